/// Result file looked up next to the video when no explicit path is given.
pub const DEFAULT_RESULT_FILENAME: &str = "cnmf.hdf5";

/// Parameter file read from the working directory by default.
pub const DEFAULT_PARAMS_FILENAME: &str = "opts.json";

/// Where the final parameters of an online run are saved, next to the video.
pub const SAVED_PARAMS_FILENAME: &str = "opts.json";

/// Channel of an RGB24 frame fed to the shifter (blue; channel 0 of BGR).
pub const SOURCE_CHANNEL: usize = 2;

/// Bytes per stored pixel (float32).
pub const BYTES_PER_PIXEL: usize = 4;

/// Scheduler variable whose presence makes the extractor run from the video's directory.
pub const SUBMIT_DIR_ENV: &str = "SLURM_SUBMIT_DIR";

/// Prefix and infix of the per-worker log files the extractor leaves behind.
pub const EXTRACTOR_LOG_PREFIX: &str = "Yr";
pub const EXTRACTOR_LOG_INFIX: &str = "_LOG_";

pub const DEFAULT_EXTRACTOR_PROGRAM: &str = "caiman-onacid";

pub const DEFAULT_FRAMES_SKIP: usize = 4;
pub const DEFAULT_HOURS_PER_CHUNK: f64 = 2.0;
pub const DEFAULT_CHUNK_STEM: &str = "chunk";
