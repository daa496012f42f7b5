use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use calcium_prep_core::extraction::domain::cluster_config::ClusterConfig;
use calcium_prep_core::extraction::domain::overwrite_policy::OverwritePolicy;
use calcium_prep_core::extraction::infrastructure::external_process_extractor::ExternalProcessExtractor;
use calcium_prep_core::extraction::infrastructure::loader_factory::ExtensionResultLoader;
use calcium_prep_core::motion::infrastructure::cubic_shifter::CubicShifter;
use calcium_prep_core::pipeline::apply_shifts_use_case::ApplyShiftsUseCase;
use calcium_prep_core::pipeline::downsample_use_case::{DownsampleConfig, DownsampleUseCase};
use calcium_prep_core::pipeline::frame_rate_use_case::{format_frame_rate, FrameRateUseCase};
use calcium_prep_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use calcium_prep_core::pipeline::run_online_use_case::RunOnlineUseCase;
use calcium_prep_core::shared::constants::{
    DEFAULT_CHUNK_STEM, DEFAULT_EXTRACTOR_PROGRAM, DEFAULT_FRAMES_SKIP, DEFAULT_HOURS_PER_CHUNK,
    DEFAULT_PARAMS_FILENAME, SUBMIT_DIR_ENV,
};
use calcium_prep_core::storage::infrastructure::mmap_column_store::MmapColumnStore;
use calcium_prep_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use calcium_prep_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// Calcium-imaging video preparation around an online source extractor.
#[derive(Parser)]
#[command(name = "calcium-prep")]
struct Cli {
    /// One of: print_fr, downsample, run_pipeline_online, apply_shifts_online_cust.
    method: String,

    /// Input video.
    #[arg(short = 'f', long)]
    fpath: PathBuf,

    /// Hours of recording per downsampled chunk.
    #[arg(short = 't', long, default_value_t = DEFAULT_HOURS_PER_CHUNK)]
    t_hr_per_chunk: f64,

    /// File name stem of downsampled chunks.
    #[arg(short = 's', long, default_value = DEFAULT_CHUNK_STEM)]
    fname_stem: String,

    /// Keep one frame out of every N when downsampling.
    #[arg(short = 'n', long, default_value_t = DEFAULT_FRAMES_SKIP)]
    n_frames_skip: usize,

    /// Extraction result to take shifts from (default: cnmf.hdf5 next to the video).
    #[arg(short = 'c', long)]
    cnmf_path: Option<PathBuf>,

    /// Extraction parameter file (JSON).
    #[arg(long, default_value = DEFAULT_PARAMS_FILENAME)]
    params: PathBuf,

    /// What to do when the result file already exists: fail, skip or overwrite.
    #[arg(long, default_value = "skip")]
    overwrite: String,

    /// Online extractor executable.
    #[arg(long, default_value = DEFAULT_EXTRACTOR_PROGRAM)]
    extractor: PathBuf,

    /// Worker processes for the extractor.
    #[arg(long)]
    n_processes: Option<usize>,

    /// Run the extractor without worker processes.
    #[arg(long)]
    single_thread: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Method {
    PrintFrameRate,
    Downsample,
    RunPipelineOnline,
    ApplyShifts,
}

impl Method {
    fn parse(name: &str) -> Result<Self, String> {
        match name {
            "print_fr" => Ok(Self::PrintFrameRate),
            "downsample" => Ok(Self::Downsample),
            "run_pipeline_online" => Ok(Self::RunPipelineOnline),
            "apply_shifts_online_cust" => Ok(Self::ApplyShifts),
            other => Err(format!("Unrecognized method: {other}")),
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let method = Method::parse(&cli.method)?;
    validate(&cli)?;

    match method {
        Method::PrintFrameRate => run_print_frame_rate(&cli.fpath),
        Method::Downsample => run_downsample(&cli),
        Method::RunPipelineOnline => run_pipeline_online(&cli),
        Method::ApplyShifts => run_apply_shifts(&cli.fpath, cli.cnmf_path.as_deref()),
    }
}

fn run_print_frame_rate(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut use_case = FrameRateUseCase::new(Box::new(FfmpegReader::new()));
    let fps = use_case.execute(input)?;
    println!("{}", format_frame_rate(fps));
    Ok(())
}

fn run_downsample(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = DownsampleConfig {
        frames_skip: cli.n_frames_skip,
        hours_per_chunk: cli.t_hr_per_chunk,
        chunk_stem: cli.fname_stem.clone(),
    };
    let mut use_case = DownsampleUseCase::new(
        Box::new(FfmpegReader::new()),
        Box::new(FfmpegWriter::new()),
        Box::new(StdoutPipelineLogger::default()),
        config,
    );
    let chunks = use_case.execute(&cli.fpath)?;
    log::info!("Wrote {} chunks", chunks.len());
    for chunk in chunks {
        println!("{}", chunk.display());
    }
    Ok(())
}

fn run_pipeline_online(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let policy: OverwritePolicy = cli.overwrite.parse()?;
    let video_dir = cli.fpath.parent().map(Path::to_path_buf);

    // Under the scheduler the extractor's workers run from the video's directory
    let submit_dir = if std::env::var_os(SUBMIT_DIR_ENV).is_some() {
        video_dir.clone()
    } else {
        None
    };
    let cluster = ClusterConfig::default()
        .with_n_processes(cli.n_processes)
        .with_single_thread(cli.single_thread)
        .with_submit_dir(submit_dir);

    let log_dir = std::env::current_dir()?;
    let extractor = ExternalProcessExtractor::new(&cli.extractor);

    let mut use_case = RunOnlineUseCase::new(
        Box::new(FfmpegReader::new()),
        Box::new(extractor),
        Box::new(StdoutPipelineLogger::default()),
        cluster,
        policy,
        log_dir,
    );
    let report = use_case.execute(&cli.fpath, &cli.params)?;
    log::info!(
        "Result {} ({:?}), parameters saved to {}",
        report.result_path.display(),
        report.outcome,
        report.params_path.display()
    );
    Ok(())
}

fn run_apply_shifts(input: &Path, cnmf_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut use_case = ApplyShiftsUseCase::new(
        Box::new(FfmpegReader::new()),
        Box::new(ExtensionResultLoader),
        Box::new(CubicShifter::new()),
        Box::new(MmapColumnStore::new()),
        Box::new(StdoutPipelineLogger::default()),
    );
    let output = use_case.execute(input, cnmf_path)?;
    println!("{}", output.display());
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.fpath.exists() {
        return Err(format!("Input file not found: {}", cli.fpath.display()).into());
    }
    if cli.n_frames_skip == 0 {
        return Err("Frames to skip must be at least 1, got 0".into());
    }
    if !(cli.t_hr_per_chunk.is_finite() && cli.t_hr_per_chunk > 0.0) {
        return Err(format!(
            "Hours per chunk must be a positive number, got {}",
            cli.t_hr_per_chunk
        )
        .into());
    }
    if cli.fname_stem.is_empty() || cli.fname_stem.contains(std::path::MAIN_SEPARATOR) {
        return Err(format!(
            "Chunk name stem must be a non-empty file name, got '{}'",
            cli.fname_stem
        )
        .into());
    }
    cli.overwrite.parse::<OverwritePolicy>()?;
    if let Some(n) = cli.n_processes {
        if n == 0 {
            return Err("Process count must be at least 1, got 0".into());
        }
    }
    if let Some(path) = &cli.cnmf_path {
        if !path.exists() {
            return Err(format!("Result file not found: {}", path.display()).into());
        }
    }
    Ok(())
}
