use std::path::{Path, PathBuf};
use std::time::Instant;

use ndarray::Array2;
use thiserror::Error;

use crate::extraction::domain::result_loader::{ResultLoadError, ResultLoader};
use crate::motion::domain::frame_shifter::FrameShifter;
use crate::motion::domain::shift::tail_shifts;
use crate::shared::constants::{DEFAULT_RESULT_FILENAME, SOURCE_CHANNEL};
use crate::shared::memmap_name::MemmapName;
use crate::shared::video_metadata::VideoMetadata;
use crate::storage::domain::column_store::{ColumnLayout, ColumnStore};
use crate::video::domain::video_reader::VideoReader;

use super::pipeline_logger::PipelineLogger;

#[derive(Error, Debug)]
pub enum ApplyShiftsError {
    #[error("failed to open video {path}: {reason}")]
    VideoOpen { path: PathBuf, reason: String },
    #[error("video {path} is unusable: {reason}")]
    InvalidVideo { path: PathBuf, reason: String },
    #[error(transparent)]
    ResultLoad(#[from] ResultLoadError),
    #[error("{what} covers {found} frames but the video has {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("failed to decode frame {index}: {reason}")]
    Decode { index: usize, reason: String },
    #[error("video ended after {index} of {expected} frames")]
    MissingFrame { index: usize, expected: usize },
    #[error("failed to write {path}: {reason}")]
    Storage { path: PathBuf, reason: String },
}

/// Result file consulted when none is given: `cnmf.hdf5` next to the video.
pub fn default_result_path(video_path: &Path) -> PathBuf {
    video_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(DEFAULT_RESULT_FILENAME)
}

/// Re-applies per-frame motion shifts to a raw video and stores the
/// corrected frames as a column-major float32 matrix on disk.
///
/// Column `i` of the output is frame `i`'s corrected plane flattened in
/// column-major order. The matrix shape lives only in the file name
/// (see [`MemmapName`]). Columns are written one at a time through the
/// [`ColumnStore`], so memory use stays at one frame regardless of length.
///
/// A failure inside the frame loop leaves the partially written file in
/// place.
pub struct ApplyShiftsUseCase {
    reader: Box<dyn VideoReader>,
    loader: Box<dyn ResultLoader>,
    shifter: Box<dyn FrameShifter>,
    store: Box<dyn ColumnStore>,
    logger: Box<dyn PipelineLogger>,
}

impl ApplyShiftsUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        loader: Box<dyn ResultLoader>,
        shifter: Box<dyn FrameShifter>,
        store: Box<dyn ColumnStore>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            loader,
            shifter,
            store,
            logger,
        }
    }

    /// Writes the corrected matrix next to `video_path` and returns its path.
    pub fn execute(
        &mut self,
        video_path: &Path,
        result_path: Option<&Path>,
    ) -> Result<PathBuf, ApplyShiftsError> {
        let metadata =
            self.reader
                .open(video_path)
                .map_err(|e| ApplyShiftsError::VideoOpen {
                    path: video_path.to_path_buf(),
                    reason: e.to_string(),
                })?;

        let outcome = self.write_corrected(video_path, result_path, &metadata);
        self.reader.close();
        if outcome.is_ok() {
            self.logger.summary();
        }
        outcome
    }

    fn write_corrected(
        &mut self,
        video_path: &Path,
        result_path: Option<&Path>,
        metadata: &VideoMetadata,
    ) -> Result<PathBuf, ApplyShiftsError> {
        validate_metadata(video_path, metadata)?;
        let height = metadata.height as usize;
        let width = metadata.width as usize;
        let frames = metadata.total_frames;

        let result_path = result_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_result_path(video_path));
        log::info!("Loading extraction result from {}", result_path.display());
        let result = self.loader.load(&result_path)?;

        if result.frame_count() != frames {
            return Err(ApplyShiftsError::ShapeMismatch {
                what: "temporal estimate",
                expected: frames,
                found: result.frame_count(),
            });
        }
        let shifts =
            tail_shifts(&result.shifts, frames).ok_or(ApplyShiftsError::ShapeMismatch {
                what: "shift table",
                expected: frames,
                found: result.shifts.len(),
            })?;
        if result.shifts.len() > frames {
            log::info!(
                "Using the last {frames} of {} shifts",
                result.shifts.len()
            );
        }

        let target = output_path(video_path, height, width, frames);
        let storage_error = |e: Box<dyn std::error::Error>| ApplyShiftsError::Storage {
            path: target.clone(),
            reason: e.to_string(),
        };
        self.store
            .allocate(&target, ColumnLayout::new(metadata.pixels_per_frame(), frames))
            .map_err(storage_error)?;
        self.logger
            .info(&format!("Writing {} frames to {}", frames, target.display()));

        let mut decoded = self.reader.frames();
        for (index, shift) in shifts.iter().enumerate() {
            let start = Instant::now();
            let frame = match decoded.next() {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    return Err(ApplyShiftsError::Decode {
                        index,
                        reason: e.to_string(),
                    })
                }
                None => {
                    return Err(ApplyShiftsError::MissingFrame {
                        index,
                        expected: frames,
                    })
                }
            };
            if frame.width() != metadata.width || frame.height() != metadata.height {
                return Err(ApplyShiftsError::Decode {
                    index,
                    reason: format!(
                        "frame is {}x{}, stream is {}x{}",
                        frame.width(),
                        frame.height(),
                        metadata.width,
                        metadata.height
                    ),
                });
            }
            let plane = frame.channel_plane(SOURCE_CHANNEL);
            self.logger
                .timing("decode", start.elapsed().as_secs_f64() * 1000.0);

            let start = Instant::now();
            let corrected = self.shifter.apply(plane.view(), shift);
            let column = fortran_column(&corrected);
            self.logger
                .timing("shift", start.elapsed().as_secs_f64() * 1000.0);

            let start = Instant::now();
            self.store
                .write_column(index, &column)
                .map_err(storage_error)?;
            self.logger
                .timing("write", start.elapsed().as_secs_f64() * 1000.0);
            self.logger
                .bytes_written((column.len() * std::mem::size_of::<f32>()) as u64);

            self.logger.progress(index + 1, frames);
        }

        log::info!("Wrote {}", target.display());
        Ok(target)
    }
}

fn validate_metadata(video_path: &Path, metadata: &VideoMetadata) -> Result<(), ApplyShiftsError> {
    let reason = if metadata.width == 0 || metadata.height == 0 {
        format!("frame size {}x{}", metadata.width, metadata.height)
    } else if metadata.total_frames == 0 {
        "container reports no frames".to_string()
    } else {
        return Ok(());
    };
    Err(ApplyShiftsError::InvalidVideo {
        path: video_path.to_path_buf(),
        reason,
    })
}

/// `<video dir>/{stem}_d1_{H}_d2_{W}_d3_1_order_F_frames_{F}_.mmap`
pub fn output_path(video_path: &Path, height: usize, width: usize, frames: usize) -> PathBuf {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = MemmapName::fortran(stem, height, width, frames);
    video_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(name.file_name())
}

/// Flattens a plane so that the row index varies fastest.
fn fortran_column(plane: &Array2<f32>) -> Vec<f32> {
    plane.t().iter().copied().collect()
}
