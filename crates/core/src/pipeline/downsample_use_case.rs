use std::path::{Path, PathBuf};

use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::pipeline_logger::PipelineLogger;

const SECONDS_PER_HOUR: f64 = 3600.0;
const FALLBACK_EXTENSION: &str = "avi";

/// How a recording is thinned out and cut into chunks.
#[derive(Clone, Debug, PartialEq)]
pub struct DownsampleConfig {
    /// Keep one frame out of every `frames_skip`.
    pub frames_skip: usize,
    /// Source time covered by each chunk, in hours.
    pub hours_per_chunk: f64,
    /// Chunk `k` is written as `{chunk_stem}_{k}.<source extension>`.
    pub chunk_stem: String,
}

impl DownsampleConfig {
    /// Source frames that fall into one chunk (at least one).
    pub fn source_frames_per_chunk(&self, fps: f64) -> usize {
        let frames = (self.hours_per_chunk * SECONDS_PER_HOUR * fps).round();
        if frames.is_finite() && frames >= 1.0 {
            frames as usize
        } else {
            1
        }
    }
}

/// Keeps every n-th frame of a long recording and splits the kept frames
/// into fixed-duration chunk files next to the source.
///
/// Chunks are played back at `fps / n`, so each file's duration shrinks
/// by the skip factor while the frames it holds still span
/// `hours_per_chunk` of recording time.
pub struct DownsampleUseCase {
    reader: Box<dyn VideoReader>,
    writer: Box<dyn VideoWriter>,
    logger: Box<dyn PipelineLogger>,
    config: DownsampleConfig,
}

impl DownsampleUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        logger: Box<dyn PipelineLogger>,
        config: DownsampleConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            logger,
            config,
        }
    }

    /// Returns the chunk files in order.
    pub fn execute(&mut self, video_path: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        if self.config.frames_skip == 0 {
            return Err("frames_skip must be at least 1".into());
        }
        let metadata = self.reader.open(video_path)?;
        let outcome = self.write_chunks(video_path, &metadata);
        self.reader.close();
        outcome
    }

    fn write_chunks(
        &mut self,
        video_path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        let mut state = ChunkState::default();
        let outcome = self.fill_chunks(video_path, metadata, &mut state);

        // A chunk cut short by an error still gets its trailer

        if state.writer_open {
            let closed = self.writer.close();
            self.logger.metric("chunk_frames", state.kept_in_chunk as f64);
            match (&outcome, closed) {
                (Ok(()), Err(e)) => return Err(e),
                (Err(_), Err(e)) => log::warn!("Failed to finalize chunk after error: {e}"),
                (_, Ok(())) => {}
            }
        }
        outcome?;

        self.logger.summary();
        Ok(state.paths)
    }

    fn fill_chunks(
        &mut self,
        video_path: &Path,
        metadata: &VideoMetadata,
        state: &mut ChunkState,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let skip = self.config.frames_skip;
        let per_chunk = self.config.source_frames_per_chunk(metadata.fps);
        let chunk_meta = VideoMetadata {
            fps: metadata.fps / skip as f64,
            total_frames: 0,
            ..metadata.clone()
        };
        self.logger.info(&format!(
            "Keeping 1 of {skip} frames, {per_chunk} source frames per chunk"
        ));
        let total = metadata.total_frames;

        for (index, frame) in self.reader.frames().enumerate() {
            let frame = frame?;
            if index % skip != 0 {
                continue;
            }

            let chunk = index / per_chunk;
            if state.current_chunk != Some(chunk) {
                if state.writer_open {
                    state.writer_open = false;
                    self.writer.close()?;
                    self.logger.metric("chunk_frames", state.kept_in_chunk as f64);
                }
                let path = chunk_path(video_path, &self.config.chunk_stem, state.paths.len());
                log::info!("Writing chunk {} to {}", state.paths.len(), path.display());
                self.writer.open(&path, &chunk_meta)?;
                state.writer_open = true;
                state.paths.push(path);
                state.current_chunk = Some(chunk);
                state.kept_in_chunk = 0;
            }

            self.writer.write(&frame)?;
            state.kept_in_chunk += 1;
            self.logger.progress(index + 1, total.max(index + 1));
        }
        Ok(())
    }
}

/// Bookkeeping for the chunk currently being written.
#[derive(Default)]
struct ChunkState {
    paths: Vec<PathBuf>,
    current_chunk: Option<usize>,
    kept_in_chunk: usize,
    writer_open: bool,
}

/// `<video dir>/{stem}_{index}.<video extension>`
pub fn chunk_path(video_path: &Path, stem: &str, index: usize) -> PathBuf {
    let ext = video_path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
    video_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(format!("{stem}_{index}.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::frame::Frame;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubReader {
        frames: Vec<Frame>,
        fps: f64,
        fail_at: Option<usize>,
    }

    impl VideoReader for StubReader {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(VideoMetadata {
                width: 2,
                height: 2,
                fps: self.fps,
                total_frames: self.frames.len(),
                codec: "stub".into(),
                source_path: Some(path.to_path_buf()),
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            let fail_at = self.fail_at;
            Box::new(self.frames.drain(..).enumerate().map(
                move |(i, f)| -> Result<Frame, Box<dyn std::error::Error>> {
                    if Some(i) == fail_at {
                        Err("corrupt packet".into())
                    } else {
                        Ok(f)
                    }
                },
            ))
        }

        fn close(&mut self) {}
    }

    /// Records `(path, fps, frame indices)` for every opened output.
    #[derive(Default)]
    struct Recorded {
        outputs: Vec<(PathBuf, f64, Vec<usize>)>,
        closes: usize,
    }

    struct StubWriter {
        recorded: Arc<Mutex<Recorded>>,
        fail_on_frame: Option<usize>,
    }

    impl VideoWriter for StubWriter {
        fn open(
            &mut self,
            path: &Path,
            metadata: &VideoMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.recorded
                .lock()
                .unwrap()
                .outputs
                .push((path.to_path_buf(), metadata.fps, Vec::new()));
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            if Some(frame.index()) == self.fail_on_frame {
                return Err("encoder rejected frame".into());
            }
            let mut recorded = self.recorded.lock().unwrap();
            let current = recorded.outputs.last_mut().ok_or("write before open")?;
            current.2.push(frame.index());
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.recorded.lock().unwrap().closes += 1;
            Ok(())
        }
    }

    fn frames(n: usize) -> Vec<Frame> {
        (0..n).map(|i| Frame::filled(2, 2, 3, 0, i)).collect()
    }

    fn run(
        source: usize,
        fps: f64,
        config: DownsampleConfig,
    ) -> (Result<Vec<PathBuf>, Box<dyn std::error::Error>>, Recorded) {
        run_failing(source, fps, config, None, None)
    }

    fn run_failing(
        source: usize,
        fps: f64,
        config: DownsampleConfig,
        decode_fails_at: Option<usize>,
        encode_fails_at: Option<usize>,
    ) -> (Result<Vec<PathBuf>, Box<dyn std::error::Error>>, Recorded) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let mut uc = DownsampleUseCase::new(
            Box::new(StubReader {
                frames: frames(source),
                fps,
                fail_at: decode_fails_at,
            }),
            Box::new(StubWriter {
                recorded: recorded.clone(),
                fail_on_frame: encode_fails_at,
            }),
            Box::new(NullPipelineLogger),
            config,
        );
        let result = uc.execute(Path::new("/data/mouse1/long.mp4"));
        drop(uc);
        let recorded = Arc::try_unwrap(recorded)
            .ok()
            .unwrap()
            .into_inner()
            .unwrap();
        (result, recorded)
    }

    fn config(frames_skip: usize, hours_per_chunk: f64) -> DownsampleConfig {
        DownsampleConfig {
            frames_skip,
            hours_per_chunk,
            chunk_stem: "chunk".into(),
        }
    }

    #[test]
    fn test_chunk_path_keeps_extension() {
        assert_eq!(
            chunk_path(Path::new("/data/mouse1/long.mp4"), "chunk", 3),
            PathBuf::from("/data/mouse1/chunk_3.mp4")
        );
        assert_eq!(
            chunk_path(Path::new("/data/raw"), "part", 0),
            PathBuf::from("/data/part_0.avi")
        );
    }

    #[rstest]
    #[case::two_hours_30fps(2.0, 30.0, 216_000)]
    #[case::one_second(1.0 / 3600.0, 10.0, 10)]
    #[case::never_zero(0.0, 30.0, 1)]
    fn test_source_frames_per_chunk(#[case] hours: f64, #[case] fps: f64, #[case] expected: usize) {
        assert_eq!(config(4, hours).source_frames_per_chunk(fps), expected);
    }

    #[test]
    fn test_keeps_every_nth_frame_in_one_chunk() {
        let (result, recorded) = run(10, 30.0, config(4, 2.0));
        let chunks = result.unwrap();

        assert_eq!(chunks, vec![PathBuf::from("/data/mouse1/chunk_0.mp4")]);
        assert_eq!(recorded.outputs.len(), 1);
        assert_eq!(recorded.outputs[0].2, vec![0, 4, 8]);
        assert_relative_eq!(recorded.outputs[0].1, 7.5);
        assert_eq!(recorded.closes, 1);
    }

    #[test]
    fn test_chunk_boundaries_follow_source_time() {
        // 10 fps, 1 second per chunk -> 10 source frames per chunk
        let (result, recorded) = run(25, 10.0, config(3, 1.0 / 3600.0));
        let chunks = result.unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], PathBuf::from("/data/mouse1/chunk_2.mp4"));
        let kept: Vec<_> = recorded.outputs.iter().map(|o| o.2.clone()).collect();
        assert_eq!(
            kept,
            vec![vec![0, 3, 6, 9], vec![12, 15, 18], vec![21, 24]]
        );
        assert_eq!(recorded.closes, 3);
    }

    #[test]
    fn test_chunks_numbered_consecutively_when_skip_exceeds_chunk() {
        // one source frame per chunk, so every kept frame starts a new chunk
        let (result, recorded) = run(9, 1.0, config(4, 1.0 / 3600.0));
        let chunks = result.unwrap();

        assert_eq!(
            chunks,
            vec![
                PathBuf::from("/data/mouse1/chunk_0.mp4"),
                PathBuf::from("/data/mouse1/chunk_1.mp4"),
                PathBuf::from("/data/mouse1/chunk_2.mp4"),
            ]
        );
        let kept: Vec<_> = recorded.outputs.iter().map(|o| o.2.clone()).collect();
        assert_eq!(kept, vec![vec![0], vec![4], vec![8]]);
    }

    #[test]
    fn test_skip_of_one_keeps_everything() {
        let (result, recorded) = run(5, 30.0, config(1, 2.0));
        assert_eq!(result.unwrap().len(), 1);
        assert_eq!(recorded.outputs[0].2, vec![0, 1, 2, 3, 4]);
        assert_relative_eq!(recorded.outputs[0].1, 30.0);
    }

    #[test]
    fn test_empty_video_writes_nothing() {
        let (result, recorded) = run(0, 30.0, config(4, 2.0));
        assert!(result.unwrap().is_empty());
        assert!(recorded.outputs.is_empty());
        assert_eq!(recorded.closes, 0);
    }

    #[test]
    fn test_zero_skip_is_rejected() {
        let (result, recorded) = run(5, 30.0, config(0, 2.0));
        assert!(result.is_err());
        assert!(recorded.outputs.is_empty());
    }

    #[rstest]
    #[case::decode_error(Some(6), None, vec![vec![0, 3]])]
    #[case::encode_error(None, Some(6), vec![vec![0, 3]])]
    #[case::second_chunk(Some(13), None, vec![vec![0, 3, 6, 9], vec![12]])]
    fn test_failure_closes_open_chunk(
        #[case] decode_fails_at: Option<usize>,
        #[case] encode_fails_at: Option<usize>,
        #[case] kept: Vec<Vec<usize>>,
    ) {
        // 10 source frames per chunk, keeping every third
        let (result, recorded) = run_failing(
            25,
            10.0,
            config(3, 1.0 / 3600.0),
            decode_fails_at,
            encode_fails_at,
        );

        assert!(result.is_err());
        let written: Vec<_> = recorded.outputs.iter().map(|o| o.2.clone()).collect();
        assert_eq!(written, kept);
        assert_eq!(recorded.closes, kept.len());
    }
}
