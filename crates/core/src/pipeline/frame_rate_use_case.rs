use std::path::Path;

use crate::video::domain::video_reader::VideoReader;

/// Reads a video's nominal frame rate.
pub struct FrameRateUseCase {
    reader: Box<dyn VideoReader>,
}

impl FrameRateUseCase {
    pub fn new(reader: Box<dyn VideoReader>) -> Self {
        Self { reader }
    }

    pub fn execute(&mut self, video_path: &Path) -> Result<f64, Box<dyn std::error::Error>> {
        let metadata = self.reader.open(video_path)?;
        self.reader.close();
        Ok(metadata.fps)
    }
}

/// Float rendering with a decimal point even for whole rates (`30.0`).
pub fn format_frame_rate(fps: f64) -> String {
    format!("{fps:?}")
}
