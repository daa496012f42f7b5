use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Pixels per frame (`height * width`).
    pub fn pixels_per_frame(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
