use crate::motion::domain::shift::Shift;

/// The parts of a persisted source-extraction result the frame writer needs.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionResult {
    /// Shape of the temporal estimate: `(components, frames)`.
    pub temporal_shape: (usize, usize),
    /// One rigid shift per frame of the stream the extractor was fit on.
    pub shifts: Vec<Shift>,
}

impl ExtractionResult {
    /// Frames covered by the temporal estimate.
    pub fn frame_count(&self) -> usize {
        self.temporal_shape.1
    }
}
