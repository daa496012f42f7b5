use ndarray::{Array2, ArrayView2};

use super::shift::Shift;

/// Domain interface for correcting motion in a single image plane.
///
/// Implementations return a new plane of the same `(height, width)` with
/// the content translated by `shift`.
pub trait FrameShifter: Send {
    fn apply(&self, plane: ArrayView2<'_, u8>, shift: &Shift) -> Array2<f32>;
}
