use ndarray::{Array2, ArrayView2};

use crate::motion::domain::frame_shifter::FrameShifter;
use crate::motion::domain::shift::Shift;

/// Bicubic kernel coefficient (OpenCV's `INTER_CUBIC` value).
const CUBIC_A: f64 = -0.75;

/// Translates 8-bit planes with separable bicubic interpolation.
///
/// Borders are reflected (`fedcba|abcdef|fedcba`). The output is clamped to
/// the input plane's value range, so interpolation overshoot never creates
/// intensities the source did not have, and rounded to whole values since
/// the source is integer-valued.
pub struct CubicShifter;

impl CubicShifter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CubicShifter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameShifter for CubicShifter {
    fn apply(&self, plane: ArrayView2<'_, u8>, shift: &Shift) -> Array2<f32> {
        let (height, width) = plane.dim();
        if height == 0 || width == 0 {
            return Array2::zeros((height, width));
        }

        let (min, max) = value_range(&plane);
        let (row_base, row_weights) = taps(shift.rows);
        let (col_base, col_weights) = taps(shift.cols);

        // Horizontal pass over every source row.
        let horizontal = Array2::from_shape_fn((height, width), |(r, c)| {
            let mut acc = 0.0f32;
            for (k, w) in col_weights.iter().enumerate() {
                let src_c = reflect(c as isize + col_base + k as isize - 1, width);
                acc += w * plane[[r, src_c]] as f32;
            }
            acc
        });

        Array2::from_shape_fn((height, width), |(r, c)| {
            let mut acc = 0.0f32;
            for (k, w) in row_weights.iter().enumerate() {
                let src_r = reflect(r as isize + row_base + k as isize - 1, height);
                acc += w * horizontal[[src_r, c]];
            }
            acc.clamp(min, max).round()
        })
    }
}

/// Integer base offset and the four tap weights for a constant shift.
///
/// Destination index `i` samples source position `i - shift`, whose integer
/// part is `i + base` for every `i`.
fn taps(shift: f64) -> (isize, [f32; 4]) {
    let source = -shift;
    let base = source.floor();
    let frac = source - base;
    let weights = [
        cubic_weight(frac + 1.0),
        cubic_weight(frac),
        cubic_weight(1.0 - frac),
        cubic_weight(2.0 - frac),
    ];
    (base as isize, weights.map(|w| w as f32))
}

fn cubic_weight(x: f64) -> f64 {
    let x = x.abs();
    if x <= 1.0 {
        ((CUBIC_A + 2.0) * x - (CUBIC_A + 3.0)) * x * x + 1.0
    } else if x < 2.0 {
        ((CUBIC_A * x - 5.0 * CUBIC_A) * x + 8.0 * CUBIC_A) * x - 4.0 * CUBIC_A
    } else {
        0.0
    }
}

/// Mirrors an out-of-range index back into `0..len`, edge pixel repeated.
fn reflect(index: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    let period = 2 * len;
    let m = index.rem_euclid(period);
    (if m < len { m } else { period - 1 - m }) as usize
}

fn value_range(plane: &ArrayView2<'_, u8>) -> (f32, f32) {
    let (min, max) = plane
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    (min as f32, max as f32)
}
