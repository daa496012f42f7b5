use serde::{Deserialize, Serialize};

/// Rigid per-frame displacement in pixels.
///
/// Applying a shift moves image content by `(rows, cols)`:
/// `dst[r, c] = src[r - rows, c - cols]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub rows: f64,
    pub cols: f64,
}

impl Shift {
    pub fn new(rows: f64, cols: f64) -> Self {
        Self { rows, cols }
    }

    /// Builds a shift from a persisted component vector.
    ///
    /// Extra components beyond the first two are ignored; fewer than two
    /// returns `None`.
    pub fn from_components(components: &[f64]) -> Option<Self> {
        match components {
            [rows, cols, ..] => Some(Self::new(*rows, *cols)),
            _ => None,
        }
    }

    pub fn is_integral(&self) -> bool {
        self.rows.fract() == 0.0 && self.cols.fract() == 0.0
    }
}

/// Returns the trailing `count` shifts, or `None` when the table is shorter.
///
/// Results fit on a longer concatenated stream carry leading shifts for
/// frames that are not part of the current video.
pub fn tail_shifts(shifts: &[Shift], count: usize) -> Option<&[Shift]> {
    let start = shifts.len().checked_sub(count)?;
    Some(&shifts[start..])
}
