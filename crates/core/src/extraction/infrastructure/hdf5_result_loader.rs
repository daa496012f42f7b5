use std::path::Path;

use crate::extraction::domain::extraction_result::ExtractionResult;
use crate::extraction::domain::result_loader::{ResultLoadError, ResultLoader};
use crate::motion::domain::shift::Shift;

const TEMPORAL_DATASET: &str = "estimates/C";
const SHIFTS_DATASET: &str = "estimates/shifts";

/// Reads the temporal-estimate shape and rigid shift table from an HDF5
/// result file.
///
/// Only the shape of `estimates/C` is read, never its data.
pub struct Hdf5ResultLoader;

impl Hdf5ResultLoader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Hdf5ResultLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultLoader for Hdf5ResultLoader {
    fn load(&self, path: &Path) -> Result<ExtractionResult, ResultLoadError> {
        if !path.exists() {
            return Err(ResultLoadError::NotFound(path.to_path_buf()));
        }
        let fail = |e: hdf5::Error| ResultLoadError::malformed(path, e.to_string());

        let file = hdf5::File::open(path).map_err(fail)?;

        let temporal_shape = match file.dataset(TEMPORAL_DATASET).map_err(fail)?.shape()[..] {
            [components, frames] => (components, frames),
            ref other => {
                return Err(ResultLoadError::malformed(
                    path,
                    format!("{TEMPORAL_DATASET} must be 2-D, got shape {other:?}"),
                ))
            }
        };

        let shifts_ds = file.dataset(SHIFTS_DATASET).map_err(fail)?;
        let shape = shifts_ds.shape();
        let raw: Vec<f64> = shifts_ds.read_raw().map_err(fail)?;
        let shifts = match shape[..] {
            [0] | [0, _] => Vec::new(),
            [_, width] if width >= 2 => raw
                .chunks_exact(width)
                .filter_map(Shift::from_components)
                .collect(),
            ref other => {
                return Err(ResultLoadError::malformed(
                    path,
                    format!("{SHIFTS_DATASET} must be (frames, 2+), got shape {other:?}"),
                ))
            }
        };

        Ok(ExtractionResult {
            temporal_shape,
            shifts,
        })
    }
}
