use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::extraction::domain::extraction_result::ExtractionResult;
use crate::extraction::domain::result_loader::{ResultLoadError, ResultLoader};
use crate::motion::domain::shift::Shift;

/// On-disk layout: `{"estimates": {"C": <ndarray>, "shifts": [[dy, dx], ...]}}`.
///
/// `C` uses ndarray's serde encoding (`{"v": 1, "dim": [k, t], "data": [...]}`).
#[derive(Serialize, Deserialize)]
struct ResultDocument {
    estimates: EstimatesDocument,
}

#[derive(Serialize, Deserialize)]
struct EstimatesDocument {
    #[serde(rename = "C")]
    temporal: Array2<f32>,
    shifts: Vec<Vec<f64>>,
}

/// Reads extraction results stored as JSON.
pub struct JsonResultLoader;

impl JsonResultLoader {
    pub fn new() -> Self {
        Self
    }

    /// Writes a result in the layout `load` reads.
    pub fn save(path: &Path, temporal: &Array2<f32>, shifts: &[Shift]) -> Result<(), ResultLoadError> {
        let document = ResultDocument {
            estimates: EstimatesDocument {
                temporal: temporal.clone(),
                shifts: shifts.iter().map(|s| vec![s.rows, s.cols]).collect(),
            },
        };
        let text = serde_json::to_string(&document)
            .map_err(|e| ResultLoadError::malformed(path, e.to_string()))?;
        std::fs::write(path, text).map_err(|source| ResultLoadError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for JsonResultLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultLoader for JsonResultLoader {
    fn load(&self, path: &Path) -> Result<ExtractionResult, ResultLoadError> {
        if !path.exists() {
            return Err(ResultLoadError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ResultLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: ResultDocument = serde_json::from_str(&text)
            .map_err(|e| ResultLoadError::malformed(path, e.to_string()))?;

        let shifts = document
            .estimates
            .shifts
            .iter()
            .enumerate()
            .map(|(i, components)| {
                Shift::from_components(components).ok_or_else(|| {
                    ResultLoadError::malformed(
                        path,
                        format!("shift {i} has {} components, need 2", components.len()),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ExtractionResult {
            temporal_shape: document.estimates.temporal.dim(),
            shifts,
        })
    }
}
