use std::path::Path;

use crate::extraction::domain::extraction_result::ExtractionResult;
use crate::extraction::domain::result_loader::{ResultLoadError, ResultLoader};
use crate::extraction::infrastructure::json_result_loader::JsonResultLoader;

/// Picks a result loader from the file extension.
pub fn create_result_loader(path: &Path) -> Result<Box<dyn ResultLoader>, ResultLoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "json" => Ok(Box::new(JsonResultLoader::new())),
        "hdf5" | "h5" => hdf5_loader(path),
        _ => Err(ResultLoadError::UnsupportedFormat(format!(
            "{} (expected .hdf5, .h5 or .json)",
            path.display()
        ))),
    }
}

/// Loader that defers the format choice to each `load` call.
pub struct ExtensionResultLoader;

impl ResultLoader for ExtensionResultLoader {
    fn load(&self, path: &Path) -> Result<ExtractionResult, ResultLoadError> {
        create_result_loader(path)?.load(path)
    }
}

#[cfg(feature = "hdf5")]
fn hdf5_loader(_path: &Path) -> Result<Box<dyn ResultLoader>, ResultLoadError> {
    use crate::extraction::infrastructure::hdf5_result_loader::Hdf5ResultLoader;
    Ok(Box::new(Hdf5ResultLoader::new()))
}

#[cfg(not(feature = "hdf5"))]
fn hdf5_loader(path: &Path) -> Result<Box<dyn ResultLoader>, ResultLoadError> {
    Err(ResultLoadError::UnsupportedFormat(format!(
        "{} (built without the `hdf5` feature)",
        path.display()
    )))
}
