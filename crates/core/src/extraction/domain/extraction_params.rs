use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("failed to access parameter file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid parameter file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("parameter file {0} must contain a JSON object")]
    NotAnObject(PathBuf),
}

/// Flat `name -> value` parameter set handed to the online extractor.
///
/// Parameter files group settings by section (`{"data": {"fr": 30}, ...}`).
/// Loading flattens the sections into one namespace; when two sections
/// define the same name, the section whose name sorts last wins.
/// Top-level entries that are not objects are kept as-is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractionParams {
    values: BTreeMap<String, Value>,
}

impl ExtractionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, ParamsError> {
        let text = std::fs::read_to_string(path).map_err(|source| ParamsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let root: Value = serde_json::from_str(&text).map_err(|source| ParamsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let Value::Object(sections) = root else {
            return Err(ParamsError::NotAnObject(path.to_path_buf()));
        };
        Ok(Self::flatten(sections))
    }

    pub fn flatten(sections: Map<String, Value>) -> Self {
        let mut values = BTreeMap::new();
        for (name, section) in sections {
            match section {
                Value::Object(entries) => values.extend(entries),
                other => {
                    values.insert(name, other);
                }
            }
        }
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone().into_iter().collect())
    }

    pub fn save(&self, path: &Path) -> Result<(), ParamsError> {
        let text = serde_json::to_string_pretty(&self.to_json()).map_err(|source| {
            ParamsError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, text).map_err(|source| ParamsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
