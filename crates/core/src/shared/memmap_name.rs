use std::fmt;
use std::path::Path;

use thiserror::Error;

const EXTENSION_SUFFIX: &str = "_.mmap";
const DIMS_MARKER: &str = "_d1_";

#[derive(Error, Debug, PartialEq)]
pub enum MemmapNameError {
    #[error("not a memmap file name: {0}")]
    NotMemmap(String),
    #[error("malformed memmap file name {name}: {reason}")]
    Malformed { name: String, reason: String },
}

/// Storage order recorded in the file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageOrder {
    /// Column-major: the first index varies fastest.
    Fortran,
    /// Row-major.
    C,
}

impl StorageOrder {
    fn tag(self) -> &'static str {
        match self {
            StorageOrder::Fortran => "F",
            StorageOrder::C => "C",
        }
    }
}

/// Shape metadata carried entirely by a memmap file's name.
///
/// The file itself has no header, so `{stem}_d1_{H}_d2_{W}_d3_{D}_order_{O}_frames_{T}_.mmap`
/// is the only place a reader can recover the matrix dimensions from.
#[derive(Clone, Debug, PartialEq)]
pub struct MemmapName {
    pub stem: String,
    pub height: usize,
    pub width: usize,
    pub depth: usize,
    pub order: StorageOrder,
    pub frames: usize,
}

impl MemmapName {
    /// Name for a single-plane, column-major frame matrix.
    pub fn fortran(stem: impl Into<String>, height: usize, width: usize, frames: usize) -> Self {
        Self {
            stem: stem.into(),
            height,
            width,
            depth: 1,
            order: StorageOrder::Fortran,
            frames,
        }
    }

    pub fn file_name(&self) -> String {
        self.to_string()
    }

    /// Rows of the stored matrix (`height * width * depth`).
    pub fn pixels_per_frame(&self) -> usize {
        self.height * self.width * self.depth
    }

    pub fn from_path(path: &Path) -> Result<Self, MemmapNameError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MemmapNameError::NotMemmap(path.display().to_string()))?;
        Self::parse(name)
    }

    pub fn parse(name: &str) -> Result<Self, MemmapNameError> {
        let body = name
            .strip_suffix(EXTENSION_SUFFIX)
            .ok_or_else(|| MemmapNameError::NotMemmap(name.to_string()))?;
        let split = body
            .rfind(DIMS_MARKER)
            .ok_or_else(|| malformed(name, "missing d1 dimension"))?;
        let stem = &body[..split];
        let fields: Vec<&str> = body[split + DIMS_MARKER.len()..].split('_').collect();

        let [h, "d2", w, "d3", d, "order", o, "frames", t] = fields.as_slice() else {
            return Err(malformed(name, "unexpected field layout"));
        };

        let order = match *o {
            "F" => StorageOrder::Fortran,
            "C" => StorageOrder::C,
            other => return Err(malformed(name, &format!("unknown order '{other}'"))),
        };

        Ok(Self {
            stem: stem.to_string(),
            height: parse_dim(name, "d1", h)?,
            width: parse_dim(name, "d2", w)?,
            depth: parse_dim(name, "d3", d)?,
            order,
            frames: parse_dim(name, "frames", t)?,
        })
    }
}

impl fmt::Display for MemmapName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_d1_{}_d2_{}_d3_{}_order_{}_frames_{}{}",
            self.stem,
            self.height,
            self.width,
            self.depth,
            self.order.tag(),
            self.frames,
            EXTENSION_SUFFIX
        )
    }
}

fn parse_dim(name: &str, field: &str, value: &str) -> Result<usize, MemmapNameError> {
    value
        .parse()
        .map_err(|_| malformed(name, &format!("{field} is not an integer: '{value}'")))
}

fn malformed(name: &str, reason: &str) -> MemmapNameError {
    MemmapNameError::Malformed {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
