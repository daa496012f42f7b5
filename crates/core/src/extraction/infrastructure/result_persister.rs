use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::extraction::domain::overwrite_policy::OverwritePolicy;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("result already exists at {0} (overwrite policy: fail)")]
    AlreadyExists(PathBuf),
    #[error("staged result missing: {0}")]
    MissingStaged(PathBuf),
    #[error("failed to move result to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistOutcome {
    Written,
    Replaced,
    /// The existing target was kept and the staged file discarded.
    Skipped,
}

/// Staging location next to `target`, keeping its extension
/// (`cnmf.hdf5` -> `cnmf.partial.hdf5`).
pub fn staging_path(target: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match target.extension() {
        Some(ext) => format!("{stem}.partial.{}", ext.to_string_lossy()),
        None => format!("{stem}.partial"),
    };
    target.with_file_name(name)
}

/// Moves a staged result onto `target`, honouring `policy` when the
/// target already exists.
pub fn persist(
    staged: &Path,
    target: &Path,
    policy: OverwritePolicy,
) -> Result<PersistOutcome, PersistError> {
    if !staged.exists() {
        return Err(PersistError::MissingStaged(staged.to_path_buf()));
    }

    let existed = target.exists();
    if existed {
        match policy {
            OverwritePolicy::Fail => {
                return Err(PersistError::AlreadyExists(target.to_path_buf()));
            }
            OverwritePolicy::Skip => {
                log::warn!(
                    "Result already exists at {}, keeping it and discarding the new one",
                    target.display()
                );
                fs::remove_file(staged).map_err(|source| PersistError::Io {
                    path: staged.to_path_buf(),
                    source,
                })?;
                return Ok(PersistOutcome::Skipped);
            }
            OverwritePolicy::Overwrite => {}
        }
    }

    fs::rename(staged, target).map_err(|source| PersistError::Io {
        path: target.to_path_buf(),
        source,
    })?;

    Ok(if existed {
        PersistOutcome::Replaced
    } else {
        PersistOutcome::Written
    })
}
