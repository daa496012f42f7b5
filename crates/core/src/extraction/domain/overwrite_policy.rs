use std::fmt;
use std::str::FromStr;

/// What to do when a result is persisted onto a path that already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Return an error and leave the existing file untouched.
    Fail,
    /// Keep the existing file and discard the new result.
    #[default]
    Skip,
    /// Replace the existing file.
    Overwrite,
}

impl FromStr for OverwritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(Self::Fail),
            "skip" => Ok(Self::Skip),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(format!(
                "Overwrite policy must be one of: fail, skip, overwrite, got '{other}'"
            )),
        }
    }
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
        };
        f.write_str(name)
    }
}
