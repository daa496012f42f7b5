use std::path::PathBuf;

pub const DEFAULT_BACKEND: &str = "local";

/// How the extractor should set up its worker cluster.
///
/// Everything the cluster needs is carried here and handed to the
/// extractor explicitly; nothing is read from or written to the current
/// process environment by the extractor itself.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterConfig {
    pub backend: String,
    /// Worker processes; `None` lets the extractor pick.
    pub n_processes: Option<usize>,
    pub single_thread: bool,
    /// Scheduler submit directory exposed to the extractor's workers.
    pub submit_dir: Option<PathBuf>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            n_processes: None,
            single_thread: false,
            submit_dir: None,
        }
    }
}

impl ClusterConfig {
    pub fn with_n_processes(mut self, n_processes: Option<usize>) -> Self {
        self.n_processes = n_processes;
        self
    }

    pub fn with_single_thread(mut self, single_thread: bool) -> Self {
        self.single_thread = single_thread;
        self
    }

    pub fn with_submit_dir(mut self, submit_dir: Option<PathBuf>) -> Self {
        self.submit_dir = submit_dir;
        self
    }
}
