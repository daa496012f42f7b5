use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::extraction::domain::cluster_config::ClusterConfig;
use crate::extraction::domain::extraction_params::ExtractionParams;
use crate::extraction::domain::online_extractor::OnlineExtractor;
use crate::shared::constants::SUBMIT_DIR_ENV;

/// Runs the online extractor as a child process.
///
/// Invocation: `<program> [args...] --params <json> --output <path>
/// --backend <name> [--n-processes N] [--single-thread]`. Parameters are
/// handed over in a temporary JSON file that is removed afterwards. The
/// scheduler submit directory, when configured, is set in the child's
/// environment only.
pub struct ExternalProcessExtractor {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ExternalProcessExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Arguments placed before the generated flags.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    fn command(&self, params_path: &Path, cluster: &ClusterConfig, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--params")
            .arg(params_path)
            .arg("--output")
            .arg(output)
            .arg("--backend")
            .arg(&cluster.backend);
        if let Some(n) = cluster.n_processes {
            cmd.arg("--n-processes").arg(n.to_string());
        }
        if cluster.single_thread {
            cmd.arg("--single-thread");
        }
        if let Some(dir) = &cluster.submit_dir {
            cmd.env(SUBMIT_DIR_ENV, dir);
        }
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl OnlineExtractor for ExternalProcessExtractor {
    fn fit_online(
        &mut self,
        params: &ExtractionParams,
        cluster: &ClusterConfig,
        output: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut params_file = tempfile::Builder::new()
            .prefix("onacid-params-")
            .suffix(".json")
            .tempfile()?;
        serde_json::to_writer_pretty(params_file.as_file_mut(), &params.to_json())?;
        params_file.flush()?;

        let mut cmd = self.command(params_file.path(), cluster, output);
        log::debug!("Launching extractor: {cmd:?}");

        let status = cmd
            .status()
            .map_err(|e| format!("failed to launch {}: {e}", self.program.display()))?;
        if !status.success() {
            return Err(format!("extractor {} failed: {status}", self.program.display()).into());
        }
        if !output.exists() {
            return Err(format!(
                "extractor {} finished without writing {}",
                self.program.display(),
                output.display()
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_command_default_cluster() {
        let extractor = ExternalProcessExtractor::new("caiman-onacid");
        let cmd = extractor.command(
            Path::new("/tmp/p.json"),
            &ClusterConfig::default(),
            Path::new("/data/cnmf.partial.hdf5"),
        );
        assert_eq!(cmd.get_program(), OsStr::new("caiman-onacid"));
        assert_eq!(
            args_of(&cmd),
            vec![
                "--params",
                "/tmp/p.json",
                "--output",
                "/data/cnmf.partial.hdf5",
                "--backend",
                "local"
            ]
        );
        assert_eq!(cmd.get_envs().count(), 0);
    }

    #[test]
    fn test_command_full_cluster() {
        let extractor = ExternalProcessExtractor::new("python3")
            .with_args(vec!["-m".into(), "onacid_driver".into()])
            .with_working_dir(Some(PathBuf::from("/work")));
        let cluster = ClusterConfig::default()
            .with_n_processes(Some(4))
            .with_single_thread(true)
            .with_submit_dir(Some(PathBuf::from("/data/session")));
        let cmd = extractor.command(Path::new("p.json"), &cluster, Path::new("out.hdf5"));

        let args = args_of(&cmd);
        assert_eq!(&args[..2], &["-m", "onacid_driver"]);
        assert!(args.windows(2).any(|w| w[0] == "--n-processes" && w[1] == "4"));
        assert!(args.contains(&"--single-thread".to_string()));

        let envs: Vec<_> = cmd.get_envs().collect();
        assert_eq!(
            envs,
            vec![(OsStr::new(SUBMIT_DIR_ENV), Some(OsStr::new("/data/session")))]
        );
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/work")));
    }

    #[cfg(unix)]
    #[test]
    fn test_fit_online_runs_program() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("cnmf.partial.hdf5");
        // `sh -c script --params p --output o ...` binds $0=--params, $3=o
        let mut extractor = ExternalProcessExtractor::new("sh")
            .with_args(vec!["-c".into(), r#"test -f "$1" && touch "$3""#.into()]);
        extractor
            .fit_online(&ExtractionParams::new(), &ClusterConfig::default(), &output)
            .unwrap();
        assert!(output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_fit_online_nonzero_exit_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut extractor =
            ExternalProcessExtractor::new("sh").with_args(vec!["-c".into(), "exit 3".into()]);
        let result = extractor.fit_online(
            &ExtractionParams::new(),
            &ClusterConfig::default(),
            &dir.path().join("out.hdf5"),
        );
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_fit_online_without_output_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut extractor =
            ExternalProcessExtractor::new("sh").with_args(vec!["-c".into(), "true".into()]);
        let err = extractor
            .fit_online(
                &ExtractionParams::new(),
                &ClusterConfig::default(),
                &dir.path().join("out.hdf5"),
            )
            .unwrap_err();
        assert!(err.to_string().contains("without writing"));
    }

    #[test]
    fn test_fit_online_missing_program_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut extractor = ExternalProcessExtractor::new("/nonexistent/extractor");
        let err = extractor
            .fit_online(
                &ExtractionParams::new(),
                &ClusterConfig::default(),
                &dir.path().join("out.hdf5"),
            )
            .unwrap_err();
        assert!(err.to_string().contains("failed to launch"));
    }
}
