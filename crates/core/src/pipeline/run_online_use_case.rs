use std::fs;
use std::path::{Path, PathBuf};

use crate::extraction::domain::cluster_config::ClusterConfig;
use crate::extraction::domain::extraction_params::ExtractionParams;
use crate::extraction::domain::online_extractor::OnlineExtractor;
use crate::extraction::domain::overwrite_policy::OverwritePolicy;
use crate::extraction::infrastructure::result_persister::{persist, staging_path, PersistOutcome};
use crate::shared::constants::{
    DEFAULT_RESULT_FILENAME, EXTRACTOR_LOG_INFIX, EXTRACTOR_LOG_PREFIX, SAVED_PARAMS_FILENAME,
};
use crate::video::domain::video_reader::VideoReader;

use super::pipeline_logger::PipelineLogger;

/// What an online run left on disk.
#[derive(Clone, Debug, PartialEq)]
pub struct OnlineRunReport {
    pub result_path: PathBuf,
    pub outcome: PersistOutcome,
    pub params_path: PathBuf,
    pub removed_logs: Vec<PathBuf>,
}

/// Fits the online extractor on one video and files its result next to it.
///
/// The video is only opened for its frame rate. The extractor writes to a
/// staging file that is then moved onto `<video dir>/cnmf.hdf5` according
/// to the overwrite policy.
pub struct RunOnlineUseCase {
    reader: Box<dyn VideoReader>,
    extractor: Box<dyn OnlineExtractor>,
    logger: Box<dyn PipelineLogger>,
    cluster: ClusterConfig,
    policy: OverwritePolicy,
    log_dir: PathBuf,
}

impl RunOnlineUseCase {
    /// `log_dir` is where the extractor drops its per-worker log files.
    pub fn new(
        reader: Box<dyn VideoReader>,
        extractor: Box<dyn OnlineExtractor>,
        logger: Box<dyn PipelineLogger>,
        cluster: ClusterConfig,
        policy: OverwritePolicy,
        log_dir: PathBuf,
    ) -> Self {
        Self {
            reader,
            extractor,
            logger,
            cluster,
            policy,
            log_dir,
        }
    }

    pub fn execute(
        &mut self,
        video_path: &Path,
        params_path: &Path,
    ) -> Result<OnlineRunReport, Box<dyn std::error::Error>> {
        let mut params = ExtractionParams::load(params_path)?;
        self.logger.info(&format!(
            "Loaded {} parameters from {}",
            params.len(),
            params_path.display()
        ));

        let metadata = self.reader.open(video_path)?;
        self.reader.close();
        let frame_rate = metadata.fps.floor() as i64;
        params.set("fnames", vec![video_path.to_string_lossy().into_owned()]);
        params.set("fr", frame_rate);

        let video_dir = video_path.parent().unwrap_or_else(|| Path::new(""));
        let target = video_dir.join(DEFAULT_RESULT_FILENAME);
        let staged = staging_path(&target);
        if staged.exists() {
            log::warn!("Removing stale staged result {}", staged.display());
            fs::remove_file(&staged)?;
        }

        self.logger.info(&format!(
            "Running online extraction on {} (fr = {frame_rate}, backend = {})",
            video_path.display(),
            self.cluster.backend
        ));
        if let Err(e) = self.extractor.fit_online(&params, &self.cluster, &staged) {
            if staged.exists() {
                fs::remove_file(&staged)?;
            }
            return Err(e);
        }

        let outcome = persist(&staged, &target, self.policy)?;
        self.logger
            .info(&format!("Result {}: {outcome:?}", target.display()));

        let removed_logs = remove_extractor_logs(&self.log_dir)?;
        if !removed_logs.is_empty() {
            log::debug!("Removed {} extractor log files", removed_logs.len());
        }

        let params_out = video_dir.join(SAVED_PARAMS_FILENAME);
        params.save(&params_out)?;
        self.logger.summary();

        Ok(OnlineRunReport {
            result_path: target,
            outcome,
            params_path: params_out,
            removed_logs,
        })
    }
}

/// Deletes `Yr*_LOG_*` files directly inside `dir`, returning what was removed.
pub fn remove_extractor_logs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if is_extractor_log(&name) {
            fs::remove_file(entry.path())?;
            removed.push(entry.path());
        }
    }
    removed.sort();
    Ok(removed)
}

fn is_extractor_log(name: &str) -> bool {
    name.strip_prefix(EXTRACTOR_LOG_PREFIX)
        .is_some_and(|rest| rest.contains(EXTRACTOR_LOG_INFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::frame::Frame;
    use crate::shared::video_metadata::VideoMetadata;
    use rstest::rstest;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubReader {
        fps: f64,
    }

    impl VideoReader for StubReader {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(VideoMetadata {
                width: 64,
                height: 48,
                fps: self.fps,
                total_frames: 10,
                codec: "stub".into(),
                source_path: Some(path.to_path_buf()),
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(std::iter::empty())
        }

        fn close(&mut self) {}
    }

    #[derive(Default)]
    struct Calls {
        params: Option<ExtractionParams>,
        cluster: Option<ClusterConfig>,
        output: Option<PathBuf>,
    }

    struct StubExtractor {
        calls: Arc<Mutex<Calls>>,
        payload: &'static str,
        fail: bool,
        log_dir: Option<PathBuf>,
    }

    impl StubExtractor {
        fn new(payload: &'static str) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Calls::default())),
                payload,
                fail: false,
                log_dir: None,
            }
        }
    }

    impl OnlineExtractor for StubExtractor {
        fn fit_online(
            &mut self,
            params: &ExtractionParams,
            cluster: &ClusterConfig,
            output: &Path,
        ) -> Result<(), Box<dyn std::error::Error>> {
            let mut calls = self.calls.lock().unwrap();
            calls.params = Some(params.clone());
            calls.cluster = Some(cluster.clone());
            calls.output = Some(output.to_path_buf());
            fs::write(output, self.payload)?;
            if let Some(dir) = &self.log_dir {
                fs::write(dir.join("Yr_0_LOG_worker1"), "log")?;
            }
            if self.fail {
                return Err("fit diverged".into());
            }
            Ok(())
        }
    }

    // --- Helpers ---

    struct Fixture {
        dir: tempfile::TempDir,
        video: PathBuf,
        params: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("session");
        fs::create_dir(&session).unwrap();
        let video = session.join("chunk_0.avi");
        fs::write(&video, b"").unwrap();
        let params = dir.path().join("opts.json");
        fs::write(
            &params,
            json!({
                "data": {"fr": 10, "decay_time": 0.4},
                "online": {"init_batch": 200},
            })
            .to_string(),
        )
        .unwrap();
        Fixture { dir, video, params }
    }

    fn use_case(
        extractor: StubExtractor,
        policy: OverwritePolicy,
        log_dir: &Path,
    ) -> RunOnlineUseCase {
        RunOnlineUseCase::new(
            Box::new(StubReader { fps: 29.97 }),
            Box::new(extractor),
            Box::new(NullPipelineLogger),
            ClusterConfig::default(),
            policy,
            log_dir.to_path_buf(),
        )
    }

    // --- Tests ---

    #[test]
    fn test_run_sets_video_and_frame_rate() {
        let fx = fixture();
        let extractor = StubExtractor::new("new");
        let calls = extractor.calls.clone();
        let mut uc = use_case(extractor, OverwritePolicy::Skip, fx.dir.path());
        let report = uc.execute(&fx.video, &fx.params).unwrap();

        let calls = calls.lock().unwrap();
        let params = calls.params.as_ref().unwrap();
        assert_eq!(
            params.get("fnames"),
            Some(&json!([fx.video.to_string_lossy()]))
        );
        assert_eq!(params.get("fr"), Some(&json!(29)));
        assert_eq!(params.get("init_batch"), Some(&json!(200)));
        assert_eq!(calls.cluster.as_ref().unwrap().backend, "local");

        let session = fx.video.parent().unwrap();
        assert_eq!(calls.output.as_deref(), Some(session.join("cnmf.partial.hdf5").as_path()));
        assert_eq!(report.result_path, session.join("cnmf.hdf5"));
        assert_eq!(report.outcome, PersistOutcome::Written);
        assert_eq!(fs::read_to_string(&report.result_path).unwrap(), "new");
        assert!(!session.join("cnmf.partial.hdf5").exists());
    }

    #[test]
    fn test_run_saves_final_params_next_to_video() {
        let fx = fixture();
        let mut uc = use_case(StubExtractor::new("new"), OverwritePolicy::Skip, fx.dir.path());
        let report = uc.execute(&fx.video, &fx.params).unwrap();

        assert_eq!(report.params_path, fx.video.parent().unwrap().join("opts.json"));
        let saved = ExtractionParams::load(&report.params_path).unwrap();
        assert_eq!(saved.get("fr"), Some(&json!(29)));
        assert_eq!(saved.get("decay_time"), Some(&json!(0.4)));
    }

    #[rstest]
    #[case::skip(OverwritePolicy::Skip, PersistOutcome::Skipped, "old")]
    #[case::overwrite(OverwritePolicy::Overwrite, PersistOutcome::Replaced, "new")]
    fn test_existing_result_follows_policy(
        #[case] policy: OverwritePolicy,
        #[case] outcome: PersistOutcome,
        #[case] contents: &str,
    ) {
        let fx = fixture();
        let target = fx.video.parent().unwrap().join("cnmf.hdf5");
        fs::write(&target, "old").unwrap();

        let mut uc = use_case(StubExtractor::new("new"), policy, fx.dir.path());
        let report = uc.execute(&fx.video, &fx.params).unwrap();

        assert_eq!(report.outcome, outcome);
        assert_eq!(fs::read_to_string(&target).unwrap(), contents);
    }

    #[test]
    fn test_existing_result_with_fail_policy_errors() {
        let fx = fixture();
        let target = fx.video.parent().unwrap().join("cnmf.hdf5");
        fs::write(&target, "old").unwrap();

        let mut uc = use_case(StubExtractor::new("new"), OverwritePolicy::Fail, fx.dir.path());
        let err = uc.execute(&fx.video, &fx.params).unwrap_err();

        assert!(err.to_string().contains("already exists"));
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");
        assert!(!fx.video.parent().unwrap().join("opts.json").exists());
    }

    #[test]
    fn test_extractor_failure_discards_staged_result() {
        let fx = fixture();
        let mut extractor = StubExtractor::new("partial");
        extractor.fail = true;
        let mut uc = use_case(extractor, OverwritePolicy::Skip, fx.dir.path());
        let err = uc.execute(&fx.video, &fx.params).unwrap_err();

        assert!(err.to_string().contains("fit diverged"));
        let session = fx.video.parent().unwrap();
        assert!(!session.join("cnmf.partial.hdf5").exists());
        assert!(!session.join("cnmf.hdf5").exists());
    }

    #[test]
    fn test_extractor_logs_are_removed() {
        let fx = fixture();
        let logs = fx.dir.path().join("work");
        fs::create_dir(&logs).unwrap();
        fs::write(logs.join("notes.txt"), "keep").unwrap();

        let mut extractor = StubExtractor::new("new");
        extractor.log_dir = Some(logs.clone());
        let mut uc = use_case(extractor, OverwritePolicy::Skip, &logs);
        let report = uc.execute(&fx.video, &fx.params).unwrap();

        assert_eq!(report.removed_logs, vec![logs.join("Yr_0_LOG_worker1")]);
        assert!(logs.join("notes.txt").exists());
    }

    #[test]
    fn test_missing_params_file_errors() {
        let fx = fixture();
        let extractor = StubExtractor::new("new");
        let calls = extractor.calls.clone();
        let mut uc = use_case(extractor, OverwritePolicy::Skip, fx.dir.path());
        let err = uc
            .execute(&fx.video, &fx.dir.path().join("missing.json"))
            .unwrap_err();

        assert!(err.to_string().contains("missing.json"));
        assert!(calls.lock().unwrap().params.is_none());
    }

    #[rstest]
    #[case::worker("Yr_d1_512_LOG_1", true)]
    #[case::bare("Yr_LOG_", true)]
    #[case::no_infix("Yr_d1_512.mmap", false)]
    #[case::wrong_prefix("log_Yr_LOG_1", false)]
    fn test_is_extractor_log(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_extractor_log(name), expected);
    }
}
