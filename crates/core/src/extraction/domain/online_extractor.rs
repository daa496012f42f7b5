use std::path::Path;

use super::cluster_config::ClusterConfig;
use super::extraction_params::ExtractionParams;

/// Runs an online source-extraction fit and persists its result.
///
/// The extractor reads its input files from `params` (`fnames`) and must
/// leave the fitted result at `output` when it returns `Ok`.
pub trait OnlineExtractor: Send {
    fn fit_online(
        &mut self,
        params: &ExtractionParams,
        cluster: &ClusterConfig,
        output: &Path,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
