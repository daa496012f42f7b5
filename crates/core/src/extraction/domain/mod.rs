pub mod cluster_config;
pub mod extraction_params;
pub mod extraction_result;
pub mod online_extractor;
pub mod overwrite_policy;
pub mod result_loader;
