pub mod external_process_extractor;
#[cfg(feature = "hdf5")]
pub mod hdf5_result_loader;
pub mod json_result_loader;
pub mod loader_factory;
pub mod result_persister;
