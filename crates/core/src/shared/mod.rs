pub mod constants;
pub mod frame;
pub mod memmap_name;
pub mod video_metadata;
