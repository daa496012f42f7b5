pub mod extraction;
pub mod motion;
pub mod pipeline;
pub mod shared;
pub mod storage;
pub mod video;
