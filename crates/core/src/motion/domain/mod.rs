pub mod frame_shifter;
pub mod shift;
