pub mod apply_shifts_use_case;
pub mod downsample_use_case;
pub mod frame_rate_use_case;
pub mod pipeline_logger;
pub mod run_online_use_case;
