use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// Writes one solid gray frame per entry of `values`.
pub(crate) fn create_test_video(path: &Path, values: &[u8], width: u32, height: u32, fps: f64) {
    let metadata = VideoMetadata {
        width,
        height,
        fps,
        total_frames: values.len(),
        codec: String::new(),
        source_path: None,
    };
    let mut writer = FfmpegWriter::new();
    writer.open(path, &metadata).unwrap();
    for (i, &value) in values.iter().enumerate() {
        writer
            .write(&Frame::filled(width, height, 3, value, i))
            .unwrap();
    }
    writer.close().unwrap();
}
