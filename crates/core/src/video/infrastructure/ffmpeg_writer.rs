use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::video::Video;
use ffmpeg_next::Rational;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Frame rates are stored with millisecond-of-a-frame precision.
const FPS_SCALE: i32 = 1000;
const FALLBACK_FPS: i32 = 30;
const STREAM_INDEX: usize = 0;

/// Writes downsampled chunks as MPEG4 through ffmpeg-next.
///
/// Each `open`/`close` pair produces one file. The frame rate is kept as a
/// rational so that thinned-out rates such as `30 / 4` survive the
/// round trip instead of being rounded to whole frames per second.
pub struct FfmpegWriter {
    chunk: Option<ChunkEncoder>,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self { chunk: None }
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.chunk.is_some() {
            self.close()?;
        }
        self.chunk = Some(ChunkEncoder::start(path, metadata)?);
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        self.chunk
            .as_mut()
            .ok_or("FfmpegWriter: not opened")?
            .encode(frame)
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        match self.chunk.take() {
            Some(chunk) => chunk.finish(),
            None => Ok(()),
        }
    }
}

/// Encoder state for the file currently being written.
struct ChunkEncoder {
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: ffmpeg_next::software::scaling::Context,
    /// Reused for every frame; only its pixel rows are overwritten.
    rgb: Video,
    width: u32,
    height: u32,
    codec_time_base: Rational,
    stream_time_base: Rational,
    next_pts: i64,
}

impl ChunkEncoder {
    fn start(path: &Path, metadata: &VideoMetadata) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        if metadata.width == 0 || metadata.height == 0 {
            return Err(format!(
                "FfmpegWriter: cannot encode {}x{} frames",
                metadata.width, metadata.height
            )
            .into());
        }

        let mut octx = ffmpeg_next::format::output(path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;
        let mut stream = octx.add_stream(Some(codec))?;

        let rate = frame_rate(metadata.fps);
        let codec_time_base = rate.invert();

        let mut ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        ctx.set_width(metadata.width);
        ctx.set_height(metadata.height);
        ctx.set_format(Pixel::YUV420P);
        ctx.set_time_base(codec_time_base);
        ctx.set_frame_rate(Some(rate));
        if global_header {
            ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = ctx.open_with(ffmpeg_next::Dictionary::new())?;
        stream.set_parameters(&encoder);
        octx.write_header()?;

        // The muxer may pick its own stream time base while writing the header
        let stream_time_base = octx
            .stream(STREAM_INDEX)
            .ok_or("FfmpegWriter: output stream missing")?
            .time_base();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            Pixel::RGB24,
            metadata.width,
            metadata.height,
            Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Encoding {}x{} at {}/{} fps to {}",
            metadata.width,
            metadata.height,
            rate.numerator(),
            rate.denominator(),
            path.display()
        );

        Ok(Self {
            octx,
            encoder,
            scaler,
            rgb: Video::new(Pixel::RGB24, metadata.width, metadata.height),
            width: metadata.width,
            height: metadata.height,
            codec_time_base,
            stream_time_base,
            next_pts: 0,
        })
    }

    fn encode(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if frame.width() != self.width || frame.height() != self.height || frame.channels() != 3 {
            return Err(format!(
                "FfmpegWriter: expected {}x{} RGB frame, got {}x{}x{}",
                self.width,
                self.height,
                frame.width(),
                frame.height(),
                frame.channels()
            )
            .into());
        }

        let row_bytes = self.width as usize * 3;
        let stride = self.rgb.stride(0);
        let dst = self.rgb.data_mut(0);
        for (row, src) in frame.data().chunks_exact(row_bytes).enumerate() {
            let start = row * stride;
            dst[start..start + row_bytes].copy_from_slice(src);
        }

        let mut yuv = Video::empty();
        self.scaler.run(&self.rgb, &mut yuv)?;
        yuv.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder.send_frame(&yuv)?;
        self.write_packets()
    }

    fn finish(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.encoder.send_eof()?;
        self.write_packets()?;
        self.octx.write_trailer()?;
        log::debug!("Chunk closed after {} frames", self.next_pts);
        Ok(())
    }

    fn write_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut packet = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(STREAM_INDEX);
            packet.rescale_ts(self.codec_time_base, self.stream_time_base);
            packet.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }
}

/// Frame rate as an exact-enough rational (`7.5` -> `15/2`, `29.97` -> `2997/100`).
fn frame_rate(fps: f64) -> Rational {
    if !fps.is_finite() || fps <= 0.0 {
        return Rational(FALLBACK_FPS, 1);
    }
    Rational((fps * FPS_SCALE as f64).round() as i32, FPS_SCALE).reduce()
}
