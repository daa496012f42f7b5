use std::collections::BTreeMap;
use std::time::{Duration, Instant};

const DEFAULT_PROGRESS_EVERY: usize = 500;
const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Where use cases report what they are doing.
///
/// Frame loops report per-frame progress and stage timings, and the frame
/// writer also reports the bytes it puts on disk. Runs over long recordings
/// see hundreds of thousands of events, so implementations aggregate
/// instead of keeping every sample.
pub trait PipelineLogger: Send {
    fn progress(&mut self, current: usize, total: usize);

    /// Time spent in one stage (`decode`, `shift`, `write`) for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// One observation of a named quantity, such as the frames in a chunk.
    fn metric(&mut self, name: &str, value: f64);

    /// Bytes written to the output for one frame.
    fn bytes_written(&mut self, _bytes: u64) {}

    fn info(&mut self, message: &str);

    fn summary(&self) {}
}

/// Discards everything.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Count, sum and extremes of a stream of samples.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Tally {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Tally {
    fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Logs progress through the `log` facade every `progress_every` frames,
/// with an estimate of the time left, and a per-stage summary at the end.
pub struct StdoutPipelineLogger {
    progress_every: usize,
    started: Instant,
    frames_done: usize,
    frames_total: usize,
    bytes: u64,
    stages: BTreeMap<String, Tally>,
    metrics: BTreeMap<String, Tally>,
}

impl StdoutPipelineLogger {
    pub fn new(progress_every: usize) -> Self {
        Self {
            progress_every: progress_every.max(1),
            started: Instant::now(),
            frames_done: 0,
            frames_total: 0,
            bytes: 0,
            stages: BTreeMap::new(),
            metrics: BTreeMap::new(),
        }
    }

    /// Summary text for a run that took `elapsed`, or `None` before any
    /// frame-level event was recorded.
    fn render_summary(&self, elapsed: Duration) -> Option<String> {
        if self.stages.is_empty() && self.metrics.is_empty() && self.bytes == 0 {
            return None;
        }
        let secs = elapsed.as_secs_f64();
        let mut lines = vec![format!(
            "Processed {}/{} frames in {secs:.1}s",
            self.frames_done, self.frames_total
        )];

        for (stage, tally) in &self.stages {
            let share = if secs > 0.0 {
                tally.sum / (secs * 1000.0) * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:8} mean {:6.2}ms  max {:7.2}ms  ({share:4.1}% of wall time)",
                tally.mean(),
                tally.max
            ));
        }
        for (name, tally) in &self.metrics {
            lines.push(format!(
                "  {name}: {} samples, min {:.0}, mean {:.1}, max {:.0}",
                tally.count,
                tally.min,
                tally.mean(),
                tally.max
            ));
        }
        if self.bytes > 0 {
            let mib = self.bytes as f64 / BYTES_PER_MIB;
            let per_frame = self.bytes / self.frames_done.max(1) as u64;
            lines.push(format!(
                "  written: {mib:.1} MiB ({per_frame} bytes per frame)"
            ));
        }
        if self.frames_done > 0 && secs > 0.0 {
            lines.push(format!(
                "  throughput: {:.1} frames/s",
                self.frames_done as f64 / secs
            ));
        }
        Some(lines.join("\n"))
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_EVERY)
    }
}

/// Time left if the remaining frames go at the average rate so far.
fn remaining(elapsed: Duration, done: usize, total: usize) -> Option<Duration> {
    if done == 0 || done > total {
        return None;
    }
    Some(elapsed.mul_f64((total - done) as f64 / done as f64))
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_done = current;
        self.frames_total = total;
        if total == 0 || (current % self.progress_every != 0 && current != total) {
            return;
        }
        let pct = current as f64 / total as f64 * 100.0;
        match remaining(self.started.elapsed(), current, total) {
            Some(left) if current < total => log::info!(
                "Frame {current}/{total} ({pct:.1}%), about {:.0}s left",
                left.as_secs_f64()
            ),
            _ => log::info!("Frame {current}/{total} ({pct:.1}%)"),
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stages
            .entry(stage.to_string())
            .or_default()
            .add(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().add(value);
    }

    fn bytes_written(&mut self, bytes: u64) {
        self.bytes += bytes;
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.render_summary(self.started.elapsed()) {
            log::info!("\n{text}");
        }
    }
}
