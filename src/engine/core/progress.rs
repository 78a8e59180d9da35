use std::collections::VecDeque;
use std::time::Duration;

use super::types::{DEFAULT_PROGRESS_WINDOW, ProgressSnapshot};

/// Rolling frame-rate estimate over the last N (frame, elapsed) samples.
///
/// Instantaneous frame deltas jitter badly with NVENC and with ffmpeg's
/// one-second reporting cadence, so the rate is always computed across the
/// whole window, oldest sample to newest.
#[derive(Debug)]
struct RateWindow {
    samples: VecDeque<(u64, f64)>,
    capacity: usize,
}

impl RateWindow {
    fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.max(2)),
            capacity: capacity.max(2),
        }
    }

    fn push(&mut self, frame: u64, elapsed_s: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((frame, elapsed_s));
    }

    fn rate(&self) -> Option<f64> {
        let (first_frame, first_t) = self.samples.front()?;
        let (last_frame, last_t) = self.samples.back()?;
        let dt = last_t - first_t;
        if dt <= 0.0 || last_frame <= first_frame {
            return None;
        }
        Some((last_frame - first_frame) as f64 / dt)
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Incremental state built from ffmpeg's `-progress pipe:1 -nostats` stream.
///
/// One monitor exists per ffmpeg process and is written only by the worker
/// thread that reads that process's stdout. Lines that are not part of the
/// key=value protocol land in the diagnostic buffer and are kept for the
/// whole operation; they carry the warnings ffmpeg interleaves on stdout.
#[derive(Debug)]
pub struct ProgressMonitor {
    total_frames: Option<u64>,
    frame: u64,
    fps_reported: Option<f64>,
    speed: Option<f64>,
    bitrate_kbps: Option<f64>,
    total_size: Option<u64>,
    out_time_us: u64,
    dup_frames: u64,
    drop_frames: u64,
    elapsed_s: f64,
    is_complete: bool,
    window: RateWindow,
    diagnostics: Vec<String>,
}

impl ProgressMonitor {
    pub fn new(total_frames: Option<u64>, window_size: usize) -> Self {
        Self {
            total_frames,
            frame: 0,
            fps_reported: None,
            speed: None,
            bitrate_kbps: None,
            total_size: None,
            out_time_us: 0,
            dup_frames: 0,
            drop_frames: 0,
            elapsed_s: 0.0,
            is_complete: false,
            window: RateWindow::new(window_size),
            diagnostics: Vec::new(),
        }
    }

    /// Feed one stdout line. Returns true if the line was part of the
    /// progress protocol, false if it went to the diagnostic buffer.
    pub fn observe_line(&mut self, line: &str, elapsed: Duration) -> bool {
        self.elapsed_s = elapsed.as_secs_f64();

        let Some((key, value)) = line.split_once('=') else {
            self.push_diagnostic(line);
            return false;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "frame" => {
                if let Ok(frame) = value.parse::<u64>() {
                    // ffmpeg occasionally re-reports an older frame count
                    // after a flush; the counter never moves backwards
                    if frame >= self.frame {
                        self.frame = frame;
                        self.window.push(frame, self.elapsed_s);
                    }
                }
            }
            "fps" => {
                if let Ok(fps) = value.parse::<f64>() {
                    self.fps_reported = Some(fps);
                }
            }
            "speed" => {
                if let Ok(speed) = value.trim_end_matches('x').parse::<f64>() {
                    self.speed = Some(speed);
                }
            }
            "bitrate" => {
                if let Ok(kbps) = value.trim_end_matches("kbits/s").parse::<f64>() {
                    self.bitrate_kbps = Some(kbps);
                }
            }
            "total_size" => {
                if let Ok(size) = value.parse::<u64>() {
                    self.total_size = Some(size);
                }
            }
            "out_time_us" | "out_time_ms" => {
                // Despite the name, ffmpeg emits microseconds for both keys
                if let Ok(us) = value.parse::<u64>() {
                    self.out_time_us = us;
                }
            }
            "out_time" => {}
            "dup_frames" => {
                if let Ok(n) = value.parse::<u64>() {
                    self.dup_frames = n;
                }
            }
            "drop_frames" => {
                if let Ok(n) = value.parse::<u64>() {
                    self.drop_frames = n;
                }
            }
            "progress" => {
                if value == "end" {
                    self.is_complete = true;
                }
            }
            _ if key.starts_with("stream_") && key.ends_with("_q") => {}
            _ => {
                self.push_diagnostic(line);
                return false;
            }
        }

        true
    }

    fn push_diagnostic(&mut self, line: &str) {
        if !line.trim().is_empty() {
            self.diagnostics.push(line.to_string());
        }
    }

    /// Record a line read from the tool's stderr alongside unmatched stdout
    pub fn push_stderr_line(&mut self, line: &str) {
        self.push_diagnostic(line);
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn total_frames(&self) -> Option<u64> {
        self.total_frames
    }

    pub fn out_time_s(&self) -> f64 {
        self.out_time_us as f64 / 1_000_000.0
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// Completion percentage clamped to [0, 100]. None while the total frame
    /// count is unknown; callers fall back to showing elapsed time only.
    pub fn progress_pct(&self) -> Option<f64> {
        let total = self.total_frames?;
        if total == 0 {
            return None;
        }
        Some((self.frame as f64 / total as f64 * 100.0).clamp(0.0, 100.0))
    }

    /// Rolling-average encode rate in frames per second over the window
    pub fn fps_avg(&self) -> Option<f64> {
        self.window.rate()
    }

    pub fn eta_s(&self) -> Option<f64> {
        let total = self.total_frames?;
        let remaining = total.saturating_sub(self.frame);
        let rate = self.fps_avg()?;
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            frame: self.frame,
            progress_pct: self.progress_pct(),
            fps_avg: self.fps_avg().or(self.fps_reported),
            speed: self.speed,
            bitrate_kbps: self.bitrate_kbps,
            size_bytes: self.total_size,
            elapsed_s: self.elapsed_s,
            eta_s: self.eta_s(),
        }
    }
}
