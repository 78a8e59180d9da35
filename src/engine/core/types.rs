use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use super::settings::EncodingSettings;

/// Default grace period between SIGTERM and SIGKILL when cancelling.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 5000;

/// Default number of samples in the rolling frame-rate window.
pub const DEFAULT_PROGRESS_WINDOW: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobStatus {
    /// Terminal states release buffers back to the UI and stop the worker
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Why an encode did not complete
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid settings: {0}")]
    SettingsInvalid(String),

    #[error("could not launch {tool}: {source}")]
    LaunchFailed {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("encoder exited with {}: {detail}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".into()))]
    EncodeFailed { code: Option<i32>, detail: String },

    #[error("cancelled by user")]
    Cancelled,
}

impl EncodeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Per-operation handle shared between the UI and the worker thread.
///
/// The UI may only raise the cancellation flag; the worker that owns the
/// child process observes it between stream reads and performs the
/// terminate / wait-for-grace / kill sequence. One context is created per
/// operation and discarded with it, so no state leaks across operations.
#[derive(Debug, Clone)]
pub struct OperationContext {
    cancel: Arc<AtomicBool>,
    grace_period: Duration,
    progress_window: usize,
}

impl OperationContext {
    pub fn new(grace_period: Duration, progress_window: usize) -> Self {
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
            grace_period,
            progress_window,
        }
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Sample count for the rolling frame-rate average
    pub fn progress_window(&self) -> usize {
        self.progress_window
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_GRACE_PERIOD_MS),
            DEFAULT_PROGRESS_WINDOW,
        )
    }
}

/// One unit of work: scale a single input file to a single output file
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub id: Uuid,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub settings: EncodingSettings,
    pub status: JobStatus,

    // Derived / runtime
    pub total_frames: Option<u64>,
    pub frame: u64,
    pub progress_pct: Option<f64>,
    pub fps_avg: Option<f64>,
    pub speed: Option<f64>,
    pub elapsed_s: f64,
    pub size_bytes: Option<u64>,

    pub started_at: Option<std::time::Instant>,
    pub displayed_eta_seconds: Option<u64>,

    pub attempts: u32,
    pub used_cpu_fallback: bool,
    pub last_error: Option<String>,
    pub diagnostics: Vec<String>,
}

impl EncodeJob {
    /// Create a new idle job
    pub fn new(input_path: PathBuf, output_path: PathBuf, settings: EncodingSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            input_path,
            output_path,
            settings,
            status: JobStatus::Idle,
            total_frames: None,
            frame: 0,
            progress_pct: None,
            fps_avg: None,
            speed: None,
            elapsed_s: 0.0,
            size_bytes: None,
            started_at: None,
            displayed_eta_seconds: None,
            attempts: 0,
            used_cpu_fallback: false,
            last_error: None,
            diagnostics: Vec::new(),
        }
    }
}

/// Immutable progress view handed to callbacks and the UI channel
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressSnapshot {
    pub frame: u64,
    /// frame / total_frames in percent, clamped to [0, 100]; None when the
    /// total is unknown and only elapsed time can be reported
    pub progress_pct: Option<f64>,
    /// Rolling-average encode rate in frames per second
    pub fps_avg: Option<f64>,
    pub speed: Option<f64>,
    pub bitrate_kbps: Option<f64>,
    pub size_bytes: Option<u64>,
    pub elapsed_s: f64,
    pub eta_s: Option<f64>,
}
