// Background runner for encode operations

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::{error, info};
use uuid::Uuid;

use super::core::{
    EncodeJob, JobStatus, JoinJob, OperationContext, ProgressSnapshot, encode_job_with_tool,
    join_job_with_tool,
};

/// Message from the worker thread to the UI thread
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    /// Job started encoding
    JobStarted { job_id: Uuid },

    /// Progress update during encoding
    ProgressUpdate {
        job_id: Uuid,
        snapshot: ProgressSnapshot,
    },

    /// Job reached a terminal status; the job carries its final state
    JobFinished { job: Box<EncodeJob> },

    /// Join operation started
    JoinStarted { job_id: Uuid },

    /// Join reached a terminal status
    JoinFinished { job: Box<JoinJob> },

    /// Every queued job has been accounted for
    BatchFinished {
        completed: usize,
        failed: usize,
        cancelled: usize,
    },
}

/// Runs one operation at a time on a background thread.
///
/// An operation is a single scale, a batch queue, or a join. Batches are
/// strictly sequential: a failed job does not stop the queue, a cancel
/// marks every not-yet-started job Cancelled without running it. Spawning
/// while an operation is live is refused rather than queued.
pub struct OperationRunner {
    tool: String,
    grace_period: Duration,
    progress_window: usize,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    active: Arc<AtomicUsize>,
    current: Arc<Mutex<Option<OperationContext>>>,
}

impl OperationRunner {
    pub fn new(grace_period: Duration, progress_window: usize) -> Self {
        Self::with_tool("ffmpeg", grace_period, progress_window)
    }

    /// Test seam: run against an explicit encoder binary
    pub fn with_tool(tool: &str, grace_period: Duration, progress_window: usize) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tool: tool.to_string(),
            grace_period,
            progress_window,
            tx,
            rx,
            active: Arc::new(AtomicUsize::new(0)),
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Get the receiver for worker messages
    pub fn receiver(&self) -> &Receiver<WorkerMessage> {
        &self.rx
    }

    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::SeqCst) > 0
    }

    /// Raise the cancellation flag on the live operation, if any
    pub fn cancel_current(&self) {
        if let Some(ctx) = self.current.lock().unwrap().as_ref() {
            ctx.request_cancel();
        }
    }

    /// Scale a single file on the background thread
    pub fn spawn_scale(&self, job: EncodeJob) -> Result<()> {
        self.spawn_batch(vec![job])
    }

    /// Run a job queue sequentially on the background thread
    pub fn spawn_batch(&self, jobs: Vec<EncodeJob>) -> Result<()> {
        let ctx = self.begin_operation()?;
        let tx = self.tx.clone();
        let active = self.active.clone();
        let current = self.current.clone();
        let tool = self.tool.clone();
        let total = jobs.len();

        thread::spawn(move || {
            let mut completed = 0usize;
            let mut failed = 0usize;
            let mut cancelled = 0usize;

            for (idx, mut job) in jobs.into_iter().enumerate() {
                if ctx.is_cancelled() {
                    job.status = JobStatus::Cancelled;
                    cancelled += 1;
                    let _ = tx.send(WorkerMessage::JobFinished { job: Box::new(job) });
                    continue;
                }

                info!(
                    "job {}/{}: {}",
                    idx + 1,
                    total,
                    job.input_path.display()
                );
                let _ = tx.send(WorkerMessage::JobStarted { job_id: job.id });

                let tx_progress = tx.clone();
                let job_id = job.id;
                let result = encode_job_with_tool(&tool, &mut job, &ctx, move |snapshot| {
                    let _ = tx_progress.send(WorkerMessage::ProgressUpdate {
                        job_id,
                        snapshot: *snapshot,
                    });
                });

                if let Err(e) = result {
                    if !e.is_cancelled() {
                        error!("job failed: {e}");
                    }
                }
                match job.status {
                    JobStatus::Completed => completed += 1,
                    JobStatus::Cancelled => cancelled += 1,
                    _ => failed += 1,
                }
                let _ = tx.send(WorkerMessage::JobFinished { job: Box::new(job) });
            }

            let _ = tx.send(WorkerMessage::BatchFinished {
                completed,
                failed,
                cancelled,
            });
            *current.lock().unwrap() = None;
            active.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(())
    }

    /// Join a set of files into one output on the background thread
    pub fn spawn_join(&self, mut job: JoinJob) -> Result<()> {
        let ctx = self.begin_operation()?;
        let tx = self.tx.clone();
        let active = self.active.clone();
        let current = self.current.clone();
        let tool = self.tool.clone();

        thread::spawn(move || {
            let _ = tx.send(WorkerMessage::JoinStarted { job_id: job.id });

            let tx_progress = tx.clone();
            let job_id = job.id;
            let result = join_job_with_tool(&tool, &mut job, &ctx, move |snapshot| {
                let _ = tx_progress.send(WorkerMessage::ProgressUpdate {
                    job_id,
                    snapshot: *snapshot,
                });
            });

            if let Err(e) = result {
                if !e.is_cancelled() {
                    error!("join failed: {e}");
                }
            }
            let _ = tx.send(WorkerMessage::JoinFinished { job: Box::new(job) });
            *current.lock().unwrap() = None;
            active.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(())
    }

    /// Claim the single operation slot and hand out a fresh context.
    ///
    /// The claim happens on the calling thread so a spawn that returns Ok
    /// is immediately visible through is_busy.
    fn begin_operation(&self) -> Result<OperationContext> {
        if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
            self.active.fetch_sub(1, Ordering::SeqCst);
            bail!("an operation is already running");
        }
        let ctx = OperationContext::new(self.grace_period, self.progress_window);
        *self.current.lock().unwrap() = Some(ctx.clone());
        Ok(ctx)
    }
}
