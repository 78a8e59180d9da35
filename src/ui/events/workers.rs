use super::*;

use crate::engine::{self, EncodeJob, JobStatus, ProgressSnapshot, WorkerMessage, write_debug_log};
use crate::ui::constants::METRICS_HISTORY;
use crate::ui::widgets::settle_eta;

pub(super) fn apply_worker_message(msg: WorkerMessage, state: &mut AppState) {
    match msg {
        WorkerMessage::JobStarted { job_id } => {
            // Update job status to Running and set start time
            if let Some(job) = state.dashboard.jobs.iter_mut().find(|j| j.id == job_id) {
                job.status = JobStatus::Running;
                job.started_at = Some(std::time::Instant::now());
            }
        }
        WorkerMessage::ProgressUpdate { job_id, snapshot } => {
            if let Some(job) = state.dashboard.jobs.iter_mut().find(|j| j.id == job_id) {
                apply_snapshot(job, &snapshot);
            } else if let Some(join) = state.dashboard.join_job.as_mut() {
                if join.id == job_id {
                    join.frame = snapshot.frame;
                    join.progress_pct = snapshot.progress_pct;
                    join.speed = snapshot.speed;
                    join.elapsed_s = snapshot.elapsed_s;
                }
            }
        }
        WorkerMessage::JobFinished { job } => {
            // Replace the UI copy with the worker's final state
            if let Some(slot) = state.dashboard.jobs.iter_mut().find(|j| j.id == job.id) {
                *slot = *job;
                if slot.status == JobStatus::Completed {
                    slot.progress_pct = Some(100.0);
                    slot.displayed_eta_seconds = None;
                }
            }
        }
        WorkerMessage::JoinStarted { job_id } => {
            if let Some(join) = state.dashboard.join_job.as_mut() {
                if join.id == job_id {
                    join.status = JobStatus::Running;
                }
            }
        }
        WorkerMessage::JoinFinished { job } => {
            let outcome = match job.status {
                JobStatus::Completed => format!("Join complete: {}", job.output_path.display()),
                JobStatus::Cancelled => "Join cancelled".to_string(),
                _ => job
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "Join failed".to_string()),
            };
            let _ = write_debug_log(&outcome);
            state.status_line = Some(outcome);
            state.dashboard.join_job = Some(*job);
        }
        WorkerMessage::BatchFinished {
            completed,
            failed,
            cancelled,
        } => {
            // The dashboard owns the terminal, so outcomes also go to the log file
            let summary = format!(
                "Batch finished: {} completed, {} failed, {} cancelled",
                completed, failed, cancelled
            );
            let _ = write_debug_log(&summary);
            state.status_line = Some(summary);
        }
    }
}

fn apply_snapshot(job: &mut EncodeJob, snapshot: &ProgressSnapshot) {
    job.frame = snapshot.frame;
    job.progress_pct = snapshot.progress_pct;
    job.fps_avg = snapshot.fps_avg;
    job.speed = snapshot.speed;
    job.size_bytes = snapshot.size_bytes;
    job.elapsed_s = snapshot.elapsed_s;

    // Settle the ETA here so the render path reads a stable value
    if let Some(eta) = snapshot.eta_s {
        job.displayed_eta_seconds = Some(settle_eta(job.displayed_eta_seconds, eta.round() as u64));
    }
}

/// Rebuild idle jobs with the current panel settings, then hand the whole
/// batch to the runner.
pub(super) fn start_batch(state: &mut AppState) {
    // Re-derive outputs so settings changed since the scan take effect
    for job in state.dashboard.jobs.iter_mut() {
        if job.status == JobStatus::Idle {
            *job =
                engine::build_job_from_path(job.input_path.clone(), &state.settings.settings, None);
        }
    }

    let batch: Vec<EncodeJob> = state
        .dashboard
        .jobs
        .iter()
        .filter(|j| j.status == JobStatus::Idle)
        .cloned()
        .collect();

    if batch.is_empty() {
        state.status_line = Some("Nothing to encode. Press R to rescan.".to_string());
        return;
    }

    // A finished join result is stale once a new batch starts
    state.dashboard.join_job = None;

    let count = batch.len();
    match state.runner.spawn_batch(batch) {
        Ok(()) => {
            state.status_line = if count == 1 {
                Some("Encoding 1 video...".to_string())
            } else {
                Some(format!("Encoding {} videos...", count))
            };
        }
        Err(e) => {
            state.status_line = Some(format!("Failed to start batch: {}", e));
        }
    }
}

/// Verify that the scanned videos agree on codec and geometry, then hand
/// the concat to the runner.
pub(super) fn start_join(state: &mut AppState) {
    let files: Vec<std::path::PathBuf> = state
        .dashboard
        .jobs
        .iter()
        .map(|j| j.input_path.clone())
        .collect();

    if files.len() < 2 {
        state.status_line = Some("Join needs at least two videos.".to_string());
        return;
    }

    // Probes run on the UI thread; a handful of ffprobe calls finishes
    // well before the first frame of a join would
    if let Err(e) = engine::verify_compatible(&files) {
        state.status_line = Some(format!("Join refused: {}", e));
        return;
    }

    let root = state
        .root_path
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    let join = engine::JoinJob::new(files, engine::default_join_output(&root));

    state.dashboard.join_job = Some(join.clone());

    if let Err(e) = state.runner.spawn_join(join) {
        state.status_line = Some(format!("Failed to start join: {}", e));
        state.dashboard.join_job = None;
    }
}

/// Throw away the queue and rescan the root directory.
pub(super) fn rescan(state: &mut AppState) {
    let root = state
        .root_path
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from("."));

    let files = engine::scan(&root);
    state.dashboard.jobs = engine::build_job_queue(files, &state.settings.settings, None);
    state.dashboard.join_job = None;

    if state.dashboard.jobs.is_empty() {
        state.dashboard.table_state.select(None);
        state.status_line = Some(format!("No videos found in {}", root.display()));
    } else {
        state.dashboard.table_state.select(Some(0));
        state.status_line = Some(format!("Found {} videos", state.dashboard.jobs.len()));
    }
}

/// Write the panel settings back into the config file as new defaults.
pub(super) fn save_settings(state: &mut AppState) {
    let panel = &state.settings;

    state.config.defaults.resolution = panel.resolution().label().to_string();
    state.config.defaults.crf = panel.settings.crf;
    state.config.defaults.preset = panel.settings.preset.clone();
    state.config.defaults.use_gpu = panel.settings.use_gpu;
    state.config.defaults.audio_bitrate_k = panel.settings.audio_bitrate_k;
    state.config.defaults.threads = panel.settings.threads;

    let line = match state.config.save() {
        Ok(()) => {
            state.settings.modified = false;
            let path = crate::config::Config::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "config".to_string());
            format!("Settings saved to {}", path)
        }
        Err(e) => format!("Failed to save settings: {}", e),
    };
    let _ = write_debug_log(&line);
    state.status_line = Some(line);
}

pub(super) fn update_metrics(state: &mut AppState) {
    // Refresh system information
    state.dashboard.system.refresh_cpu();
    state.dashboard.system.refresh_memory();

    // Get global CPU usage (0-100)
    let cpu_usage = state.dashboard.system.global_cpu_info().cpu_usage() as u64;

    // Get memory usage percentage (0-100)
    let total_mem = state.dashboard.system.total_memory();
    let used_mem = state.dashboard.system.used_memory();
    let mem_usage = if total_mem > 0 {
        ((used_mem as f64 / total_mem as f64) * 100.0) as u64
    } else {
        0
    };

    // Add to ring buffers
    if state.dashboard.cpu_data.len() >= METRICS_HISTORY {
        state.dashboard.cpu_data.pop_front();
    }
    state.dashboard.cpu_data.push_back(cpu_usage);

    if state.dashboard.mem_data.len() >= METRICS_HISTORY {
        state.dashboard.mem_data.pop_front();
    }
    state.dashboard.mem_data.push_back(mem_usage);
}
