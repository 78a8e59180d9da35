//! Lossless joining of video files through ffmpeg's concat demuxer.
//!
//! The join never re-encodes: streams are copied as-is, which is only
//! well-defined when the inputs share codec, dimensions, and frame rate.
//! Callers verify the inputs against the first file up front and a
//! mismatch refuses the whole join.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::core::ffmpeg_cmd::{
    STDERR_TAIL_LINES, build_concat_args, format_ffmpeg_cmd, remove_partial_output,
    run_ffmpeg_once,
};
use crate::engine::core::progress::ProgressMonitor;
use crate::engine::core::types::{
    EncodeError, JobStatus, OperationContext, ProgressSnapshot,
};
use crate::engine::probe;

/// File name of the temporary demuxer list, written next to the output
pub const CONCAT_LIST_NAME: &str = "concat_list.txt";

/// Default output file name for a join
pub const JOIN_OUTPUT_NAME: &str = "joined_output.mp4";

pub fn default_join_output(dir: &Path) -> PathBuf {
    dir.join(JOIN_OUTPUT_NAME)
}

/// One join operation: N ordered inputs concatenated into one output
#[derive(Debug, Clone)]
pub struct JoinJob {
    pub id: Uuid,
    pub inputs: Vec<PathBuf>,
    pub output_path: PathBuf,
    pub status: JobStatus,

    pub total_frames: Option<u64>,
    pub frame: u64,
    pub progress_pct: Option<f64>,
    pub speed: Option<f64>,
    pub elapsed_s: f64,

    pub last_error: Option<String>,
    pub diagnostics: Vec<String>,
}

impl JoinJob {
    pub fn new(inputs: Vec<PathBuf>, output_path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            inputs,
            output_path,
            status: JobStatus::Idle,
            total_frames: None,
            frame: 0,
            progress_pct: None,
            speed: None,
            elapsed_s: 0.0,
            last_error: None,
            diagnostics: Vec::new(),
        }
    }
}

/// Quote a path for a `file '...'` line in the concat list.
/// Backslashes become forward slashes and embedded single quotes get the
/// close-escape-reopen treatment the demuxer expects.
pub fn escape_concat_path(path: &str) -> String {
    path.replace('\\', "/").replace('\'', "'\\''")
}

/// Write the demuxer list file, one absolute path per input in join order
pub fn write_concat_list(inputs: &[PathBuf], list_path: &Path) -> std::io::Result<()> {
    let mut body = String::new();
    for input in inputs {
        let absolute = std::path::absolute(input)?;
        body.push_str("file '");
        body.push_str(&escape_concat_path(&absolute.to_string_lossy()));
        body.push_str("'\n");
    }
    fs::write(list_path, body)
}

/// Why `other` cannot be stream-copied after `reference`, if anything
fn incompatibility(reference: &probe::InputInfo, other: &probe::InputInfo) -> Option<String> {
    let ref_codec = reference.codec.as_deref().unwrap_or("unknown");
    let codec = other.codec.as_deref().unwrap_or("unknown");
    if codec != ref_codec {
        return Some(format!("codec {codec} (first input is {ref_codec})"));
    }
    if other.width != reference.width || other.height != reference.height {
        return Some(format!(
            "{}x{} (first input is {}x{})",
            other.width, other.height, reference.width, reference.height
        ));
    }
    if (other.fps - reference.fps).abs() > 0.001 {
        return Some(format!(
            "{:.3} fps (first input is {:.3} fps)",
            other.fps, reference.fps
        ));
    }
    None
}

/// Probe every input and compare it against the first one. Any mismatch,
/// or an input ffprobe cannot read, refuses the join before a process is
/// spawned.
pub fn verify_compatible(inputs: &[PathBuf]) -> Result<(), EncodeError> {
    let Some((first, rest)) = inputs.split_first() else {
        return Ok(());
    };
    let reference = probe::probe_input_info(first).map_err(|e| {
        EncodeError::SettingsInvalid(format!("could not probe {}: {e}", first.display()))
    })?;
    for input in rest {
        let info = probe::probe_input_info(input).map_err(|e| {
            EncodeError::SettingsInvalid(format!("could not probe {}: {e}", input.display()))
        })?;
        if let Some(difference) = incompatibility(&reference, &info) {
            return Err(EncodeError::SettingsInvalid(format!(
                "cannot join {}: {difference}",
                input.display()
            )));
        }
    }
    Ok(())
}

/// Sum of the inputs' frame counts, or None as soon as one is unknown
fn summed_total_frames(inputs: &[PathBuf]) -> Option<u64> {
    let mut sum: u64 = 0;
    for input in inputs {
        sum = sum.saturating_add(probe::probe_input_info(input).ok()?.total_frames()?);
    }
    Some(sum)
}

fn validate_inputs(inputs: &[PathBuf]) -> Result<(), EncodeError> {
    if inputs.len() < 2 {
        return Err(EncodeError::SettingsInvalid(format!(
            "joining needs at least two inputs, got {}",
            inputs.len()
        )));
    }
    for input in inputs {
        if !input.is_file() {
            return Err(EncodeError::SettingsInvalid(format!(
                "input is not a file: {}",
                input.display()
            )));
        }
    }
    Ok(())
}

/// Run one join end to end with the system ffmpeg
pub fn join_job<F>(
    job: &mut JoinJob,
    ctx: &OperationContext,
    on_progress: F,
) -> Result<(), EncodeError>
where
    F: FnMut(&ProgressSnapshot),
{
    join_job_with_tool("ffmpeg", job, ctx, on_progress)
}

/// Run one join end to end with an explicit encoder binary.
///
/// Compatibility is the caller's gate (`verify_compatible`); here only
/// count and existence are re-checked. The list file is written next to
/// the output and removed again whatever the outcome. A partial output is
/// deleted on Failed or Cancelled, same as a scale encode.
pub fn join_job_with_tool<F>(
    tool: &str,
    job: &mut JoinJob,
    ctx: &OperationContext,
    mut on_progress: F,
) -> Result<(), EncodeError>
where
    F: FnMut(&ProgressSnapshot),
{
    if let Err(err) = validate_inputs(&job.inputs) {
        job.status = JobStatus::Failed;
        job.last_error = Some(err.to_string());
        return Err(err);
    }

    job.status = JobStatus::Running;

    let out_dir = job.output_path.parent().map(Path::to_path_buf);
    if let Some(dir) = &out_dir {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            if let Err(e) = fs::create_dir_all(dir) {
                let err = EncodeError::EncodeFailed {
                    code: None,
                    detail: format!("could not create {}: {e}", dir.display()),
                };
                job.status = JobStatus::Failed;
                job.last_error = Some(err.to_string());
                return Err(err);
            }
        }
    }

    job.total_frames = summed_total_frames(&job.inputs);

    let list_path = match &out_dir {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(CONCAT_LIST_NAME),
        _ => PathBuf::from(CONCAT_LIST_NAME),
    };
    if let Err(e) = write_concat_list(&job.inputs, &list_path) {
        let err = EncodeError::EncodeFailed {
            code: None,
            detail: format!("could not write {}: {e}", list_path.display()),
        };
        job.status = JobStatus::Failed;
        job.last_error = Some(err.to_string());
        return Err(err);
    }

    let result = run_join(tool, job, &list_path, ctx, &mut on_progress);

    match fs::remove_file(&list_path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove {}: {e}", list_path.display()),
    }

    result
}

fn run_join<F>(
    tool: &str,
    job: &mut JoinJob,
    list_path: &Path,
    ctx: &OperationContext,
    on_progress: &mut F,
) -> Result<(), EncodeError>
where
    F: FnMut(&ProgressSnapshot),
{
    let args = build_concat_args(list_path, &job.output_path);
    debug!("spawning: {}", format_ffmpeg_cmd(tool, &args));

    let mut monitor = ProgressMonitor::new(job.total_frames, ctx.progress_window());
    let run = run_ffmpeg_once(tool, &args, &mut monitor, ctx, on_progress);

    let snap = monitor.snapshot();
    job.frame = snap.frame;
    job.progress_pct = snap.progress_pct;
    job.speed = snap.speed;
    job.elapsed_s = snap.elapsed_s;
    job.diagnostics.extend(monitor.take_diagnostics());

    match run {
        Ok(report) => {
            if report.cancelled {
                job.status = JobStatus::Cancelled;
                remove_partial_output(&job.output_path);
                info!("cancelled join into {}", job.output_path.display());
                return Err(EncodeError::Cancelled);
            }
            if report.success {
                job.status = JobStatus::Completed;
                info!(
                    "joined {} files into {}",
                    job.inputs.len(),
                    job.output_path.display()
                );
                return Ok(());
            }

            remove_partial_output(&job.output_path);
            let detail = report.failure_detail(STDERR_TAIL_LINES);
            job.status = JobStatus::Failed;
            job.last_error = Some(detail.clone());
            Err(EncodeError::EncodeFailed {
                code: report.exit_code,
                detail,
            })
        }
        Err(err) => {
            remove_partial_output(&job.output_path);
            job.status = JobStatus::Failed;
            job.last_error = Some(err.to_string());
            Err(err)
        }
    }
}
