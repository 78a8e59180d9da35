//! FFmpeg command construction and supervised execution.
//!
//! Arguments are always passed to the process as discrete strings, never
//! through a shell, so paths with spaces or quotes need no escaping. The
//! runner owns the child process for its whole lifetime: it drains stdout
//! through the progress monitor, drains stderr on a side thread, and
//! watches the operation's cancel flag between reads.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::engine::core::progress::ProgressMonitor;
use crate::engine::core::settings::EncodingSettings;
use crate::engine::core::types::{
    EncodeError, EncodeJob, JobStatus, OperationContext, ProgressSnapshot,
};
use crate::engine::hardware;
use crate::engine::probe;

/// How often the run loop checks the cancel flag while no output arrives
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How often a terminated child is polled for exit during the grace period
const TERMINATE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lines of stderr kept as the human-readable failure detail
pub(crate) const STDERR_TAIL_LINES: usize = 10;

/// Build the argument list for a single-file scale encode.
///
/// The CPU path encodes with libx264 under -crf; the GPU path decodes and
/// scales on the card (scale_cuda) and encodes with h264_nvenc in VBR
/// mode, with the x264 preset and CRF mapped onto their NVENC
/// equivalents.
pub fn build_scale_args(settings: &EncodingSettings, input: &Path, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    if settings.use_gpu {
        args.push("-hwaccel".to_string());
        args.push("cuda".to_string());
        args.push("-hwaccel_output_format".to_string());
        args.push("cuda".to_string());
    }

    args.push("-i".to_string());
    args.push(input.to_string_lossy().into_owned());

    if let Some((w, h)) = settings.scale_dimensions() {
        args.push("-vf".to_string());
        if settings.use_gpu {
            args.push(format!("scale_cuda={w}:{h}"));
        } else {
            args.push(format!("scale={w}:{h}"));
        }
    }

    if settings.use_gpu {
        args.push("-c:v".to_string());
        args.push("h264_nvenc".to_string());
        args.push("-preset".to_string());
        args.push(hardware::nvenc_preset_for(&settings.preset).to_string());
        args.push("-rc".to_string());
        args.push("vbr".to_string());
        args.push("-cq".to_string());
        args.push(hardware::nvenc_cq_for(settings.crf).to_string());
    } else {
        args.push("-c:v".to_string());
        args.push(settings.video_codec.clone());
        if settings.threads > 0 {
            args.push("-threads".to_string());
            args.push(settings.threads.to_string());
        }
        args.push("-crf".to_string());
        args.push(settings.crf.to_string());
        args.push("-preset".to_string());
        args.push(settings.preset.clone());
    }

    args.push("-c:a".to_string());
    args.push(settings.audio_codec.clone());
    args.push("-b:a".to_string());
    args.push(format!("{}k", settings.audio_bitrate_k));

    if let Some(fps) = settings.fps {
        args.push("-r".to_string());
        args.push(fps.to_string());
    }

    apply_extra_args(&mut args, &settings.extra_args);

    args.push("-progress".to_string());
    args.push("pipe:1".to_string());
    args.push("-nostats".to_string());
    args.push("-y".to_string());
    args.push(output.to_string_lossy().into_owned());

    args
}

/// Build the argument list for a stream-copy concat over a list file
pub fn build_concat_args(list_path: &Path, output: &Path) -> Vec<String> {
    vec![
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_path.to_string_lossy().into_owned(),
        "-c".to_string(),
        "copy".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-nostats".to_string(),
        "-y".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Append user-supplied FFmpeg arguments, shell-style quoted.
/// Falls back to whitespace splitting when the quoting is unbalanced.
fn apply_extra_args(args: &mut Vec<String>, extra: &str) {
    if extra.trim().is_empty() {
        return;
    }
    match shlex::split(extra) {
        Some(parsed) => args.extend(parsed),
        None => args.extend(extra.split_whitespace().map(String::from)),
    }
}

/// Render a command line for logs. Arguments containing whitespace are
/// quoted so the line can be pasted into a shell for reproduction.
pub fn format_ffmpeg_cmd(program: &str, args: &[String]) -> String {
    let mut rendered = String::from(program);
    for arg in args {
        rendered.push(' ');
        if arg.contains(char::is_whitespace) {
            rendered.push('"');
            rendered.push_str(arg);
            rendered.push('"');
        } else {
            rendered.push_str(arg);
        }
    }
    rendered
}

/// What one supervised process run produced
pub struct RunReport {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub cancelled: bool,
    /// At least one frame= line arrived before exit
    pub frames_seen: bool,
    pub stderr: Vec<String>,
}

impl RunReport {
    pub fn stderr_tail(&self, lines: usize) -> String {
        let skip = self.stderr.len().saturating_sub(lines);
        self.stderr[skip..].join("\n")
    }

    /// stderr tail, prefixed with a named meaning for well-known exit codes
    pub fn failure_detail(&self, lines: usize) -> String {
        let tail = self.stderr_tail(lines);
        match self.exit_code.and_then(exit_code_hint) {
            Some(hint) if tail.is_empty() => hint.to_string(),
            Some(hint) => format!("{hint}\n{tail}"),
            None => tail,
        }
    }
}

/// Exit codes worth naming for the user. 134/137/139 are the shell's
/// 128+signal convention for wrapper tools, 255 is ffmpeg shutting down
/// after handling a termination signal itself.
fn exit_code_hint(code: i32) -> Option<&'static str> {
    match code {
        134 => Some("the encoder aborted"),
        137 => Some("the encoder was killed, often by the out-of-memory killer"),
        139 => Some("the encoder crashed with a segmentation fault"),
        255 => Some("the encoder stopped on a termination signal"),
        _ => None,
    }
}

/// Spawn one process and supervise it to completion or cancellation.
///
/// stdout lines feed the monitor and a snapshot goes to the callback at
/// every `progress=` block boundary. stderr drains on its own thread so
/// the child never blocks on a full pipe; its lines land in the monitor's
/// diagnostic buffer once the process exits. The cancel flag is checked
/// at least every [`CANCEL_POLL_INTERVAL`] even when the child is silent.
pub fn run_ffmpeg_once<F>(
    tool: &str,
    args: &[String],
    monitor: &mut ProgressMonitor,
    ctx: &OperationContext,
    on_progress: &mut F,
) -> Result<RunReport, EncodeError>
where
    F: FnMut(&ProgressSnapshot),
{
    let started = Instant::now();
    let mut child = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| EncodeError::LaunchFailed {
            tool: tool.to_string(),
            source,
        })?;

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(EncodeError::EncodeFailed {
            code: None,
            detail: "could not attach to the encoder's pipes".to_string(),
        });
    };

    let stderr_handle = thread::spawn(move || {
        BufReader::new(stderr)
            .lines()
            .map_while(Result::ok)
            .collect::<Vec<String>>()
    });

    let (line_tx, line_rx) = mpsc::channel::<String>();
    let stdout_handle = thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut cancelled = false;
    loop {
        if ctx.is_cancelled() {
            cancelled = true;
            terminate_child(&mut child, ctx.grace_period());
            break;
        }
        match line_rx.recv_timeout(CANCEL_POLL_INTERVAL) {
            Ok(line) => {
                monitor.observe_line(&line, started.elapsed());
                if line.starts_with("progress=") {
                    on_progress(&monitor.snapshot());
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    let status = child.wait().map_err(|e| EncodeError::EncodeFailed {
        code: None,
        detail: format!("could not collect the encoder's exit status: {e}"),
    })?;
    let _ = stdout_handle.join();
    let stderr_lines = stderr_handle.join().unwrap_or_default();
    for line in &stderr_lines {
        monitor.push_stderr_line(line);
    }

    Ok(RunReport {
        exit_code: status.code(),
        success: status.success() && !cancelled,
        cancelled,
        frames_seen: monitor.frame() > 0,
        stderr: stderr_lines,
    })
}

/// SIGTERM first so the muxer can flush, SIGKILL once the grace period
/// lapses without an exit.
fn terminate_child(child: &mut Child, grace: Duration) {
    send_sigterm(child);
    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) => thread::sleep(TERMINATE_POLL_INTERVAL),
            Err(_) => break,
        }
    }
    let _ = child.kill();
}

#[cfg(unix)]
fn send_sigterm(child: &Child) {
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) {}

pub(crate) fn remove_partial_output(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => info!("removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove partial output {}: {e}", path.display()),
    }
}

/// Run one job end to end with the system ffmpeg
pub fn encode_job<F>(
    job: &mut EncodeJob,
    ctx: &OperationContext,
    on_progress: F,
) -> Result<(), EncodeError>
where
    F: FnMut(&ProgressSnapshot),
{
    encode_job_with_tool("ffmpeg", job, ctx, on_progress)
}

/// Run one job end to end with an explicit encoder binary.
///
/// Settings are validated before anything is spawned. A GPU attempt that
/// fails before producing frames, or whose stderr names an NVENC fault,
/// is retried exactly once with the CPU equivalent of the same settings;
/// the error reported after a second failure comes from the CPU attempt.
/// Partial output files are deleted when the job ends Failed or
/// Cancelled and kept only on Completed.
pub fn encode_job_with_tool<F>(
    tool: &str,
    job: &mut EncodeJob,
    ctx: &OperationContext,
    mut on_progress: F,
) -> Result<(), EncodeError>
where
    F: FnMut(&ProgressSnapshot),
{
    if let Err(err) = job.settings.validate(&job.input_path) {
        job.status = JobStatus::Failed;
        job.last_error = Some(err.to_string());
        return Err(err);
    }

    job.status = JobStatus::Running;
    job.started_at = Some(Instant::now());

    let out_dir = job.output_path.parent().map(Path::to_path_buf);
    if let Some(dir) = out_dir {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            if let Err(e) = fs::create_dir_all(&dir) {
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

    // A failed probe only costs the percentage display; the encode still
    // runs and reports elapsed time instead
    if let Ok(info) = probe::probe_input_info(&job.input_path) {
        job.total_frames = info.total_frames();
        if info.is_vertical() {
            job.settings.vertical = true;
        }
    }

    let mut attempt_settings = job.settings.clone();
    loop {
        job.attempts += 1;
        let args = build_scale_args(&attempt_settings, &job.input_path, &job.output_path);
        debug!("spawning: {}", format_ffmpeg_cmd(tool, &args));

        let mut monitor = ProgressMonitor::new(job.total_frames, ctx.progress_window());
        let run = run_ffmpeg_once(tool, &args, &mut monitor, ctx, &mut on_progress);

        let snap = monitor.snapshot();
        job.frame = snap.frame;
        job.progress_pct = snap.progress_pct;
        job.fps_avg = snap.fps_avg;
        job.speed = snap.speed;
        job.elapsed_s = snap.elapsed_s;
        job.size_bytes = snap.size_bytes;
        job.diagnostics.extend(monitor.take_diagnostics());

        match run {
            Ok(report) => {
                if report.cancelled {
                    job.status = JobStatus::Cancelled;
                    remove_partial_output(&job.output_path);
                    info!("cancelled encode of {}", job.input_path.display());
                    return Err(EncodeError::Cancelled);
                }
                if report.success {
                    job.status = JobStatus::Completed;
                    info!("completed {}", job.output_path.display());
                    return Ok(());
                }

                let stderr_text = report.stderr.join("\n");
                let gpu_retry = attempt_settings.use_gpu
                    && !job.used_cpu_fallback
                    && !ctx.is_cancelled()
                    && (hardware::stderr_indicates_gpu_failure(&stderr_text)
                        || !report.frames_seen);
                if gpu_retry {
                    warn!("NVENC attempt failed before encoding started, retrying with x264");
                    remove_partial_output(&job.output_path);
                    job.used_cpu_fallback = true;
                    attempt_settings = attempt_settings.cpu_fallback();
                    continue;
                }

                remove_partial_output(&job.output_path);
                let detail = report.failure_detail(STDERR_TAIL_LINES);
                job.status = JobStatus::Failed;
                job.last_error = Some(detail.clone());
                return Err(EncodeError::EncodeFailed {
                    code: report.exit_code,
                    detail,
                });
            }
            Err(err) => {
                if attempt_settings.use_gpu && !job.used_cpu_fallback && !ctx.is_cancelled() {
                    warn!("could not start the NVENC pipeline, retrying with x264");
                    job.used_cpu_fallback = true;
                    attempt_settings = attempt_settings.cpu_fallback();
                    continue;
                }
                remove_partial_output(&job.output_path);
                job.status = JobStatus::Failed;
                job.last_error = Some(err.to_string());
                return Err(err);
            }
        }
    }
}
