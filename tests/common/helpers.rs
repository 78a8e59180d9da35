#![allow(dead_code)] // Not every test binary uses every helper

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tempfile::TempDir;

use vidscale::engine::{EncodingSettings, Resolution, WorkerMessage};

/// Timeout for draining worker messages. Fake encoders finish in
/// milliseconds; ten seconds means a hang, not a slow machine.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Check if FFmpeg is available
pub fn is_ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check if ffprobe is available (probing tests need it even when the
/// encode itself is faked)
pub fn is_ffprobe_available() -> bool {
    Command::new("ffprobe")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Generate a test input video using FFmpeg's testsrc source
pub fn generate_test_video(
    output_path: &Path,
    duration_secs: f32,
    width: u32,
    height: u32,
) -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-f")
        .arg("lavfi")
        .arg("-i")
        .arg(format!(
            "testsrc=duration={duration_secs}:size={width}x{height}:rate=30"
        ))
        .arg("-c:v")
        .arg("libx264")
        .arg("-preset")
        .arg("ultrafast")
        .arg("-threads")
        .arg("1")
        .arg("-pix_fmt")
        .arg("yuv420p")
        .arg("-an")
        .arg(output_path)
        .output()
        .context("Failed to generate test video")?;

    if !output.status.success() {
        anyhow::bail!(
            "Failed to generate test video: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(())
}

/// Write a file that only has to LOOK like a video to the scanner.
/// Anything that actually probes or encodes it needs `generate_test_video`.
pub fn write_stub_video(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"not a real video").expect("write stub video");
    path
}

/// Write an executable shell script that stands in for ffmpeg.
/// The body runs after the shebang; arguments arrive as "$@" like they
/// would for the real binary.
#[cfg(unix)]
pub fn fake_encoder(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake encoder");
    let mut perms = fs::metadata(&path).expect("stat fake encoder").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod fake encoder");
    path
}

/// A fake encoder that reports a short progress stream and exits 0
#[cfg(unix)]
pub fn fake_encoder_ok(dir: &TempDir) -> PathBuf {
    fake_encoder(
        dir,
        "fake-ffmpeg-ok",
        "printf 'frame=10\\nfps=30.0\\nspeed=1.5x\\nprogress=continue\\nframe=20\\nprogress=end\\n'",
    )
}

/// A fake encoder that prints an error and exits non-zero
#[cfg(unix)]
pub fn fake_encoder_failing(dir: &TempDir) -> PathBuf {
    fake_encoder(
        dir,
        "fake-ffmpeg-fail",
        "echo 'Conversion failed!' >&2; exit 1",
    )
}

/// A fake encoder that reports one frame and then sleeps far past any
/// test timeout, for exercising cancellation
#[cfg(unix)]
pub fn fake_encoder_hanging(dir: &TempDir) -> PathBuf {
    fake_encoder(
        dir,
        "fake-ffmpeg-hang",
        "printf 'frame=1\\nprogress=continue\\n'; sleep 30",
    )
}

/// Settings every integration test starts from: HD target, CPU path
pub fn hd_settings() -> EncodingSettings {
    EncodingSettings::default().with_resolution(Resolution::Hd)
}

/// Collect worker messages until BatchFinished arrives, then stop.
/// Panics when the channel goes quiet before the batch accounting shows
/// up, so a wedged worker fails the test instead of hanging it.
pub fn drain_until_batch_finished(
    rx: &std::sync::mpsc::Receiver<WorkerMessage>,
) -> Vec<WorkerMessage> {
    let mut messages = Vec::new();
    loop {
        let msg = rx
            .recv_timeout(DRAIN_TIMEOUT)
            .expect("worker went quiet before BatchFinished");
        let done = matches!(msg, WorkerMessage::BatchFinished { .. });
        messages.push(msg);
        if done {
            return messages;
        }
    }
}

/// Collect worker messages until JoinFinished arrives, then stop
pub fn drain_until_join_finished(
    rx: &std::sync::mpsc::Receiver<WorkerMessage>,
) -> Vec<WorkerMessage> {
    let mut messages = Vec::new();
    loop {
        let msg = rx
            .recv_timeout(DRAIN_TIMEOUT)
            .expect("worker went quiet before JoinFinished");
        let done = matches!(msg, WorkerMessage::JoinFinished { .. });
        messages.push(msg);
        if done {
            return messages;
        }
    }
}
