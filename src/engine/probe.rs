// Input probing using ffprobe

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

/// Video metadata for the first video stream of a file
#[derive(Debug, Clone, PartialEq)]
pub struct InputInfo {
    pub codec: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration_s: Option<f64>,
}

impl InputInfo {
    /// Estimated frame count, the denominator for progress percentages.
    /// None when the container reports no duration (progress then shows
    /// elapsed time only).
    pub fn total_frames(&self) -> Option<u64> {
        let duration = self.duration_s?;
        if self.fps <= 0.0 || duration <= 0.0 {
            return None;
        }
        Some((duration * self.fps).round() as u64)
    }

    /// Portrait sources get the scale dimensions swapped by default
    pub fn is_vertical(&self) -> bool {
        self.height > self.width
    }
}

/// Check if ffmpeg is available and return its version line
pub fn ffmpeg_version() -> Result<String> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .context("Failed to execute ffmpeg. Is ffmpeg installed and in PATH?")?;

    if !output.status.success() {
        anyhow::bail!("ffmpeg command failed with status: {}", output.status);
    }

    let version_output = String::from_utf8_lossy(&output.stdout);
    let first_line = version_output.lines().next().unwrap_or("Unknown version");

    Ok(first_line.to_string())
}

/// Check if ffprobe is available and return its version line
pub fn ffprobe_version() -> Result<String> {
    let output = Command::new("ffprobe")
        .arg("-version")
        .output()
        .context("Failed to execute ffprobe. Is ffprobe installed and in PATH?")?;

    if !output.status.success() {
        anyhow::bail!("ffprobe command failed with status: {}", output.status);
    }

    let version_output = String::from_utf8_lossy(&output.stdout);
    let first_line = version_output.lines().next().unwrap_or("Unknown version");

    Ok(first_line.to_string())
}

/// Probe the first video stream of a file with ffprobe
pub fn probe_input_info(input_path: &Path) -> Result<InputInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=codec_name,width,height,r_frame_rate,duration",
            "-show_entries",
            "format=duration",
            "-of",
            "json",
        ])
        .arg(input_path)
        .output()
        .context("Failed to execute ffprobe")?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            input_path.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&json_str)
        .with_context(|| format!("Unusable ffprobe output for {}", input_path.display()))
}

/// Parse the JSON from the probe invocation (separated for testing)
pub fn parse_probe_output(json: &str) -> Result<InputInfo> {
    let probe: FfprobeOutput = serde_json::from_str(json).context("Failed to parse ffprobe JSON")?;

    let stream = probe
        .streams
        .first()
        .context("No video stream found in ffprobe output")?;

    let width = stream.width.context("Video stream reports no width")?;
    let height = stream.height.context("Video stream reports no height")?;

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_fraction)
        .context("Video stream reports no usable frame rate")?;

    // MKV often omits the stream duration; the format-level value covers it
    let duration_s = stream
        .duration
        .as_deref()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| {
            probe
                .format
                .as_ref()
                .and_then(|f| f.duration.as_deref())
                .and_then(|s| s.parse::<f64>().ok())
        });

    Ok(InputInfo {
        codec: stream.codec_name.clone(),
        width,
        height,
        fps,
        duration_s,
    })
}

/// Parse a fraction string like "30000/1001" to f64
fn parse_fraction(s: &str) -> Option<f64> {
    let (num, den) = s.split_once('/')?;
    let numerator: f64 = num.parse().ok()?;
    let denominator: f64 = den.parse().ok()?;

    if denominator == 0.0 {
        return None;
    }

    Some(numerator / denominator)
}
