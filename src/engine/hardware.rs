//! NVENC hardware encoding detection

use std::process::Command;
use std::sync::OnceLock;
use tracing::warn;

/// Supported video encoders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    /// Software x264
    X264,
    /// NVIDIA hardware H.264
    H264Nvenc,
}

impl Encoder {
    /// Get the FFmpeg encoder name
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            Self::X264 => "libx264",
            Self::H264Nvenc => "h264_nvenc",
        }
    }

    /// Get user-friendly display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::X264 => "x264 (Software)",
            Self::H264Nvenc => "H.264 NVENC (NVIDIA)",
        }
    }

    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::H264Nvenc)
    }
}

/// Cache for the output of `ffmpeg -encoders`.
static FFMPEG_ENCODERS_OUTPUT_CACHE: OnceLock<String> = OnceLock::new();

fn ffmpeg_encoders_output() -> &'static str {
    FFMPEG_ENCODERS_OUTPUT_CACHE.get_or_init(|| {
        Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .output()
            .ok()
            .map(|o| String::from_utf8_lossy(&o.stdout).to_string())
            .unwrap_or_default()
    })
}

/// Detect NVIDIA GPU using nvidia-smi
pub fn detect_nvidia_gpu() -> Option<String> {
    let output = Command::new("nvidia-smi")
        .args(["--query-gpu=name", "--format=csv,noheader"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let name = stdout.lines().next()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

pub fn has_nvidia_gpu() -> bool {
    detect_nvidia_gpu().is_some()
}

/// Whether this ffmpeg build lists the h264_nvenc encoder at all
pub fn nvenc_encoder_listed() -> bool {
    ffmpeg_encoders_output().contains("h264_nvenc")
}

/// The encoder row can be present in builds without a usable GPU runtime,
/// so the driver has to answer too.
pub fn check_nvenc_available() -> bool {
    nvenc_encoder_listed() && has_nvidia_gpu()
}

/// Pick the encoder for an operation. GPU requests fall back to x264 when
/// NVENC is not usable; the spawn itself then never sees the bad encoder.
pub fn select_encoder(use_gpu: bool) -> Encoder {
    if use_gpu {
        if check_nvenc_available() {
            Encoder::H264Nvenc
        } else {
            warn!("NVENC requested but unavailable, using x264");
            Encoder::X264
        }
    } else {
        Encoder::X264
    }
}

/// Map the x264 preset ladder onto NVENC's coarser fast/medium/slow tiers
pub fn nvenc_preset_for(preset: &str) -> &'static str {
    match preset {
        "ultrafast" | "superfast" | "veryfast" | "faster" | "fast" => "fast",
        "medium" => "medium",
        "slow" | "slower" | "veryslow" => "slow",
        _ => "medium",
    }
}

/// NVENC takes -cq instead of -crf, same 0-51 scale
pub fn nvenc_cq_for(crf: u32) -> u32 {
    crf.min(51)
}

/// stderr fragments that mean the GPU path is broken, not the input.
/// Matching any of these (or dying before the first progress frame) makes
/// the operation eligible for its one CPU retry.
const NVENC_FAILURE_PATTERNS: &[&str] = &[
    "nvencodeapi",
    "hardware is lacking",
    "no capable devices found",
];

pub fn stderr_indicates_gpu_failure(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    NVENC_FAILURE_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}
