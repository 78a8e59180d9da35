use std::path::Path;

use super::types::EncodeError;

/// x264 preset ladder, fastest to slowest
pub const PRESETS: &[&str] = &[
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
];

/// CRF range accepted by the command builder (full libx264 range)
pub const CRF_MAX: u32 = 51;

/// CRF range exposed in the UI (sane quality band)
pub const UI_CRF_MIN: u32 = 17;
pub const UI_CRF_MAX: u32 = 30;

pub const DEFAULT_CRF: u32 = 26;
pub const DEFAULT_PRESET: &str = "medium";
pub const DEFAULT_AUDIO_BITRATE_K: u32 = 128;

/// Target resolution presets selectable in the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    /// Keep the source resolution (no scale filter emitted)
    #[default]
    Source,
    Hd,
    Fhd,
    Uhd4k,
}

impl Resolution {
    pub const ALL: &[Resolution] = &[
        Resolution::Source,
        Resolution::Hd,
        Resolution::Fhd,
        Resolution::Uhd4k,
    ];

    /// Target dimensions in landscape orientation, None for passthrough
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Self::Source => None,
            Self::Hd => Some((1280, 720)),
            Self::Fhd => Some((1920, 1080)),
            Self::Uhd4k => Some((3840, 2160)),
        }
    }

    /// Short label used in output file names and the UI
    pub fn label(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Hd => "HD",
            Self::Fhd => "FHD",
            Self::Uhd4k => "4K",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Source => "Source (no scaling)",
            Self::Hd => "HD 1280x720",
            Self::Fhd => "FHD 1920x1080",
            Self::Uhd4k => "4K 3840x2160",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Source => Self::Hd,
            Self::Hd => Self::Fhd,
            Self::Fhd => Self::Uhd4k,
            Self::Uhd4k => Self::Source,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Self::Source => Self::Uhd4k,
            Self::Hd => Self::Source,
            Self::Fhd => Self::Hd,
            Self::Uhd4k => Self::Fhd,
        }
    }

    /// Map dimensions back onto the preset that produced them; unknown
    /// dimensions fall back to Source
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        match (width, height) {
            (1280, 720) | (720, 1280) => Self::Hd,
            (1920, 1080) | (1080, 1920) => Self::Fhd,
            (3840, 2160) | (2160, 3840) => Self::Uhd4k,
            _ => Self::Source,
        }
    }

    /// Map explicit dimensions back onto a preset label for display
    pub fn label_for(width: u32, height: u32) -> &'static str {
        match (width, height) {
            (0, 0) => "source",
            (1280, 720) | (720, 1280) => "HD",
            (1920, 1080) | (1080, 1920) => "FHD",
            (3840, 2160) | (2160, 3840) => "4K",
            _ => "custom",
        }
    }

    /// Parse a label from config or the command line, with the common
    /// scan-line aliases (720p, 1080p, 2160p) accepted
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "source" | "none" => Some(Self::Source),
            "hd" | "720p" | "720" => Some(Self::Hd),
            "fhd" | "1080p" | "1080" => Some(Self::Fhd),
            "4k" | "uhd" | "2160p" | "2160" => Some(Self::Uhd4k),
            _ => None,
        }
    }
}

/// Everything the command builder needs to produce one ffmpeg invocation.
///
/// A settings value is cloned into each job when the operation starts, so
/// later UI edits never affect a running encode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingSettings {
    /// Target width in landscape orientation; 0x0 means no scaling
    pub width: u32,
    pub height: u32,
    /// Swap width/height in the scale expression for portrait sources
    pub vertical: bool,
    pub crf: u32,
    pub preset: String,
    pub video_codec: String,
    pub audio_codec: String,
    pub audio_bitrate_k: u32,
    /// Encode with NVENC instead of libx264
    pub use_gpu: bool,
    /// libx264 worker threads, 0 = let ffmpeg decide (CPU only)
    pub threads: u32,
    /// Cap the output frame rate; None keeps the source rate
    pub fps: Option<u32>,
    /// Extra ffmpeg arguments from config, shell-style quoted
    pub extra_args: String,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            vertical: false,
            crf: DEFAULT_CRF,
            preset: DEFAULT_PRESET.to_string(),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate_k: DEFAULT_AUDIO_BITRATE_K,
            use_gpu: false,
            threads: 0,
            fps: None,
            extra_args: String::new(),
        }
    }
}

impl EncodingSettings {
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.set_resolution(resolution);
        self
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        match resolution.dimensions() {
            Some((w, h)) => {
                self.width = w;
                self.height = h;
            }
            None => {
                self.width = 0;
                self.height = 0;
            }
        }
    }

    pub fn resolution_label(&self) -> &'static str {
        Resolution::label_for(self.width, self.height)
    }

    /// Effective scale dimensions after applying the orientation flag
    pub fn scale_dimensions(&self) -> Option<(u32, u32)> {
        if self.width == 0 && self.height == 0 {
            return None;
        }
        if self.vertical {
            Some((self.height, self.width))
        } else {
            Some((self.width, self.height))
        }
    }

    /// CPU-equivalent settings for the single retry after a GPU failure
    pub fn cpu_fallback(&self) -> Self {
        let mut fallback = self.clone();
        fallback.use_gpu = false;
        fallback
    }

    /// Reject settings the builder must never turn into a spawn.
    pub fn validate(&self, input_path: &Path) -> Result<(), EncodeError> {
        if !input_path.exists() {
            return Err(EncodeError::SettingsInvalid(format!(
                "input does not exist: {}",
                input_path.display()
            )));
        }
        if !input_path.is_file() {
            return Err(EncodeError::SettingsInvalid(format!(
                "input is not a file: {}",
                input_path.display()
            )));
        }
        if self.crf > CRF_MAX {
            return Err(EncodeError::SettingsInvalid(format!(
                "crf {} out of range 0-{}",
                self.crf, CRF_MAX
            )));
        }
        if !PRESETS.contains(&self.preset.as_str()) {
            return Err(EncodeError::SettingsInvalid(format!(
                "unknown preset: {}",
                self.preset
            )));
        }
        if self.fps == Some(0) {
            return Err(EncodeError::SettingsInvalid(
                "fps must be greater than zero".to_string(),
            ));
        }
        // One zero dimension would produce a degenerate scale filter
        if (self.width == 0) != (self.height == 0) {
            return Err(EncodeError::SettingsInvalid(format!(
                "scale needs both dimensions or neither, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}
