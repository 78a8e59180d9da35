use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidscale")]
#[command(about = "FFmpeg video scaler with a live dashboard", long_about = None)]
pub struct Cli {
    /// Folder to scan for video files (defaults to current directory)
    #[arg(value_name = "DIRECTORY")]
    pub directory: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Launch the TUI (default if no other flags provided)
    #[arg(long)]
    pub tui: bool,

    /// Automatically start encoding when TUI launches (overrides config)
    #[arg(long, conflicts_with = "no_autostart")]
    pub autostart: bool,

    /// Don't automatically start encoding when TUI launches (overrides config)
    #[arg(long, conflicts_with = "autostart")]
    pub no_autostart: bool,

    /// Scan for files on TUI launch (overrides config)
    #[arg(long, conflicts_with = "no_scan")]
    pub scan: bool,

    /// Don't scan for files on TUI launch (overrides config)
    #[arg(long, conflicts_with = "scan")]
    pub no_scan: bool,
}

/// Encoder knobs shared by the scale, batch, and dry-run commands.
/// Anything left unset falls back to the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct EncodeArgs {
    /// Target resolution: source, HD, FHD, or 4K
    #[arg(long, value_name = "LABEL")]
    pub resolution: Option<String>,

    /// Quality level, 0-51 (lower is better)
    #[arg(long)]
    pub crf: Option<u32>,

    /// x264 preset, ultrafast through veryslow
    #[arg(long)]
    pub preset: Option<String>,

    /// Encode with NVENC instead of libx264
    #[arg(long)]
    pub gpu: bool,

    /// Treat the source as portrait and swap the scale dimensions
    #[arg(long)]
    pub vertical: bool,

    /// libx264 worker threads, 0 lets ffmpeg decide
    #[arg(long)]
    pub threads: Option<u32>,

    /// Cap the output frame rate
    #[arg(long)]
    pub fps: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check if ffmpeg and ffprobe are installed
    CheckFfmpeg,

    /// Check NVENC hardware encoding availability
    CheckGpu,

    /// Probe a video file and print its streams
    Probe {
        /// Path to the video file
        file: PathBuf,
    },

    /// Scan a folder and list the videos a batch would pick up
    Scan {
        /// Folder to scan (defaults to current directory)
        directory: Option<PathBuf>,

        /// Descend into subfolders
        #[arg(long)]
        recursive: bool,
    },

    /// Show the ffmpeg commands a batch would run, without encoding
    DryRun {
        /// Folder to scan (defaults to current directory)
        directory: Option<PathBuf>,

        /// Descend into subfolders
        #[arg(long)]
        recursive: bool,

        #[command(flatten)]
        encode: EncodeArgs,
    },

    /// Scale a single video
    Scale {
        /// Input video file
        input: PathBuf,

        /// Output path (defaults to a timestamped name next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        encode: EncodeArgs,
    },

    /// Scale every video in a folder, one after another
    Batch {
        /// Folder to process
        directory: PathBuf,

        /// Folder for the outputs (defaults to each input's folder)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Descend into subfolders
        #[arg(long)]
        recursive: bool,

        #[command(flatten)]
        encode: EncodeArgs,
    },

    /// Join videos losslessly into one file with the concat demuxer
    Join {
        /// Input videos, in playback order
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,

        /// Output path (defaults to joined_output.mp4 next to the first input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show config status and location, or create default config if missing
    InitConfig,
}

pub fn parse() -> Cli {
    Cli::parse()
}
