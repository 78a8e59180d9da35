// Core encoding engine - independent of UI

pub mod core;
pub mod hardware;
pub mod probe;
pub mod worker;

pub use core::*;
pub use hardware::{Encoder, check_nvenc_available, detect_nvidia_gpu, select_encoder};
pub use probe::{InputInfo, ffmpeg_version, ffprobe_version, probe_input_info};
pub use worker::{OperationRunner, WorkerMessage};
