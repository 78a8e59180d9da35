mod concat;
mod ffmpeg_cmd;
mod log;
mod progress;
mod scan;
mod settings;
mod types;

pub use concat::{
    CONCAT_LIST_NAME, JOIN_OUTPUT_NAME, JoinJob, default_join_output, escape_concat_path,
    join_job, join_job_with_tool, verify_compatible, write_concat_list,
};
pub use ffmpeg_cmd::{
    RunReport, build_concat_args, build_scale_args, encode_job, encode_job_with_tool,
    format_ffmpeg_cmd, run_ffmpeg_once,
};
pub use log::write_debug_log;
pub use progress::ProgressMonitor;
pub use scan::{
    build_job_from_path, build_job_queue, derive_output_path, is_video_file,
    output_name_with_timestamp, scan, scan_recursive,
};
pub use settings::{
    DEFAULT_AUDIO_BITRATE_K, DEFAULT_CRF, DEFAULT_PRESET, EncodingSettings, PRESETS, Resolution,
    UI_CRF_MAX, UI_CRF_MIN,
};
pub use types::{
    DEFAULT_GRACE_PERIOD_MS, DEFAULT_PROGRESS_WINDOW, EncodeError, EncodeJob, JobStatus,
    OperationContext, ProgressSnapshot,
};
