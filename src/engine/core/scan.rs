use std::path::{Path, PathBuf};

use chrono::Local;
use walkdir::WalkDir;

use super::settings::EncodingSettings;
use super::types::EncodeJob;

/// Video file extensions eligible for batch processing
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "flv", "wmv"];

/// Check if a path has a video file extension
pub fn is_video_file(path: &Path) -> bool {
    if let Some(ext) = path.extension() {
        if let Some(ext_str) = ext.to_str() {
            return VIDEO_EXTENSIONS.contains(&ext_str.to_lowercase().as_str());
        }
    }
    false
}

/// Collect the video files directly inside a folder, sorted by name so a
/// batch always runs in the same order
pub fn scan(root: &Path) -> Vec<PathBuf> {
    scan_with_depth(root, 1)
}

/// Recursive variant for nested libraries
pub fn scan_recursive(root: &Path) -> Vec<PathBuf> {
    scan_with_depth(root, usize::MAX)
}

fn scan_with_depth(root: &Path, depth: usize) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .max_depth(depth)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file() && is_video_file(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

/// Output file name carrying the settings that produced it:
/// `{stem}_{resolution}_{crf}_{preset}_{timestamp}.mp4`
pub fn output_name_with_timestamp(
    input: &Path,
    settings: &EncodingSettings,
    timestamp: &str,
) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    format!(
        "{stem}_{}_{}_{}_{timestamp}.mp4",
        settings.resolution_label(),
        settings.crf,
        settings.preset
    )
}

/// Derive the output path for an input. Defaults to the input's own folder
/// when no output directory is given.
pub fn derive_output_path(
    input: &Path,
    settings: &EncodingSettings,
    output_dir: Option<&Path>,
) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let name = output_name_with_timestamp(input, settings, &timestamp);
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(name)
}

pub fn build_job_from_path(
    input_path: PathBuf,
    settings: &EncodingSettings,
    output_dir: Option<&Path>,
) -> EncodeJob {
    let output_path = derive_output_path(&input_path, settings, output_dir);
    EncodeJob::new(input_path, output_path, settings.clone())
}

/// Build the sequential job queue for a batch run
pub fn build_job_queue(
    files: Vec<PathBuf>,
    settings: &EncodingSettings,
    output_dir: Option<&Path>,
) -> Vec<EncodeJob> {
    files
        .into_iter()
        .map(|input_path| build_job_from_path(input_path, settings, output_dir))
        .collect()
}
