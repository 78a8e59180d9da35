// Tests for the folder-scan to job-queue pipeline

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use vidscale::engine::{
    EncodingSettings, JobStatus, Resolution, build_job_queue, scan, scan_recursive,
};

use crate::common::helpers::*;

/// A folder the way downloads really look: mixed extensions, mixed case,
/// clutter, and one nested directory
fn messy_library() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_stub_video(dir.path(), "b_second.mp4");
    write_stub_video(dir.path(), "a_first.MKV");
    write_stub_video(dir.path(), "c_third.mov");
    fs::write(dir.path().join("notes.txt"), b"x").unwrap();
    fs::write(dir.path().join("cover.jpg"), b"x").unwrap();
    fs::write(dir.path().join("no_extension"), b"x").unwrap();

    let nested = dir.path().join("season_two");
    fs::create_dir(&nested).unwrap();
    write_stub_video(&nested, "episode.mp4");
    dir
}

#[test]
fn test_scan_filters_and_sorts_a_messy_folder() {
    let dir = messy_library();

    let files = scan(dir.path());
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(
        names,
        ["a_first.MKV", "b_second.mp4", "c_third.mov"],
        "clutter excluded, videos sorted by name, nested folder untouched"
    );
}

#[test]
fn test_recursive_scan_reaches_nested_folders() {
    let dir = messy_library();

    let files = scan_recursive(dir.path());
    assert_eq!(files.len(), 4, "recursive scan should add the nested episode");
    assert!(
        files
            .iter()
            .any(|p| p.ends_with("season_two/episode.mp4")),
        "nested file missing from {files:?}"
    );
}

#[test]
fn test_scanned_folder_becomes_an_idle_queue() {
    let dir = messy_library();
    let settings = hd_settings();

    let jobs = build_job_queue(scan(dir.path()), &settings, None);

    assert_eq!(jobs.len(), 3);
    for job in &jobs {
        assert_eq!(job.status, JobStatus::Idle);
        assert_eq!(job.attempts, 0);
        assert_eq!(
            job.output_path.parent(),
            Some(dir.path()),
            "default output folder is the input's own folder"
        );
        assert_ne!(
            job.output_path, job.input_path,
            "output name must never collide with the input"
        );
    }
}

#[test]
fn test_output_names_carry_the_settings() {
    let dir = TempDir::new().unwrap();
    write_stub_video(dir.path(), "holiday.mkv");

    let mut settings = EncodingSettings::default().with_resolution(Resolution::Fhd);
    settings.crf = 23;
    settings.preset = "fast".to_string();

    let jobs = build_job_queue(scan(dir.path()), &settings, None);
    let name = jobs[0].output_path.file_name().unwrap().to_string_lossy();

    assert!(
        name.starts_with("holiday_FHD_23_fast_"),
        "settings missing from output name: {name}"
    );
    assert!(name.ends_with(".mp4"), "output container is always mp4");
}

#[test]
fn test_output_dir_override_collects_all_outputs() {
    let dir = messy_library();
    let out = TempDir::new().unwrap();
    let settings = hd_settings();

    let jobs = build_job_queue(scan(dir.path()), &settings, Some(out.path()));

    for job in &jobs {
        assert_eq!(job.output_path.parent(), Some(out.path()));
    }
}

#[test]
fn test_spaced_names_survive_the_queue() {
    let dir = TempDir::new().unwrap();
    write_stub_video(dir.path(), "family trip 2024.mp4");

    let jobs = build_job_queue(scan(dir.path()), &hd_settings(), None);

    assert_eq!(jobs.len(), 1);
    let name = jobs[0].output_path.file_name().unwrap().to_string_lossy();
    assert!(
        name.starts_with("family trip 2024_HD_"),
        "stem was mangled: {name}"
    );
}

#[test]
fn test_queue_order_matches_scan_order() {
    let dir = messy_library();
    let files = scan(dir.path());
    let jobs = build_job_queue(files.clone(), &hd_settings(), None);

    let queued: Vec<&Path> = jobs.iter().map(|j| j.input_path.as_path()).collect();
    let scanned: Vec<&Path> = files.iter().map(|p| p.as_path()).collect();
    assert_eq!(queued, scanned, "batch must run in scan order");
}
