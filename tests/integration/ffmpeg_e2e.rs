// End-to-end tests that run the real FFmpeg binaries
//
// These generate tiny testsrc clips, push them through the actual encode
// and join paths, and verify the outputs with ffprobe.

use std::fs;
use tempfile::TempDir;

use vidscale::engine::{
    EncodingSettings, JobStatus, JoinJob, OperationContext, Resolution, build_job_from_path,
    encode_job, join_job, probe_input_info, verify_compatible,
};

use crate::common::helpers::*;

// Both binaries are needed: ffmpeg for the encode, ffprobe to check the
// result. Skip the test when either is missing.
macro_rules! require_ffmpeg {
    () => {
        if !is_ffmpeg_available() || !is_ffprobe_available() {
            eprintln!("Skipping test: FFmpeg/ffprobe not available");
            return;
        }
    };
}

/// Settings tuned for test speed, not quality
fn fast_settings(resolution: Resolution) -> EncodingSettings {
    let mut settings = EncodingSettings::default().with_resolution(resolution);
    settings.preset = "ultrafast".to_string();
    settings.crf = 30;
    settings
}

#[test]
fn e2e_test_scale_to_hd() {
    require_ffmpeg!();

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.mp4");
    generate_test_video(&input, 1.0, 320, 240).expect("generate test video");

    let mut job = build_job_from_path(input, &fast_settings(Resolution::Hd), None);
    encode_job(&mut job, &OperationContext::default(), |_| {}).expect("encode failed");

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 1);
    assert!(job.frame > 0, "progress stream should have reported frames");
    assert!(job.output_path.exists());

    let info = probe_input_info(&job.output_path).expect("probe output");
    assert_eq!((info.width, info.height), (1280, 720));
    assert_eq!(info.codec.as_deref(), Some("h264"));
    let duration = info.duration_s.expect("output should report a duration");
    assert!(
        (duration - 1.0).abs() < 0.3,
        "scaling must not change the duration, got {duration}"
    );
}

#[test]
fn e2e_test_vertical_flag_swaps_dimensions() {
    require_ffmpeg!();

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.mp4");
    generate_test_video(&input, 1.0, 320, 240).expect("generate test video");

    let mut settings = fast_settings(Resolution::Hd);
    settings.vertical = true;

    let mut job = build_job_from_path(input, &settings, None);
    encode_job(&mut job, &OperationContext::default(), |_| {}).expect("encode failed");

    let info = probe_input_info(&job.output_path).expect("probe output");
    assert_eq!(
        (info.width, info.height),
        (720, 1280),
        "portrait flag should swap the scale expression"
    );
    assert!(info.is_vertical());
}

#[test]
fn e2e_test_fps_cap() {
    require_ffmpeg!();

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.mp4");
    generate_test_video(&input, 1.0, 320, 240).expect("generate test video");

    let mut settings = fast_settings(Resolution::Source);
    settings.fps = Some(15);

    let mut job = build_job_from_path(input, &settings, None);
    encode_job(&mut job, &OperationContext::default(), |_| {}).expect("encode failed");

    let info = probe_input_info(&job.output_path).expect("probe output");
    assert!(
        (info.fps - 15.0).abs() < 0.1,
        "expected the 15 fps cap, output reports {}",
        info.fps
    );
    assert_eq!(
        (info.width, info.height),
        (320, 240),
        "source resolution must pass through unscaled"
    );
}

#[test]
fn e2e_test_join_two_clips() {
    require_ffmpeg!();

    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.mp4");
    let b = dir.path().join("b.mp4");
    generate_test_video(&a, 1.0, 320, 240).expect("generate clip a");
    generate_test_video(&b, 1.0, 320, 240).expect("generate clip b");

    verify_compatible(&[a.clone(), b.clone()]).expect("identical clips must be compatible");

    let mut job = JoinJob::new(vec![a, b], dir.path().join("joined.mp4"));
    join_job(&mut job, &OperationContext::default(), |_| {}).expect("join failed");

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.output_path.exists());

    let info = probe_input_info(&job.output_path).expect("probe joined output");
    let duration = info.duration_s.expect("joined output should report a duration");
    assert!(
        (duration - 2.0).abs() < 0.3,
        "two one-second clips should join to ~2s, got {duration}"
    );
    assert_eq!(info.codec.as_deref(), Some("h264"), "stream copy keeps the codec");
}

#[test]
fn e2e_test_mismatched_clips_refuse_to_join() {
    require_ffmpeg!();

    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.mp4");
    let b = dir.path().join("b.mp4");
    generate_test_video(&a, 1.0, 320, 240).expect("generate clip a");
    generate_test_video(&b, 1.0, 640, 480).expect("generate clip b");

    let err = verify_compatible(&[a, b]).unwrap_err();
    assert!(
        err.to_string().contains("640x480"),
        "refusal should name the mismatched dimensions: {err}"
    );
}

#[test]
fn e2e_test_junk_input_fails_cleanly() {
    require_ffmpeg!();

    let dir = TempDir::new().unwrap();
    let input = write_stub_video(dir.path(), "junk.mp4");

    let mut job = build_job_from_path(input, &fast_settings(Resolution::Hd), None);
    let err = encode_job(&mut job, &OperationContext::default(), |_| {}).unwrap_err();

    assert_eq!(job.status, JobStatus::Failed);
    assert!(
        job.last_error.as_deref().is_some_and(|e| !e.is_empty()),
        "failure should carry ffmpeg's explanation"
    );
    assert!(
        !job.output_path.exists(),
        "no partial output may be left behind: {err}"
    );
}

#[test]
fn e2e_test_output_is_probeable_by_the_scanner_loop() {
    require_ffmpeg!();

    // A completed output dropped into the same folder must be something a
    // rescan-and-encode cycle can pick up again
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.mp4");
    generate_test_video(&input, 1.0, 320, 240).expect("generate test video");

    let mut job = build_job_from_path(input, &fast_settings(Resolution::Hd), None);
    encode_job(&mut job, &OperationContext::default(), |_| {}).expect("encode failed");

    let second_pass = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| vidscale::engine::is_video_file(&e.path()))
        .count();
    assert_eq!(second_pass, 2, "input and output should both scan as videos");

    let info = probe_input_info(&job.output_path).expect("output must be probeable");
    assert!(info.total_frames().is_some());
}
