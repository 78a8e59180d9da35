// Tests for the join pipeline: list file handling, output placement,
// and cancellation through the runner

#![cfg(unix)]

use std::fs;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use vidscale::engine::{
    CONCAT_LIST_NAME, JobStatus, JoinJob, OperationContext, OperationRunner, WorkerMessage,
    join_job_with_tool,
};

use crate::common::helpers::*;

#[test]
fn test_list_is_written_next_to_the_output() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let a = write_stub_video(input_dir.path(), "part one.mp4");
    let b = write_stub_video(input_dir.path(), "it's part two.mp4");

    // The list is gone once the join returns, so have the tool squirrel
    // away a copy of its -i argument while it still exists
    let tool = fake_encoder(
        &input_dir,
        "fake-ffmpeg-capture",
        "cp \"$6\" \"$(dirname \"$6\")/captured_list.txt\"\n\
         printf 'frame=5\\nprogress=end\\n'",
    );

    let mut job = JoinJob::new(vec![a, b], output_dir.path().join("joined.mp4"));
    join_job_with_tool(
        tool.to_str().unwrap(),
        &mut job,
        &OperationContext::default(),
        |_| {},
    )
    .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert!(
        !output_dir.path().join(CONCAT_LIST_NAME).exists(),
        "the real list is removed after the run"
    );

    let captured = fs::read_to_string(output_dir.path().join("captured_list.txt"))
        .expect("list must be written into the output folder, not the input folder");
    let lines: Vec<&str> = captured.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(
        lines[0].starts_with("file '") && lines[0].contains("part one.mp4"),
        "unexpected list line: {}",
        lines[0]
    );
    assert!(
        lines[1].contains("it'\\''s part two.mp4"),
        "apostrophe must be demuxer-escaped: {}",
        lines[1]
    );
}

#[test]
fn test_join_creates_a_missing_output_folder() {
    let dir = TempDir::new().unwrap();
    let a = write_stub_video(dir.path(), "a.mp4");
    let b = write_stub_video(dir.path(), "b.mp4");
    let tool = fake_encoder_ok(&dir);

    let output = dir.path().join("exports").join("joined.mp4");
    let mut job = JoinJob::new(vec![a, b], output.clone());
    join_job_with_tool(
        tool.to_str().unwrap(),
        &mut job,
        &OperationContext::default(),
        |_| {},
    )
    .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert!(
        output.parent().unwrap().is_dir(),
        "missing output folder should be created before the spawn"
    );
}

#[test]
fn test_cancelled_join_cleans_up() {
    let dir = TempDir::new().unwrap();
    let a = write_stub_video(dir.path(), "a.mp4");
    let b = write_stub_video(dir.path(), "b.mp4");
    let tool = fake_encoder_hanging(&dir);

    let runner = OperationRunner::with_tool(
        tool.to_str().unwrap(),
        Duration::from_millis(500),
        50,
    );
    let join = JoinJob::new(vec![a, b], dir.path().join("joined.mp4"));
    runner.spawn_join(join).unwrap();

    match runner.receiver().recv_timeout(DRAIN_TIMEOUT).unwrap() {
        WorkerMessage::JoinStarted { .. } => {}
        other => panic!("expected JoinStarted first, got {other:?}"),
    }
    thread::sleep(Duration::from_millis(200));
    runner.cancel_current();

    let messages = drain_until_join_finished(runner.receiver());
    match messages.last() {
        Some(WorkerMessage::JoinFinished { job }) => {
            assert_eq!(job.status, JobStatus::Cancelled);
        }
        other => panic!("expected JoinFinished last, got {other:?}"),
    }
    assert!(
        !dir.path().join(CONCAT_LIST_NAME).exists(),
        "list file must not survive a cancelled join"
    );
    assert!(
        !dir.path().join("joined.mp4").exists(),
        "partial output must not survive a cancelled join"
    );
}
