// Tests for the background operation runner and its message protocol
//
// Every test drives the runner through a shell script standing in for
// ffmpeg, so the full spawn/supervise/report path runs without encoding
// a single real frame.

#![cfg(unix)]

use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use uuid::Uuid;

use vidscale::engine::{
    EncodeJob, JobStatus, JoinJob, OperationRunner, WorkerMessage, build_job_from_path,
};

use crate::common::helpers::*;

fn runner_for(tool: &std::path::Path) -> OperationRunner {
    OperationRunner::with_tool(
        tool.to_str().expect("tool path is utf-8"),
        Duration::from_millis(500),
        50,
    )
}

fn queue_of(dir: &TempDir, names: &[&str]) -> Vec<EncodeJob> {
    names
        .iter()
        .map(|name| {
            let input = write_stub_video(dir.path(), name);
            build_job_from_path(input, &hd_settings(), None)
        })
        .collect()
}

/// The slot clears shortly after BatchFinished, not atomically with it
fn wait_until_idle(runner: &OperationRunner) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while runner.is_busy() {
        assert!(Instant::now() < deadline, "runner never released its slot");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_batch_reports_every_job_in_order() {
    let dir = TempDir::new().unwrap();
    let tool = fake_encoder_ok(&dir);
    let jobs = queue_of(&dir, &["a.mp4", "b.mp4"]);
    let ids: Vec<Uuid> = jobs.iter().map(|j| j.id).collect();

    let runner = runner_for(&tool);
    runner.spawn_batch(jobs).unwrap();
    assert!(runner.is_busy(), "slot is claimed before spawn returns");

    let messages = drain_until_batch_finished(runner.receiver());

    let started: Vec<Uuid> = messages
        .iter()
        .filter_map(|m| match m {
            WorkerMessage::JobStarted { job_id } => Some(*job_id),
            _ => None,
        })
        .collect();
    assert_eq!(started, ids, "jobs must start in queue order");

    let finished: Vec<&EncodeJob> = messages
        .iter()
        .filter_map(|m| match m {
            WorkerMessage::JobFinished { job } => Some(job.as_ref()),
            _ => None,
        })
        .collect();
    assert_eq!(finished.len(), 2);
    for job in &finished {
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.attempts, 1);
    }

    let progress_updates = messages
        .iter()
        .filter(|m| matches!(m, WorkerMessage::ProgressUpdate { .. }))
        .count();
    assert!(
        progress_updates >= 2,
        "each job's progress stream should reach the channel, saw {progress_updates}"
    );

    match messages.last() {
        Some(WorkerMessage::BatchFinished {
            completed,
            failed,
            cancelled,
        }) => {
            assert_eq!((*completed, *failed, *cancelled), (2, 0, 0));
        }
        other => panic!("expected BatchFinished last, got {other:?}"),
    }

    wait_until_idle(&runner);
}

#[test]
fn test_one_failure_does_not_stop_the_queue() {
    let dir = TempDir::new().unwrap();
    // Fails only when the input name contains "bad"
    let tool = fake_encoder(
        &dir,
        "fake-ffmpeg-picky",
        "case \"$*\" in *bad*) echo 'Conversion failed!' >&2; exit 1;; esac\n\
         printf 'frame=10\\nprogress=end\\n'",
    );
    let jobs = queue_of(&dir, &["bad.mp4", "good.mp4"]);

    let runner = runner_for(&tool);
    runner.spawn_batch(jobs).unwrap();
    let messages = drain_until_batch_finished(runner.receiver());

    let finished: Vec<&EncodeJob> = messages
        .iter()
        .filter_map(|m| match m {
            WorkerMessage::JobFinished { job } => Some(job.as_ref()),
            _ => None,
        })
        .collect();
    assert_eq!(finished[0].status, JobStatus::Failed);
    assert!(
        finished[0]
            .last_error
            .as_deref()
            .unwrap()
            .contains("Conversion failed"),
        "failure detail should carry the tool's stderr"
    );
    assert_eq!(
        finished[1].status,
        JobStatus::Completed,
        "the queue must keep going past a failed job"
    );

    match messages.last() {
        Some(WorkerMessage::BatchFinished {
            completed,
            failed,
            cancelled,
        }) => {
            assert_eq!((*completed, *failed, *cancelled), (1, 1, 0));
        }
        other => panic!("expected BatchFinished last, got {other:?}"),
    }
}

#[test]
fn test_spawn_while_busy_is_refused() {
    let dir = TempDir::new().unwrap();
    let tool = fake_encoder_hanging(&dir);
    let jobs = queue_of(&dir, &["a.mp4"]);

    let runner = runner_for(&tool);
    runner.spawn_batch(jobs).unwrap();

    let second = queue_of(&dir, &["b.mp4"]);
    let err = runner.spawn_batch(second).unwrap_err();
    assert!(
        err.to_string().contains("already running"),
        "unexpected refusal message: {err}"
    );

    let join = JoinJob::new(
        vec![dir.path().join("a.mp4"), dir.path().join("b.mp4")],
        dir.path().join("joined.mp4"),
    );
    assert!(
        runner.spawn_join(join).is_err(),
        "a join must be refused while a batch is live"
    );

    runner.cancel_current();
    drain_until_batch_finished(runner.receiver());
    wait_until_idle(&runner);
}

#[test]
fn test_cancel_marks_unstarted_jobs_cancelled() {
    let dir = TempDir::new().unwrap();
    let tool = fake_encoder_hanging(&dir);
    let jobs = queue_of(&dir, &["a.mp4", "b.mp4", "c.mp4"]);
    let first_id = jobs[0].id;

    let runner = runner_for(&tool);
    runner.spawn_batch(jobs).unwrap();

    // Let the first job get properly underway before pulling the plug
    loop {
        match runner.receiver().recv_timeout(DRAIN_TIMEOUT).unwrap() {
            WorkerMessage::JobStarted { job_id } => {
                assert_eq!(job_id, first_id);
                break;
            }
            WorkerMessage::ProgressUpdate { .. } => continue,
            other => panic!("unexpected message before first start: {other:?}"),
        }
    }
    thread::sleep(Duration::from_millis(200));
    runner.cancel_current();

    let messages = drain_until_batch_finished(runner.receiver());

    let statuses: Vec<JobStatus> = messages
        .iter()
        .filter_map(|m| match m {
            WorkerMessage::JobFinished { job } => Some(job.status),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        [
            JobStatus::Cancelled,
            JobStatus::Cancelled,
            JobStatus::Cancelled
        ],
        "killed job and never-started jobs all land on Cancelled"
    );

    let started = messages
        .iter()
        .filter(|m| matches!(m, WorkerMessage::JobStarted { .. }))
        .count();
    assert_eq!(started, 0, "jobs after the cancel must never start");

    match messages.last() {
        Some(WorkerMessage::BatchFinished {
            completed,
            failed,
            cancelled,
        }) => {
            assert_eq!((*completed, *failed, *cancelled), (0, 0, 3));
        }
        other => panic!("expected BatchFinished last, got {other:?}"),
    }

    wait_until_idle(&runner);
}

#[test]
fn test_runner_is_reusable_after_a_batch() {
    let dir = TempDir::new().unwrap();
    let tool = fake_encoder_ok(&dir);

    let runner = runner_for(&tool);
    runner.spawn_batch(queue_of(&dir, &["a.mp4"])).unwrap();
    drain_until_batch_finished(runner.receiver());
    wait_until_idle(&runner);

    runner.spawn_batch(queue_of(&dir, &["b.mp4"])).unwrap();
    let messages = drain_until_batch_finished(runner.receiver());
    match messages.last() {
        Some(WorkerMessage::BatchFinished { completed, .. }) => assert_eq!(*completed, 1),
        other => panic!("expected BatchFinished last, got {other:?}"),
    }
}

#[test]
fn test_join_reports_started_then_finished() {
    let dir = TempDir::new().unwrap();
    let tool = fake_encoder_ok(&dir);
    let a = write_stub_video(dir.path(), "a.mp4");
    let b = write_stub_video(dir.path(), "b.mp4");
    let join = JoinJob::new(vec![a, b], dir.path().join("joined.mp4"));
    let join_id = join.id;

    let runner = runner_for(&tool);
    runner.spawn_join(join).unwrap();
    let messages = drain_until_join_finished(runner.receiver());

    match messages.first() {
        Some(WorkerMessage::JoinStarted { job_id }) => assert_eq!(*job_id, join_id),
        other => panic!("expected JoinStarted first, got {other:?}"),
    }
    match messages.last() {
        Some(WorkerMessage::JoinFinished { job }) => {
            assert_eq!(job.status, JobStatus::Completed);
            assert_eq!(job.frame, 20, "final frame count comes from the progress stream");
        }
        other => panic!("expected JoinFinished last, got {other:?}"),
    }

    wait_until_idle(&runner);
}
