//! Background loop start/stop, handler timeouts and lifecycle events.

mod common;

use std::time::Duration;

use common::{FakeRenderer, FakeStyleTransfer, FakeTranscriber, Harness};
use lyricflow_core::job_events::{
    EVENT_JOB_COMPLETED, EVENT_JOB_FAILED, EVENT_JOB_RETRY_SCHEDULED, EVENT_PROJECT_COMPLETED,
    EVENT_PROJECT_FAILED,
};
use lyricflow_core::retry::{Backoff, RetryPolicy};
use lyricflow_db::models::status::{JobStage, JobStatus};
use lyricflow_pipeline::{DispatcherConfig, JobStore};

// ---------------------------------------------------------------------------
// Start / stop
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn started_loop_processes_jobs() {
    let h = Harness::new();
    let project = h.seed_project("a.mp3").await;
    let id = h.enqueue(project.id, JobStage::StyleTransfer).await;

    let handle = h.dispatcher.start().expect("first start spawns the loop");
    tokio::time::sleep(Duration::from_millis(10)).await;

    let job = h.store.find_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn start_while_running_is_a_no_op() {
    let h = Harness::new();

    let handle = h.dispatcher.start().expect("first start spawns the loop");
    assert!(h.dispatcher.is_running());
    assert!(h.dispatcher.start().is_none());

    handle.stop().await;
    assert!(!h.dispatcher.is_running());
    assert!(!handle.is_running());
}

#[tokio::test(start_paused = true)]
async fn stop_twice_is_a_no_op_and_restart_works() {
    let h = Harness::new();

    let handle = h.dispatcher.start().unwrap();
    handle.stop().await;
    handle.stop().await;

    let again = h.dispatcher.start().expect("restart after stop");
    again.stop().await;
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_cancels_loop() {
    let h = Harness::new();

    let handle = h.dispatcher.start().unwrap();
    drop(handle);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(!h.dispatcher.is_running());
}

#[tokio::test(start_paused = true)]
async fn loop_picks_up_jobs_on_later_ticks() {
    let h = Harness::new();
    let handle = h.dispatcher.start().unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let project = h.seed_project("a.mp3").await;
    let id = h.enqueue(project.id, JobStage::StyleTransfer).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        h.store.find_job(id).await.unwrap().unwrap().status,
        JobStatus::Pending
    );

    // Next tick at the 5 s poll interval.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(
        h.store.find_job(id).await.unwrap().unwrap().status,
        JobStatus::Completed
    );

    handle.stop().await;
}

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn hung_handler_times_out_and_is_retried() {
    let config = DispatcherConfig {
        handler_timeout: Duration::from_secs(1),
        retry: RetryPolicy {
            backoff: Backoff::immediate(),
            ..Default::default()
        },
        ..Default::default()
    };
    let h = Harness::build(
        config,
        FakeStyleTransfer::default(),
        FakeTranscriber {
            hang: true,
            ..Default::default()
        },
        FakeRenderer::default(),
    );
    let project = h.seed_project("a.mp3").await;
    let id = h.enqueue(project.id, JobStage::Transcription).await;

    let report = h.dispatcher.run_cycle().await;
    assert_eq!(report.retried, 1);

    let job = h.store.find_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.error_message.as_deref(), Some("Timed out after 1s"));
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_publishes_job_and_project_events() {
    let h = Harness::new();
    let mut rx = h.events.subscribe();
    let project = h.seed_project("a.mp3").await;
    h.enqueue(project.id, JobStage::Transcription).await;
    h.enqueue(project.id, JobStage::VideoRender).await;
    h.dispatcher.run_cycle().await;

    let types: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|e| e.event_type)
        .collect();
    assert_eq!(
        types,
        vec![EVENT_JOB_COMPLETED, EVENT_JOB_COMPLETED, EVENT_PROJECT_COMPLETED]
    );
}

#[tokio::test]
async fn exhaustion_publishes_retry_failure_and_project_events() {
    let h = Harness::build(
        common::immediate_config(),
        FakeStyleTransfer {
            fail_times: std::sync::atomic::AtomicUsize::new(3),
            ..Default::default()
        },
        FakeTranscriber::default(),
        FakeRenderer::default(),
    );
    let mut rx = h.events.subscribe();
    let project = h.seed_project("a.mp3").await;
    let id = h.enqueue(project.id, JobStage::StyleTransfer).await;

    for _ in 0..3 {
        h.dispatcher.run_cycle().await;
    }

    let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(
        types,
        vec![
            EVENT_JOB_RETRY_SCHEDULED,
            EVENT_JOB_RETRY_SCHEDULED,
            EVENT_JOB_FAILED,
            EVENT_PROJECT_FAILED,
        ]
    );
    assert!(events.iter().all(|e| e.job_id == Some(id)));
    assert_eq!(events[1].payload["retry_count"], 2);
    assert_eq!(events[0].stage.as_deref(), Some("style_transfer"));
    assert_eq!(
        events[3].payload["error"],
        "style_transfer failed: style transfer unavailable"
    );
}

#[tokio::test]
async fn retry_event_reports_attempt_delay_and_error() {
    let config = DispatcherConfig {
        retry: RetryPolicy {
            backoff: Backoff::default(),
            ..Default::default()
        },
        ..Default::default()
    };
    let h = Harness::build(
        config,
        FakeStyleTransfer::default(),
        FakeTranscriber {
            fail_times: std::sync::atomic::AtomicUsize::new(1),
            ..Default::default()
        },
        FakeRenderer::default(),
    );
    let mut rx = h.events.subscribe();
    let project = h.seed_project("a.mp3").await;
    let id = h.enqueue(project.id, JobStage::Transcription).await;
    h.dispatcher.run_cycle().await;

    let event = rx.try_recv().expect("retry event published");
    assert_eq!(event.event_type, EVENT_JOB_RETRY_SCHEDULED);
    assert_eq!(event.project_id, project.id);
    assert_eq!(event.job_id, Some(id));
    assert_eq!(event.stage.as_deref(), Some("transcription"));
    assert_eq!(
        event.payload,
        serde_json::json!({
            "retry_count": 1,
            "retry_in_ms": 5000,
            "error": "Service returned 503: transcriber busy",
        })
    );
}
