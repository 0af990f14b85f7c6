use serde_json::json;

use telenote_store::JobStatus;

use crate::fixtures::mock_clients::{LlmBehavior, PlatformBehavior};
use crate::fixtures::test_app::{TestApp, TestAppConfig};

#[tokio::test]
async fn summarizer_timeout_fails_the_job_with_exit_5() {
    let app = TestApp::spawn_with(TestAppConfig {
        llm: LlmBehavior::Timeout,
        ..Default::default()
    })
    .await;
    let dir = app.seed_recording("consult-t", &["speaker1.mka"]);

    app.post(
        "/api/job",
        &json!({ "recording_path": dir.to_string_lossy() }),
    )
    .await;
    let record = app.wait_for_terminal("consult-t").await;

    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.exit_code, Some(5));
    assert!(record.error.as_deref().unwrap().contains("timeout"));

    // A required-stage failure stops the sequence before delivery.
    assert!(app.platform.delivered.lock().unwrap().is_empty());

    // And the lock is free again for a re-run.
    assert!(!app.locks.is_held("consult-t"));
}

#[tokio::test]
async fn platform_auth_rejection_fails_with_exit_6() {
    let app = TestApp::spawn_with(TestAppConfig {
        platform: PlatformBehavior::AuthRejected,
        ..Default::default()
    })
    .await;
    let dir = app.seed_recording("consult-a", &["speaker1.mka"]);

    app.post(
        "/api/job",
        &json!({ "recording_path": dir.to_string_lossy() }),
    )
    .await;
    let record = app.wait_for_terminal("consult-a").await;

    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.exit_code, Some(6));

    // Context retrieval precedes summarization and delivery.
    assert_eq!(app.llm.call_count(), 0);
    assert!(app.platform.delivered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_emr_delivery_does_not_fail_the_job() {
    let app = TestApp::spawn_with(TestAppConfig {
        emr: Some(true),
        ..Default::default()
    })
    .await;
    let dir = app.seed_recording("consult-e", &["speaker1.mka"]);

    app.post(
        "/api/job",
        &json!({ "recording_path": dir.to_string_lossy() }),
    )
    .await;
    let record = app.wait_for_terminal("consult-e").await;

    // Secondary delivery is optional; the job still completes.
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.exit_code, Some(0));
    assert_eq!(app.platform.delivered.lock().unwrap().len(), 1);
    assert!(app.emr.as_ref().unwrap().filed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn working_emr_files_the_note() {
    let app = TestApp::spawn_with(TestAppConfig {
        emr: Some(false),
        ..Default::default()
    })
    .await;
    let dir = app.seed_recording("consult-f", &["speaker1.mka"]);

    app.post(
        "/api/job",
        &json!({ "recording_path": dir.to_string_lossy() }),
    )
    .await;
    let record = app.wait_for_terminal("consult-f").await;

    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(
        *app.emr.as_ref().unwrap().filed.lock().unwrap(),
        ["consult-f"]
    );
}

#[tokio::test]
async fn failed_job_can_be_rerun() {
    let app = TestApp::spawn_with(TestAppConfig {
        platform: PlatformBehavior::AuthRejected,
        ..Default::default()
    })
    .await;
    let dir = app.seed_recording("consult-r", &["speaker1.mka"]);
    let path = json!({ "recording_path": dir.to_string_lossy() });

    app.post("/api/job", &path).await;
    let first = app.wait_for_terminal("consult-r").await;
    assert_eq!(first.status, JobStatus::Failed);

    // The terminal record lands just before the lock release; wait for
    // the release itself before re-triggering.
    for _ in 0..300 {
        if !app.locks.is_held("consult-r") {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    // The lock was released, so a second trigger runs the pipeline
    // again rather than being deduplicated.
    app.post("/api/job", &path).await;
    for _ in 0..300 {
        if app.asr.submissions.lock().unwrap().len() >= 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(app.asr.submissions.lock().unwrap().len(), 2);
}
