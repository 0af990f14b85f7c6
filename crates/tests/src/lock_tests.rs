use std::sync::Arc;
use std::time::Duration;

use telenote_store::TriggerSource;

use crate::fixtures::mock_clients::LlmBehavior;
use crate::fixtures::test_app::{TestApp, TestAppConfig};

#[tokio::test]
async fn lock_is_released_when_a_run_is_cancelled() {
    let app = TestApp::spawn_with(TestAppConfig {
        llm: LlmBehavior::Hang,
        ..Default::default()
    })
    .await;
    let dir = app.seed_recording("consult-h", &["speaker1.mka"]);

    let sequencer = Arc::clone(&app.sequencer);
    let handle =
        tokio::spawn(async move { sequencer.run(&dir, TriggerSource::Manual, None).await });

    // Wait until the run holds the lock (it is parked in the
    // summarizer).
    for _ in 0..300 {
        if app.locks.is_held("consult-h") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(app.locks.is_held("consult-h"));

    handle.abort();
    let _ = handle.await;

    // Cancellation dropped the guard, so the lock is free again.
    assert!(!app.locks.is_held("consult-h"));
    assert!(app.locks.acquire("consult-h").unwrap().is_some());
}

#[tokio::test]
async fn lock_is_held_for_the_whole_run() {
    let app = TestApp::spawn_with(TestAppConfig {
        llm: LlmBehavior::Hang,
        ..Default::default()
    })
    .await;
    let dir = app.seed_recording("consult-w", &["speaker1.mka"]);

    let sequencer = Arc::clone(&app.sequencer);
    let handle =
        tokio::spawn(async move { sequencer.run(&dir, TriggerSource::Manual, None).await });

    for _ in 0..300 {
        if app.locks.is_held("consult-w") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // While the run is parked mid-stage, a competing acquisition
    // loses.
    assert!(app.locks.acquire("consult-w").unwrap().is_none());

    handle.abort();
    let _ = handle.await;
}

#[tokio::test]
async fn concurrent_jobs_with_different_ids_run_independently() {
    let app = TestApp::spawn().await;
    let dir_a = app.seed_recording("consult-ia", &["speaker1.mka"]);
    let dir_b = app.seed_recording("consult-ib", &["speaker1.mka"]);

    let seq_a = Arc::clone(&app.sequencer);
    let seq_b = Arc::clone(&app.sequencer);
    let (code_a, code_b) = tokio::join!(
        async move { seq_a.run(&dir_a, TriggerSource::Manual, None).await },
        async move { seq_b.run(&dir_b, TriggerSource::Manual, None).await },
    );

    assert_eq!(code_a, 0);
    assert_eq!(code_b, 0);
    assert_eq!(app.platform.delivered.lock().unwrap().len(), 2);
}
