use std::sync::atomic::Ordering;

use serde_json::{Value, json};

use telenote_store::{JobStatus, TriggerSource};

use crate::fixtures::test_app::{TestApp, TestAppConfig, WEBHOOK_TOKEN};

fn finished_payload(secret: &str) -> Value {
    json!({
        "topic": "videoconsultation-finished",
        "vc": { "secret": secret },
    })
}

#[tokio::test]
async fn finished_event_starts_processing() {
    let app = TestApp::spawn().await;
    app.seed_recording("secret-abc", &["speaker1.mka", "speaker2.mka"]);

    let resp = app
        .webhook(Some(WEBHOOK_TOKEN), &finished_payload("secret-abc"))
        .await;
    assert_eq!(resp.status().as_u16(), 202);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["job_id"], "secret-abc");

    let record = app.wait_for_terminal("secret-abc").await;
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.trigger_source, TriggerSource::Event);

    // Event-triggered jobs report their terminal state back to the
    // trigger origin.
    let notifications = app.platform.notifications.lock().unwrap();
    assert_eq!(
        *notifications,
        [("secret-abc".to_string(), "completed".to_string())]
    );
}

#[tokio::test]
async fn failed_callback_does_not_fail_the_job() {
    let app = TestApp::spawn_with(TestAppConfig {
        notify_fails: true,
        ..Default::default()
    })
    .await;
    app.seed_recording("secret-cb", &["speaker1.mka"]);

    let resp = app
        .webhook(Some(WEBHOOK_TOKEN), &finished_payload("secret-cb"))
        .await;
    assert_eq!(resp.status().as_u16(), 202);

    // The callback error is logged only; the job's terminal state is
    // unaffected.
    let record = app.wait_for_terminal("secret-cb").await;
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.exit_code, Some(0));

    for _ in 0..300 {
        if app.platform.notify_attempts.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(app.platform.notify_attempts.load(Ordering::SeqCst), 1);
    assert!(app.platform.notifications.lock().unwrap().is_empty());
}

#[tokio::test]
async fn other_topics_are_acknowledged_and_ignored() {
    let app = TestApp::spawn().await;
    app.seed_recording("secret-xyz", &["speaker1.mka"]);

    let resp = app
        .webhook(
            Some(WEBHOOK_TOKEN),
            &json!({
                "topic": "videoconsultation-started",
                "vc": { "secret": "secret-xyz" },
            }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ignored");

    assert!(app.store.read("secret-xyz").unwrap().is_none());
    assert!(app.asr.submissions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_webhook_token_is_rejected() {
    let app = TestApp::spawn().await;

    let resp = app
        .webhook(Some("wrong-token"), &finished_payload("secret-abc"))
        .await;
    assert_eq!(resp.status().as_u16(), 401);

    let resp = app.webhook(None, &finished_payload("secret-abc")).await;
    assert_eq!(resp.status().as_u16(), 401);

    assert!(app.store.read("secret-abc").unwrap().is_none());
}

#[tokio::test]
async fn missing_consultation_secret_is_rejected() {
    let app = TestApp::spawn().await;
    let resp = app
        .webhook(
            Some(WEBHOOK_TOKEN),
            &json!({ "topic": "videoconsultation-finished" }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn repeated_webhook_for_running_job_is_deduplicated() {
    let app = TestApp::spawn().await;
    app.seed_recording("secret-dup", &["speaker1.mka"]);

    let guard = app.locks.acquire("secret-dup").unwrap().unwrap();

    let resp = app
        .webhook(Some(WEBHOOK_TOKEN), &finished_payload("secret-dup"))
        .await;
    assert_eq!(resp.status().as_u16(), 202);

    for _ in 0..300 {
        if app
            .sequencer
            .duplicate_count("secret-dup", TriggerSource::Event)
            > 0
        {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(
        app.sequencer
            .duplicate_count("secret-dup", TriggerSource::Event),
        1
    );
    assert!(app.store.read("secret-dup").unwrap().is_none());

    guard.release();
}
