use serde_json::{Value, json};

use telenote_store::{JobStatus, TriggerSource};

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn direct_trigger_processes_recording_end_to_end() {
    let app = TestApp::spawn().await;
    let dir = app.seed_recording("consult-100", &["speaker1.mka", "speaker2.mka"]);

    let resp = app
        .post(
            "/api/job",
            &json!({ "recording_path": dir.to_string_lossy() }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 202);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["job_id"], "consult-100");

    let record = app.wait_for_terminal("consult-100").await;
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.exit_code, Some(0));
    assert_eq!(record.trigger_source, TriggerSource::Direct);
    assert!(record.completed_at.is_some());

    // Both tracks went to the engine natively.
    assert_eq!(
        *app.asr.submissions.lock().unwrap(),
        ["speaker1.mka", "speaker2.mka"]
    );

    // Delivery is keyed by the platform's consultation id, not the
    // filesystem-derived job id.
    let delivered = app.platform.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, "vc-consult-100");
    assert!(delivered[0].1.contains("Alice Demo"));
    assert!(delivered[0].1.contains("Dr. Reyes"));

    // Artifacts land next to the recording.
    assert!(dir.join("final_merged.json").exists());
    assert!(dir.join("clinical_summary.json").exists());
    assert!(dir.join("final_note.txt").exists());
}

#[tokio::test]
async fn explicit_job_id_overrides_directory_name() {
    let app = TestApp::spawn().await;
    let dir = app.seed_recording("dir-name", &["speaker1.mka"]);

    let resp = app
        .post(
            "/api/job",
            &json!({ "recording_path": dir.to_string_lossy(), "job_id": "custom-id" }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 202);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["job_id"], "custom-id");

    let record = app.wait_for_terminal("custom-id").await;
    assert_eq!(record.status, JobStatus::Completed);
    assert!(app.store.read("dir-name").unwrap().is_none());
}

#[tokio::test]
async fn missing_recording_path_is_rejected() {
    let app = TestApp::spawn().await;
    let resp = app
        .post(
            "/api/job",
            &json!({ "recording_path": "/nonexistent/consult" }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_trigger_skips_without_side_effects() {
    let app = TestApp::spawn().await;
    let dir = app.seed_recording("consult-101", &["speaker1.mka"]);

    // Simulate an in-flight run by holding the job's lock.
    let guard = app.locks.acquire("consult-101").unwrap().unwrap();

    let resp = app
        .post(
            "/api/job",
            &json!({ "recording_path": dir.to_string_lossy() }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 202);

    for _ in 0..300 {
        if app
            .sequencer
            .duplicate_count("consult-101", TriggerSource::Direct)
            > 0
        {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(
        app.sequencer
            .duplicate_count("consult-101", TriggerSource::Direct),
        1
    );

    // The duplicate never wrote a status record or ran a stage.
    assert!(app.store.read("consult-101").unwrap().is_none());
    assert!(app.asr.submissions.lock().unwrap().is_empty());
    assert!(app.platform.delivered.lock().unwrap().is_empty());
    assert_eq!(app.llm.call_count(), 0);

    guard.release();
}

#[tokio::test]
async fn room_events_yield_participant_labels() {
    let app = TestApp::spawn().await;
    let dir = app.seed_recording("consult-sp", &["ep-aa.mka", "ep-bb.mka"]);
    app.seed_events(
        "consult-sp",
        &json!([
            { "type": "participant_joined", "endpoint_id": "ep-aa", "display_name": "Ana Gomez" },
            { "type": "participant_joined", "endpoint_id": "ep-bb", "display_name": "Dr. Silva" },
            { "type": "track_added", "endpoint_id": "ep-aa", "media_type": "audio" },
            { "type": "track_added", "endpoint_id": "ep-bb", "media_type": "audio" },
        ]),
    );

    app.post(
        "/api/job",
        &json!({ "recording_path": dir.to_string_lossy() }),
    )
    .await;
    let record = app.wait_for_terminal("consult-sp").await;
    assert_eq!(record.status, JobStatus::Completed);

    let merged: Value =
        serde_json::from_slice(&std::fs::read(dir.join("final_merged.json")).unwrap()).unwrap();
    let speakers: Vec<&str> = merged["segments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["speaker"].as_str().unwrap())
        .collect();
    assert_eq!(speakers, ["Ana Gomez", "Dr. Silva"]);
    assert_eq!(merged["speaker_count"], 2);
}

#[tokio::test]
async fn missing_timeline_degrades_to_generic_labels() {
    let app = TestApp::spawn().await;
    let dir = app.seed_recording("consult-gen", &["speaker1.mka", "speaker2.mka"]);

    app.post(
        "/api/job",
        &json!({ "recording_path": dir.to_string_lossy() }),
    )
    .await;
    let record = app.wait_for_terminal("consult-gen").await;
    assert_eq!(record.status, JobStatus::Completed);

    let merged: Value =
        serde_json::from_slice(&std::fs::read(dir.join("final_merged.json")).unwrap()).unwrap();
    let speakers: Vec<&str> = merged["segments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["speaker"].as_str().unwrap())
        .collect();
    assert_eq!(speakers, ["Speaker 0", "Speaker 1"]);
}
