//! Save / resume flows through both reference stores

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use ttx_engine::prelude::*;
use ttx_engine::{SessionSnapshot, StoreError};
use ttx_store::{FileSessionStore, MemorySessionStore, DEFAULT_MAX_SESSIONS};
use ttx_test_utils::{lanternfish, mini_scenario};

async fn played_session(engine: &InvestigationEngine, id: &str) -> InvestigationState {
    let mut state = engine.start_session_with_id(SessionId::new(id));
    for request in ["phishing email", "scheduled task"] {
        engine.disclose(&mut state, request).await.unwrap();
    }
    state
}

#[tokio::test]
async fn memory_store_round_trip() {
    let engine = InvestigationEngine::new(lanternfish());
    let store = MemorySessionStore::new();
    let state = played_session(&engine, "INC-MEM-1").await;

    engine.save(&store, &state).await.unwrap();
    assert_eq!(store.len(), 1);

    let resumed = engine.resume(&store, state.session_id()).await.unwrap();
    assert_eq!(resumed, state);

    assert!(store.delete(state.session_id()));
    assert!(store.is_empty());
    let err = engine.resume(&store, state.session_id()).await.unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::NotFound(_))));
}

#[tokio::test]
async fn file_store_resumes_with_identical_behavior() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InvestigationEngine::new(lanternfish());
    let mut state = played_session(&engine, "INC-FILE-1").await;

    {
        let store = FileSessionStore::open(dir.path()).await.unwrap();
        engine.save(&store, &state).await.unwrap();
        assert!(dir.path().join("INC-FILE-1.json").is_file());
    }

    // Fresh store: nothing cached, read from disk
    let store = FileSessionStore::open(dir.path()).await.unwrap();
    assert_eq!(store.cached_count(), 0);
    let mut resumed = engine.resume(&store, state.session_id()).await.unwrap();
    assert_eq!(resumed.remaining_budget(), state.remaining_budget());
    assert_eq!(resumed.discovered_phases(), state.discovered_phases());

    let next = engine.disclose(&mut state, "lsass dump").await.unwrap();
    let next_resumed = engine.disclose(&mut resumed, "lsass dump").await.unwrap();
    assert_eq!(next.evidence.id, next_resumed.evidence.id);
}

#[tokio::test]
async fn file_store_rejects_tampered_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InvestigationEngine::new(lanternfish());
    let state = played_session(&engine, "INC-TAMPER").await;
    let store = FileSessionStore::open(dir.path()).await.unwrap();
    engine.save(&store, &state).await.unwrap();

    let path = dir.path().join("INC-TAMPER.json");
    let raw = std::fs::read_to_string(&path).unwrap();
    let mut snapshot = SessionSnapshot::from_json(&raw).unwrap();
    snapshot.payload.push(' ');
    std::fs::write(&path, snapshot.to_json().unwrap()).unwrap();

    let fresh = FileSessionStore::open(dir.path()).await.unwrap();
    let err = engine.resume(&fresh, state.session_id()).await.unwrap_err();
    assert!(matches!(err, EngineError::Snapshot(_)));
}

#[tokio::test]
async fn snapshot_for_other_scenario_is_rejected() {
    let store = MemorySessionStore::new();
    let lantern = InvestigationEngine::new(lanternfish());
    let mini = InvestigationEngine::new(mini_scenario());
    let state = played_session(&lantern, "INC-X").await;
    lantern.save(&store, &state).await.unwrap();

    let err = mini.resume(&store, state.session_id()).await.unwrap_err();
    assert!(matches!(err, EngineError::Snapshot(_)));
    assert!(!err.user_message().is_empty());
}

#[tokio::test]
async fn list_and_prune_keep_newest() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InvestigationEngine::new(mini_scenario());
    let store = FileSessionStore::open(dir.path()).await.unwrap();
    let base = Utc::now();

    for i in 0..12 {
        let state = engine.start_session_with_id(SessionId::new(format!("INC-{i:02}")));
        let mut snapshot = engine.snapshot(&state).unwrap();
        snapshot.saved_at = base + Duration::minutes(i);
        store.save(state.session_id(), &snapshot).await.unwrap();
    }
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 12);
    assert_eq!(listed[0].session_id, SessionId::new("INC-11"));
    assert_eq!(listed[0].scenario_id, "MINI-1");

    let removed = store.prune(DEFAULT_MAX_SESSIONS).await.unwrap();
    assert_eq!(removed, vec![SessionId::new("INC-01"), SessionId::new("INC-00")]);
    assert_eq!(store.list().await.unwrap().len(), DEFAULT_MAX_SESSIONS);

    let err = store.load(&SessionId::new("INC-00")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert!(store.load(&SessionId::new("INC-11")).await.is_ok());
}

#[tokio::test]
async fn failed_rename_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InvestigationEngine::new(mini_scenario());
    let state = engine.start_session_with_id(SessionId::new("INC-BLOCKED"));
    let store = FileSessionStore::open(dir.path()).await.unwrap();

    // A non-empty directory where the snapshot file should go
    let target = dir.path().join("INC-BLOCKED.json");
    std::fs::create_dir(&target).unwrap();
    std::fs::write(target.join("keep"), b"x").unwrap();

    let err = engine.save(&store, &state).await.unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Io(_))));
    assert!(!dir.path().join("INC-BLOCKED.json.tmp").exists());
    assert!(target.is_dir());
}
