use std::collections::HashSet;
use std::sync::Arc;

use kv_store::{FileStore, KvStore, MemoryStore};
use telemetry::journal::EventJournal;
use telemetry::{EventKind, PersistPolicy};
use uxlab_cli::scenario::{run_study, StudyOptions};
use uxlab_core_types::Variant;

fn options(variant: Variant, persist: PersistPolicy) -> StudyOptions {
    StudyOptions {
        variant,
        persist,
        ..StudyOptions::default()
    }
}

#[test]
fn full_flow_records_sessions_events_and_feedback() {
    let store = MemoryStore::new();
    let summary = run_study(
        store.clone(),
        &options(Variant::Bootstrap, PersistPolicy::Immediate),
    )
    .unwrap();

    assert_eq!(summary.sessions.len(), 3);
    assert_eq!(summary.feedback.score, 78);
    assert_eq!(summary.submission.version, 1);
    assert_eq!(summary.submission.file_name, "solution.pdf");
    assert_eq!(summary.submission.file_size, 2_048);

    let events = EventJournal::new(store, "metrics_logs_v1").read();
    assert_eq!(events.len(), summary.events_recorded);

    // Every page load contributed its own session to the shared log.
    let sessions: HashSet<String> = events.iter().map(|e| e.session.0.clone()).collect();
    assert_eq!(sessions.len(), 3);

    // The login task span closed successfully with a measured duration.
    let login_end = events
        .iter()
        .find(|e| e.kind == EventKind::TaskEnd && e.name.as_deref() == Some("login"))
        .expect("login task_end");
    assert_eq!(login_end.success, Some(true));
    assert!(login_end.duration_ms.unwrap_or(0) >= 900);

    // The forgotten required field surfaced as a validation error.
    let invalid = events
        .iter()
        .find(|e| e.kind == EventKind::Error)
        .expect("html5_invalid error");
    assert_eq!(invalid.code.as_deref(), Some("html5_invalid"));
    assert_eq!(invalid.extra["field"], serde_json::json!("comments"));

    // The corrected submit closed the form task with the validity outcome.
    let submit_end = events
        .iter()
        .find(|e| {
            e.kind == EventKind::TaskEnd && e.name.as_deref() == Some("submit-assignment")
        })
        .expect("submit task_end");
    assert_eq!(submit_end.success, Some(true));

    // Variant detection stamped the rendered framework on the events.
    assert!(events
        .iter()
        .filter(|e| e.kind == EventKind::Click)
        .all(|e| e.variant == Variant::Bootstrap));

    // The explicit click markers on the feedback page were honored.
    let names: Vec<&str> = events.iter().filter_map(|e| e.name.as_deref()).collect();
    assert!(names.contains(&"export-csv"));
    assert!(names.contains(&"toggle-theme"));
    assert!(names.contains(&"auto:loginBtn"));
}

#[test]
fn debounced_runs_lose_nothing_across_page_teardowns() {
    let store = MemoryStore::new();
    let summary = run_study(
        store.clone(),
        &options(Variant::Bulma, PersistPolicy::Debounced { delay_ms: 250 }),
    )
    .unwrap();

    let events = EventJournal::new(store, "metrics_logs_v1").read();
    assert_eq!(events.len(), summary.events_recorded);
    assert!(events.iter().any(|e| e.variant == Variant::Bulma));
}

#[test]
fn theme_toggle_reaches_later_events() {
    let store = MemoryStore::new();
    run_study(
        store.clone(),
        &options(Variant::Bootstrap, PersistPolicy::Immediate),
    )
    .unwrap();

    let events = EventJournal::new(store.clone(), "metrics_logs_v1").read();
    let toggled = events
        .iter()
        .find(|e| e.name.as_deref() == Some("theme-toggled"))
        .expect("theme-toggled mark");
    assert_eq!(toggled.theme.as_str(), "dark");
    assert_eq!(store.get("pref-theme").as_deref(), Some("dark"));
}

#[test]
fn journal_carries_business_events_and_mirrored_telemetry() {
    let store = MemoryStore::new();
    run_study(
        store.clone(),
        &options(Variant::Bootstrap, PersistPolicy::Immediate),
    )
    .unwrap();

    let journal = portal::StudyJournal::new(store);
    let entries = journal.entries();
    let kinds: HashSet<&str> = entries.iter().map(|r| r.event.as_str()).collect();
    assert!(kinds.contains("login_succeeded"));
    assert!(kinds.contains("submission_succeeded"));
    assert!(kinds.contains("feedback_created"));
    assert!(kinds.contains("metrics"));
}

#[test]
fn repeated_runs_reuse_identity_and_version_submissions() {
    let store = MemoryStore::new();
    let first = run_study(
        store.clone(),
        &options(Variant::Bootstrap, PersistPolicy::Immediate),
    )
    .unwrap();
    let second = run_study(
        store,
        &options(Variant::Bootstrap, PersistPolicy::Immediate),
    )
    .unwrap();

    assert_eq!(first.study_id, second.study_id);
    assert_eq!(second.submission.version, 2);
}

#[test]
fn file_backed_store_survives_process_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let first_summary = {
        let store = FileStore::open(dir.path()).unwrap();
        run_study(
            store,
            &options(Variant::Bootstrap, PersistPolicy::Immediate),
        )
        .unwrap()
    };

    // A fresh handle over the same directory sees the whole history.
    let store = FileStore::open(dir.path()).unwrap();
    let events = EventJournal::new(store.clone(), "metrics_logs_v1").read();
    assert_eq!(events.len(), first_summary.events_recorded);

    let export_path = dir.path().join("report.csv");
    telemetry::export::write_report(&export_path, &events).unwrap();
    let body = std::fs::read_to_string(export_path).unwrap();
    assert_eq!(body.lines().count(), events.len() + 1);
}
