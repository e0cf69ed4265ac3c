//! Intentos de etapa y eventos: numeración contigua, transiciones y queries.

use phase_core::{AttemptStatus, EventKind, NewEvent, NewRun, PipelineStore, StoreError};
use phase_persistence::SqliteStore;
use serde_json::json;

fn store_with_run(id: &str) -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteStore::open(&dir.path().join("tracker.db")).expect("open");
    store.create_run(NewRun { id: Some(id.to_string()),
                              industry: "Energy Services".to_string(),
                              country: "Vietnam".to_string(),
                              client_context: None,
                              target_stage: Some("9".to_string()) })
         .expect("run");
    (dir, store)
}

#[test]
fn attempts_are_one_indexed_and_contiguous() {
    let (_dir, store) = store_with_run("run-att");

    let first = store.start_stage_attempt("run-att", "2").expect("first");
    assert_eq!(first, 1);
    store.fail_stage_attempt("run-att", "2", first, "boom").expect("fail");

    // `start(R,S) = k` implica que la próxima llamada devuelve `k + 1`.
    let second = store.start_stage_attempt("run-att", "2").expect("second");
    assert_eq!(second, 2);
    store.finish_stage_attempt("run-att", "2", second).expect("finish");

    let attempts = store.stage_attempts("run-att", Some("2")).expect("attempts");
    let numbers: Vec<i32> = attempts.iter().map(|a| a.attempt).collect();
    assert_eq!(numbers, vec![1, 2]);

    // Otra etapa arranca su propia numeración.
    assert_eq!(store.start_stage_attempt("run-att", "2a").expect("other stage"), 1);
}

#[test]
fn starting_an_attempt_for_a_missing_run_fails() {
    let (_dir, store) = store_with_run("run-exists");
    match store.start_stage_attempt("run-ghost", "2") {
        Err(StoreError::RunNotFound(id)) => assert_eq!(id, "run-ghost"),
        other => panic!("expected RunNotFound, got {other:?}"),
    }
}

#[test]
fn finish_computes_duration_and_requires_running() {
    let (_dir, store) = store_with_run("run-fin");
    let attempt = store.start_stage_attempt("run-fin", "3").expect("start");
    std::thread::sleep(std::time::Duration::from_millis(10));
    store.finish_stage_attempt("run-fin", "3", attempt).expect("finish");

    let record = store.latest_attempt("run-fin", "3").expect("latest").expect("row");
    assert_eq!(record.status, AttemptStatus::Completed);
    let finished = record.finished_at.expect("finished_at");
    assert!(finished >= record.started_at);
    let duration = record.duration_ms.expect("duration");
    assert!(duration >= 0);
    // duration_ms = finished - started con tolerancia de milisegundo.
    assert!((duration - (finished - record.started_at).num_milliseconds()).abs() <= 1);

    // Cerrar dos veces no es válido.
    match store.finish_stage_attempt("run-fin", "3", attempt) {
        Err(StoreError::AttemptNotRunning { .. }) => {}
        other => panic!("expected AttemptNotRunning, got {other:?}"),
    }
}

#[test]
fn fail_records_the_error_string() {
    let (_dir, store) = store_with_run("run-err");
    let attempt = store.start_stage_attempt("run-err", "3").expect("start");
    store.fail_stage_attempt("run-err", "3", attempt, "synthesis failed").expect("fail");

    let record = store.latest_attempt("run-err", "3").expect("latest").expect("row");
    assert_eq!(record.status, AttemptStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("synthesis failed"));
}

#[test]
fn latest_completed_ignores_failed_attempts() {
    let (_dir, store) = store_with_run("run-lat");
    let a1 = store.start_stage_attempt("run-lat", "4").expect("a1");
    store.finish_stage_attempt("run-lat", "4", a1).expect("finish a1");
    let a2 = store.start_stage_attempt("run-lat", "4").expect("a2");
    store.fail_stage_attempt("run-lat", "4", a2, "regression").expect("fail a2");

    assert_eq!(store.latest_attempt("run-lat", "4").unwrap().unwrap().attempt, 2);
    let completed = store.latest_completed_attempt("run-lat", "4").unwrap().expect("completed attempt");
    assert_eq!(completed.attempt, 1);
}

#[test]
fn events_are_append_only_and_filterable() {
    let (_dir, store) = store_with_run("run-ev");
    store.append_event(NewEvent { run_id: "run-ev".to_string(),
                                  stage: Some("2".to_string()),
                                  attempt: Some(1),
                                  kind: EventKind::Info,
                                  message: "stage `2` completed in 12ms".to_string(),
                                  data: Some(json!({ "durationMs": 12 })) })
         .expect("info");
    store.append_event(NewEvent { run_id: "run-ev".to_string(),
                                  stage: Some("3".to_string()),
                                  attempt: Some(1),
                                  kind: EventKind::Error,
                                  message: "stage `3` failed: boom".to_string(),
                                  data: None })
         .expect("error");
    store.append_event(NewEvent { run_id: "run-ev".to_string(),
                                  stage: None,
                                  attempt: None,
                                  kind: EventKind::Metric,
                                  message: "pipeline duration".to_string(),
                                  data: Some(json!({ "totalMs": 340 })) })
         .expect("metric");

    let all = store.events("run-ev", None, None).expect("all");
    assert_eq!(all.len(), 3);
    // Orden de inserción estable.
    assert_eq!(all[0].kind, EventKind::Info);
    assert_eq!(all[0].data.as_ref().unwrap()["durationMs"], 12);

    let errors = store.events("run-ev", None, Some(EventKind::Error)).expect("errors");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].stage.as_deref(), Some("3"));

    let stage2 = store.events("run-ev", Some("2"), None).expect("stage 2");
    assert_eq!(stage2.len(), 1);
}
