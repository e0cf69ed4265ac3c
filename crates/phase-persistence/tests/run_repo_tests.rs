//! Repositorio de runs: altas, duplicados, listado y transiciones de estado.

use phase_core::{NewRun, PipelineStore, RunFilter, RunStatus, StoreError};
use phase_persistence::SqliteStore;

fn store() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteStore::open(&dir.path().join("tracker.db")).expect("open");
    (dir, store)
}

fn new_run(id: &str) -> NewRun {
    NewRun { id: Some(id.to_string()),
             industry: "Energy Services".to_string(),
             country: "Vietnam".to_string(),
             client_context: Some("entry strategy".to_string()),
             target_stage: Some("3".to_string()) }
}

#[test]
fn create_and_get_round_trip() {
    let (_dir, store) = store();
    let created = store.create_run(new_run("run-a")).expect("create");
    assert_eq!(created.status, RunStatus::Pending);

    let fetched = store.get_run("run-a").expect("get").expect("row");
    assert_eq!(fetched.id, "run-a");
    assert_eq!(fetched.industry, "Energy Services");
    assert_eq!(fetched.client_context.as_deref(), Some("entry strategy"));
    assert_eq!(fetched.target_stage, "3");
    assert!(fetched.finished_at.is_none());

    assert!(store.get_run("run-missing").expect("get").is_none());
}

#[test]
fn duplicate_id_is_rejected() {
    let (_dir, store) = store();
    store.create_run(new_run("run-dup")).expect("first");
    match store.create_run(new_run("run-dup")) {
        Err(StoreError::DuplicateRunId(id)) => assert_eq!(id, "run-dup"),
        other => panic!("expected DuplicateRunId, got {other:?}"),
    }
}

#[test]
fn generated_ids_have_the_expected_shape() {
    let (_dir, store) = store();
    let run = store.create_run(NewRun { id: None,
                                        industry: "Energy Services".to_string(),
                                        country: "Vietnam".to_string(),
                                        client_context: None,
                                        target_stage: None })
                   .expect("create");
    assert!(run.id.starts_with("run-"), "generated id {}", run.id);
}

#[test]
fn list_orders_by_created_at_desc_and_filters() {
    let (_dir, store) = store();
    for id in ["run-1", "run-2", "run-3"] {
        store.create_run(new_run(id)).expect("create");
        // created_at con milisegundos: separa el orden.
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    store.update_run_status("run-2", RunStatus::Failed, Some("boom")).expect("fail");

    let all = store.list_runs(&RunFilter::default()).expect("list");
    let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["run-3", "run-2", "run-1"]);

    let failed = store.list_runs(&RunFilter { status: Some(RunStatus::Failed), limit: 50 }).expect("list");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, "run-2");
    assert_eq!(failed[0].error.as_deref(), Some("boom"));

    let limited = store.list_runs(&RunFilter { status: None, limit: 2 }).expect("list");
    assert_eq!(limited.len(), 2);
}

#[test]
fn terminal_status_sets_finished_at() {
    let (_dir, store) = store();
    store.create_run(new_run("run-t")).expect("create");

    store.update_run_status("run-t", RunStatus::Running, None).expect("running");
    let running = store.get_run("run-t").unwrap().unwrap();
    assert!(running.finished_at.is_none());

    store.update_run_status("run-t", RunStatus::Completed, None).expect("completed");
    let completed = store.get_run("run-t").unwrap().unwrap();
    assert!(completed.finished_at.is_some());
    assert!(completed.finished_at.unwrap() >= completed.created_at);

    // `cancelled` está expuesto para uso del operador.
    store.update_run_status("run-t", RunStatus::Cancelled, None).expect("cancelled");
    assert_eq!(store.get_run("run-t").unwrap().unwrap().status, RunStatus::Cancelled);

    match store.update_run_status("run-missing", RunStatus::Failed, None) {
        Err(StoreError::RunNotFound(_)) => {}
        other => panic!("expected RunNotFound, got {other:?}"),
    }
}

#[test]
fn target_stage_follows_resume() {
    let (_dir, store) = store();
    store.create_run(new_run("run-resume")).expect("create");
    store.update_target_stage("run-resume", "7").expect("update");
    assert_eq!(store.get_run("run-resume").unwrap().unwrap().target_stage, "7");
}
