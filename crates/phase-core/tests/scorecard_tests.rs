//! Vistas de sólo lectura: completadas, próxima pendiente y filas por etapa.

use phase_core::{build_scorecard, AttemptStatus, InMemoryPipelineStore, NewRun, PipelineStore};

fn seeded_store() -> InMemoryPipelineStore {
    let store = InMemoryPipelineStore::new();
    store.create_run(NewRun { id: Some("run-sc".to_string()),
                              industry: "Energy Services".to_string(),
                              country: "Vietnam".to_string(),
                              client_context: None,
                              target_stage: Some("5".to_string()) })
         .expect("run");
    store
}

#[test]
fn missing_run_yields_none() {
    let store = InMemoryPipelineStore::new();
    assert!(build_scorecard(&store, "nope").unwrap().is_none());
}

#[test]
fn fresh_run_has_everything_pending() {
    let store = seeded_store();
    let sc = build_scorecard(&store, "run-sc").unwrap().expect("run exists");
    assert!(sc.completed.is_empty());
    assert_eq!(sc.next_pending.as_deref(), Some("2"));
    assert_eq!(sc.stages.len(), 13);
    assert!(sc.stages.iter().all(|s| s.status.is_none() && s.attempts == 0));
}

#[test]
fn completed_and_failed_attempts_are_reflected() {
    let store = seeded_store();
    let a1 = store.start_stage_attempt("run-sc", "2").unwrap();
    store.finish_stage_attempt("run-sc", "2", a1).unwrap();
    let a2 = store.start_stage_attempt("run-sc", "2a").unwrap();
    store.fail_stage_attempt("run-sc", "2a", a2, "review failed").unwrap();

    let sc = build_scorecard(&store, "run-sc").unwrap().expect("run exists");
    assert_eq!(sc.completed, vec!["2".to_string()]);
    assert_eq!(sc.next_pending.as_deref(), Some("2a"));

    let row2 = sc.stages.iter().find(|s| s.stage == "2").unwrap();
    assert_eq!(row2.status, Some(AttemptStatus::Completed));
    assert_eq!(row2.attempts, 1);
    assert_eq!(row2.label, "Market research");

    let row2a = sc.stages.iter().find(|s| s.stage == "2a").unwrap();
    assert_eq!(row2a.status, Some(AttemptStatus::Failed));

    // Un reintento completado de 2a hace avanzar la próxima pendiente.
    let a3 = store.start_stage_attempt("run-sc", "2a").unwrap();
    assert_eq!(a3, 2);
    store.finish_stage_attempt("run-sc", "2a", a3).unwrap();
    let sc = build_scorecard(&store, "run-sc").unwrap().expect("run exists");
    assert_eq!(sc.next_pending.as_deref(), Some("3"));
}
