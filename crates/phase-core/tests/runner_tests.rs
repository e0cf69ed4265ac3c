//! Tests del runner contra los backends in-memory: camino feliz, fail-fast,
//! recuperación, lock y gate de template.

use std::sync::Mutex;

use phase_core::artifact::{artifact_path, ArtifactStore};
use phase_core::model::{DeckInspection, GateResults, ShapeInspection, SlideInspection, StageContext, StageResult};
use phase_core::runner::TEMPLATE_STRICT_FAILURE;
use phase_core::stage::STAGE_ORDER;
use phase_core::store::LockManager;
use phase_core::{AttemptStatus, HandlerError, HandlerRegistry, InMemoryArtifactStore, InMemoryPipelineStore,
                 LockAcquire, OutcomeStatus, PipelineStore, RunRequest, Runner, RunnerError, RunnerHooks, RunStatus};
use serde_json::{json, Value};

fn ok_handler(stage_id: &'static str) -> impl Fn(&StageContext) -> Result<StageResult, HandlerError> {
    move |ctx: &StageContext| {
        Ok(StageResult::with_data(json!({
            "stage": stage_id,
            "country": ctx.scope.country,
        })))
    }
}

/// Registro con handlers stub para todas las etapas.
fn full_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for (idx, stage_id) in STAGE_ORDER.iter().enumerate() {
        let needs: Vec<&str> = if idx == 0 { vec![] } else { vec![STAGE_ORDER[idx - 1]] };
        registry.register(stage_id, ok_handler(stage_id), &needs).expect("register");
    }
    registry
}

fn request(run_id: &str, through: &str) -> RunRequest {
    let mut req = RunRequest::new(run_id, through);
    req.country = Some("Vietnam".to_string());
    req.industry = Some("Energy Services".to_string());
    req
}

#[test]
fn happy_path_through_stage_three() {
    let store = InMemoryPipelineStore::new();
    let artifacts = InMemoryArtifactStore::new();
    let registry = full_registry();
    let runner = Runner::new(&store, &artifacts, &registry);

    let outcome = runner.execute(&request("run-vn-001", "3")).expect("runner");
    assert_eq!(outcome.status, OutcomeStatus::Completed);
    assert_eq!(outcome.run_status, RunStatus::Pending); // `3` no es la última etapa
    let ran: Vec<&str> = outcome.stages.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(ran, vec!["2", "2a", "3"]);

    // Todos los intentos completados, con output.json presente.
    for stage_id in ["2", "2a", "3"] {
        let latest = store.latest_attempt("run-vn-001", stage_id).unwrap().expect("attempt");
        assert_eq!(latest.attempt, 1);
        assert_eq!(latest.status, AttemptStatus::Completed);
        let path = artifact_path("run-vn-001", stage_id, 1, "output.json");
        assert!(artifacts.exists(&path).unwrap(), "missing {path}");
    }

    let scorecard = phase_core::build_scorecard(&store, "run-vn-001").unwrap().expect("run");
    assert_eq!(scorecard.next_pending.as_deref(), Some("3a"));
}

#[test]
fn reinvoking_at_reached_target_is_a_noop() {
    let store = InMemoryPipelineStore::new();
    let artifacts = InMemoryArtifactStore::new();
    let registry = full_registry();
    let runner = Runner::new(&store, &artifacts, &registry);

    runner.execute(&request("run-noop", "3")).expect("first invocation");
    let before = store.stage_attempts("run-noop", None).unwrap().len();

    let outcome = runner.execute(&request("run-noop", "3")).expect("second invocation");
    assert_eq!(outcome.status, OutcomeStatus::Completed);
    assert!(outcome.stages.is_empty());
    assert_eq!(store.stage_attempts("run-noop", None).unwrap().len(), before);
}

#[test]
fn new_run_requires_scope() {
    let store = InMemoryPipelineStore::new();
    let artifacts = InMemoryArtifactStore::new();
    let registry = full_registry();
    let runner = Runner::new(&store, &artifacts, &registry);

    let err = runner.execute(&RunRequest::new("run-bare", "3")).unwrap_err();
    assert!(matches!(err, RunnerError::InvalidArgument(_)));
    assert!(store.get_run("run-bare").unwrap().is_none(), "no state must be written");
}

#[test]
fn unknown_through_stage_is_rejected() {
    let store = InMemoryPipelineStore::new();
    let artifacts = InMemoryArtifactStore::new();
    let registry = full_registry();
    let runner = Runner::new(&store, &artifacts, &registry);

    let err = runner.execute(&request("run-x", "17")).unwrap_err();
    assert!(matches!(err, RunnerError::InvalidArgument(_)));
}

#[test]
fn fail_fast_preserves_diagnosis() {
    let store = InMemoryPipelineStore::new();
    let artifacts = InMemoryArtifactStore::new();
    let mut registry = full_registry();
    registry.register("3",
                      |_ctx: &StageContext| -> Result<StageResult, HandlerError> {
                          Err(HandlerError::new("synthesis failed"))
                      },
                      &["2a"])
            .expect("register");
    let runner = Runner::new(&store, &artifacts, &registry);

    let outcome = runner.execute(&request("run-vn-001", "3")).expect("runner returns an outcome");
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.failed_stage.as_deref(), Some("3"));
    assert_eq!(outcome.error.as_deref(), Some("synthesis failed"));

    // 2 y 2a completaron; 3 falló en el intento 1.
    assert_eq!(store.latest_attempt("run-vn-001", "2").unwrap().unwrap().status, AttemptStatus::Completed);
    assert_eq!(store.latest_attempt("run-vn-001", "2a").unwrap().unwrap().status, AttemptStatus::Completed);
    let failed = store.latest_attempt("run-vn-001", "3").unwrap().unwrap();
    assert_eq!(failed.attempt, 1);
    assert_eq!(failed.status, AttemptStatus::Failed);

    // error.json con el mensaje, y ninguna etapa posterior arrancó.
    let error_path = artifact_path("run-vn-001", "3", 1, "error.json");
    let payload: Value = serde_json::from_slice(&artifacts.read(&error_path).unwrap()).unwrap();
    assert_eq!(payload["message"], "synthesis failed");
    for stage_id in ["3a", "4", "4a", "5", "6", "6a", "7", "8", "8a", "9"] {
        assert!(store.latest_attempt("run-vn-001", stage_id).unwrap().is_none());
    }

    let run = store.get_run("run-vn-001").unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.finished_at.is_some());
}

#[test]
fn recovery_creates_a_fresh_attempt_and_keeps_the_old_one() {
    let store = InMemoryPipelineStore::new();
    let artifacts = InMemoryArtifactStore::new();

    let mut broken = full_registry();
    broken.register("3",
                    |_ctx: &StageContext| -> Result<StageResult, HandlerError> {
                        Err(HandlerError::new("synthesis failed"))
                    },
                    &["2a"])
          .expect("register");
    Runner::new(&store, &artifacts, &broken).execute(&request("run-rec", "3")).expect("failing invocation");

    // Reintento del operador: mismo run, handler arreglado, target más lejos.
    let fixed = full_registry();
    let outcome = Runner::new(&store, &artifacts, &fixed).execute(&request("run-rec", "5")).expect("retry");
    assert_eq!(outcome.status, OutcomeStatus::Completed);
    let ran: Vec<&str> = outcome.stages.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(ran, vec!["3", "3a", "4", "4a", "5"]);

    let stage3 = store.latest_attempt("run-rec", "3").unwrap().unwrap();
    assert_eq!(stage3.attempt, 2);
    assert_eq!(stage3.status, AttemptStatus::Completed);
    for stage_id in ["3a", "4", "4a", "5"] {
        assert_eq!(store.latest_attempt("run-rec", stage_id).unwrap().unwrap().attempt, 1);
    }

    // Los artefactos del intento fallido quedan intactos para diagnóstico.
    assert!(artifacts.exists(&artifact_path("run-rec", "3", 1, "error.json")).unwrap());
    assert!(artifacts.exists(&artifact_path("run-rec", "3", 2, "output.json")).unwrap());

    // El target registrado sigue al nuevo `through`.
    assert_eq!(store.get_run("run-rec").unwrap().unwrap().target_stage, "5");
}

#[test]
fn lock_held_by_another_worker_refuses_to_start() {
    let store = InMemoryPipelineStore::new();
    let artifacts = InMemoryArtifactStore::new();
    let registry = full_registry();

    // W1 sostiene el lock del run.
    let mut req = request("run-lock", "3");
    store.create_run(phase_core::NewRun { id: Some("run-lock".to_string()),
                                          industry: "Energy Services".to_string(),
                                          country: "Vietnam".to_string(),
                                          client_context: None,
                                          target_stage: Some("3".to_string()) })
         .unwrap();
    let acquired = store.acquire("run-lock", Some("W1"), 60_000).unwrap();
    assert!(matches!(acquired, LockAcquire::Acquired { .. }));

    req.holder = Some("W2".to_string());
    let runner = Runner::new(&store, &artifacts, &registry);
    match runner.execute(&req).unwrap_err() {
        RunnerError::LockHeld { holder, .. } => assert_eq!(holder, "W1"),
        other => panic!("expected LockHeld, got {other:?}"),
    }
    assert!(store.stage_attempts("run-lock", None).unwrap().is_empty(), "store state unchanged");

    // Tras liberar W1, W2 puede correr.
    assert!(store.release("run-lock", "W1").unwrap());
    let outcome = runner.execute(&req).expect("after release");
    assert_eq!(outcome.status, OutcomeStatus::Completed);
}

#[test]
fn strict_template_gate_blocks_the_deck_stage() {
    let store = InMemoryPipelineStore::new();
    let artifacts = InMemoryArtifactStore::new();
    let mut registry = full_registry();
    // Handler del deck que reporta un relleno fuera de paleta.
    registry.register("7",
                      |_ctx: &StageContext| -> Result<StageResult, HandlerError> {
                          let inspection = DeckInspection {
                              slides: vec![SlideInspection {
                                  key: "slide-04-sizing".to_string(),
                                  shapes: vec![ShapeInspection { name: "title".to_string(),
                                                                 x: 0.5,
                                                                 y: 0.4,
                                                                 expected_x: Some(0.5),
                                                                 expected_y: Some(0.4),
                                                                 fill_color: Some("#FF00AA".to_string()),
                                                                 font: Some("Calibri".to_string()) }],
                                  tables: vec![],
                              }],
                          };
                          Ok(StageResult::with_data(json!({ "deck": true }))
                              .binary("deck.pptx", vec![0x50, 0x4b])
                              .inspection(inspection))
                      },
                      &["6a"])
            .expect("register");
    let runner = Runner::new(&store, &artifacts, &registry);

    let mut req = request("run-gate", "7");
    req.strict_template = true;
    let outcome = runner.execute(&req).expect("outcome");
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.failed_stage.as_deref(), Some("7"));

    let failed = store.latest_attempt("run-gate", "7").unwrap().unwrap();
    assert_eq!(failed.status, AttemptStatus::Failed);

    let payload: Value =
        serde_json::from_slice(&artifacts.read(&artifact_path("run-gate", "7", 1, "error.json")).unwrap()).unwrap();
    assert_eq!(payload["code"], TEMPLATE_STRICT_FAILURE);
    assert_eq!(payload["details"]["blockingSlideKeys"][0], "slide-04-sizing");
    assert_eq!(payload["details"]["violations"][0]["rule"], "palette");

    // La etapa 8 nunca arrancó.
    assert!(store.latest_attempt("run-gate", "8").unwrap().is_none());
}

#[test]
fn compliant_deck_passes_the_strict_gate() {
    let store = InMemoryPipelineStore::new();
    let artifacts = InMemoryArtifactStore::new();
    let mut registry = full_registry();
    registry.register("7",
                      |_ctx: &StageContext| -> Result<StageResult, HandlerError> {
                          let inspection = DeckInspection {
                              slides: vec![SlideInspection {
                                  key: "slide-01-title".to_string(),
                                  shapes: vec![ShapeInspection { name: "title".to_string(),
                                                                 x: 0.5,
                                                                 y: 0.42,
                                                                 expected_x: Some(0.5),
                                                                 expected_y: Some(0.4),
                                                                 fill_color: Some("#1F3864".to_string()),
                                                                 font: Some("Calibri".to_string()) }],
                                  tables: vec![],
                              }],
                          };
                          Ok(StageResult::with_data(json!({ "deck": true }))
                              .binary("deck.pptx", vec![0x50, 0x4b])
                              .inspection(inspection)
                              .gate(GateResults::pass(1.0)))
                      },
                      &["6a"])
            .expect("register");
    let runner = Runner::new(&store, &artifacts, &registry);

    let mut req = request("run-gate-ok", "7");
    req.strict_template = true;
    let outcome = runner.execute(&req).expect("outcome");
    assert_eq!(outcome.status, OutcomeStatus::Completed);
    assert!(artifacts.exists(&artifact_path("run-gate-ok", "7", 1, "deck.pptx")).unwrap());
}

struct RecordingHooks {
    calls: Mutex<Vec<String>>,
}

impl RunnerHooks for RecordingHooks {
    fn on_stage_start(&self, payload: &phase_core::HookPayload) -> Result<(), String> {
        self.calls.lock().unwrap().push(format!("start:{}", payload.stage));
        Ok(())
    }

    fn on_stage_complete(&self, payload: &phase_core::HookPayload) -> Result<(), String> {
        self.calls.lock().unwrap().push(format!("complete:{}", payload.stage));
        // Un hook que falla no debe afectar la etapa.
        Err("hook exploded".to_string())
    }
}

#[test]
fn hook_errors_are_swallowed() {
    let store = InMemoryPipelineStore::new();
    let artifacts = InMemoryArtifactStore::new();
    let registry = full_registry();
    let hooks = RecordingHooks { calls: Mutex::new(Vec::new()) };
    let runner = Runner::new(&store, &artifacts, &registry).with_hooks(&hooks);

    let outcome = runner.execute(&request("run-hooks", "2a")).expect("runner");
    assert_eq!(outcome.status, OutcomeStatus::Completed);

    let calls = hooks.calls.lock().unwrap();
    assert_eq!(calls.as_slice(),
               ["start:2", "complete:2", "start:2a", "complete:2a"]);
}

#[test]
fn prior_outputs_flow_into_later_stages() {
    let store = InMemoryPipelineStore::new();
    let artifacts = InMemoryArtifactStore::new();
    let mut registry = full_registry();
    // La etapa 3 verifica que el output de 2a llegue en el contexto.
    registry.register("3",
                      |ctx: &StageContext| -> Result<StageResult, HandlerError> {
                          let prev = ctx.prior
                                        .output("2a")
                                        .ok_or_else(|| HandlerError::new("missing 2a output"))?;
                          Ok(StageResult::with_data(json!({ "synthesized_from": prev["stage"] })))
                      },
                      &["2a"])
            .expect("register");
    let runner = Runner::new(&store, &artifacts, &registry);

    // Primera invocación corta: deja 2 y 2a completadas.
    runner.execute(&request("run-ctx", "2a")).expect("first");
    // La segunda rehidrata 2a desde disco y corre 3.
    let outcome = runner.execute(&request("run-ctx", "3")).expect("second");
    assert_eq!(outcome.status, OutcomeStatus::Completed);

    let output: Value =
        serde_json::from_slice(&artifacts.read(&artifact_path("run-ctx", "3", 1, "output.json")).unwrap()).unwrap();
    assert_eq!(output["synthesized_from"], "2a");
}
