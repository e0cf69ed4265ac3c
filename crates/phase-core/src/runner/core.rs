//! Bucle de ejecución por etapa.
//!
//! Secuencia por invocación:
//! 1. Validar `through` y el alcance del run (uno nuevo exige country e
//!    industry; uno reanudado usa el alcance almacenado).
//! 2. Adquirir el lock del run; rechazar si otro holder lo sostiene.
//! 3. Calcular el slice `[next ..= through]` a partir de las etapas con algún
//!    intento completado.
//! 4. Por etapa: heartbeat, intento nuevo, handler, gate post-etapa si
//!    corresponde, artefactos + estado en el store, evento. Ante el primer
//!    fallo, registrar y cortar (fail-fast).
//! 5. Estado terminal: todas las etapas completas -> `completed`; corte sin
//!    fallo -> `pending`; fallo -> `failed`. El lock se libera en todos los
//!    caminos de salida.

use std::collections::BTreeSet;
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use log::{debug, error, warn};
use serde_json::{json, Value};

use crate::artifact::{artifact_path, write_error_artifact, write_stage_artifacts, ArtifactStore, StageArtifactBundle};
use crate::constants::{DECK_PPTX, DEFAULT_LOCK_TTL_MS, OUTPUT_JSON, TRACKER_VERSION};
use crate::errors::RunnerError;
use crate::ids::generate_worker_id;
use crate::model::{ErrorArtifact, PriorOutputs, RunOptions, RunScope, StageContext, StageResult};
use crate::registry::HandlerRegistry;
use crate::runner::gate::{evaluate_template, TemplateContract, TemplateGateReport, TEMPLATE_STRICT_FAILURE};
use crate::runner::hooks::{HookPayload, RunnerHooks};
use crate::runner::outcome::{OutcomeStatus, RunOutcome, StageReport};
use crate::scrub::scrub;
use crate::stage::{self, DECK_STAGE, STAGE_ORDER};
use crate::store::{AttemptStatus, EventKind, LockAcquire, LockManager, NewEvent, NewRun, PipelineStore, RunRecord,
                   RunStatus};

/// Configuración del runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub lock_ttl_ms: i64,
    pub template: TemplateContract,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { lock_ttl_ms: DEFAULT_LOCK_TTL_MS, template: TemplateContract::default() }
    }
}

/// Petición de una invocación del runner.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub run_id: String,
    /// Última etapa a ejecutar en esta invocación.
    pub through: String,
    /// Requeridos sólo para un run nuevo; uno existente usa su alcance.
    pub country: Option<String>,
    pub industry: Option<String>,
    pub client_context: Option<String>,
    pub strict_template: bool,
    /// Identidad del worker para el lock; se genera una si falta.
    pub holder: Option<String>,
}

impl RunRequest {
    pub fn new(run_id: impl Into<String>, through: impl Into<String>) -> Self {
        Self { run_id: run_id.into(),
               through: through.into(),
               country: None,
               industry: None,
               client_context: None,
               strict_template: false,
               holder: None }
    }
}

/// Orquestador de la secuencia de etapas de un run.
pub struct Runner<'a, S, A>
    where S: PipelineStore + LockManager,
          A: ArtifactStore
{
    store: &'a S,
    artifacts: &'a A,
    registry: &'a HandlerRegistry,
    config: RunnerConfig,
    hooks: Option<&'a dyn RunnerHooks>,
}

impl<'a, S, A> Runner<'a, S, A>
    where S: PipelineStore + LockManager,
          A: ArtifactStore
{
    pub fn new(store: &'a S, artifacts: &'a A, registry: &'a HandlerRegistry) -> Self {
        Self { store, artifacts, registry, config: RunnerConfig::default(), hooks: None }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_hooks(mut self, hooks: &'a dyn RunnerHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Ejecuta las etapas pendientes hasta `through` inclusive.
    pub fn execute(&self, req: &RunRequest) -> Result<RunOutcome, RunnerError> {
        if !stage::is_valid(&req.through) {
            return Err(RunnerError::InvalidArgument(format!("unknown stage `{}`", req.through)));
        }

        let run = match self.store.get_run(&req.run_id)? {
            Some(run) => run,
            None => {
                let (country, industry) = match (&req.country, &req.industry) {
                    (Some(c), Some(i)) => (c.clone(), i.clone()),
                    _ => {
                        return Err(RunnerError::InvalidArgument(
                            "a new run requires country and industry".to_string(),
                        ))
                    }
                };
                self.store.create_run(NewRun { id: Some(req.run_id.clone()),
                                               industry,
                                               country,
                                               client_context: req.client_context.clone(),
                                               target_stage: Some(req.through.clone()) })?
            }
        };

        let holder = req.holder.clone().unwrap_or_else(generate_worker_id);
        match self.store.acquire(&run.id, Some(&holder), self.config.lock_ttl_ms)? {
            LockAcquire::Held { holder: current } => {
                return Err(RunnerError::LockHeld { run_id: run.id, holder: current })
            }
            LockAcquire::Acquired { .. } => {}
        }

        let result = self.execute_locked(&run, req, &holder);
        match self.store.release(&run.id, &holder) {
            Ok(false) => warn!("lock for run {} was no longer held by {holder} at release", run.id),
            Ok(true) => {}
            Err(e) => warn!("failed to release lock for run {}: {e}", run.id),
        }
        result
    }

    fn execute_locked(&self, run: &RunRecord, req: &RunRequest, holder: &str) -> Result<RunOutcome, RunnerError> {
        // El target registrado sigue al último `through` pedido.
        if run.target_stage != req.through {
            self.store.update_target_stage(&run.id, &req.through)?;
        }

        let mut completed = self.completed_stages(&run.id)?;
        let through_idx = stage::stage_index(&req.through)
            .ok_or_else(|| RunnerError::InvalidArgument(format!("unknown stage `{}`", req.through)))?;

        let slice: &[&str] = match STAGE_ORDER.iter().copied().find(|s| !completed.contains(*s)) {
            None => return Ok(self.noop_outcome(run)),
            Some(next) if stage::stage_index(next).unwrap_or(usize::MAX) > through_idx => {
                return Ok(self.noop_outcome(run))
            }
            Some(next) => stage::slice_between(next, &req.through).unwrap_or(&[]),
        };

        let missing = self.registry.missing_for(slice);
        if !missing.is_empty() {
            return Err(RunnerError::InvalidArgument(format!("no handler registered for stages: {}",
                                                            missing.join(", "))));
        }

        self.store.update_run_status(&run.id, RunStatus::Running, None)?;

        let scope = RunScope { run_id: run.id.clone(),
                               country: run.country.clone(),
                               industry: run.industry.clone(),
                               client_context: run.client_context.clone() };
        let options = RunOptions { strict_template: req.strict_template };
        let mut prior = self.load_prior(&run.id, &completed, slice)?;
        let mut reports: Vec<StageReport> = Vec::new();

        for stage_id in slice {
            self.heartbeat_or_bail(&run.id, holder)?;

            let attempt = self.store.start_stage_attempt(&run.id, stage_id)?;
            debug!("run {}: stage {stage_id} attempt {attempt} started", run.id);
            self.emit_hook("on_stage_start",
                           &HookPayload { run_id: run.id.clone(),
                                          stage: stage_id.to_string(),
                                          attempt,
                                          data: json!({ "stage": stage_id, "attempt": attempt }) },
                           |h, p| h.on_stage_start(p));

            let started = Instant::now();
            let ctx = StageContext { scope: scope.clone(), prior: prior.clone(), options };
            let handler = match self.registry.handler(stage_id) {
                Some(h) => h,
                None => {
                    return Err(RunnerError::InvalidArgument(format!("no handler registered for stage `{stage_id}`")))
                }
            };

            match handler.run(&ctx) {
                Ok(result) => {
                    let duration_ms = started.elapsed().as_millis() as i64;

                    if options.strict_template && *stage_id == DECK_STAGE {
                        if let Some(inspection) = &result.inspection {
                            let report = evaluate_template(&self.config.template, inspection);
                            if !report.passed {
                                return self.fail_stage(run, stage_id, attempt, &gate_error(&report), reports);
                            }
                            self.store.append_event(NewEvent { run_id: run.id.clone(),
                                                               stage: Some(stage_id.to_string()),
                                                               attempt: Some(attempt),
                                                               kind: EventKind::Gate,
                                                               message: "template gate passed".to_string(),
                                                               data: serde_json::to_value(&report).ok() })?;
                        }
                    }

                    self.record_success(run, stage_id, attempt, duration_ms, &result)?;

                    // El contexto entre etapas lleva el dato SIN sanear.
                    prior.insert(stage_id, result.data.clone());
                    if let Some(bytes) = result.binaries.get(DECK_PPTX) {
                        prior.set_deck(bytes.clone());
                    }

                    self.emit_hook("on_stage_complete",
                                   &HookPayload { run_id: run.id.clone(),
                                                  stage: stage_id.to_string(),
                                                  attempt,
                                                  data: scrub(&json!({
                                                            "durationMs": duration_ms,
                                                            "gateResults": &result.gate_results,
                                                        })) },
                                   |h, p| h.on_stage_complete(p));

                    completed.insert(stage_id.to_string());
                    reports.push(StageReport { stage: stage_id.to_string(),
                                               attempt,
                                               duration_ms,
                                               gate_results: result.gate_results.clone() });
                }
                Err(err) => {
                    return self.fail_stage(run, stage_id, attempt, &ErrorArtifact::from_handler(&err), reports)
                }
            }
        }

        let run_status = if STAGE_ORDER.iter().all(|s| completed.contains(*s)) {
            RunStatus::Completed
        } else {
            RunStatus::Pending
        };
        self.store.update_run_status(&run.id, run_status, None)?;

        Ok(RunOutcome { run_id: run.id.clone(),
                        status: OutcomeStatus::Completed,
                        run_status,
                        stages: reports,
                        failed_stage: None,
                        error: None })
    }

    fn noop_outcome(&self, run: &RunRecord) -> RunOutcome {
        RunOutcome { run_id: run.id.clone(),
                     status: OutcomeStatus::Completed,
                     run_status: run.status,
                     stages: Vec::new(),
                     failed_stage: None,
                     error: None }
    }

    fn completed_stages(&self, run_id: &str) -> Result<BTreeSet<String>, RunnerError> {
        let attempts = self.store.stage_attempts(run_id, None)?;
        Ok(attempts.into_iter()
                   .filter(|a| a.status == AttemptStatus::Completed)
                   .map(|a| a.stage)
                   .collect())
    }

    /// Hidrata los outputs previos que el slice necesita, desde el último
    /// intento completado de cada etapa. Un `output.json` ausente o con forma
    /// inválida se trata como contexto faltante (se loguea y se omite).
    fn load_prior(&self,
                  run_id: &str,
                  completed: &BTreeSet<String>,
                  slice: &[&str])
                  -> Result<PriorOutputs, RunnerError> {
        let mut needed: BTreeSet<&str> = BTreeSet::new();
        for stage_id in slice {
            for need in self.registry.context_needs(stage_id) {
                needed.insert(need.as_str());
            }
        }

        let mut prior = PriorOutputs::new();
        for stage_id in needed {
            if !completed.contains(stage_id) {
                continue;
            }
            let Some(attempt) = self.store.latest_completed_attempt(run_id, stage_id)? else {
                continue;
            };
            let path = artifact_path(run_id, stage_id, attempt.attempt, OUTPUT_JSON);
            match self.artifacts.read(&path) {
                Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                    Ok(value) => prior.insert(stage_id, value),
                    Err(e) => warn!("malformed output.json for stage {stage_id} of run {run_id}: {e}"),
                },
                Err(e) => warn!("missing output.json for stage {stage_id} of run {run_id}: {e}"),
            }
            if stage_id == DECK_STAGE {
                let deck_path = artifact_path(run_id, stage_id, attempt.attempt, DECK_PPTX);
                if let Ok(bytes) = self.artifacts.read(&deck_path) {
                    prior.set_deck(bytes);
                }
            }
        }
        Ok(prior)
    }

    fn record_success(&self,
                      run: &RunRecord,
                      stage_id: &str,
                      attempt: i32,
                      duration_ms: i64,
                      result: &StageResult)
                      -> Result<(), RunnerError> {
        let scrubbed = scrub(&result.data);
        let meta = json!({
            "stage": stage_id,
            "attempt": attempt,
            "durationMs": duration_ms,
            "gateResults": &result.gate_results,
            "completedAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "trackerVersion": TRACKER_VERSION,
        });
        let events_ndjson = if result.events.is_empty() {
            None
        } else {
            let lines: Vec<String> = result.events
                                           .iter()
                                           .filter_map(|e| serde_json::to_string(e).ok())
                                           .collect();
            Some(format!("{}\n", lines.join("\n")))
        };
        let bundle = StageArtifactBundle { output: Some(&scrubbed),
                                           output_md: result.summary_md.as_deref(),
                                           meta: Some(&meta),
                                           events_ndjson: events_ndjson.as_deref(),
                                           binaries: if result.binaries.is_empty() {
                                               None
                                           } else {
                                               Some(&result.binaries)
                                           } };
        write_stage_artifacts(self.artifacts, self.store, &run.id, stage_id, attempt, &bundle)?;

        self.store.finish_stage_attempt(&run.id, stage_id, attempt)?;

        for ev in &result.events {
            self.store.append_event(NewEvent { run_id: run.id.clone(),
                                               stage: Some(stage_id.to_string()),
                                               attempt: Some(attempt),
                                               kind: ev.kind,
                                               message: ev.message.clone(),
                                               data: ev.data.as_ref().map(scrub) })?;
        }
        self.store.append_event(NewEvent { run_id: run.id.clone(),
                                           stage: Some(stage_id.to_string()),
                                           attempt: Some(attempt),
                                           kind: EventKind::Info,
                                           message: format!("stage `{stage_id}` completed in {duration_ms}ms"),
                                           data: Some(json!({
                                               "durationMs": duration_ms,
                                               "gateResults": &result.gate_results,
                                           })) })?;
        Ok(())
    }

    /// Camino de fallo compartido por handler y gate: `error.json`, intento
    /// `failed`, evento `error`, run `failed`, y corte del pipeline.
    fn fail_stage(&self,
                  run: &RunRecord,
                  stage_id: &str,
                  attempt: i32,
                  artifact: &ErrorArtifact,
                  reports: Vec<StageReport>)
                  -> Result<RunOutcome, RunnerError> {
        error!("run {}: stage {stage_id} failed: {}", run.id, artifact.message);

        write_error_artifact(self.artifacts, self.store, &run.id, stage_id, attempt, artifact)?;
        self.store.fail_stage_attempt(&run.id, stage_id, attempt, &artifact.message)?;

        let payload = serde_json::to_value(artifact).unwrap_or(Value::Null);
        self.store.append_event(NewEvent { run_id: run.id.clone(),
                                           stage: Some(stage_id.to_string()),
                                           attempt: Some(attempt),
                                           kind: EventKind::Error,
                                           message: format!("stage `{stage_id}` failed: {}", artifact.message),
                                           data: Some(payload.clone()) })?;
        self.store.update_run_status(&run.id, RunStatus::Failed, Some(&payload.to_string()))?;

        self.emit_hook("on_stage_fail",
                       &HookPayload { run_id: run.id.clone(),
                                      stage: stage_id.to_string(),
                                      attempt,
                                      data: scrub(&payload) },
                       |h, p| h.on_stage_fail(p));

        Ok(RunOutcome { run_id: run.id.clone(),
                        status: OutcomeStatus::Failed,
                        run_status: RunStatus::Failed,
                        stages: reports,
                        failed_stage: Some(stage_id.to_string()),
                        error: Some(artifact.message.clone()) })
    }

    fn heartbeat_or_bail(&self, run_id: &str, holder: &str) -> Result<(), RunnerError> {
        if self.store.heartbeat(run_id, holder, self.config.lock_ttl_ms)? {
            return Ok(());
        }
        let current = self.store
                          .is_locked(run_id)?
                          .map(|l| l.holder)
                          .unwrap_or_else(|| "unknown".to_string());
        Err(RunnerError::LockHeld { run_id: run_id.to_string(), holder: current })
    }

    fn emit_hook<F>(&self, name: &str, payload: &HookPayload, call: F)
        where F: Fn(&dyn RunnerHooks, &HookPayload) -> Result<(), String>
    {
        if let Some(hooks) = self.hooks {
            if let Err(e) = call(hooks, payload) {
                warn!("hook {name} failed (ignored): {e}");
            }
        }
    }
}

fn gate_error(report: &TemplateGateReport) -> ErrorArtifact {
    ErrorArtifact { name: "PostStageGateFailure".to_string(),
                    message: format!("template gate blocked {} slide(s)", report.blocking_slide_keys.len()),
                    stack: None,
                    code: Some(TEMPLATE_STRICT_FAILURE.to_string()),
                    details: serde_json::to_value(report).ok() }
}
