//! Backends in-memory con paridad 1:1 respecto al backend durable.
//!
//! Pensados para tests del runner y de los handlers; protegen su estado con
//! un `Mutex` para cumplir los mismos contratos `Send + Sync`.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{Duration, Utc};

use crate::artifact::ArtifactStore;
use crate::errors::{ArtifactError, StoreError};
use crate::ids::{generate_run_id, generate_worker_id};
use crate::store::{ArtifactRecord, AttemptRecord, AttemptStatus, EventKind, EventRecord, LockAcquire, LockRecord,
                   NewEvent, NewRun, PipelineStore, RunFilter, RunRecord, RunStatus};
use crate::store::LockManager;

#[derive(Default)]
struct StoreState {
    runs: BTreeMap<String, RunRecord>,
    attempts: Vec<AttemptRecord>,
    artifacts: BTreeMap<(String, String, i32, String), ArtifactRecord>,
    events: Vec<EventRecord>,
    locks: BTreeMap<String, LockRecord>,
    next_attempt_id: i64,
    next_event_id: i64,
}

/// Store de metadatos en memoria.
#[derive(Default)]
pub struct InMemoryPipelineStore {
    state: Mutex<StoreState>,
}

impl InMemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, StoreState> {
        // Un Mutex envenenado sólo puede venir de un panic previo en tests.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PipelineStore for InMemoryPipelineStore {
    fn create_run(&self, new: NewRun) -> Result<RunRecord, StoreError> {
        let mut st = self.locked();
        let id = new.id.unwrap_or_else(generate_run_id);
        if st.runs.contains_key(&id) {
            return Err(StoreError::DuplicateRunId(id));
        }
        let now = Utc::now();
        let record = RunRecord { id: id.clone(),
                                 industry: new.industry,
                                 country: new.country,
                                 client_context: new.client_context,
                                 target_stage: new.target_stage.unwrap_or_else(|| "9".to_string()),
                                 status: RunStatus::Pending,
                                 created_at: now,
                                 updated_at: now,
                                 finished_at: None,
                                 error: None };
        st.runs.insert(id, record.clone());
        Ok(record)
    }

    fn get_run(&self, id: &str) -> Result<Option<RunRecord>, StoreError> {
        Ok(self.locked().runs.get(id).cloned())
    }

    fn list_runs(&self, filter: &RunFilter) -> Result<Vec<RunRecord>, StoreError> {
        let st = self.locked();
        let mut runs: Vec<RunRecord> = st.runs
                                         .values()
                                         .filter(|r| filter.status.map_or(true, |s| r.status == s))
                                         .cloned()
                                         .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs.truncate(filter.limit.max(0) as usize);
        Ok(runs)
    }

    fn update_run_status(&self, id: &str, status: RunStatus, error: Option<&str>) -> Result<(), StoreError> {
        let mut st = self.locked();
        let run = st.runs.get_mut(id).ok_or_else(|| StoreError::RunNotFound(id.to_string()))?;
        let now = Utc::now();
        run.status = status;
        run.updated_at = now;
        if status.is_terminal() {
            run.finished_at = Some(now);
        }
        if let Some(e) = error {
            run.error = Some(e.to_string());
        }
        Ok(())
    }

    fn update_target_stage(&self, id: &str, target_stage: &str) -> Result<(), StoreError> {
        let mut st = self.locked();
        let run = st.runs.get_mut(id).ok_or_else(|| StoreError::RunNotFound(id.to_string()))?;
        run.target_stage = target_stage.to_string();
        run.updated_at = Utc::now();
        Ok(())
    }

    fn start_stage_attempt(&self, run_id: &str, stage: &str) -> Result<i32, StoreError> {
        let mut st = self.locked();
        if !st.runs.contains_key(run_id) {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }
        let attempt = st.attempts
                        .iter()
                        .filter(|a| a.run_id == run_id && a.stage == stage)
                        .map(|a| a.attempt)
                        .max()
                        .unwrap_or(0)
                      + 1;
        st.next_attempt_id += 1;
        let record = AttemptRecord { id: st.next_attempt_id,
                                     run_id: run_id.to_string(),
                                     stage: stage.to_string(),
                                     attempt,
                                     status: AttemptStatus::Running,
                                     started_at: Utc::now(),
                                     finished_at: None,
                                     duration_ms: None,
                                     error: None };
        st.attempts.push(record);
        Ok(attempt)
    }

    fn finish_stage_attempt(&self, run_id: &str, stage: &str, attempt: i32) -> Result<(), StoreError> {
        self.close_attempt(run_id, stage, attempt, AttemptStatus::Completed, None)
    }

    fn fail_stage_attempt(&self, run_id: &str, stage: &str, attempt: i32, error: &str) -> Result<(), StoreError> {
        self.close_attempt(run_id, stage, attempt, AttemptStatus::Failed, Some(error))
    }

    fn stage_attempts(&self, run_id: &str, stage: Option<&str>) -> Result<Vec<AttemptRecord>, StoreError> {
        let st = self.locked();
        Ok(st.attempts
             .iter()
             .filter(|a| a.run_id == run_id && stage.map_or(true, |s| a.stage == s))
             .cloned()
             .collect())
    }

    fn latest_attempt(&self, run_id: &str, stage: &str) -> Result<Option<AttemptRecord>, StoreError> {
        let st = self.locked();
        Ok(st.attempts
             .iter()
             .filter(|a| a.run_id == run_id && a.stage == stage)
             .max_by_key(|a| a.attempt)
             .cloned())
    }

    fn latest_completed_attempt(&self, run_id: &str, stage: &str) -> Result<Option<AttemptRecord>, StoreError> {
        let st = self.locked();
        Ok(st.attempts
             .iter()
             .filter(|a| a.run_id == run_id && a.stage == stage && a.status == AttemptStatus::Completed)
             .max_by_key(|a| a.attempt)
             .cloned())
    }

    fn record_artifact(&self, artifact: &ArtifactRecord) -> Result<(), StoreError> {
        let mut st = self.locked();
        let key = (artifact.run_id.clone(), artifact.stage.clone(), artifact.attempt, artifact.filename.clone());
        st.artifacts.insert(key, artifact.clone());
        Ok(())
    }

    fn artifacts(&self, run_id: &str, stage: Option<&str>) -> Result<Vec<ArtifactRecord>, StoreError> {
        let st = self.locked();
        Ok(st.artifacts
             .values()
             .filter(|a| a.run_id == run_id && stage.map_or(true, |s| a.stage == s))
             .cloned()
             .collect())
    }

    fn append_event(&self, event: NewEvent) -> Result<(), StoreError> {
        let mut st = self.locked();
        st.next_event_id += 1;
        let record = EventRecord { id: st.next_event_id,
                                   run_id: event.run_id,
                                   stage: event.stage,
                                   attempt: event.attempt,
                                   kind: event.kind,
                                   message: event.message,
                                   data: event.data,
                                   created_at: Utc::now() };
        st.events.push(record);
        Ok(())
    }

    fn events(&self, run_id: &str, stage: Option<&str>, kind: Option<EventKind>) -> Result<Vec<EventRecord>, StoreError> {
        let st = self.locked();
        Ok(st.events
             .iter()
             .filter(|e| {
                 e.run_id == run_id
                 && stage.map_or(true, |s| e.stage.as_deref() == Some(s))
                 && kind.map_or(true, |k| e.kind == k)
             })
             .cloned()
             .collect())
    }
}

impl InMemoryPipelineStore {
    fn close_attempt(&self,
                     run_id: &str,
                     stage: &str,
                     attempt: i32,
                     status: AttemptStatus,
                     error: Option<&str>)
                     -> Result<(), StoreError> {
        let mut st = self.locked();
        let rec = st.attempts
                    .iter_mut()
                    .find(|a| a.run_id == run_id && a.stage == stage && a.attempt == attempt)
                    .ok_or_else(|| StoreError::AttemptNotRunning { run_id: run_id.to_string(),
                                                                   stage: stage.to_string(),
                                                                   attempt })?;
        if rec.status != AttemptStatus::Running {
            return Err(StoreError::AttemptNotRunning { run_id: run_id.to_string(),
                                                       stage: stage.to_string(),
                                                       attempt });
        }
        let now = Utc::now();
        rec.status = status;
        rec.finished_at = Some(now);
        rec.duration_ms = Some((now - rec.started_at).num_milliseconds());
        rec.error = error.map(str::to_string);
        Ok(())
    }
}

impl LockManager for InMemoryPipelineStore {
    fn acquire(&self, run_id: &str, holder: Option<&str>, ttl_ms: i64) -> Result<LockAcquire, StoreError> {
        let mut st = self.locked();
        let now = Utc::now();
        st.locks.retain(|_, l| l.expires_at >= now);
        if let Some(current) = st.locks.get(run_id) {
            return Ok(LockAcquire::Held { holder: current.holder.clone() });
        }
        let holder = holder.map(str::to_string).unwrap_or_else(generate_worker_id);
        let record = LockRecord { run_id: run_id.to_string(),
                                  holder: holder.clone(),
                                  acquired_at: now,
                                  heartbeat_at: now,
                                  expires_at: now + Duration::milliseconds(ttl_ms) };
        st.locks.insert(run_id.to_string(), record);
        Ok(LockAcquire::Acquired { holder })
    }

    fn release(&self, run_id: &str, holder: &str) -> Result<bool, StoreError> {
        let mut st = self.locked();
        match st.locks.get(run_id) {
            Some(l) if l.holder == holder => {
                st.locks.remove(run_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn heartbeat(&self, run_id: &str, holder: &str, ttl_ms: i64) -> Result<bool, StoreError> {
        let mut st = self.locked();
        let now = Utc::now();
        match st.locks.get_mut(run_id) {
            Some(l) if l.holder == holder => {
                l.heartbeat_at = now;
                l.expires_at = now + Duration::milliseconds(ttl_ms);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn is_locked(&self, run_id: &str) -> Result<Option<LockRecord>, StoreError> {
        let mut st = self.locked();
        let now = Utc::now();
        st.locks.retain(|_, l| l.expires_at >= now);
        Ok(st.locks.get(run_id).cloned())
    }

    fn clean_expired(&self) -> Result<usize, StoreError> {
        let mut st = self.locked();
        let now = Utc::now();
        let before = st.locks.len();
        st.locks.retain(|_, l| l.expires_at >= now);
        Ok(before - st.locks.len())
    }
}

/// Árbol de artefactos en memoria, indexado por ruta relativa.
#[derive(Default)]
pub struct InMemoryArtifactStore {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn write_atomic(&self, rel_path: &str, bytes: &[u8]) -> Result<u64, ArtifactError> {
        let mut files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        files.insert(rel_path.to_string(), bytes.to_vec());
        Ok(bytes.len() as u64)
    }

    fn read(&self, rel_path: &str) -> Result<Vec<u8>, ArtifactError> {
        let files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        files.get(rel_path)
             .cloned()
             .ok_or_else(|| ArtifactError::NotFound(rel_path.to_string()))
    }

    fn exists(&self, rel_path: &str) -> Result<bool, ArtifactError> {
        let files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        Ok(files.contains_key(rel_path))
    }
}
