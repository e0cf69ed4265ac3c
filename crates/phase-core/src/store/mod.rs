//! Traits del store de metadatos y del lock por run.
//!
//! El core define los contratos; `phase-persistence` provee la implementación
//! SQLite y este módulo incluye backends in-memory con paridad 1:1 para tests
//! del runner.
//!
//! Contratos relevantes:
//! - Toda escritura multi-fila del backend durable debe ser transaccional.
//! - La contención sobre un mismo `run_id` se resuelve con el lock, no con el
//!   store.

mod memory;
mod types;

pub use memory::{InMemoryArtifactStore, InMemoryPipelineStore};
pub use types::{AttemptRecord, AttemptStatus, ArtifactRecord, EventKind, EventRecord, LockAcquire, LockRecord,
                NewEvent, NewRun, RunFilter, RunRecord, RunStatus};

use crate::errors::StoreError;

/// Repositorios de runs, intentos de etapa, artefactos y eventos.
pub trait PipelineStore: Send + Sync {
    /// Crea un run. Falla con `DuplicateRunId` si el id ya existe; genera un
    /// id `run-<base36>-<hex>` cuando `new.id` es `None`.
    fn create_run(&self, new: NewRun) -> Result<RunRecord, StoreError>;

    fn get_run(&self, id: &str) -> Result<Option<RunRecord>, StoreError>;

    /// Runs ordenados por `created_at` descendente.
    fn list_runs(&self, filter: &RunFilter) -> Result<Vec<RunRecord>, StoreError>;

    /// Actualiza el estado; fija `updated_at` siempre y `finished_at` sólo si
    /// el estado es terminal.
    fn update_run_status(&self, id: &str, status: RunStatus, error: Option<&str>) -> Result<(), StoreError>;

    /// El target se actualiza al reanudar con un nuevo `--through`.
    fn update_target_stage(&self, id: &str, target_stage: &str) -> Result<(), StoreError>;

    /// Nuevo intento `max(existentes) + 1` con `status = running`.
    fn start_stage_attempt(&self, run_id: &str, stage: &str) -> Result<i32, StoreError>;

    /// Transición `running -> completed`; calcula `duration_ms`.
    fn finish_stage_attempt(&self, run_id: &str, stage: &str, attempt: i32) -> Result<(), StoreError>;

    /// Transición `running -> failed`; calcula `duration_ms`.
    fn fail_stage_attempt(&self, run_id: &str, stage: &str, attempt: i32, error: &str) -> Result<(), StoreError>;

    /// Intentos de un run, opcionalmente filtrados por etapa, en orden de
    /// inserción.
    fn stage_attempts(&self, run_id: &str, stage: Option<&str>) -> Result<Vec<AttemptRecord>, StoreError>;

    fn latest_attempt(&self, run_id: &str, stage: &str) -> Result<Option<AttemptRecord>, StoreError>;

    /// Último intento con `status = completed` (para hidratar contexto).
    fn latest_completed_attempt(&self, run_id: &str, stage: &str) -> Result<Option<AttemptRecord>, StoreError>;

    /// Upsert por `(run_id, stage, attempt, filename)`.
    fn record_artifact(&self, artifact: &ArtifactRecord) -> Result<(), StoreError>;

    fn artifacts(&self, run_id: &str, stage: Option<&str>) -> Result<Vec<ArtifactRecord>, StoreError>;

    fn append_event(&self, event: NewEvent) -> Result<(), StoreError>;

    fn events(&self, run_id: &str, stage: Option<&str>, kind: Option<EventKind>) -> Result<Vec<EventRecord>, StoreError>;
}

/// Lock cooperativo de escritor único por `run_id`.
///
/// Invariantes:
/// - A lo sumo un lock no expirado por run.
/// - Sólo el holder puede liberar o renovar.
/// - Los locks expirados se recuperan automáticamente en el próximo
///   `acquire` o `is_locked`.
pub trait LockManager: Send + Sync {
    /// Intenta adquirir el lock. Genera `worker-<hex>` si `holder` es `None`.
    fn acquire(&self, run_id: &str, holder: Option<&str>, ttl_ms: i64) -> Result<LockAcquire, StoreError>;

    /// Libera sólo si el holder coincide; devuelve si se eliminó una fila.
    fn release(&self, run_id: &str, holder: &str) -> Result<bool, StoreError>;

    /// Renueva `heartbeat_at`/`expires_at` sólo si el holder coincide.
    fn heartbeat(&self, run_id: &str, holder: &str, ttl_ms: i64) -> Result<bool, StoreError>;

    /// Lock vigente del run (limpia expirados primero).
    fn is_locked(&self, run_id: &str) -> Result<Option<LockRecord>, StoreError>;

    /// Elimina locks expirados; devuelve cuántos.
    fn clean_expired(&self) -> Result<usize, StoreError>;
}
