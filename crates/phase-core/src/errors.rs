//! Taxonomía de errores del core.
//!
//! Propagación:
//! - Los fallos de handler y del gate post-etapa NO atraviesan el límite del
//!   runner: se registran como intento `failed` + `error.json` y el run queda
//!   `failed`.
//! - `InvalidArgument`, `LockHeld` y `DuplicateRunId` (vía `StoreError`) se
//!   devuelven al caller sin mutar estado.
//! - `StoreError` / `ArtifactError` durante la fase de registro de una etapa
//!   exitosa se re-propagan: la etapa no puede marcarse completada de forma
//!   segura.

use serde_json::Value;
use thiserror::Error;

/// Errores semánticos del store de metadatos.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("run `{0}` already exists")]
    DuplicateRunId(String),
    #[error("run `{0}` not found")]
    RunNotFound(String),
    #[error("attempt {attempt} of stage {stage} in run `{run_id}` is not running")]
    AttemptNotRunning { run_id: String, stage: String, attempt: i32 },
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errores del árbol de artefactos en disco.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("filesystem error at `{path}`: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("artifact `{0}` not found")]
    NotFound(String),
}

/// Error devuelto por un handler de etapa. El runner lo serializa a
/// `error.json` y termina el run (fail-fast); nunca se re-lanza.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), details: None }
    }

    pub fn with_details(message: impl Into<String>, details: Value) -> Self {
        Self { message: message.into(), details: Some(details) }
    }
}

/// Errores que el runner devuelve al caller.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("run `{run_id}` is locked by {holder}")]
    LockHeld { run_id: String, holder: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}
