//! Registros del modelo de datos (runs, intentos, artefactos, eventos, locks).
//!
//! Los timestamps viven como `DateTime<Utc>` en memoria; el backend durable
//! los persiste como texto ISO-8601 UTC de ancho fijo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::DEFAULT_LIST_LIMIT;

/// Estados de un run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RunStatus::Pending),
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            "cancelled" => Some(RunStatus::Cancelled),
            _ => None,
        }
    }

    /// Un estado terminal implica `finished_at` no nulo.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled)
    }
}

/// Estados de un intento de etapa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Running,
    Completed,
    Failed,
    /// Reservado para reviews sin acción; el runner no lo produce hoy.
    Skipped,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Running => "running",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Failed => "failed",
            AttemptStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(AttemptStatus::Running),
            "completed" => Some(AttemptStatus::Completed),
            "failed" => Some(AttemptStatus::Failed),
            "skipped" => Some(AttemptStatus::Skipped),
            _ => None,
        }
    }
}

/// Tipos de evento del log append-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Info,
    Gate,
    Error,
    Metric,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Info => "info",
            EventKind::Gate => "gate",
            EventKind::Error => "error",
            EventKind::Metric => "metric",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(EventKind::Info),
            "gate" => Some(EventKind::Gate),
            "error" => Some(EventKind::Error),
            "metric" => Some(EventKind::Metric),
            _ => None,
        }
    }
}

/// Entidad run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: String,
    pub industry: String,
    pub country: String,
    pub client_context: Option<String>,
    pub target_stage: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Datos para crear un run.
#[derive(Debug, Clone, Default)]
pub struct NewRun {
    /// Id provisto por el operador; si es `None` se genera uno.
    pub id: Option<String>,
    pub industry: String,
    pub country: String,
    pub client_context: Option<String>,
    pub target_stage: Option<String>,
}

/// Intento de etapa dentro de un run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub id: i64,
    pub run_id: String,
    pub stage: String,
    /// 1-indexado, contiguo dentro de `(run_id, stage)`.
    pub attempt: i32,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub error: Option<String>,
}

/// Artefacto registrado para un intento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    pub run_id: String,
    pub stage: String,
    pub attempt: i32,
    pub filename: String,
    /// Ruta relativa a la base configurada de artefactos.
    pub path: String,
    pub size_bytes: i64,
    pub content_type: String,
}

/// Evento del log de un run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: i64,
    pub run_id: String,
    pub stage: Option<String>,
    pub attempt: Option<i32>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    pub data: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Evento a insertar.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub run_id: String,
    pub stage: Option<String>,
    pub attempt: Option<i32>,
    pub kind: EventKind,
    pub message: String,
    pub data: Option<Value>,
}

/// Lock vigente de un run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecord {
    pub run_id: String,
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    pub heartbeat_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Resultado de `LockManager::acquire`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAcquire {
    /// El lock es nuestro; `holder` es la identidad registrada.
    Acquired { holder: String },
    /// Otro worker lo sostiene.
    Held { holder: String },
}

/// Filtro de `list_runs`.
#[derive(Debug, Clone)]
pub struct RunFilter {
    pub status: Option<RunStatus>,
    pub limit: i64,
}

impl Default for RunFilter {
    fn default() -> Self {
        Self { status: None, limit: DEFAULT_LIST_LIMIT }
    }
}
