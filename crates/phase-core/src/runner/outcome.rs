//! Resultado de una invocación del runner.

use serde::{Deserialize, Serialize};

use crate::model::GateResults;
use crate::store::RunStatus;

/// Estado de la invocación (no del run): o se alcanzó el target, o el
/// pipeline se detuvo en una etapa fallida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Completed,
    Failed,
}

/// Reporte de una etapa ejecutada en esta invocación.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub stage: String,
    pub attempt: i32,
    pub duration_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate_results: Option<GateResults>,
}

/// Resultado completo de `Runner::execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub run_id: String,
    pub status: OutcomeStatus,
    /// Estado persistido del run al terminar la invocación.
    pub run_status: RunStatus,
    /// Etapas ejecutadas en esta invocación, en orden. Vacío cuando no había
    /// nada pendiente hasta el target.
    pub stages: Vec<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
