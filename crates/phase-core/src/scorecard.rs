//! Vistas de sólo lectura sobre un run: etapas completadas, próxima
//! pendiente y resumen por etapa. Consumidas por el comando `status` del CLI.

use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::stage::{self, STAGE_ORDER};
use crate::store::{AttemptStatus, PipelineStore, RunRecord};

/// Fila del scorecard para una etapa.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageScore {
    pub stage: String,
    pub label: String,
    pub kind: String,
    /// Estado del último intento; `None` si la etapa nunca corrió.
    pub status: Option<AttemptStatus>,
    pub attempts: i32,
    pub duration_ms: Option<i64>,
}

/// Resumen completo de un run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunScorecard {
    pub run: RunRecord,
    pub completed: Vec<String>,
    pub next_pending: Option<String>,
    pub stages: Vec<StageScore>,
}

/// Construye el scorecard de un run; `None` si el run no existe.
pub fn build_scorecard<S>(store: &S, run_id: &str) -> Result<Option<RunScorecard>, StoreError>
    where S: PipelineStore + ?Sized
{
    let Some(run) = store.get_run(run_id)? else {
        return Ok(None);
    };

    let attempts = store.stage_attempts(run_id, None)?;
    let mut stages = Vec::with_capacity(STAGE_ORDER.len());
    let mut completed = Vec::new();

    for stage_id in STAGE_ORDER {
        let of_stage: Vec<_> = attempts.iter().filter(|a| a.stage == stage_id).collect();
        let latest = of_stage.iter().max_by_key(|a| a.attempt);
        if of_stage.iter().any(|a| a.status == AttemptStatus::Completed) {
            completed.push(stage_id.to_string());
        }
        let definition = stage::definition(stage_id);
        stages.push(StageScore { stage: stage_id.to_string(),
                                 label: definition.map(|d| d.label.to_string()).unwrap_or_default(),
                                 kind: definition.map(|d| d.kind.as_str().to_string()).unwrap_or_default(),
                                 status: latest.map(|a| a.status),
                                 attempts: of_stage.len() as i32,
                                 duration_ms: latest.and_then(|a| a.duration_ms) });
    }

    let next_pending = STAGE_ORDER.iter()
                                  .find(|s| !completed.iter().any(|c| c == *s))
                                  .map(|s| s.to_string());

    Ok(Some(RunScorecard { run, completed, next_pending, stages }))
}
