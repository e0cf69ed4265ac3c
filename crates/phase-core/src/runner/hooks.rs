//! Hooks opcionales del runner.
//!
//! Los payloads llegan ya saneados (ver `scrub`). Un error de hook se loguea
//! y se descarta: nunca falla una etapa.

use serde_json::Value;

/// Payload entregado a cada hook.
#[derive(Debug, Clone)]
pub struct HookPayload {
    pub run_id: String,
    pub stage: String,
    pub attempt: i32,
    pub data: Value,
}

/// Observador de límites de etapa. Implementación por defecto: no-op.
pub trait RunnerHooks: Send + Sync {
    fn on_stage_start(&self, _payload: &HookPayload) -> Result<(), String> {
        Ok(())
    }

    fn on_stage_complete(&self, _payload: &HookPayload) -> Result<(), String> {
        Ok(())
    }

    fn on_stage_fail(&self, _payload: &HookPayload) -> Result<(), String> {
        Ok(())
    }
}
