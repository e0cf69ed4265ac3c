//! Handler genérico de etapas review (2a, 3a, 4a, 6a, 8a).
//!
//! Un review recibe el output de su etapa objetivo, lo re-emite (pasada de
//! reparación identidad en el stub) y adjunta `gate_results` con un score
//! determinista derivado del tamaño del payload.

use phase_core::{GateResults, HandlerError, StageContext, StageHandler, StageResult};
use serde_json::json;

pub struct ReviewHandler {
    /// Etapa primaria cuyo output se revisa.
    pub target: &'static str,
    /// Aspecto evaluado, para el mensaje del gate.
    pub aspect: &'static str,
}

impl ReviewHandler {
    pub fn new(target: &'static str, aspect: &'static str) -> Self {
        Self { target, aspect }
    }
}

impl StageHandler for ReviewHandler {
    fn run(&self, ctx: &StageContext) -> Result<StageResult, HandlerError> {
        let reviewed = ctx.prior
                          .output(self.target)
                          .ok_or_else(|| HandlerError::new(format!("missing prior output for stage {}",
                                                                   self.target)))?;

        // Score estable: función del tamaño serializado del payload revisado.
        let serialized_len = reviewed.to_string().len();
        let score = 0.7 + ((serialized_len % 30) as f64) / 100.0;

        let data = json!({
            "reviewedStage": self.target,
            "aspect": self.aspect,
            "revised": reviewed,
            "revisions": [],
        });
        Ok(StageResult::with_data(data).gate(GateResults::pass(score)))
    }
}
