//! Handlers de las etapas 4 (Market sizing) y 5 (Competitive landscape).
//!
//! Valores stub deterministas derivados del alcance (longitudes de strings),
//! sin fuentes externas.

use phase_core::store::EventKind;
use phase_core::{HandlerError, StageContext, StageHandler, StageResult};
use serde_json::json;

use crate::outputs::{Competitor, LandscapeOutput, SizingOutput};

pub struct SizingHandler;

impl StageHandler for SizingHandler {
    fn run(&self, ctx: &StageContext) -> Result<StageResult, HandlerError> {
        // Asegura que la cadena de contexto llegó hasta acá.
        let _research = ctx.prior
                           .output("2")
                           .ok_or_else(|| HandlerError::new("missing prior output for stage 2"))?;

        let base = (ctx.scope.country.len() + ctx.scope.industry.len()) as i64;
        let sizing = SizingOutput { tam_usd_m: base * 100,
                                    sam_usd_m: base * 40,
                                    som_usd_m: base * 8,
                                    method: "top-down proxy".to_string() };

        let data = serde_json::to_value(&sizing)
            .map_err(|e| HandlerError::new(format!("serialize sizing: {e}")))?;
        Ok(StageResult::with_data(data)
            .metrics(json!({ "tamUsdM": sizing.tam_usd_m }))
            .event(EventKind::Metric, "market sized", Some(json!({ "tamUsdM": sizing.tam_usd_m }))))
    }
}

pub struct LandscapeHandler;

impl StageHandler for LandscapeHandler {
    fn run(&self, ctx: &StageContext) -> Result<StageResult, HandlerError> {
        let industry = &ctx.scope.industry;
        let competitors: Vec<Competitor> =
            (1..=3).map(|i| Competitor { name: format!("{industry} incumbent {i}"),
                                         share_pct: (industry.len() as i64 * i) % 40 })
                   .collect();

        let data = serde_json::to_value(&LandscapeOutput { competitors })
            .map_err(|e| HandlerError::new(format!("serialize landscape: {e}")))?;
        Ok(StageResult::with_data(data))
    }
}
