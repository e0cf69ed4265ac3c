//! Handler de la etapa 2 (Market research, stub determinista).
//!
//! Sin I/O ni azar: los hallazgos se derivan del alcance del run, de modo que
//! el mismo `(country, industry)` produce el mismo brief. Un backend real (AI
//! client) se conecta por el mismo contrato del registro.

use phase_core::store::EventKind;
use phase_core::{HandlerError, StageContext, StageHandler, StageResult};
use serde_json::json;

use crate::outputs::{ResearchBrief, ResearchTopic};

const TOPICS: [&str; 4] = ["demand drivers", "regulation", "supply chain", "pricing"];

pub struct ResearchHandler;

impl StageHandler for ResearchHandler {
    fn run(&self, ctx: &StageContext) -> Result<StageResult, HandlerError> {
        let country = &ctx.scope.country;
        let industry = &ctx.scope.industry;

        let topics: Vec<ResearchTopic> =
            TOPICS.iter()
                  .map(|name| ResearchTopic { name: name.to_string(),
                                              findings: vec![
                                                  format!("{industry} {name} baseline for {country}"),
                                                  format!("{country} outlook on {name}"),
                                              ] })
                  .collect();
        let brief = ResearchBrief { country: country.clone(),
                                    industry: industry.clone(),
                                    client_context: ctx.scope.client_context.clone(),
                                    source_count: country.len() + industry.len(),
                                    topics };

        let data = serde_json::to_value(&brief)
            .map_err(|e| HandlerError::new(format!("serialize research brief: {e}")))?;
        Ok(StageResult::with_data(data)
            .event(EventKind::Metric, "research sources collected",
                   Some(json!({ "sourceCount": brief.source_count }))))
    }
}
