//! Handler de la etapa 3 (Synthesis, stub determinista).

use phase_core::{HandlerError, StageContext, StageHandler, StageResult};

use crate::outputs::{ResearchBrief, SynthesisOutput};

pub struct SynthesisHandler;

impl StageHandler for SynthesisHandler {
    fn run(&self, ctx: &StageContext) -> Result<StageResult, HandlerError> {
        let brief: ResearchBrief = ctx.output_as("2")?;

        let thesis = format!("Enter {} {} through the under-served industrial segment",
                             brief.country, brief.industry);
        let pillars: Vec<String> = brief.topics
                                        .iter()
                                        .map(|t| format!("Leverage {} insight", t.name))
                                        .collect();
        let synthesis = SynthesisOutput { thesis, pillars };

        let data = serde_json::to_value(&synthesis)
            .map_err(|e| HandlerError::new(format!("serialize synthesis: {e}")))?;
        Ok(StageResult::with_data(data))
    }
}
