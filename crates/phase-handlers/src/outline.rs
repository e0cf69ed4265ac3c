//! Handler de la etapa 6 (Deck outline).
//!
//! Arma la lista de slides a partir de la síntesis, el sizing y el
//! landscape; las claves de slide son estables y alimentan la inspección del
//! gate de template aguas abajo.

use phase_core::{HandlerError, StageContext, StageHandler, StageResult};

use crate::outputs::{DeckOutline, LandscapeOutput, SizingOutput, SlidePlan, SynthesisOutput};

pub struct OutlineHandler;

impl StageHandler for OutlineHandler {
    fn run(&self, ctx: &StageContext) -> Result<StageResult, HandlerError> {
        let synthesis: SynthesisOutput = ctx.output_as("3")?;
        let sizing: SizingOutput = ctx.output_as("4")?;
        let landscape: LandscapeOutput = ctx.output_as("5")?;

        let mut slides = vec![
            SlidePlan { key: "slide-01-title".to_string(),
                        title: format!("{} — {}", ctx.scope.country, ctx.scope.industry),
                        source_stage: "2".to_string() },
            SlidePlan { key: "slide-02-thesis".to_string(),
                        title: synthesis.thesis.clone(),
                        source_stage: "3".to_string() },
            SlidePlan { key: "slide-03-sizing".to_string(),
                        title: format!("TAM ${}M / SAM ${}M / SOM ${}M",
                                       sizing.tam_usd_m, sizing.sam_usd_m, sizing.som_usd_m),
                        source_stage: "4".to_string() },
            SlidePlan { key: "slide-04-landscape".to_string(),
                        title: format!("{} incumbents mapped", landscape.competitors.len()),
                        source_stage: "5".to_string() },
        ];
        for (i, pillar) in synthesis.pillars.iter().enumerate() {
            slides.push(SlidePlan { key: format!("slide-{:02}-pillar", i + 5),
                                    title: pillar.clone(),
                                    source_stage: "3".to_string() });
        }

        let data = serde_json::to_value(&DeckOutline { slides })
            .map_err(|e| HandlerError::new(format!("serialize outline: {e}")))?;
        Ok(StageResult::with_data(data))
    }
}
