//! Handlers de las etapas 8 (Deck QA) y 9 (Final package).

use phase_core::{GateResults, HandlerError, StageContext, StageHandler, StageResult};
use serde_json::json;

use crate::outputs::{DeckManifest, DeckOutline, FinalPackage, QaReport};

pub struct QaHandler;

impl StageHandler for QaHandler {
    fn run(&self, ctx: &StageContext) -> Result<StageResult, HandlerError> {
        let outline: DeckOutline = ctx.output_as("6")?;
        let deck_bytes = ctx.prior
                            .deck()
                            .ok_or_else(|| HandlerError::new("missing deck binary from stage 7"))?;
        let manifest: DeckManifest = serde_json::from_slice(deck_bytes)
            .map_err(|e| HandlerError::new(format!("unreadable deck manifest: {e}")))?;

        let mut issues = Vec::new();
        if manifest.slides.len() != outline.slides.len() {
            issues.push(format!("deck has {} slides but the outline plans {}",
                                manifest.slides.len(), outline.slides.len()));
        }
        for (planned, built) in outline.slides.iter().zip(&manifest.slides) {
            if planned.key != built.key {
                issues.push(format!("slide order mismatch: expected {}, found {}", planned.key, built.key));
            }
        }

        let report = QaReport { checked_slides: manifest.slides.len(), issues };
        if !report.issues.is_empty() {
            return Err(HandlerError::with_details("deck QA found blocking issues",
                                                  json!({ "issues": report.issues })));
        }

        let data = serde_json::to_value(&report)
            .map_err(|e| HandlerError::new(format!("serialize QA report: {e}")))?;
        Ok(StageResult::with_data(data).gate(GateResults::pass(1.0)))
    }
}

pub struct PackageHandler;

impl StageHandler for PackageHandler {
    fn run(&self, ctx: &StageContext) -> Result<StageResult, HandlerError> {
        let deck_meta = ctx.prior
                           .output("7")
                           .ok_or_else(|| HandlerError::new("missing prior output for stage 7"))?;
        let qa: QaReport = ctx.output_as("8")?;

        let package = FinalPackage {
            deliverables: vec!["deck.pptx".to_string(), "output.md".to_string()],
            summary: format!("{} {} deck: {} slides, QA clean",
                             ctx.scope.country,
                             ctx.scope.industry,
                             deck_meta["slideCount"].as_u64().unwrap_or(qa.checked_slides as u64)),
        };
        let summary_md = format!("# Delivery — {} / {}\n\n- Slides: {}\n- QA issues: {}\n",
                                 ctx.scope.country,
                                 ctx.scope.industry,
                                 qa.checked_slides,
                                 qa.issues.len());

        let data = serde_json::to_value(&package)
            .map_err(|e| HandlerError::new(format!("serialize package: {e}")))?;
        Ok(StageResult::with_data(data).summary(summary_md))
    }
}
