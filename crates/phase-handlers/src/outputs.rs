//! Payloads tipados de los handlers integrados.
//!
//! Estos tipos no introducen semántica en el core; sólo fijan la forma del
//! JSON que viaja en `output.json` entre etapas (campos camelCase, que es el
//! formato de los artefactos en disco). Eso habilita `output_as::<T>` en los
//! handlers consumidores y estabilidad de forma para los tests.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchTopic {
    pub name: String,
    pub findings: Vec<String>,
}

/// Output de la etapa 2 (Market research).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchBrief {
    pub country: String,
    pub industry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_context: Option<String>,
    pub topics: Vec<ResearchTopic>,
    pub source_count: usize,
}

/// Output de la etapa 3 (Synthesis).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisOutput {
    pub thesis: String,
    pub pillars: Vec<String>,
}

/// Output de la etapa 4 (Market sizing). Montos en millones de USD.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizingOutput {
    pub tam_usd_m: i64,
    pub sam_usd_m: i64,
    pub som_usd_m: i64,
    pub method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub name: String,
    pub share_pct: i64,
}

/// Output de la etapa 5 (Competitive landscape).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandscapeOutput {
    pub competitors: Vec<Competitor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlidePlan {
    /// Clave estable de la slide (p. ej. "slide-03-thesis").
    pub key: String,
    pub title: String,
    /// Etapa cuyo output alimenta la slide.
    pub source_stage: String,
}

/// Output de la etapa 6 (Deck outline).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckOutline {
    pub slides: Vec<SlidePlan>,
}

/// Manifiesto que la etapa 7 serializa dentro del binario del deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckManifest {
    pub slides: Vec<SlidePlan>,
    pub template: String,
}

/// Output de la etapa 8 (Deck QA).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaReport {
    pub checked_slides: usize,
    pub issues: Vec<String>,
}

/// Output de la etapa 9 (Final package).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalPackage {
    pub deliverables: Vec<String>,
    pub summary: String,
}
