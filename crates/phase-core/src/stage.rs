//! Contrato congelado de etapas.
//!
//! Reglas clave:
//! - `STAGE_ORDER` es la única fuente de verdad del orden; el resto de los
//!   componentes consultan esta tabla.
//! - La partición primary/review es la unión disjunta del orden; toda etapa
//!   review termina en `a` y es un pase de calidad/reparación sobre la salida
//!   de la etapa primaria anterior.
//! - La etapa `7` es la que produce el deck (`deck.pptx`).

use serde::{Deserialize, Serialize};

use crate::constants::{DECK_PPTX, OUTPUT_JSON};

/// Tipo de etapa dentro del pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Etapa productora de datos.
    Primary,
    /// Pase de calidad/reparación sobre la etapa primaria precedente.
    Review,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Primary => "primary",
            StageKind::Review => "review",
        }
    }
}

/// Definición inmutable de una etapa: metadatos y artefactos declarados.
#[derive(Debug, Clone)]
pub struct StageDefinition {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub kind: StageKind,
    /// Nombres de artefactos que la etapa consume de etapas previas.
    pub inputs: &'static [&'static str],
    /// Nombres de artefactos que la etapa declara producir.
    pub outputs: &'static [&'static str],
}

/// Orden total congelado del pipeline.
pub const STAGE_ORDER: [&str; 13] = ["2", "2a", "3", "3a", "4", "4a", "5", "6", "6a", "7", "8", "8a", "9"];

/// Etapa que produce el binario del deck.
pub const DECK_STAGE: &str = "7";

/// Tabla congelada de definiciones, en el mismo orden que `STAGE_ORDER`.
pub static STAGES: [StageDefinition; 13] = [
    StageDefinition { id: "2",
                      label: "Market research",
                      description: "Collect country and industry evidence for the run scope",
                      kind: StageKind::Primary,
                      inputs: &[],
                      outputs: &[OUTPUT_JSON] },
    StageDefinition { id: "2a",
                      label: "Research review",
                      description: "Quality pass over the research brief",
                      kind: StageKind::Review,
                      inputs: &[OUTPUT_JSON],
                      outputs: &[OUTPUT_JSON] },
    StageDefinition { id: "3",
                      label: "Synthesis",
                      description: "Distill the research into a thesis and supporting pillars",
                      kind: StageKind::Primary,
                      inputs: &[OUTPUT_JSON],
                      outputs: &[OUTPUT_JSON] },
    StageDefinition { id: "3a",
                      label: "Synthesis review",
                      description: "Quality pass over the synthesis",
                      kind: StageKind::Review,
                      inputs: &[OUTPUT_JSON],
                      outputs: &[OUTPUT_JSON] },
    StageDefinition { id: "4",
                      label: "Market sizing",
                      description: "Estimate the addressable market for the scope",
                      kind: StageKind::Primary,
                      inputs: &[OUTPUT_JSON],
                      outputs: &[OUTPUT_JSON] },
    StageDefinition { id: "4a",
                      label: "Sizing review",
                      description: "Quality pass over the sizing model",
                      kind: StageKind::Review,
                      inputs: &[OUTPUT_JSON],
                      outputs: &[OUTPUT_JSON] },
    StageDefinition { id: "5",
                      label: "Competitive landscape",
                      description: "Map competitors and positioning",
                      kind: StageKind::Primary,
                      inputs: &[OUTPUT_JSON],
                      outputs: &[OUTPUT_JSON] },
    StageDefinition { id: "6",
                      label: "Deck outline",
                      description: "Assemble the slide-by-slide outline",
                      kind: StageKind::Primary,
                      inputs: &[OUTPUT_JSON],
                      outputs: &[OUTPUT_JSON] },
    StageDefinition { id: "6a",
                      label: "Outline review",
                      description: "Quality pass over the outline",
                      kind: StageKind::Review,
                      inputs: &[OUTPUT_JSON],
                      outputs: &[OUTPUT_JSON] },
    StageDefinition { id: "7",
                      label: "Deck build",
                      description: "Render the outline into the deck binary",
                      kind: StageKind::Primary,
                      inputs: &[OUTPUT_JSON],
                      outputs: &[OUTPUT_JSON, DECK_PPTX] },
    StageDefinition { id: "8",
                      label: "Deck QA",
                      description: "Inspect the built deck against the outline",
                      kind: StageKind::Primary,
                      inputs: &[OUTPUT_JSON, DECK_PPTX],
                      outputs: &[OUTPUT_JSON] },
    StageDefinition { id: "8a",
                      label: "Deck repair",
                      description: "Repair pass over QA findings",
                      kind: StageKind::Review,
                      inputs: &[OUTPUT_JSON],
                      outputs: &[OUTPUT_JSON] },
    StageDefinition { id: "9",
                      label: "Final package",
                      description: "Assemble the final delivery summary",
                      kind: StageKind::Primary,
                      inputs: &[OUTPUT_JSON],
                      outputs: &[OUTPUT_JSON] },
];

/// Definición de una etapa por id.
pub fn definition(id: &str) -> Option<&'static StageDefinition> {
    STAGES.iter().find(|s| s.id == id)
}

/// Posición de la etapa dentro de `STAGE_ORDER`.
pub fn stage_index(id: &str) -> Option<usize> {
    STAGE_ORDER.iter().position(|s| *s == id)
}

pub fn is_valid(id: &str) -> bool {
    stage_index(id).is_some()
}

/// Etapa siguiente en el orden, si existe.
pub fn next_stage(id: &str) -> Option<&'static str> {
    let idx = stage_index(id)?;
    STAGE_ORDER.get(idx + 1).copied()
}

/// Etapa anterior en el orden, si existe.
pub fn prev_stage(id: &str) -> Option<&'static str> {
    let idx = stage_index(id)?;
    idx.checked_sub(1).and_then(|i| STAGE_ORDER.get(i).copied())
}

/// Prefijo del orden hasta `through` inclusive.
pub fn slice_through(through: &str) -> Option<&'static [&'static str]> {
    let idx = stage_index(through)?;
    Some(&STAGE_ORDER[..=idx])
}

/// Sub-secuencia `[from ..= through]` del orden. `None` si alguno de los ids
/// es desconocido o si `from` va después de `through`.
pub fn slice_between(from: &str, through: &str) -> Option<&'static [&'static str]> {
    let lo = stage_index(from)?;
    let hi = stage_index(through)?;
    if lo > hi {
        return None;
    }
    Some(&STAGE_ORDER[lo..=hi])
}

/// Ids de etapas primarias, en orden.
pub fn primary_stages() -> Vec<&'static str> {
    STAGES.iter().filter(|s| s.kind == StageKind::Primary).map(|s| s.id).collect()
}

/// Ids de etapas review, en orden.
pub fn review_stages() -> Vec<&'static str> {
    STAGES.iter().filter(|s| s.kind == StageKind::Review).map(|s| s.id).collect()
}
