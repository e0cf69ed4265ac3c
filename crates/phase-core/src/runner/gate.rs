//! Gate determinista de template sobre la inspección del deck.
//!
//! Corre sólo cuando el flag estricto está activo y el handler de la etapa
//! del deck emitió un payload de inspección. Un fallo del gate se trata
//! exactamente igual que un fallo del handler: intento `failed`, `error.json`
//! con la evidencia estructurada, y fin del pipeline.

use serde::{Deserialize, Serialize};

use crate::model::DeckInspection;

/// Código estable registrado en `error.json` cuando el gate bloquea.
pub const TEMPLATE_STRICT_FAILURE: &str = "TEMPLATE_STRICT_FAILURE";

/// Contrato visual del template corporativo.
#[derive(Debug, Clone)]
pub struct TemplateContract {
    /// Colores de relleno permitidos, hex `#RRGGBB` mayúsculas.
    pub palette: Vec<String>,
    pub fonts: Vec<String>,
    /// Tolerancia de posición en pulgadas.
    pub position_tolerance: f64,
    pub require_table_borders: bool,
}

impl Default for TemplateContract {
    fn default() -> Self {
        Self { palette: ["#1F3864", "#2E74B5", "#9DC3E6", "#D6E4F0", "#FFFFFF", "#404040"].map(String::from)
                                                                                          .to_vec(),
               fonts: ["Calibri", "Calibri Light"].map(String::from).to_vec(),
               position_tolerance: 0.05,
               require_table_borders: true }
    }
}

/// Una violación concreta del contrato.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateViolation {
    pub slide_key: String,
    pub item: String,
    /// Regla violada: `position`, `palette`, `font` o `table-borders`.
    pub rule: String,
    pub detail: String,
}

/// Veredicto del gate con la evidencia por violación.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateGateReport {
    pub passed: bool,
    pub blocking_slide_keys: Vec<String>,
    pub violations: Vec<GateViolation>,
}

fn palette_contains(contract: &TemplateContract, color: &str) -> bool {
    contract.palette.iter().any(|c| c.eq_ignore_ascii_case(color))
}

/// Evalúa la inspección contra el contrato. Determinista: mismo payload,
/// mismo veredicto.
pub fn evaluate_template(contract: &TemplateContract, inspection: &DeckInspection) -> TemplateGateReport {
    let mut violations = Vec::new();

    for slide in &inspection.slides {
        for shape in &slide.shapes {
            if let (Some(ex), Some(ey)) = (shape.expected_x, shape.expected_y) {
                let dx = (shape.x - ex).abs();
                let dy = (shape.y - ey).abs();
                if dx > contract.position_tolerance || dy > contract.position_tolerance {
                    violations.push(GateViolation { slide_key: slide.key.clone(),
                                                    item: shape.name.clone(),
                                                    rule: "position".to_string(),
                                                    detail: format!("off by ({dx:.3}, {dy:.3}) in, tolerance {:.3}",
                                                                    contract.position_tolerance) });
                }
            }
            if let Some(color) = &shape.fill_color {
                if !palette_contains(contract, color) {
                    violations.push(GateViolation { slide_key: slide.key.clone(),
                                                    item: shape.name.clone(),
                                                    rule: "palette".to_string(),
                                                    detail: format!("fill {color} is outside the template palette") });
                }
            }
            if let Some(font) = &shape.font {
                if !contract.fonts.iter().any(|f| f.eq_ignore_ascii_case(font)) {
                    violations.push(GateViolation { slide_key: slide.key.clone(),
                                                    item: shape.name.clone(),
                                                    rule: "font".to_string(),
                                                    detail: format!("font {font} is not a template font") });
                }
            }
        }
        if contract.require_table_borders {
            for table in &slide.tables {
                if !table.has_borders {
                    violations.push(GateViolation { slide_key: slide.key.clone(),
                                                    item: table.name.clone(),
                                                    rule: "table-borders".to_string(),
                                                    detail: "table is missing borders".to_string() });
                }
            }
        }
    }

    let mut blocking: Vec<String> = violations.iter().map(|v| v.slide_key.clone()).collect();
    blocking.sort();
    blocking.dedup();

    TemplateGateReport { passed: violations.is_empty(), blocking_slide_keys: blocking, violations }
}
