//! Payload de inspección post-etapa que emite el handler del deck.
//!
//! El handler reporta lo que efectivamente renderizó (posiciones, colores,
//! fuentes, bordes de tablas); el gate de template lo evalúa de forma
//! determinista contra el contrato. Unidades de posición en pulgadas.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckInspection {
    pub slides: Vec<SlideInspection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideInspection {
    /// Clave estable de la slide (p. ej. "slide-03-thesis").
    pub key: String,
    #[serde(default)]
    pub shapes: Vec<ShapeInspection>,
    #[serde(default)]
    pub tables: Vec<TableInspection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeInspection {
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Posición esperada por el layout del template, si la shape la declara.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_y: Option<f64>,
    /// Color de relleno en hex `#RRGGBB`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInspection {
    pub name: String,
    pub has_borders: bool,
}
