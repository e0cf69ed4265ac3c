//! Resultado de la ejecución de un handler y tipos auxiliares.
//!
//! El runner traduce estos resultados a artefactos y filas del store; el
//! handler nunca escribe por su cuenta (eso mantiene las etapas replayables y
//! testeables en aislamiento).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::HandlerError;
use crate::model::DeckInspection;
use crate::store::EventKind;

/// Resultado de un gate de calidad dentro de una etapa review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateResults {
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub failures: Vec<String>,
    /// El review determinó que no había nada que hacer. El intento se marca
    /// `completed` igual; el estado `skipped` queda reservado.
    #[serde(default)]
    pub skipped: bool,
}

impl GateResults {
    pub fn pass(score: f64) -> Self {
        Self { passed: true, score: Some(score), failures: Vec::new(), skipped: false }
    }

    pub fn fail(failures: Vec<String>) -> Self {
        Self { passed: false, score: None, failures, skipped: false }
    }
}

/// Anotación ligera emitida por un handler; el runner la agrega al log de
/// eventos y a `events.ndjson` sin afectar la máquina de estados.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Resultado neutral de ejecutar un handler de etapa.
#[derive(Debug, Clone, Default)]
pub struct StageResult {
    /// Se serializa a `output.json` tras el scrubbing de secretos.
    pub data: Value,
    pub gate_results: Option<GateResults>,
    pub metrics: Option<Value>,
    /// Resumen opcional en markdown (`output.md`).
    pub summary_md: Option<String>,
    /// Blobs binarios nombrados (p. ej. `deck.pptx`). Nunca pasan por JSON.
    pub binaries: BTreeMap<String, Vec<u8>>,
    /// Payload de inspección post-etapa para el gate de template.
    pub inspection: Option<DeckInspection>,
    /// Eventos ligeros a registrar junto con la etapa.
    pub events: Vec<StageEvent>,
}

impl StageResult {
    pub fn with_data(data: Value) -> Self {
        Self { data, ..Self::default() }
    }

    pub fn gate(mut self, gate: GateResults) -> Self {
        self.gate_results = Some(gate);
        self
    }

    pub fn metrics(mut self, metrics: Value) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn summary(mut self, md: impl Into<String>) -> Self {
        self.summary_md = Some(md.into());
        self
    }

    pub fn binary(mut self, filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.binaries.insert(filename.into(), bytes);
        self
    }

    pub fn inspection(mut self, inspection: DeckInspection) -> Self {
        self.inspection = Some(inspection);
        self
    }

    pub fn event(mut self, kind: EventKind, message: impl Into<String>, data: Option<Value>) -> Self {
        self.events.push(StageEvent { kind, message: message.into(), data });
        self
    }
}

/// Payload persistido en `error.json` de un intento fallido.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorArtifact {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorArtifact {
    pub fn from_handler(error: &HandlerError) -> Self {
        Self { name: "HandlerError".to_string(),
               message: error.message.clone(),
               stack: None,
               code: None,
               details: error.details.clone() }
    }
}
