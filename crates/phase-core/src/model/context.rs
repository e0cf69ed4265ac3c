//! Contexto de ejecución entregado a cada handler de etapa.
//!
//! El `StageContext` encapsula el alcance inmutable del run, los outputs
//! acumulados de las etapas ya completadas (hidratados desde `output.json`
//! del último intento completado) y las opciones de runtime. Los handlers
//! reciben los datos SIN sanear: el scrubbing aplica sólo a payloads
//! persistidos/emitidos.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::HandlerError;

/// Alcance inmutable del run.
#[derive(Debug, Clone)]
pub struct RunScope {
    pub run_id: String,
    pub country: String,
    pub industry: String,
    pub client_context: Option<String>,
}

/// Opciones de runtime visibles a los handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Activa el gate estricto de template sobre la etapa del deck.
    pub strict_template: bool,
}

/// Outputs de etapas previas, por id de etapa, más el binario del deck si la
/// etapa que lo produce ya completó.
#[derive(Debug, Clone, Default)]
pub struct PriorOutputs {
    outputs: BTreeMap<String, Value>,
    deck: Option<Vec<u8>>,
}

impl PriorOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, stage: &str, output: Value) {
        self.outputs.insert(stage.to_string(), output);
    }

    pub fn set_deck(&mut self, bytes: Vec<u8>) {
        self.deck = Some(bytes);
    }

    pub fn output(&self, stage: &str) -> Option<&Value> {
        self.outputs.get(stage)
    }

    pub fn has(&self, stage: &str) -> bool {
        self.outputs.contains_key(stage)
    }

    pub fn deck(&self) -> Option<&[u8]> {
        self.deck.as_deref()
    }

    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }
}

/// Contexto entregado a `StageHandler::run`. Posee sus datos: el runner lo
/// arma por etapa clonando el alcance y los outputs acumulados.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub scope: RunScope,
    pub prior: PriorOutputs,
    pub options: RunOptions,
}

impl StageContext {
    /// Decodifica el output de una etapa previa a un tipo fuerte. Falla como
    /// error de handler si la etapa no está en el contexto o la forma no
    /// coincide.
    pub fn output_as<T: DeserializeOwned>(&self, stage: &str) -> Result<T, HandlerError> {
        let value = self.prior
                        .output(stage)
                        .ok_or_else(|| HandlerError::new(format!("missing prior output for stage {stage}")))?;
        serde_json::from_value(value.clone())
            .map_err(|e| HandlerError::new(format!("malformed prior output for stage {stage}: {e}")))
    }
}
