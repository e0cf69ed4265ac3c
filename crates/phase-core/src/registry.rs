//! Registro de handlers: la única superficie por la que entra la lógica de
//! dominio al core.
//!
//! Reglas clave:
//! - Un handler es puro respecto del store y el filesystem: no escribe
//!   artefactos ni toca la base; el runner hace ambas cosas.
//! - Cada etapa declara (tabla estática junto al registro) qué outputs de
//!   etapas previas necesita; el runner hidrata exactamente eso.
//! - La tabla se cablea al inicio del programa, no en la definición del
//!   handler.

use std::collections::BTreeMap;

use crate::errors::{HandlerError, RunnerError};
use crate::model::{StageContext, StageResult};
use crate::stage;

/// Contrato de un handler de etapa.
pub trait StageHandler: Send + Sync {
    fn run(&self, ctx: &StageContext) -> Result<StageResult, HandlerError>;
}

impl<F> StageHandler for F where F: Fn(&StageContext) -> Result<StageResult, HandlerError> + Send + Sync {
    fn run(&self, ctx: &StageContext) -> Result<StageResult, HandlerError> {
        self(ctx)
    }
}

/// Mapa `stage_id -> handler` más la tabla de contexto requerido.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Box<dyn StageHandler>>,
    context_needs: BTreeMap<String, Vec<String>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un handler para `stage_id` declarando qué etapas previas
    /// consume. Valida que todos los ids existan en el contrato y que las
    /// dependencias sean estrictamente anteriores en el orden.
    pub fn register<H>(&mut self, stage_id: &str, handler: H, needs: &[&str]) -> Result<(), RunnerError>
        where H: StageHandler + 'static
    {
        let idx = stage::stage_index(stage_id)
            .ok_or_else(|| RunnerError::InvalidArgument(format!("unknown stage `{stage_id}`")))?;
        for need in needs {
            let need_idx = stage::stage_index(need)
                .ok_or_else(|| RunnerError::InvalidArgument(format!("unknown context stage `{need}`")))?;
            if need_idx >= idx {
                return Err(RunnerError::InvalidArgument(format!(
                    "stage `{stage_id}` cannot depend on `{need}` (not an earlier stage)"
                )));
            }
        }
        self.handlers.insert(stage_id.to_string(), Box::new(handler));
        self.context_needs
            .insert(stage_id.to_string(), needs.iter().map(|s| s.to_string()).collect());
        Ok(())
    }

    pub fn handler(&self, stage_id: &str) -> Option<&dyn StageHandler> {
        self.handlers.get(stage_id).map(Box::as_ref)
    }

    /// Etapas previas cuyos outputs requiere `stage_id`.
    pub fn context_needs(&self, stage_id: &str) -> &[String] {
        self.context_needs.get(stage_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Etapas del slice sin handler registrado.
    pub fn missing_for(&self, slice: &[&str]) -> Vec<String> {
        slice.iter()
             .filter(|s| !self.handlers.contains_key(**s))
             .map(|s| s.to_string())
             .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
