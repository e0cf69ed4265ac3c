//! phase-handlers: set integrado de handlers de etapa.
//!
//! Stubs deterministas en el contrato del registro: valores derivados del
//! alcance del run, sin I/O, sin azar. Un despliegue con backends reales
//! (cliente AI, renderer PPTX) reemplaza handlers individuales manteniendo
//! la misma tabla de contexto.
//!
//! La tabla `stage -> outputs previos que consume` vive junto al cableado del
//! registro (`default_registry`), que ocurre al inicio del programa.

pub mod outputs;

mod deck;
mod outline;
mod qa;
mod research;
mod review;
mod sizing;
mod synthesis;

pub use deck::DeckHandler;
pub use outline::OutlineHandler;
pub use qa::{PackageHandler, QaHandler};
pub use research::ResearchHandler;
pub use review::ReviewHandler;
pub use sizing::{LandscapeHandler, SizingHandler};
pub use synthesis::SynthesisHandler;

use phase_core::{HandlerRegistry, RunnerError};

/// Tabla de contexto: qué outputs previos hidrata el runner para cada etapa.
pub const CONTEXT_NEEDS: [(&str, &[&str]); 13] = [
    ("2", &[]),
    ("2a", &["2"]),
    ("3", &["2"]),
    ("3a", &["3"]),
    ("4", &["2", "3"]),
    ("4a", &["4"]),
    ("5", &["2", "3"]),
    ("6", &["3", "4", "5"]),
    ("6a", &["6"]),
    ("7", &["6"]),
    ("8", &["6", "7"]),
    ("8a", &["8"]),
    ("9", &["7", "8"]),
];

fn needs_for(stage_id: &str) -> &'static [&'static str] {
    CONTEXT_NEEDS.iter().find(|(id, _)| *id == stage_id).map(|(_, needs)| *needs).unwrap_or(&[])
}

/// Construye el registro con los trece handlers integrados.
pub fn default_registry() -> Result<HandlerRegistry, RunnerError> {
    let mut registry = HandlerRegistry::new();
    registry.register("2", ResearchHandler, needs_for("2"))?;
    registry.register("2a", ReviewHandler::new("2", "research coverage"), needs_for("2a"))?;
    registry.register("3", SynthesisHandler, needs_for("3"))?;
    registry.register("3a", ReviewHandler::new("3", "argument consistency"), needs_for("3a"))?;
    registry.register("4", SizingHandler, needs_for("4"))?;
    registry.register("4a", ReviewHandler::new("4", "sizing sanity"), needs_for("4a"))?;
    registry.register("5", LandscapeHandler, needs_for("5"))?;
    registry.register("6", OutlineHandler, needs_for("6"))?;
    registry.register("6a", ReviewHandler::new("6", "narrative flow"), needs_for("6a"))?;
    registry.register("7", DeckHandler, needs_for("7"))?;
    registry.register("8", QaHandler, needs_for("8"))?;
    registry.register("8a", ReviewHandler::new("8", "qa follow-up"), needs_for("8a"))?;
    registry.register("9", PackageHandler, needs_for("9"))?;
    Ok(registry)
}
