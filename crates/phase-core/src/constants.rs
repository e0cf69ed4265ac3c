//! Constantes compartidas del core.

/// Versión del orquestador, registrada en `meta.json` de cada intento.
pub const TRACKER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// TTL por defecto del lock de run (5 minutos).
pub const DEFAULT_LOCK_TTL_MS: i64 = 300_000;

/// Límite por defecto de `list_runs`.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Nombres de artefactos estándar de un intento.
pub const OUTPUT_JSON: &str = "output.json";
pub const OUTPUT_MD: &str = "output.md";
pub const META_JSON: &str = "meta.json";
pub const ERROR_JSON: &str = "error.json";
pub const EVENTS_NDJSON: &str = "events.ndjson";
pub const DECK_PPTX: &str = "deck.pptx";
