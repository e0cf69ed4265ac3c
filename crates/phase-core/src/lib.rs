//! phase-core: contrato de etapas y orquestación del pipeline
//!
//! Propósito:
//! - Proveer los contratos neutrales (sin lógica de dominio de las etapas) y
//!   la orquestación para ejecutar la secuencia fija de etapas de un run de
//!   manera reanudable y fail-fast.
//! - Dejar la lógica de cada etapa fuera del core: los handlers entran por el
//!   registro (`HandlerRegistry`) y se tratan como funciones opacas
//!   `(StageContext) -> StageResult | HandlerError`.
//!
//! Componentes principales:
//! - `stage`: tabla congelada de etapas (ids, tipo, artefactos declarados) y
//!   helpers de orden.
//! - `store`: traits del store de metadatos (runs, intentos, artefactos,
//!   eventos) y del lock por run, más backends in-memory para tests.
//! - `artifact`: derivación de rutas, tipos de contenido y escritura por
//!   bundle de los artefactos estándar de una etapa.
//! - `registry`: mapa `stage_id -> handler` y tabla de contexto requerido.
//! - `runner`: bucle por etapa (intento nuevo, handler, artefactos, estado),
//!   gate de template post-etapa y hooks.
//! - `scrub`: saneado de secretos aplicado a payloads persistidos/emitidos.
//! - `scorecard`: vistas de sólo lectura sobre un run.
//! - `errors`: taxonomía de errores del core.
//!
//! Re-exports: se exponen símbolos clave para facilitar el uso desde
//! binarios/tests.

pub mod artifact;
pub mod constants;
pub mod errors;
pub mod ids;
pub mod model;
pub mod registry;
pub mod runner;
pub mod scorecard;
pub mod scrub;
pub mod stage;
pub mod store;

// Re-exports públicos principales
pub use errors::{ArtifactError, HandlerError, RunnerError, StoreError};
pub use model::{DeckInspection, ErrorArtifact, GateResults, PriorOutputs, RunOptions, RunScope, StageContext,
                StageEvent, StageResult};
pub use registry::{HandlerRegistry, StageHandler};
pub use runner::{HookPayload, OutcomeStatus, RunOutcome, RunRequest, Runner, RunnerConfig, RunnerHooks, StageReport,
                 TemplateContract};
pub use scorecard::{build_scorecard, RunScorecard, StageScore};
pub use stage::{StageDefinition, StageKind};
pub use store::{AttemptRecord, AttemptStatus, EventKind, EventRecord, InMemoryArtifactStore, InMemoryPipelineStore,
                LockAcquire, LockManager, LockRecord, NewEvent, NewRun, PipelineStore, RunFilter, RunRecord,
                RunStatus};
pub use artifact::ArtifactStore;
