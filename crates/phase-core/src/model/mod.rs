//! Tipos neutrales intercambiados entre el runner y los handlers.

mod context;
mod inspection;
mod result;

pub use context::{PriorOutputs, RunOptions, RunScope, StageContext};
pub use inspection::{DeckInspection, ShapeInspection, SlideInspection, TableInspection};
pub use result::{ErrorArtifact, GateResults, StageEvent, StageResult};
