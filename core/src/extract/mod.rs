pub mod condition;
pub mod markers;

pub use condition::{ConditionExtractor, ConditionMatch};
pub use markers::{CompiledMarkers, MarkerCatalog, MarkerClass, MarkerDef, Placement};
