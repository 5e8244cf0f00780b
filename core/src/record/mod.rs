pub mod model;
pub mod raw;

pub use model::{ConditionSource, Constraint, FieldKind, NormalizedRequirement};
pub use raw::{parse_requirements_json, RawField, RawRequirement};
