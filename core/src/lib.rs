pub mod audit;
pub mod config;
pub mod determinism;
pub mod extract;
pub mod issues;
pub mod normalize;
pub mod record;
pub mod report;
pub mod rules;
pub mod run;

pub mod error;

pub use config::EngineConfig;
pub use error::{CoreError, CoreResult};
pub use run::Engine;
