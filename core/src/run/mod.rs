pub mod engine;
pub mod lifecycle;

pub use engine::Engine;
