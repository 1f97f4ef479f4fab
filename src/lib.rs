pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod wal;

pub use engine::{Engine, EngineError, EngineOptions};
