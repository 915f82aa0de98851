//! Engine orchestration: lifecycle, ingress admission, dispatch and the
//! matching workers that tie the queues, books, risk gate and fan-out
//! together.

mod engine;
mod error;
mod lifecycle;
mod runtime;

pub use engine::{Admission, EngineCommand, MatchingEngine};
pub use error::EngineError;
pub use lifecycle::{EngineState, Lifecycle};
