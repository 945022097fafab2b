//! pipeflow - asynchronous DAG pipeline orchestration.
//!
//! Components are wired into a directed acyclic graph. Running the
//! pipeline starts every root concurrently, propagates mapped results
//! from parents to children as dependencies complete, and returns the
//! aggregated outputs of the leaf tasks.

// Core infrastructure modules
pub mod core {
    pub mod errors;
}

pub mod pipeline;

// Re-exports for convenience
pub use self::core::errors::{PipelineError, Result};
pub use self::pipeline::*;
