//! Error taxonomy for the pipeline engine.

use thiserror::Error;

use crate::pipeline::pipeline::RunStatus;

/// Unified error type for the pipeline engine.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The pipeline graph or its run inputs are malformed: unknown
    /// endpoint, cycle introduced, missing mandatory input or an input
    /// mapping referencing an undeclared output field.
    #[error("pipeline definition error: {0}")]
    Definition(String),

    /// A task was asked to run before all of its parents reported done.
    /// The scheduler never hands out such tasks, so seeing this error
    /// means an internal invariant was broken.
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    /// A disallowed status transition was attempted. The execute path
    /// catches this and treats the task as already handled by another
    /// branch; it is not a user-facing failure.
    #[error("cannot move task '{name}' from {current:?} to {requested:?}")]
    StatusUpdate {
        name: String,
        current: RunStatus,
        requested: RunStatus,
    },

    /// A result was stored twice under the same key with overwrite
    /// disabled.
    #[error("result for '{0}' already exists")]
    DuplicateResult(String),

    /// The wrapped component failed. Aborts the enclosing pipeline run;
    /// no partial results are returned and no retry is attempted.
    #[error("component '{name}' failed: {source}")]
    Component {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
