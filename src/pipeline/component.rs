//! The polymorphic unit of work executed by a pipeline.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared input parameter of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputField {
    /// Expected type of the parameter, informational only.
    pub expected_type: String,
    /// Whether the component falls back to a default when the input is
    /// absent. Inputs without a default are mandatory and checked before
    /// the pipeline runs.
    pub has_default: bool,
}

impl InputField {
    pub fn required(expected_type: impl Into<String>) -> Self {
        Self {
            expected_type: expected_type.into(),
            has_default: false,
        }
    }

    pub fn optional(expected_type: impl Into<String>) -> Self {
        Self {
            expected_type: expected_type.into(),
            has_default: true,
        }
    }
}

/// Declared output field of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputField {
    pub expected_type: String,
    pub description: Option<String>,
}

impl OutputField {
    pub fn new(expected_type: impl Into<String>) -> Self {
        Self {
            expected_type: expected_type.into(),
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A single pipeline stage.
///
/// Components are the sole extension point of the engine: retrieval,
/// extraction, embedding or writing stages all implement this trait and
/// are otherwise opaque to the scheduler. Implementations declare their
/// parameters up front so the pipeline can validate input coverage before
/// anything runs, then do their work in [`Component::run`].
#[async_trait]
pub trait Component: Send + Sync {
    /// Name identifying this component implementation, used as the
    /// registry key in declarative pipeline configs.
    fn name(&self) -> &str;

    /// Declared input parameters of [`Component::run`].
    fn component_inputs(&self) -> HashMap<String, InputField> {
        HashMap::new()
    }

    /// Declared fields of the object returned by [`Component::run`].
    fn component_outputs(&self) -> HashMap<String, OutputField> {
        HashMap::new()
    }

    /// Execute the stage.
    ///
    /// Must return a JSON object whose keys match
    /// [`Component::component_outputs`]. Failures are opaque to the
    /// scheduler and abort the enclosing pipeline run.
    async fn run(&self, inputs: HashMap<String, Value>) -> anyhow::Result<Value>;
}
