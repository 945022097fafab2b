//! Declarative pipeline descriptions and the component registry.
//!
//! A [`PipelineConfig`] describes a pipeline's component set and
//! connections without any live component instances; it is used purely
//! for construction and export, never on the execution path. Component
//! entries reference implementations by the name under which they were
//! registered in a [`ComponentRegistry`].

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::errors::{PipelineError, Result};
use crate::pipeline::component::Component;

/// Registry resolving component names used in declarative configs to live
/// component instances.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Arc<dyn Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component under its [`Component::name`]. Registering the
    /// same name twice replaces the previous entry.
    pub fn register(&mut self, component: Arc<dyn Component>) {
        info!(component = component.name(), "registered component");
        self.components
            .insert(component.name().to_string(), component);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.components.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// All registered component names.
    pub fn list(&self) -> Vec<String> {
        self.components.keys().cloned().collect()
    }
}

/// One component entry in a pipeline description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Task name, unique within the pipeline.
    pub name: String,
    /// Registry key of the component implementation.
    pub component: String,
}

/// One connection entry in a pipeline description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub start: String,
    pub end: String,
    /// Mapping from the end component's input parameters to source
    /// references (`"<component>.<output_field>"` or `"<component>"`).
    #[serde(default)]
    pub input_config: HashMap<String, String>,
}

/// Serializable description of a pipeline: its components and their
/// connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    pub components: Vec<ComponentConfig>,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

impl PipelineConfig {
    /// Load a pipeline description from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PipelineError::Definition(format!(
                "cannot open pipeline config '{}': {e}",
                path.display()
            ))
        })?;
        serde_yaml::from_reader(file).map_err(|e| {
            PipelineError::Definition(format!(
                "invalid pipeline config '{}': {e}",
                path.display()
            ))
        })
    }
}
