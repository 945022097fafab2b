pub mod component;
pub mod config;
pub mod graph;
pub mod pipeline;
pub mod stores;

pub use component::{Component, InputField, OutputField};
pub use config::{ComponentConfig, ComponentRegistry, ConnectionConfig, PipelineConfig};
pub use graph::{GraphNode, PipelineEdge, PipelineGraph};
pub use pipeline::{Orchestrator, Pipeline, RunResult, RunStatus, TaskNode};
pub use stores::{InMemoryStore, ResultStore};
