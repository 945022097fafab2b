//! Task scheduling and the user-facing pipeline API.
//!
//! A [`Pipeline`] is a DAG of named [`TaskNode`]s, each wrapping one
//! [`Component`]. Running the pipeline starts every root concurrently;
//! each completed task records its result and fans out into the
//! successors whose dependencies are now all done, until only the leaf
//! outputs remain.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn, Instrument};

use crate::core::errors::{PipelineError, Result};
use crate::pipeline::component::Component;
use crate::pipeline::config::{
    ComponentConfig, ComponentRegistry, ConnectionConfig, PipelineConfig,
};
use crate::pipeline::graph::{GraphNode, PipelineEdge, PipelineGraph};
use crate::pipeline::stores::{InMemoryStore, ResultStore};

/// Run status of a single task within a pipeline pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Unknown,
    Scheduled,
    Waiting,
    Running,
    Skip,
    Done,
}

/// Immutable record of one task completion, handed to the orchestrator's
/// completion callback and not retained beyond it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub result: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

/// Graph node wrapping one component with run-status tracking.
pub struct TaskNode {
    pub name: String,
    pub component: Arc<dyn Component>,
    // Serializes every status read and write, so concurrent completion
    // callbacks racing to start the same task observe a consistent status.
    status: Mutex<RunStatus>,
}

impl GraphNode for TaskNode {
    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskNode")
            .field("name", &self.name)
            .field("component", &self.component.name())
            .finish()
    }
}

impl TaskNode {
    pub fn new(name: impl Into<String>, component: Arc<dyn Component>) -> Self {
        Self {
            name: name.into(),
            component,
            status: Mutex::new(RunStatus::Unknown),
        }
    }

    /// Set a new status.
    ///
    /// Two transitions are rejected: setting the current status again, and
    /// `Running` while already `Done`. The first rule is what keeps a task
    /// from starting twice when several parents finish at the same time.
    pub async fn set_status(&self, status: RunStatus) -> Result<()> {
        let mut current = self.status.lock().await;
        if status == *current || (status == RunStatus::Running && *current == RunStatus::Done) {
            return Err(PipelineError::StatusUpdate {
                name: self.name.clone(),
                current: *current,
                requested: status,
            });
        }
        *current = status;
        Ok(())
    }

    pub async fn read_status(&self) -> RunStatus {
        *self.status.lock().await
    }

    /// Execute the task: move to `Running`, call the wrapped component,
    /// move to `Done`.
    ///
    /// Returns `Ok(None)` when the `Running` transition is rejected (the
    /// task is already running or done); callers must treat that as
    /// "handled elsewhere", not as an error.
    pub async fn execute(&self, inputs: HashMap<String, Value>) -> Result<Option<RunResult>> {
        debug!(task = %self.name, ?inputs, "running component");
        let start = Instant::now();
        match self.set_status(RunStatus::Running).await {
            Ok(()) => {}
            Err(PipelineError::StatusUpdate { current, .. }) => {
                info!(task = %self.name, status = ?current, "component already running or done");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
        let component_result =
            self.component
                .run(inputs)
                .await
                .map_err(|source| PipelineError::Component {
                    name: self.name.clone(),
                    source,
                })?;
        self.set_status(RunStatus::Done).await?;
        debug!(task = %self.name, elapsed = ?start.elapsed(), "component finished");
        Ok(Some(RunResult {
            status: RunStatus::Done,
            result: Some(component_result),
            timestamp: Utc::now(),
        }))
    }

    /// Reset to `Scheduled` between runs, bypassing the transition rules.
    pub async fn reinitialize(&self) {
        *self.status.lock().await = RunStatus::Scheduled;
    }
}

/// Drives a pipeline graph to completion.
///
/// The orchestrator finds the next tasks to execute, builds the inputs for
/// each task and runs them, fanning out concurrently whenever several
/// tasks become ready at once. There is no central dependency counter:
/// readiness is re-evaluated by every completing parent, and the status
/// transition rules on [`TaskNode`] deduplicate double starts.
pub struct Orchestrator<'a> {
    pipeline: &'a Pipeline,
}

impl<'a> Orchestrator<'a> {
    pub fn new(pipeline: &'a Pipeline) -> Self {
        Self { pipeline }
    }

    /// Start every root task concurrently; the completion callbacks carry
    /// the run forward from there. Resolves once every spawned subtree has
    /// completed, or with the first failure.
    pub async fn run(&'a self, data: &'a Value) -> Result<()> {
        try_join_all(
            self.pipeline
                .graph
                .roots()
                .into_iter()
                .map(|root| self.run_task(root, data)),
        )
        .await?;
        Ok(())
    }

    /// Resolve inputs for `task`, execute it and, unless the execution was
    /// deduplicated, hand the result to the completion callback.
    pub fn run_task(&'a self, task: &'a TaskNode, data: &'a Value) -> BoxFuture<'a, Result<()>> {
        async move {
            let input_config = self.get_input_config_for_task(task).await?;
            let inputs = self.get_component_inputs(&task.name, &input_config, data);
            match task.execute(inputs).await? {
                Some(res) => self.on_task_complete(task, res, data).await,
                None => Ok(()),
            }
        }
        .boxed()
    }

    /// Record the task's result, then fan out into every successor that is
    /// now ready. The fan-out is a structured join: siblings interleave
    /// freely but this call only resolves once all of them (transitively)
    /// have completed.
    pub async fn on_task_complete(
        &'a self,
        task: &'a TaskNode,
        res: RunResult,
        data: &'a Value,
    ) -> Result<()> {
        self.pipeline.add_result_for_component(
            &task.name,
            res.result.unwrap_or(Value::Null),
            self.pipeline.graph.is_leaf(&task.name),
        )?;
        let ready = self.next(task).await;
        try_join_all(ready.into_iter().map(|next| self.run_task(next, data))).await?;
        Ok(())
    }

    /// Check that every parent of `task` reads `Done` right now.
    pub async fn check_dependencies_complete(&self, task: &TaskNode) -> Result<()> {
        for edge in self.pipeline.graph.previous_edges(&task.name) {
            let start_node = self
                .pipeline
                .graph
                .get_node_by_name(&edge.start)
                .ok_or_else(|| PipelineError::MissingDependency(edge.start.clone()))?;
            let status = start_node.read_status().await;
            if status != RunStatus::Done {
                debug!(task = %task.name, dependency = %edge.start, ?status, "dependency not complete");
                return Err(PipelineError::MissingDependency(edge.start.clone()));
            }
        }
        Ok(())
    }

    /// Successors of `task` that are ready to run: not already running or
    /// done, with every one of their parents reporting `Done` at this
    /// moment. A successor with pending parents is silently skipped; it
    /// will be re-examined when another parent completes.
    pub async fn next(&self, task: &TaskNode) -> Vec<&'a TaskNode> {
        let graph = &self.pipeline.graph;
        let mut ready = Vec::new();
        for edge in graph.next_edges(&task.name) {
            let Some(next_node) = graph.get_node_by_name(&edge.end) else {
                continue;
            };
            let status = next_node.read_status().await;
            if matches!(status, RunStatus::Running | RunStatus::Done) {
                continue;
            }
            if self.check_dependencies_complete(next_node).await.is_err() {
                continue;
            }
            ready.push(next_node);
        }
        ready
    }

    /// Merge the input mappings of every incoming edge into one
    /// {parameter -> source reference} configuration.
    ///
    /// All parents must already be done; the scheduler only hands out
    /// tasks for which that holds, so a violation here is an internal
    /// invariant breach.
    pub async fn get_input_config_for_task(&self, task: &TaskNode) -> Result<HashMap<String, String>> {
        let mut input_config = HashMap::new();
        for edge in self.pipeline.graph.previous_edges(&task.name) {
            let prev_node = self
                .pipeline
                .graph
                .get_node_by_name(&edge.start)
                .ok_or_else(|| PipelineError::MissingDependency(edge.start.clone()))?;
            let status = prev_node.read_status().await;
            if status != RunStatus::Done {
                warn!(task = %task.name, dependency = %edge.start, ?status, "missing dependency");
                return Err(PipelineError::MissingDependency(format!(
                    "{} not ready",
                    edge.start
                )));
            }
            for (parameter, mapping) in &edge.input_config {
                input_config.insert(parameter.clone(), mapping.clone());
            }
        }
        Ok(input_config)
    }

    /// Build the concrete inputs for a component from the user-supplied
    /// data and the mapped results of its parents.
    ///
    /// A reference `"comp.field"` resolves to that field of comp's stored
    /// result; a bare `"comp"` resolves to the whole result. A reference
    /// with more than one dot is not field syntax and falls back to a bare
    /// component reference. Mapped values override user-supplied keys of
    /// the same name.
    pub fn get_component_inputs(
        &self,
        component_name: &str,
        input_config: &HashMap<String, String>,
        input_data: &Value,
    ) -> HashMap<String, Value> {
        let mut component_inputs: HashMap<String, Value> = input_data
            .get(component_name)
            .and_then(Value::as_object)
            .map(|object| {
                object
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();
        for (parameter, mapping) in input_config {
            let (source_component, output_param) = match mapping.split_once('.') {
                Some((component, field)) if !field.contains('.') => (component, Some(field)),
                _ => (mapping.as_str(), None),
            };
            let component_result = self.pipeline.get_results_for_component(source_component);
            let value = match output_param {
                Some(field) => component_result.get(field).cloned().unwrap_or(Value::Null),
                None => component_result,
            };
            if component_inputs.contains_key(parameter) {
                warn!(
                    component = component_name,
                    parameter = %parameter,
                    mapping = %mapping,
                    "user input ignored, replaced by mapped upstream result"
                );
            }
            component_inputs.insert(parameter.clone(), value);
        }
        component_inputs
    }
}

/// The main pipeline, where components and their execution order are
/// defined.
pub struct Pipeline {
    pub(crate) graph: PipelineGraph<TaskNode>,
    store: Arc<dyn ResultStore>,
    final_results: InMemoryStore,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()))
    }

    /// Use a custom result store instead of the in-memory default.
    pub fn with_store(store: Arc<dyn ResultStore>) -> Self {
        Self {
            graph: PipelineGraph::new(),
            store,
            final_results: InMemoryStore::new(),
        }
    }

    /// Build a pipeline from a declarative description, resolving
    /// component names through `registry`.
    pub fn from_config(config: &PipelineConfig, registry: &ComponentRegistry) -> Result<Self> {
        let mut pipeline = Pipeline::new();
        for component in &config.components {
            let instance = registry.get(&component.component).ok_or_else(|| {
                PipelineError::Definition(format!(
                    "component '{}' is not registered",
                    component.component
                ))
            })?;
            pipeline.add_component(instance, component.name.clone())?;
        }
        for connection in &config.connections {
            pipeline.connect(
                &connection.start,
                &connection.end,
                connection.input_config.clone(),
            )?;
        }
        Ok(pipeline)
    }

    /// Build a pipeline from a YAML description on disk.
    pub fn from_yaml_file(path: impl AsRef<Path>, registry: &ComponentRegistry) -> Result<Self> {
        let config = PipelineConfig::from_yaml_file(path)?;
        Self::from_config(&config, registry)
    }

    /// Export the pipeline as a declarative description, suitable for
    /// reconstructing an equivalent pipeline via [`Pipeline::from_config`].
    pub fn to_config(&self) -> PipelineConfig {
        let mut components: Vec<ComponentConfig> = self
            .graph
            .nodes()
            .map(|task| ComponentConfig {
                name: task.name.clone(),
                component: task.component.name().to_string(),
            })
            .collect();
        components.sort_by(|a, b| a.name.cmp(&b.name));
        let connections = self
            .graph
            .edges()
            .map(|edge| ConnectionConfig {
                start: edge.start.clone(),
                end: edge.end.clone(),
                input_config: edge.input_config.clone(),
            })
            .collect();
        PipelineConfig {
            components,
            connections,
        }
    }

    /// Add a new component under a unique name.
    pub fn add_component(
        &mut self,
        component: Arc<dyn Component>,
        name: impl Into<String>,
    ) -> Result<()> {
        self.graph.add_node(TaskNode::new(name, component))
    }

    /// Replace an existing component, keeping its connections.
    pub fn set_component(&mut self, name: &str, component: Arc<dyn Component>) -> Result<()> {
        self.graph.set_node(TaskNode::new(name, component))
    }

    /// Connect `start` to `end`, optionally mapping upstream outputs into
    /// `end`'s input parameters.
    ///
    /// Fails if either endpoint is unknown or if the edge would make the
    /// graph cyclic; a rejected edge is rolled back so the pipeline stays
    /// usable.
    pub fn connect(
        &mut self,
        start: &str,
        end: &str,
        input_config: HashMap<String, String>,
    ) -> Result<()> {
        self.graph
            .add_edge(PipelineEdge::new(start, end, input_config))
            .map_err(|_| {
                PipelineError::Definition(format!("{start} or {end} is not in the pipeline"))
            })?;
        if self.graph.is_cyclic() {
            self.graph.remove_edge(start, end);
            return Err(PipelineError::Definition(
                "cyclic graphs are not allowed".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<&TaskNode> {
        self.graph.get_node_by_name(name)
    }

    /// Save a task's result, and when the task is a leaf also into the
    /// final-results store returned by [`Pipeline::run`].
    pub fn add_result_for_component(
        &self,
        name: &str,
        result: Value,
        is_final: bool,
    ) -> Result<()> {
        self.store.add(name, result.clone(), true)?;
        if is_final {
            self.final_results.add(name, result, true)?;
        }
        Ok(())
    }

    pub fn get_results_for_component(&self, name: &str) -> Value {
        self.store.get(name).unwrap_or(Value::Null)
    }

    /// Clear both stores and reset every task status, so the same pipeline
    /// instance can run again without leaking results between passes.
    async fn reinitialize(&self) {
        self.store.empty();
        self.final_results.empty();
        for task in self.graph.nodes() {
            task.reinitialize().await;
        }
    }

    /// Make sure no component will miss a mandatory input once the run
    /// starts.
    pub fn validate_inputs_config(&self, data: &Value) -> Result<()> {
        for task in self.graph.nodes() {
            self.validate_inputs_config_for_task(task, data)?;
        }
        Ok(())
    }

    /// A task's mandatory inputs (those without a default) must each be
    /// covered by the user-supplied data or by an incoming edge mapping.
    /// Every `"comp.field"` mapping must also name a declared output of
    /// `comp`.
    pub fn validate_inputs_config_for_task(&self, task: &TaskNode, input_data: &Value) -> Result<()> {
        let component_inputs = task.component.component_inputs();
        let mut expected_mandatory: Vec<&str> = component_inputs
            .iter()
            .filter(|(_, field)| !field.has_default)
            .map(|(name, _)| name.as_str())
            .collect();
        expected_mandatory.sort_unstable();

        let mut actual_inputs: Vec<String> = input_data
            .get(&task.name)
            .and_then(Value::as_object)
            .map(|object| object.keys().cloned().collect())
            .unwrap_or_default();
        for edge in self.graph.previous_edges(&task.name) {
            for (parameter, mapping) in &edge.input_config {
                // only "<component>.<field>" references (exactly one dot)
                // are checked against declared outputs; anything else is a
                // bare component reference
                if let Some((source_name, field)) =
                    mapping.split_once('.').filter(|(_, field)| !field.contains('.'))
                {
                    let source_node = self.graph.get_node_by_name(source_name).ok_or_else(|| {
                        PipelineError::Definition(format!(
                            "unknown component '{source_name}' in input mapping '{mapping}'"
                        ))
                    })?;
                    let source_outputs = source_node.component.component_outputs();
                    if !source_outputs.contains_key(field) {
                        let mut declared: Vec<&str> =
                            source_outputs.keys().map(String::as_str).collect();
                        declared.sort_unstable();
                        return Err(PipelineError::Definition(format!(
                            "parameter '{field}' is not a valid output for '{source_name}' \
                             (must be one of {declared:?})"
                        )));
                    }
                }
                actual_inputs.push(parameter.clone());
            }
        }

        let missing: Vec<&str> = expected_mandatory
            .iter()
            .filter(|name| !actual_inputs.iter().any(|actual| actual == *name))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::Definition(format!(
                "missing input parameters for '{}': expected parameters: {expected_mandatory:?}, got: {actual_inputs:?}",
                task.name
            )));
        }
        Ok(())
    }

    /// Run the pipeline.
    ///
    /// `data` maps component names to their user-supplied input objects.
    /// Validates input coverage, resets all task statuses and stores, then
    /// orchestrates from the roots. Returns the final-results snapshot:
    /// one entry per leaf component. Either the whole mapping is returned
    /// or the first encountered failure propagates; there is no partial
    /// success.
    pub async fn run(&self, data: Value) -> Result<HashMap<String, Value>> {
        let run_id = cuid2::create_id();
        let span = tracing::info_span!("pipeline_run", %run_id);
        async {
            debug!(?data, "starting pipeline");
            let start = Instant::now();
            self.validate_inputs_config(&data)?;
            self.reinitialize().await;
            let orchestrator = Orchestrator::new(self);
            orchestrator.run(&data).await?;
            info!(elapsed = ?start.elapsed(), "pipeline finished");
            Ok(self.final_results.all())
        }
        .instrument(span)
        .await
    }
}
