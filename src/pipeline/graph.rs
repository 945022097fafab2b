//! Generic named-node / directed-edge container backing a pipeline.

use std::collections::HashMap;

use crate::core::errors::{PipelineError, Result};

/// Anything stored in a [`PipelineGraph`] must expose a name that is
/// unique within the graph.
pub trait GraphNode {
    fn name(&self) -> &str;
}

/// A directed edge between two named nodes.
///
/// Edges reference their endpoints by name only; the nodes themselves are
/// owned by the graph. The `input_config` payload maps a destination input
/// parameter to a source reference, either `"<component>.<output_field>"`
/// or a bare `"<component>"`.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineEdge {
    pub start: String,
    pub end: String,
    pub input_config: HashMap<String, String>,
}

impl PipelineEdge {
    pub fn new(
        start: impl Into<String>,
        end: impl Into<String>,
        input_config: HashMap<String, String>,
    ) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            input_config,
        }
    }
}

/// Directed graph keyed by node name.
///
/// At most one edge exists per ordered (start, end) pair; inserting a
/// duplicate overwrites the previous edge in place. Edge queries return
/// edges in insertion order.
#[derive(Debug)]
pub struct PipelineGraph<N> {
    nodes: HashMap<String, N>,
    edges: Vec<PipelineEdge>,
}

impl<N> Default for PipelineGraph<N> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
        }
    }
}

impl<N: GraphNode> PipelineGraph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new node. Node names are unique within a graph.
    pub fn add_node(&mut self, node: N) -> Result<()> {
        if self.nodes.contains_key(node.name()) {
            return Err(PipelineError::Definition(format!(
                "node '{}' already exists in the graph",
                node.name()
            )));
        }
        self.nodes.insert(node.name().to_string(), node);
        Ok(())
    }

    /// Replace an existing node in place.
    pub fn set_node(&mut self, node: N) -> Result<()> {
        if !self.nodes.contains_key(node.name()) {
            return Err(PipelineError::Definition(format!(
                "node '{}' is not in the graph",
                node.name()
            )));
        }
        self.nodes.insert(node.name().to_string(), node);
        Ok(())
    }

    /// Insert an edge, overwriting any existing edge between the same
    /// endpoints. Both endpoints must already be in the graph.
    pub fn add_edge(&mut self, edge: PipelineEdge) -> Result<()> {
        if !self.nodes.contains_key(&edge.start) || !self.nodes.contains_key(&edge.end) {
            return Err(PipelineError::Definition(format!(
                "{} or {} is not in the graph",
                edge.start, edge.end
            )));
        }
        if let Some(existing) = self
            .edges
            .iter_mut()
            .find(|e| e.start == edge.start && e.end == edge.end)
        {
            *existing = edge;
        } else {
            self.edges.push(edge);
        }
        Ok(())
    }

    /// Remove the edge between `start` and `end`, if any.
    pub fn remove_edge(&mut self, start: &str, end: &str) {
        self.edges.retain(|e| !(e.start == start && e.end == end));
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<&N> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &PipelineEdge> {
        self.edges.iter()
    }

    /// All edges ending at `name`, in insertion order.
    pub fn previous_edges(&self, name: &str) -> Vec<&PipelineEdge> {
        self.edges.iter().filter(|e| e.end == name).collect()
    }

    /// All edges starting at `name`, in insertion order.
    pub fn next_edges(&self, name: &str) -> Vec<&PipelineEdge> {
        self.edges.iter().filter(|e| e.start == name).collect()
    }

    /// A node with no incoming edges.
    pub fn is_root(&self, name: &str) -> bool {
        self.previous_edges(name).is_empty()
    }

    /// A node with no outgoing edges.
    pub fn is_leaf(&self, name: &str) -> bool {
        self.next_edges(name).is_empty()
    }

    /// All nodes without any parent.
    pub fn roots(&self) -> Vec<&N> {
        self.nodes
            .values()
            .filter(|n| self.is_root(n.name()))
            .collect()
    }

    /// Whether the current node/edge set contains a cycle.
    ///
    /// DFS coloring: a back-edge to a gray (in-progress) node signals a
    /// cycle. Callers enforcing acyclicity must run this after every edge
    /// insertion.
    pub fn is_cyclic(&self) -> bool {
        let mut colors: HashMap<&str, Color> = HashMap::with_capacity(self.nodes.len());
        for name in self.nodes.keys() {
            if colors.get(name.as_str()).copied().unwrap_or(Color::White) == Color::White
                && self.visit(name, &mut colors)
            {
                return true;
            }
        }
        false
    }

    fn visit<'a>(&'a self, name: &'a str, colors: &mut HashMap<&'a str, Color>) -> bool {
        colors.insert(name, Color::Gray);
        for edge in self.next_edges(name) {
            match colors.get(edge.end.as_str()).copied().unwrap_or(Color::White) {
                Color::Gray => return true,
                Color::White => {
                    if self.visit(&edge.end, colors) {
                        return true;
                    }
                }
                Color::Black => {}
            }
        }
        colors.insert(name, Color::Black);
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}
