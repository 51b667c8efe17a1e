//! Analysis pass trait, stage definitions and per-node reports.

use crate::Result;
use crate::error::Diagnostic;
use crate::registry::FrozenRegistry;
use crate::schema::OperatorId;
use onyxia_onnx::{Graph, NodeId};
use std::fmt;

/// Analysis stage for organizing passes.
///
/// Passes are grouped into stages and run in a fixed order. Within each stage,
/// passes run in the order they were registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Check nodes against their schemas without computing anything.
    Validation,

    /// Propagate element types and shapes through the graph.
    Inference,
}

/// Trait for implementing analysis passes.
///
/// A pass walks the graph in node order, resolves each node against the
/// registry and reports how far every node got. Passes may write inferred
/// descriptors back into the graph.
///
/// # Example
///
/// ```
/// use onyxia_onnx::Graph;
/// use onyxia_schema::{FrozenRegistry, Pass, PassReport, Result, Stage};
///
/// struct CountNodes;
///
/// impl Pass for CountNodes {
///     fn name(&self) -> &str {
///         "count_nodes"
///     }
///
///     fn stage(&self) -> Stage {
///         Stage::Validation
///     }
///
///     fn run(&self, graph: &mut Graph, _registry: &FrozenRegistry) -> Result<PassReport> {
///         tracing::debug!(nodes = graph.nodes.len(), "counted");
///         Ok(PassReport::new(self.name()))
///     }
/// }
/// ```
pub trait Pass: Send + Sync {
    /// Get the pass name (used for logging and reports).
    fn name(&self) -> &str;

    /// Get the stage this pass belongs to.
    fn stage(&self) -> Stage;

    /// Run the pass on the given graph.
    ///
    /// Per-node problems are returned in the report. `Err(_)` means the pass
    /// stopped early, either because the graph itself is malformed or because
    /// it runs in fail-fast mode.
    fn run(&self, graph: &mut Graph, registry: &FrozenRegistry) -> Result<PassReport>;
}

/// How far a node got through resolution, validation and inference.
///
/// A node rejected by a check keeps the last state it reached; the
/// diagnostics in its [`NodeReport`] say why it went no further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// Not yet looked at, or no schema was found.
    Unresolved,
    /// A schema covers the node's operator and opset version.
    SchemaResolved,
    /// Operand counts and attributes match the schema.
    AttributesValidated,
    /// Known operand types satisfy the type constraints.
    TypesConstrained,
    /// The inference function ran and its results were written.
    ShapeInferred,
    /// The inference function deferred to run time.
    InferenceSkipped,
    /// The schema declares no inference function.
    NoInferenceFunction,
    /// The inference function failed, or its outputs broke a type constraint.
    InferenceFailed,
}

impl NodeState {
    /// Check if no further processing will change this state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeState::ShapeInferred
                | NodeState::InferenceSkipped
                | NodeState::NoInferenceFunction
                | NodeState::InferenceFailed
        )
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeState::Unresolved => "unresolved",
            NodeState::SchemaResolved => "schema_resolved",
            NodeState::AttributesValidated => "attributes_validated",
            NodeState::TypesConstrained => "types_constrained",
            NodeState::ShapeInferred => "shape_inferred",
            NodeState::InferenceSkipped => "inference_skipped",
            NodeState::NoInferenceFunction => "no_inference_function",
            NodeState::InferenceFailed => "inference_failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one node in one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    pub node: NodeId,
    /// Schema the node resolved to, if resolution succeeded.
    pub op: Option<OperatorId>,
    pub state: NodeState,
    pub diagnostics: Vec<Diagnostic>,
}

impl NodeReport {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            op: None,
            state: NodeState::Unresolved,
            diagnostics: Vec::new(),
        }
    }
}

/// Outcome of one pass over a graph.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PassReport {
    pub pass: String,
    /// One entry per node visited, in node order.
    pub nodes: Vec<NodeReport>,
}

impl PassReport {
    pub fn new(pass: impl Into<String>) -> Self {
        Self {
            pass: pass.into(),
            nodes: Vec::new(),
        }
    }

    /// Report for node `id`, if the pass reached it.
    pub fn node(&self, id: NodeId) -> Option<&NodeReport> {
        self.nodes.iter().find(|report| report.node == id)
    }

    /// Final state of node `id`.
    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.node(id).map(|report| report.state)
    }

    /// Every diagnostic, in node order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.nodes.iter().flat_map(|report| &report.diagnostics)
    }

    /// Check if no node produced a diagnostic.
    pub fn is_clean(&self) -> bool {
        self.diagnostics().next().is_none()
    }

    /// Number of nodes that ended in `state`.
    pub fn count(&self, state: NodeState) -> usize {
        self.nodes
            .iter()
            .filter(|report| report.state == state)
            .count()
    }
}
