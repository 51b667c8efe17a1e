//! Schema validation pass.

use super::node::{Depth, analyze_node, enforce_policy};
use crate::options::InferenceOptions;
use onyxia_onnx::Graph;
use onyxia_schema::{FrozenRegistry, NodeState, Pass, PassReport, Result, Stage};

/// Pass that checks every node against its schema without running inference.
///
/// Nodes go no further than `TypesConstrained`, and the graph is left
/// untouched. Only element types already present in the graph are checked,
/// so a node downstream of an undeclared tensor sees an open type.
pub struct ValidationPass {
    options: InferenceOptions,
}

impl ValidationPass {
    /// Create a new validation pass.
    pub fn new(options: InferenceOptions) -> Self {
        Self { options }
    }

    /// Validate a graph without taking it mutably.
    #[tracing::instrument(skip_all, fields(num_nodes = graph.nodes.len()))]
    pub fn check(&self, graph: &Graph, registry: &FrozenRegistry) -> Result<PassReport> {
        graph.validate()?;

        let mut report = PassReport::new(self.name());
        for (index, node) in graph.nodes.iter().enumerate() {
            let analysis =
                analyze_node(graph, index, node, registry, &self.options, Depth::Validate);
            enforce_policy(&self.options, &analysis.report)?;
            report.nodes.push(analysis.report);
        }

        tracing::debug!(
            valid = report.count(NodeState::TypesConstrained),
            diagnostics = report.diagnostics().count(),
            "validation complete"
        );
        Ok(report)
    }
}

impl Default for ValidationPass {
    fn default() -> Self {
        Self::new(InferenceOptions::default())
    }
}

impl Pass for ValidationPass {
    fn name(&self) -> &str {
        "validation"
    }

    fn stage(&self) -> Stage {
        Stage::Validation
    }

    fn run(&self, graph: &mut Graph, registry: &FrozenRegistry) -> Result<PassReport> {
        self.check(graph, registry)
    }
}
