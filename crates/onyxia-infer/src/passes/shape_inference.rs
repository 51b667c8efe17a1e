//! Shape inference pass.
//!
//! Forward pass in node order that runs each operator's inference function
//! to propagate element types and shapes through the graph.

use super::node::{Depth, analyze_node, commit, enforce_policy};
use crate::options::InferenceOptions;
use onyxia_onnx::Graph;
use onyxia_schema::{FrozenRegistry, NodeState, Pass, PassReport, Result, Stage};

/// Pass that infers output element types and shapes for every node.
///
/// Walks the nodes in the order given, which must be topological: a node sees
/// the descriptors its predecessors committed. A node's writes reach the
/// graph only when its inference function returns successfully and the
/// written types satisfy the schema's constraints, so a failing node leaves
/// its outputs as they were declared.
pub struct ShapeInferencePass {
    options: InferenceOptions,
}

impl ShapeInferencePass {
    /// Create a new shape inference pass.
    pub fn new(options: InferenceOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &InferenceOptions {
        &self.options
    }
}

impl Default for ShapeInferencePass {
    fn default() -> Self {
        Self::new(InferenceOptions::default())
    }
}

impl Pass for ShapeInferencePass {
    fn name(&self) -> &str {
        "shape_inference"
    }

    fn stage(&self) -> Stage {
        Stage::Inference
    }

    #[tracing::instrument(skip_all, fields(num_nodes = graph.nodes.len()))]
    fn run(&self, graph: &mut Graph, registry: &FrozenRegistry) -> Result<PassReport> {
        graph.validate()?;

        let mut report = PassReport::new(self.name());
        for index in 0..graph.nodes.len() {
            let node = graph.nodes[index].clone();

            // Outputs nobody declared start out unknown
            for output in node.outputs.iter().filter(|name| !name.is_empty()) {
                graph.ensure_tensor(output);
            }

            let analysis =
                analyze_node(graph, index, &node, registry, &self.options, Depth::Infer);
            if let Some(staged) = analysis.staged {
                commit(graph, &node, staged)?;
            }
            enforce_policy(&self.options, &analysis.report)?;
            report.nodes.push(analysis.report);
        }

        tracing::debug!(
            inferred = report.count(NodeState::ShapeInferred),
            skipped = report.count(NodeState::InferenceSkipped),
            no_function = report.count(NodeState::NoInferenceFunction),
            failed = report.count(NodeState::InferenceFailed),
            diagnostics = report.diagnostics().count(),
            "shape inference complete"
        );
        Ok(report)
    }
}
