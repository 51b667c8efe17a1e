//! Shape and type propagation for Onyxia graphs.
//!
//! This crate drives the schema framework over a whole graph. Each node is
//! resolved against a frozen schema registry, checked, and handed to its
//! operator's inference function; results are written back into the graph's
//! tensor descriptors.
//!
//! Passes run in stages:
//! 1. **Validation** - Check nodes against their schemas (checker mode)
//! 2. **Inference** - Propagate element types and shapes in node order
//!
//! # Example
//!
//! ```
//! use onyxia_infer::infer_shapes;
//! use onyxia_onnx::{AttributeValue, DataType, Graph, Node, TensorInfo, TensorShape};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = onyxia_defs::experimental_schema_registry()?;
//!
//! let mut graph = Graph::new();
//! graph.set_opset_import("", 1);
//! graph.add_input(
//!     TensorInfo::new("x")
//!         .with_dtype(DataType::F32)
//!         .with_shape(TensorShape::fixed(&[2, 4])),
//! );
//! graph.add_node(
//!     Node::new("Scale")
//!         .with_input("x")
//!         .with_output("y")
//!         .with_attr("scale", AttributeValue::Float(0.5)),
//! );
//!
//! let report = infer_shapes(&mut graph, &registry)?;
//! assert!(report.is_clean());
//! assert_eq!(graph.tensor_by_name("y")?.shape, TensorShape::fixed(&[2, 4]));
//! # Ok(())
//! # }
//! ```

pub mod options;
pub mod passes;

pub use options::{ErrorPolicy, InferenceOptions, MissingSchemaPolicy};
pub use passes::{ShapeInferencePass, ValidationPass};

// Re-export commonly used types from onyxia-schema
pub use onyxia_schema::{
    Diagnostic, Error, FrozenRegistry, NodeReport, NodeState, Pass, PassReport, Result, Stage,
};

use onyxia_onnx::Graph;

/// Analysis pipeline with pluggable passes.
///
/// The pipeline runs in fixed stages: Validation → Inference. Custom passes
/// can be added via `add_pass()`; within a stage they run in the order they
/// were added.
pub struct AnalysisPipeline {
    /// All passes to run, ordered by (stage, registration order).
    passes: Vec<Box<dyn Pass>>,
}

impl AnalysisPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Create a pipeline that runs shape inference.
    pub fn with_defaults(options: InferenceOptions) -> Self {
        let mut pipeline = Self::new();
        pipeline.add_pass(ShapeInferencePass::new(options));
        pipeline
    }

    /// Create a pipeline that only validates nodes against their schemas.
    pub fn checker(options: InferenceOptions) -> Self {
        let mut pipeline = Self::new();
        pipeline.add_pass(ValidationPass::new(options));
        pipeline
    }

    /// Add a pass to the pipeline.
    ///
    /// Returns a mutable reference to self for method chaining.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Number of passes in the pipeline.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Run every pass in stage order, returning one report per pass.
    ///
    /// # Errors
    ///
    /// Returns the first error a pass returns: a malformed graph, or the
    /// first diagnostic of a pass running fail-fast.
    #[tracing::instrument(skip_all, fields(num_nodes = graph.nodes.len(), num_tensors = graph.tensor_info.len()))]
    pub fn run(&mut self, graph: &mut Graph, registry: &FrozenRegistry) -> Result<Vec<PassReport>> {
        // Stable sort keeps registration order within a stage
        self.passes.sort_by_key(|p| p.stage());

        let mut reports = Vec::with_capacity(self.passes.len());
        for pass in &self.passes {
            let _span =
                tracing::debug_span!("pass", name = pass.name(), stage = ?pass.stage()).entered();
            reports.push(pass.run(graph, registry)?);
        }
        Ok(reports)
    }
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self::with_defaults(InferenceOptions::default())
    }
}

/// Run shape inference over `graph` with default options.
///
/// Collects every diagnostic rather than stopping at the first.
pub fn infer_shapes(graph: &mut Graph, registry: &FrozenRegistry) -> Result<PassReport> {
    ShapeInferencePass::default().run(graph, registry)
}

/// Validate `graph` against `registry` without running inference.
pub fn check_graph(graph: &Graph, registry: &FrozenRegistry) -> Result<PassReport> {
    ValidationPass::default().check(graph, registry)
}
