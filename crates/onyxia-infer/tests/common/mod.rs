//! Common test utilities for propagation tests.
//!
//! Graph builders over the experimental operator set.

#![allow(dead_code)]

use onyxia_onnx::{AttributeValue, DataType, Graph, Node, TensorInfo, TensorShape};
use onyxia_schema::FrozenRegistry;

// Re-export types commonly used in tests
pub use onyxia_infer::{AnalysisPipeline, InferenceOptions, NodeState, ShapeInferencePass};

/// Install a test log subscriber once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Frozen registry holding the experimental schemas.
pub fn experimental_registry() -> FrozenRegistry {
    init_tracing();
    onyxia_defs::experimental_schema_registry().unwrap()
}

/// Empty graph importing opset 1 of the default domain.
pub fn graph_v1() -> Graph {
    let mut graph = Graph::new();
    graph.set_opset_import("", 1);
    graph
}

/// Declare a graph input with known element type and static shape.
pub fn add_input(graph: &mut Graph, name: &str, dtype: DataType, dims: &[usize]) {
    graph.add_input(
        TensorInfo::new(name)
            .with_dtype(dtype)
            .with_shape(TensorShape::fixed(dims)),
    );
}

/// Create a one-input, one-output graph for a unary operator.
///
/// Graph structure:
/// - Input: x:[dtype;shape]
/// - Operation: OpType(x) -> y
/// - Output: y (declared with unknown type and shape)
pub fn make_unary_graph(op_type: &str, dtype: DataType, shape: &[usize]) -> Graph {
    let mut graph = graph_v1();
    add_input(&mut graph, "x", dtype, shape);
    graph.add_tensor(TensorInfo::new("y"));
    graph.add_node(
        Node::new(op_type)
            .with_name(format!("{}_0", op_type.to_lowercase()))
            .with_input("x")
            .with_output("y"),
    );
    graph.outputs.push("y".to_string());
    graph
}

/// Create a GivenTensorFill graph reading the shape of `x`.
pub fn make_fill_graph(input_dims: &[usize], attrs: &[(&str, AttributeValue)]) -> Graph {
    let mut graph = graph_v1();
    add_input(&mut graph, "x", DataType::F32, input_dims);
    let node = attrs.iter().fold(
        Node::new("GivenTensorFill")
            .with_name("fill")
            .with_input("x")
            .with_output("filled"),
        |node, (name, value)| node.with_attr(*name, value.clone()),
    );
    graph.add_node(node);
    graph
}
