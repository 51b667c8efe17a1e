//! Common test utilities for schema catalogue tests.
//!
//! Builds inference contexts for a single node against the experimental
//! registry, so tests can call an operator's inference function directly.

use onyxia_onnx::{DataType, Node, TensorShape};
use onyxia_schema::{
    FrozenRegistry, InferenceContext, InferenceFailure, InferenceOutcome, TensorType,
    TypeBindings,
};
use std::sync::OnceLock;

/// Shared frozen experimental registry.
pub fn registry() -> &'static FrozenRegistry {
    static REGISTRY: OnceLock<FrozenRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        onyxia_defs::experimental_schema_registry().unwrap()
    })
}

/// Known element type and static shape.
pub fn tensor(dtype: DataType, dims: &[usize]) -> Option<TensorType> {
    Some(TensorType::new(Some(dtype), TensorShape::fixed(dims)))
}

/// Run the registered inference function for `node` with the given inputs.
///
/// Outputs start unknown. Returns the outcome and the staged outputs.
pub fn infer(
    node: &Node,
    inputs: Vec<Option<TensorType>>,
) -> (Result<InferenceOutcome, InferenceFailure>, Vec<TensorType>) {
    let schema = registry()
        .lookup(&node.domain, &node.op_type, 1)
        .unwrap();
    let function = schema
        .inference_function()
        .unwrap_or_else(|| panic!("{} declares no inference function", node.op_type));
    let bindings = TypeBindings::new();
    let outputs = vec![TensorType::default(); node.outputs.len().max(1)];

    let mut ctx = InferenceContext::new(node, schema, &bindings, inputs, outputs);
    let outcome = function.infer(&mut ctx);
    (outcome, ctx.into_outputs())
}
