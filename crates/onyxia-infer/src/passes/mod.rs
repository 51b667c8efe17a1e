//! Analysis passes over an ONNX graph.

mod node;
mod shape_inference;
mod validation;

pub use shape_inference::ShapeInferencePass;
pub use validation::ValidationPass;
