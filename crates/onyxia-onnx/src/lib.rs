//! ONNX graph representation for Onyxia.
//!
//! This crate provides the caller-side view of a model that schema validation
//! and shape/type inference work on: nodes with their attributes and operand
//! names, and per-tensor descriptors whose element type and shape may be only
//! partially known.
//!
//! # Example
//!
//! ```
//! use onyxia_onnx::{AttributeValue, DataType, Graph, Node, TensorInfo, TensorShape};
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
//! assert!(graph.validate().is_ok());
//! ```

use thiserror::Error;

pub mod graph;

pub use graph::{
    AttributeTensor, AttributeType, AttributeValue, DataType, Dimension, Graph, Node, NodeId,
    TensorId, TensorInfo, TensorShape, all_tensor_types,
};

/// Name of the default ONNX operator domain.
pub const ONNX_DOMAIN: &str = "ai.onnx";

/// Map the default domain's aliases ("" and "ai.onnx") to one key.
pub fn normalize_domain(domain: &str) -> &str {
    if domain == ONNX_DOMAIN { "" } else { domain }
}

/// Errors that can occur when processing ONNX graphs.
#[derive(Debug, Error)]
pub enum OnnxError {
    #[error("Invalid graph structure: {0}")]
    InvalidGraph(String),

    #[error("Missing tensor: {0}")]
    MissingTensor(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),
}

/// Result type for ONNX operations.
pub type Result<T> = std::result::Result<T, OnnxError>;
