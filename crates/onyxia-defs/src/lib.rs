//! Operator schema catalogue for Onyxia.
//!
//! This crate supplies operator declarations to the schema framework as
//! registration data, and the inference function families they share.
//!
//! # Inference Families
//!
//! - **Pass-through**: ThresholdedRelu, ScaledTanh, Scale
//! - **Fill**: GivenTensorFill
//!
//! # Operators Without Inference
//!
//! - GRUUnit, ATen, DynamicSlice
//!
//! # Example
//!
//! ```
//! use onyxia_defs::experimental_schema_registry;
//!
//! let registry = experimental_schema_registry()?;
//! let schema = registry.lookup("", "GivenTensorFill", 1)?;
//! assert!(schema.has_inference_function());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod families;
pub mod operators;

mod registry;

pub use families::{FillInference, PropagateFromFirstInput};
pub use registry::{experimental_schema_registry, register_experimental_schemas};
