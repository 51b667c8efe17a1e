//! Operator schemas, node validation and inference contracts for Onyxia.
//!
//! This crate provides the framework that operator catalogues plug into:
//! - Versioned operator schemas (`OpSchema`) built with `SchemaBuilder`
//! - A write-once registry (`SchemaRegistry`) frozen into a shareable read view
//! - Attribute, arity and type-constraint checks for concrete nodes
//! - The `InferenceFunction` trait, `InferenceContext` and shared helpers
//! - Diagnostics attributed to single nodes, and the `Pass` trait

pub mod builder;
pub mod constraints;
pub mod error;
pub mod inference;
pub mod pass;
pub mod registry;
pub mod schema;
pub mod validate;

// Re-export commonly used types
pub use builder::SchemaBuilder;
pub use constraints::{TypeBindings, TypeConstraintResolver};
pub use error::{
    ArityError, AttributeError, ConstraintViolation, Diagnostic, DiagnosticKind, InferenceFailure,
    NodeRef, NotFound, RegistrationError, SchemaRule, SlotKind,
};
pub use inference::{
    InferenceContext, InferenceFunction, InferenceOutcome, TensorType, dims_from_ints,
    merge_shapes, propagate_elem_type_from_input_to_output,
    propagate_shape_and_type_from_first_input, propagate_shape_from_attribute_to_output,
    propagate_shape_from_input_to_output,
};
pub use pass::{NodeReport, NodeState, Pass, PassReport, Stage};
pub use registry::{FrozenRegistry, SchemaRegistry};
pub use schema::{
    AttrRequirement, AttributeSpec, FormalArity, IoSpec, OpSchema, OperatorId, Permissiveness,
    SlotType, SupportLevel, TypeConstraint,
};
pub use validate::{AttributeValidator, check_arity};

/// Result type using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for onyxia-schema operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// First node diagnostic, raised when a pass runs fail-fast.
    #[error("{0}")]
    Node(Box<Diagnostic>),

    #[error(transparent)]
    Onnx(#[from] onyxia_onnx::OnnxError),
}

impl From<Diagnostic> for Error {
    fn from(diagnostic: Diagnostic) -> Self {
        Error::Node(Box::new(diagnostic))
    }
}
