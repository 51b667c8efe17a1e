//! Error and diagnostic types.
//!
//! Registration errors are fatal to the write phase. Everything else is
//! attributed to a single node through [`Diagnostic`].

use crate::schema::OperatorId;
use onyxia_onnx::{AttributeType, DataType, Node, NodeId};
use std::fmt;
use thiserror::Error;

/// Structural rule a schema declaration broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaRule {
    #[error("operator name must not be empty")]
    EmptyName,

    #[error("since_version must be at least 1, got {0}")]
    InvalidVersion(i64),

    #[error("attribute '{0}' is declared more than once")]
    DuplicateAttribute(String),

    #[error("default for attribute '{attribute}' is {actual}, declared {declared}")]
    DefaultTypeMismatch {
        attribute: String,
        declared: AttributeType,
        actual: AttributeType,
    },

    #[error("{kind} indices must be 0..n without gaps or repeats, found index {index}")]
    SlotIndex { kind: SlotKind, index: usize },

    #[error("{kind} '{slot}' refers to undefined type constraint '{type_str}'")]
    UndefinedTypeVariable {
        kind: SlotKind,
        slot: String,
        type_str: String,
    },

    #[error("variadic {kind} '{slot}' must be the last {kind}")]
    VariadicNotLast { kind: SlotKind, slot: String },

    #[error("type constraint '{0}' is declared more than once")]
    DuplicateConstraint(String),

    #[error("type constraint '{0}' allows no types")]
    EmptyConstraint(String),

    #[error("type constraint '{variable}' lists unknown type '{type_str}'")]
    UnknownTypeString { variable: String, type_str: String },
}

/// Formal slot direction, used in messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Input,
    Output,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Input => f.write_str("input"),
            SlotKind::Output => f.write_str("output"),
        }
    }
}

/// Failure to add a schema to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("invalid schema {op}: {rule}")]
    Definition { op: OperatorId, rule: SchemaRule },

    #[error("schema {op} is already registered")]
    Duplicate { op: OperatorId },
}

/// No schema covers the requested operator and opset version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no schema for {}::{name} at opset version {version}", display_domain(.domain))]
pub struct NotFound {
    pub domain: String,
    pub name: String,
    pub version: i64,
}

fn display_domain(domain: &str) -> &str {
    if domain.is_empty() {
        onyxia_onnx::ONNX_DOMAIN
    } else {
        domain
    }
}

/// Problem with a node's concrete attributes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("required attribute '{attribute}' is missing")]
    MissingRequired { attribute: String },

    #[error("attribute '{attribute}' should be {expected}, got {actual}")]
    TypeMismatch {
        attribute: String,
        expected: AttributeType,
        actual: AttributeType,
    },

    #[error("attribute '{attribute}' is not declared by the schema")]
    UnexpectedAttribute { attribute: String },
}

/// Node lists the wrong number of operands, or leaves a required one empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArityError {
    #[error("expected {} {kind}s, node has {actual}", bounds(.min, .max))]
    Count {
        kind: SlotKind,
        min: usize,
        max: Option<usize>,
        actual: usize,
    },

    #[error("required {kind} '{slot}' (index {index}) is absent")]
    MissingOperand {
        kind: SlotKind,
        slot: String,
        index: usize,
    },
}

fn bounds(min: &usize, max: &Option<usize>) -> String {
    match *max {
        Some(max) if max == *min => format!("{}", min),
        Some(max) => format!("{} to {}", min, max),
        None => format!("at least {}", min),
    }
}

/// Observed element types disagree with the schema's type constraints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintViolation {
    #[error("type variable '{variable}' is bound to {type_a} but {slot} has {type_b}")]
    Conflict {
        variable: String,
        type_a: DataType,
        type_b: DataType,
        slot: String,
    },

    #[error("{slot} has {dtype}, which type variable '{variable}' does not allow")]
    Disallowed {
        variable: String,
        dtype: DataType,
        slot: String,
    },

    #[error("{slot} must be {expected}, got {actual}")]
    FixedType {
        expected: DataType,
        actual: DataType,
        slot: String,
    },
}

/// Domain-specific failure raised by an inference function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InferenceFailure {
    pub message: String,
}

impl InferenceFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The node a diagnostic is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    /// Position in the graph's node list.
    pub index: NodeId,
    pub name: String,
    pub op_type: String,
    pub domain: String,
}

impl NodeRef {
    pub fn new(index: NodeId, node: &Node) -> Self {
        Self {
            index,
            name: node.name.clone(),
            op_type: node.op_type.clone(),
            domain: node.domain.clone(),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "node #{} ({})", self.index, self.op_type)
        } else {
            write!(f, "node #{} '{}' ({})", self.index, self.name, self.op_type)
        }
    }
}

/// What went wrong with a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticKind {
    #[error("no opset version imported for domain '{}'", display_domain(.domain))]
    MissingOpsetImport { domain: String },

    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error(transparent)]
    Arity(#[from] ArityError),

    #[error(transparent)]
    Attribute(#[from] AttributeError),

    #[error(transparent)]
    Constraint(#[from] ConstraintViolation),

    #[error("inference failed: {0}")]
    Inference(#[from] InferenceFailure),
}

/// A per-node problem, with the schema it was resolved to if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub node: NodeRef,
    pub op: Option<OperatorId>,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(node: NodeRef, op: Option<OperatorId>, kind: impl Into<DiagnosticKind>) -> Self {
        Self {
            node,
            op,
            kind: kind.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            Some(op) => write!(f, "{} [{}]: {}", self.node, op, self.kind),
            None => write!(f, "{}: {}", self.node, self.kind),
        }
    }
}

impl std::error::Error for Diagnostic {}
