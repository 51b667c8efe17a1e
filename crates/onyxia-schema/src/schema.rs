//! Operator schema data model.
//!
//! An [`OpSchema`] describes one version of one operator: its attributes,
//! formal inputs and outputs, the type-constraint variables those slots refer
//! to, and an optional inference function. Schemas are only constructed
//! through [`SchemaBuilder`](crate::SchemaBuilder), so every `OpSchema` in a
//! registry has passed the structural checks in `build()`.

use crate::inference::InferenceFunction;
use onyxia_onnx::{AttributeType, AttributeValue, DataType, ONNX_DOMAIN, normalize_domain};
use std::fmt;

/// Identity of one operator schema version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperatorId {
    /// Normalized domain ("" for the default ONNX domain).
    pub domain: String,
    pub name: String,
    pub since_version: i64,
}

impl OperatorId {
    /// Create an identity, normalizing the domain.
    pub fn new(domain: &str, name: impl Into<String>, since_version: i64) -> Self {
        Self {
            domain: normalize_domain(domain).to_string(),
            name: name.into(),
            since_version,
        }
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let domain = if self.domain.is_empty() {
            ONNX_DOMAIN
        } else {
            &self.domain
        };
        write!(f, "{}::{}-{}", domain, self.name, self.since_version)
    }
}

/// Whether an attribute must be present, and what fills it in when absent.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrRequirement {
    Required,
    OptionalNoDefault,
    OptionalWithDefault(AttributeValue),
}

/// One declared attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub name: String,
    pub attr_type: AttributeType,
    pub requirement: AttrRequirement,
    pub doc: String,
}

impl AttributeSpec {
    pub fn is_required(&self) -> bool {
        matches!(self.requirement, AttrRequirement::Required)
    }

    /// Schema-declared default, if any.
    pub fn default_value(&self) -> Option<&AttributeValue> {
        match &self.requirement {
            AttrRequirement::OptionalWithDefault(value) => Some(value),
            _ => None,
        }
    }
}

/// How many operands a formal input or output slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormalArity {
    /// Exactly one operand.
    Single,
    /// Zero or one operand.
    Optional,
    /// Zero or more operands; only allowed in the last position.
    Variadic,
}

/// Element type a slot is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotType {
    /// Shares a type-constraint variable with other slots.
    Variable(String),
    /// Fixed element type written directly as a type string.
    Fixed(DataType),
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotType::Variable(var) => f.write_str(var),
            SlotType::Fixed(dtype) => f.write_str(&dtype.type_str()),
        }
    }
}

/// One formal input or output.
#[derive(Debug, Clone, PartialEq)]
pub struct IoSpec {
    pub name: String,
    pub slot_type: SlotType,
    pub arity: FormalArity,
    pub doc: String,
}

/// A type-constraint variable and the element types it may bind to.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeConstraint {
    pub variable: String,
    /// Non-empty, in declaration order, without duplicates.
    pub allowed: Vec<DataType>,
    pub doc: String,
}

impl TypeConstraint {
    pub fn allows(&self, dtype: DataType) -> bool {
        self.allowed.contains(&dtype)
    }
}

/// Maturity of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SupportLevel {
    #[default]
    Common,
    Experimental,
}

/// Whether attributes the schema does not declare are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Permissiveness {
    #[default]
    Strict,
    AllowUnchecked,
}

/// A validated operator schema.
pub struct OpSchema {
    pub(crate) id: OperatorId,
    pub(crate) doc: String,
    pub(crate) attributes: Vec<AttributeSpec>,
    pub(crate) inputs: Vec<IoSpec>,
    pub(crate) outputs: Vec<IoSpec>,
    pub(crate) constraints: Vec<TypeConstraint>,
    pub(crate) support_level: SupportLevel,
    pub(crate) permissiveness: Permissiveness,
    pub(crate) inference: Option<Box<dyn InferenceFunction>>,
}

impl OpSchema {
    pub fn id(&self) -> &OperatorId {
        &self.id
    }

    pub fn domain(&self) -> &str {
        &self.id.domain
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn since_version(&self) -> i64 {
        self.id.since_version
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }

    /// Look up a declared attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn inputs(&self) -> &[IoSpec] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[IoSpec] {
        &self.outputs
    }

    pub fn type_constraints(&self) -> &[TypeConstraint] {
        &self.constraints
    }

    /// Look up a type constraint by variable name.
    pub fn type_constraint(&self, variable: &str) -> Option<&TypeConstraint> {
        self.constraints.iter().find(|c| c.variable == variable)
    }

    pub fn support_level(&self) -> SupportLevel {
        self.support_level
    }

    pub fn permissiveness(&self) -> Permissiveness {
        self.permissiveness
    }

    pub fn inference_function(&self) -> Option<&dyn InferenceFunction> {
        self.inference.as_deref()
    }

    pub fn has_inference_function(&self) -> bool {
        self.inference.is_some()
    }

    /// Formal input backing the operand at `index`.
    ///
    /// Operands past the last formal belong to it when it is variadic.
    pub fn input_formal(&self, index: usize) -> Option<&IoSpec> {
        formal_for(&self.inputs, index)
    }

    /// Formal output backing the operand at `index`.
    pub fn output_formal(&self, index: usize) -> Option<&IoSpec> {
        formal_for(&self.outputs, index)
    }

    /// Minimum number of input operands a node must list.
    pub fn min_inputs(&self) -> usize {
        min_operands(&self.inputs)
    }

    /// Maximum number of input operands, `None` when unbounded.
    pub fn max_inputs(&self) -> Option<usize> {
        max_operands(&self.inputs)
    }

    pub fn min_outputs(&self) -> usize {
        min_operands(&self.outputs)
    }

    pub fn max_outputs(&self) -> Option<usize> {
        max_operands(&self.outputs)
    }
}

impl fmt::Debug for OpSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpSchema")
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("constraints", &self.constraints)
            .field("support_level", &self.support_level)
            .field("permissiveness", &self.permissiveness)
            .field(
                "inference",
                &self.inference.as_ref().map(|function| function.name()),
            )
            .finish_non_exhaustive()
    }
}

fn formal_for(formals: &[IoSpec], index: usize) -> Option<&IoSpec> {
    match formals.get(index) {
        Some(formal) => Some(formal),
        None => formals
            .last()
            .filter(|last| last.arity == FormalArity::Variadic),
    }
}

// Optional slots before a Single still need a placeholder operand.
fn min_operands(formals: &[IoSpec]) -> usize {
    formals
        .iter()
        .rposition(|formal| formal.arity == FormalArity::Single)
        .map_or(0, |pos| pos + 1)
}

fn max_operands(formals: &[IoSpec]) -> Option<usize> {
    match formals.last() {
        Some(last) if last.arity == FormalArity::Variadic => None,
        _ => Some(formals.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io(name: &str, arity: FormalArity) -> IoSpec {
        IoSpec {
            name: name.to_string(),
            slot_type: SlotType::Variable("T".to_string()),
            arity,
            doc: String::new(),
        }
    }

    #[test]
    fn test_operator_id_display() {
        assert_eq!(
            OperatorId::new("", "Scale", 1).to_string(),
            "ai.onnx::Scale-1"
        );
        assert_eq!(
            OperatorId::new("ai.onnx", "Scale", 1),
            OperatorId::new("", "Scale", 1)
        );
        assert_eq!(
            OperatorId::new("com.example", "Foo", 3).to_string(),
            "com.example::Foo-3"
        );
    }

    #[test]
    fn test_operand_bounds() {
        let formals = vec![
            io("data", FormalArity::Single),
            io("starts", FormalArity::Single),
            io("axes", FormalArity::Optional),
        ];
        assert_eq!(min_operands(&formals), 2);
        assert_eq!(max_operands(&formals), Some(3));

        let optional_first = vec![io("shape", FormalArity::Optional)];
        assert_eq!(min_operands(&optional_first), 0);
        assert_eq!(max_operands(&optional_first), Some(1));

        let variadic = vec![io("input", FormalArity::Variadic)];
        assert_eq!(min_operands(&variadic), 0);
        assert_eq!(max_operands(&variadic), None);
        assert_eq!(formal_for(&variadic, 5).map(|f| f.name.as_str()), Some("input"));

        assert!(formal_for(&optional_first, 1).is_none());
    }
}
