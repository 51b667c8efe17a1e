//! Checks of a node's attributes and operand counts against its schema.

use crate::error::{ArityError, AttributeError, SlotKind};
use crate::schema::{FormalArity, IoSpec, OpSchema, Permissiveness};
use onyxia_onnx::{AttributeValue, Node};
use std::collections::HashMap;

/// Validates concrete attribute values against a schema's declarations.
///
/// Every declared attribute must be present or optional, and a present value
/// must have the declared kind. Under [`Permissiveness::Strict`] undeclared
/// attributes are rejected. Schema defaults are never checked here: they
/// were checked when the schema was built.
///
/// ```
/// use onyxia_onnx::{AttributeType, AttributeValue};
/// use onyxia_schema::{AttrRequirement, AttributeError, AttributeValidator, SchemaBuilder};
/// use std::collections::HashMap;
///
/// let schema = SchemaBuilder::new("LeakyRelu", 6)
///     .attr("alpha", "", AttributeType::Float, AttrRequirement::Required)
///     .build()?;
///
/// let attrs = HashMap::from([("alpha".to_string(), AttributeValue::Int(1))]);
/// let errors = AttributeValidator::new(&schema).validate(&attrs);
/// assert!(matches!(errors[0], AttributeError::TypeMismatch { .. }));
/// # Ok::<(), onyxia_schema::RegistrationError>(())
/// ```
pub struct AttributeValidator<'a> {
    schema: &'a OpSchema,
}

impl<'a> AttributeValidator<'a> {
    pub fn new(schema: &'a OpSchema) -> Self {
        Self { schema }
    }

    /// Validate `attributes`, returning every problem found.
    ///
    /// Declared attributes are reported in declaration order, followed by
    /// undeclared ones sorted by name.
    pub fn validate(&self, attributes: &HashMap<String, AttributeValue>) -> Vec<AttributeError> {
        let mut errors = Vec::new();

        for spec in self.schema.attributes() {
            match attributes.get(&spec.name) {
                Some(value) if value.kind() != spec.attr_type => {
                    errors.push(AttributeError::TypeMismatch {
                        attribute: spec.name.clone(),
                        expected: spec.attr_type,
                        actual: value.kind(),
                    });
                }
                Some(_) => {}
                None if spec.is_required() => {
                    errors.push(AttributeError::MissingRequired {
                        attribute: spec.name.clone(),
                    });
                }
                None => {}
            }
        }

        if self.schema.permissiveness() == Permissiveness::Strict {
            let mut unexpected: Vec<&String> = attributes
                .keys()
                .filter(|name| self.schema.attribute(name).is_none())
                .collect();
            unexpected.sort();
            errors.extend(
                unexpected
                    .into_iter()
                    .map(|name| AttributeError::UnexpectedAttribute {
                        attribute: name.clone(),
                    }),
            );
        }

        errors
    }
}

/// Check a node's operand lists against the schema's formal slots.
///
/// Empty operand names stand for absent optional operands and still count
/// toward the total.
pub fn check_arity(schema: &OpSchema, node: &Node) -> Vec<ArityError> {
    let mut errors = Vec::new();
    check_operands(
        &mut errors,
        SlotKind::Input,
        schema.inputs(),
        &node.inputs,
        schema.min_inputs(),
        schema.max_inputs(),
    );
    check_operands(
        &mut errors,
        SlotKind::Output,
        schema.outputs(),
        &node.outputs,
        schema.min_outputs(),
        schema.max_outputs(),
    );
    errors
}

fn check_operands(
    errors: &mut Vec<ArityError>,
    kind: SlotKind,
    formals: &[IoSpec],
    operands: &[String],
    min: usize,
    max: Option<usize>,
) {
    let actual = operands.len();
    if actual < min || max.is_some_and(|max| actual > max) {
        errors.push(ArityError::Count {
            kind,
            min,
            max,
            actual,
        });
        return;
    }

    for (index, (formal, operand)) in formals.iter().zip(operands).enumerate() {
        if formal.arity == FormalArity::Single && operand.is_empty() {
            errors.push(ArityError::MissingOperand {
                kind,
                slot: formal.name.clone(),
                index,
            });
        }
    }
}
