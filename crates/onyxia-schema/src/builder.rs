//! Fluent construction of operator schemas.
//!
//! The builder only accumulates. All structural checks run in
//! [`SchemaBuilder::build`], which either yields a valid [`OpSchema`] or names
//! the first rule the declaration breaks.
//!
//! # Example
//!
//! ```
//! use onyxia_onnx::{AttributeType, AttributeValue};
//! use onyxia_schema::{AttrRequirement, FormalArity, SchemaBuilder, SchemaRegistry};
//!
//! let mut registry = SchemaRegistry::new();
//! SchemaBuilder::new("Scale", 1)
//!     .attr(
//!         "scale",
//!         "The scale to apply.",
//!         AttributeType::Float,
//!         AttrRequirement::OptionalWithDefault(AttributeValue::Float(1.0)),
//!     )
//!     .input(0, "input", "Input data to be scaled", "T", FormalArity::Single)
//!     .output(0, "output", "Output data after scaling", "T", FormalArity::Single)
//!     .type_constraint("T", ["tensor(float16)", "tensor(float)", "tensor(double)"], "")
//!     .finalize(&mut registry)?;
//!
//! assert!(registry.lookup("", "Scale", 1).is_ok());
//! # Ok::<(), onyxia_schema::RegistrationError>(())
//! ```

use crate::error::{RegistrationError, SchemaRule, SlotKind};
use crate::inference::InferenceFunction;
use crate::registry::SchemaRegistry;
use crate::schema::{
    AttrRequirement, AttributeSpec, FormalArity, IoSpec, OpSchema, OperatorId, Permissiveness,
    SlotType, SupportLevel, TypeConstraint,
};
use onyxia_onnx::{AttributeType, DataType};
use std::collections::HashSet;

/// A formal slot as declared, before its type string is resolved.
struct PendingIo {
    index: usize,
    name: String,
    doc: String,
    type_str: String,
    arity: FormalArity,
}

struct PendingConstraint {
    variable: String,
    allowed: Vec<String>,
    doc: String,
}

/// Accumulates one operator schema declaration.
pub struct SchemaBuilder {
    domain: String,
    name: String,
    since_version: i64,
    doc: String,
    support_level: SupportLevel,
    permissiveness: Permissiveness,
    attributes: Vec<AttributeSpec>,
    inputs: Vec<PendingIo>,
    outputs: Vec<PendingIo>,
    constraints: Vec<PendingConstraint>,
    inference: Option<Box<dyn InferenceFunction>>,
}

impl SchemaBuilder {
    /// Start a schema in the default domain.
    pub fn new(name: impl Into<String>, since_version: i64) -> Self {
        Self {
            domain: String::new(),
            name: name.into(),
            since_version,
            doc: String::new(),
            support_level: SupportLevel::default(),
            permissiveness: Permissiveness::default(),
            attributes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            constraints: Vec::new(),
            inference: None,
        }
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn support_level(mut self, level: SupportLevel) -> Self {
        self.support_level = level;
        self
    }

    /// Accept attributes the schema does not declare.
    pub fn allow_unchecked_attributes(mut self) -> Self {
        self.permissiveness = Permissiveness::AllowUnchecked;
        self
    }

    /// Declare an attribute.
    pub fn attr(
        mut self,
        name: impl Into<String>,
        doc: impl Into<String>,
        attr_type: AttributeType,
        requirement: AttrRequirement,
    ) -> Self {
        self.attributes.push(AttributeSpec {
            name: name.into(),
            attr_type,
            requirement,
            doc: doc.into(),
        });
        self
    }

    /// Declare formal input `index`.
    ///
    /// `type_str` is either a type-constraint variable or a concrete type
    /// string such as `"tensor(int64)"`.
    pub fn input(
        mut self,
        index: usize,
        name: impl Into<String>,
        doc: impl Into<String>,
        type_str: impl Into<String>,
        arity: FormalArity,
    ) -> Self {
        self.inputs.push(PendingIo {
            index,
            name: name.into(),
            doc: doc.into(),
            type_str: type_str.into(),
            arity,
        });
        self
    }

    /// Declare formal output `index`.
    pub fn output(
        mut self,
        index: usize,
        name: impl Into<String>,
        doc: impl Into<String>,
        type_str: impl Into<String>,
        arity: FormalArity,
    ) -> Self {
        self.outputs.push(PendingIo {
            index,
            name: name.into(),
            doc: doc.into(),
            type_str: type_str.into(),
            arity,
        });
        self
    }

    /// Declare a type-constraint variable and its allowed type strings.
    pub fn type_constraint<I, S>(
        mut self,
        variable: impl Into<String>,
        allowed: I,
        doc: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.constraints.push(PendingConstraint {
            variable: variable.into(),
            allowed: allowed
                .into_iter()
                .map(|s| s.as_ref().to_string())
                .collect(),
            doc: doc.into(),
        });
        self
    }

    /// Attach the shape/type inference function.
    pub fn inference_function(mut self, function: impl InferenceFunction + 'static) -> Self {
        self.inference = Some(Box::new(function));
        self
    }

    /// Run the structural checks and produce the schema.
    pub fn build(self) -> Result<OpSchema, RegistrationError> {
        let id = OperatorId::new(&self.domain, self.name, self.since_version);
        let fail = |rule: SchemaRule| RegistrationError::Definition {
            op: id.clone(),
            rule,
        };

        if id.name.is_empty() {
            return Err(fail(SchemaRule::EmptyName));
        }
        if id.since_version < 1 {
            return Err(fail(SchemaRule::InvalidVersion(id.since_version)));
        }

        check_attributes(&self.attributes).map_err(&fail)?;
        let constraints = resolve_constraints(self.constraints).map_err(&fail)?;
        let inputs = resolve_slots(SlotKind::Input, self.inputs, &constraints).map_err(&fail)?;
        let outputs =
            resolve_slots(SlotKind::Output, self.outputs, &constraints).map_err(&fail)?;

        Ok(OpSchema {
            id,
            doc: self.doc,
            attributes: self.attributes,
            inputs,
            outputs,
            constraints,
            support_level: self.support_level,
            permissiveness: self.permissiveness,
            inference: self.inference,
        })
    }

    /// Build the schema and register it.
    pub fn finalize(self, registry: &mut SchemaRegistry) -> Result<(), RegistrationError> {
        registry.register(self.build()?)
    }
}

fn check_attributes(attributes: &[AttributeSpec]) -> Result<(), SchemaRule> {
    let mut seen = HashSet::new();
    for attr in attributes {
        if !seen.insert(attr.name.as_str()) {
            return Err(SchemaRule::DuplicateAttribute(attr.name.clone()));
        }
        if let Some(default) = attr.default_value()
            && default.kind() != attr.attr_type
        {
            return Err(SchemaRule::DefaultTypeMismatch {
                attribute: attr.name.clone(),
                declared: attr.attr_type,
                actual: default.kind(),
            });
        }
    }
    Ok(())
}

fn resolve_constraints(
    pending: Vec<PendingConstraint>,
) -> Result<Vec<TypeConstraint>, SchemaRule> {
    let mut seen = HashSet::new();
    let mut constraints = Vec::with_capacity(pending.len());

    for constraint in pending {
        if !seen.insert(constraint.variable.clone()) {
            return Err(SchemaRule::DuplicateConstraint(constraint.variable));
        }
        if constraint.allowed.is_empty() {
            return Err(SchemaRule::EmptyConstraint(constraint.variable));
        }

        let mut allowed = Vec::with_capacity(constraint.allowed.len());
        for type_str in &constraint.allowed {
            let dtype = DataType::from_type_str(type_str).map_err(|_| {
                SchemaRule::UnknownTypeString {
                    variable: constraint.variable.clone(),
                    type_str: type_str.clone(),
                }
            })?;
            if !allowed.contains(&dtype) {
                allowed.push(dtype);
            }
        }

        constraints.push(TypeConstraint {
            variable: constraint.variable,
            allowed,
            doc: constraint.doc,
        });
    }

    Ok(constraints)
}

fn resolve_slots(
    kind: SlotKind,
    mut pending: Vec<PendingIo>,
    constraints: &[TypeConstraint],
) -> Result<Vec<IoSpec>, SchemaRule> {
    pending.sort_by_key(|slot| slot.index);

    let count = pending.len();
    let mut slots = Vec::with_capacity(count);
    for (position, slot) in pending.into_iter().enumerate() {
        if slot.index != position {
            return Err(SchemaRule::SlotIndex {
                kind,
                index: slot.index,
            });
        }
        if slot.arity == FormalArity::Variadic && position + 1 != count {
            return Err(SchemaRule::VariadicNotLast {
                kind,
                slot: slot.name,
            });
        }

        let slot_type = if constraints.iter().any(|c| c.variable == slot.type_str) {
            SlotType::Variable(slot.type_str)
        } else {
            match DataType::from_type_str(&slot.type_str) {
                Ok(dtype) => SlotType::Fixed(dtype),
                Err(_) => {
                    return Err(SchemaRule::UndefinedTypeVariable {
                        kind,
                        slot: slot.name,
                        type_str: slot.type_str,
                    });
                }
            }
        };

        slots.push(IoSpec {
            name: slot.name,
            slot_type,
            arity: slot.arity,
            doc: slot.doc,
        });
    }

    Ok(slots)
}
