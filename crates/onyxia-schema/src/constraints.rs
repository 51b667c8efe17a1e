//! Binding of type-constraint variables to concrete element types.

use crate::error::{ConstraintViolation, SlotKind};
use crate::schema::{OpSchema, SlotType};
use onyxia_onnx::DataType;
use std::collections::BTreeMap;

/// Element types bound to a schema's type-constraint variables for one node.
///
/// Variables with no operand of known type stay unbound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeBindings {
    bound: BTreeMap<String, DataType>,
}

impl TypeBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type bound to `variable`, if any operand fixed it.
    pub fn get(&self, variable: &str) -> Option<DataType> {
        self.bound.get(variable).copied()
    }

    pub fn is_bound(&self, variable: &str) -> bool {
        self.bound.contains_key(variable)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DataType)> {
        self.bound.iter().map(|(var, dtype)| (var.as_str(), *dtype))
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

/// Checks observed operand element types against a schema's constraints.
///
/// The first operand of known type referring to a variable binds it. Every
/// later operand under the same variable must carry exactly that type.
///
/// ```
/// use onyxia_onnx::DataType;
/// use onyxia_schema::{ConstraintViolation, FormalArity, SchemaBuilder, TypeConstraintResolver};
///
/// let schema = SchemaBuilder::new("Add", 7)
///     .input(0, "A", "", "T", FormalArity::Single)
///     .input(1, "B", "", "T", FormalArity::Single)
///     .output(0, "C", "", "T", FormalArity::Single)
///     .type_constraint("T", ["tensor(int32)", "tensor(int64)"], "")
///     .build()?;
///
/// let resolver = TypeConstraintResolver::new(&schema);
/// let err = resolver
///     .resolve(&[Some(DataType::I32), Some(DataType::I64)], &[None])
///     .unwrap_err();
/// assert!(matches!(err, ConstraintViolation::Conflict { .. }));
/// # Ok::<(), onyxia_schema::RegistrationError>(())
/// ```
pub struct TypeConstraintResolver<'a> {
    schema: &'a OpSchema,
}

impl<'a> TypeConstraintResolver<'a> {
    pub fn new(schema: &'a OpSchema) -> Self {
        Self { schema }
    }

    /// Bind variables from input then output operand types.
    ///
    /// `None` entries are absent operands or operands of unknown type.
    pub fn resolve(
        &self,
        inputs: &[Option<DataType>],
        outputs: &[Option<DataType>],
    ) -> Result<TypeBindings, ConstraintViolation> {
        let mut bindings = TypeBindings::new();
        self.bind(&mut bindings, SlotKind::Input, inputs)?;
        self.bind(&mut bindings, SlotKind::Output, outputs)?;
        Ok(bindings)
    }

    /// Check output types produced by inference against existing bindings.
    ///
    /// Variables still open are bound by the outputs.
    pub fn check_outputs(
        &self,
        bindings: &mut TypeBindings,
        outputs: &[Option<DataType>],
    ) -> Result<(), ConstraintViolation> {
        self.bind(bindings, SlotKind::Output, outputs)
    }

    fn bind(
        &self,
        bindings: &mut TypeBindings,
        kind: SlotKind,
        operands: &[Option<DataType>],
    ) -> Result<(), ConstraintViolation> {
        for (index, observed) in operands.iter().enumerate() {
            let Some(dtype) = *observed else {
                continue;
            };
            let formal = match kind {
                SlotKind::Input => self.schema.input_formal(index),
                SlotKind::Output => self.schema.output_formal(index),
            };
            // Excess operands are reported by the arity check.
            let Some(formal) = formal else {
                continue;
            };
            let slot = || format!("{} {} ('{}')", kind, index, formal.name);

            match &formal.slot_type {
                SlotType::Fixed(expected) => {
                    if dtype != *expected {
                        return Err(ConstraintViolation::FixedType {
                            expected: *expected,
                            actual: dtype,
                            slot: slot(),
                        });
                    }
                }
                SlotType::Variable(variable) => {
                    let allowed = self
                        .schema
                        .type_constraint(variable)
                        .is_some_and(|constraint| constraint.allows(dtype));
                    if !allowed {
                        return Err(ConstraintViolation::Disallowed {
                            variable: variable.clone(),
                            dtype,
                            slot: slot(),
                        });
                    }

                    match bindings.get(variable) {
                        Some(bound) if bound != dtype => {
                            return Err(ConstraintViolation::Conflict {
                                variable: variable.clone(),
                                type_a: bound,
                                type_b: dtype,
                                slot: slot(),
                            });
                        }
                        Some(_) => {}
                        None => {
                            tracing::trace!(variable = %variable, %dtype, "bound type variable");
                            bindings.bound.insert(variable.clone(), dtype);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SchemaBuilder;
    use crate::schema::FormalArity;

    fn slice_schema() -> OpSchema {
        SchemaBuilder::new("DynamicSlice", 1)
            .input(0, "data", "", "T", FormalArity::Single)
            .input(1, "starts", "", "Tind", FormalArity::Single)
            .input(2, "ends", "", "Tind", FormalArity::Single)
            .input(3, "axes", "", "Tind", FormalArity::Optional)
            .output(0, "output", "", "T", FormalArity::Single)
            .type_constraint("T", onyxia_onnx::all_tensor_types(), "")
            .type_constraint("Tind", ["tensor(int32)", "tensor(int64)"], "")
            .build()
            .unwrap()
    }

    #[test]
    fn test_binds_each_variable_independently() {
        let schema = slice_schema();
        let bindings = TypeConstraintResolver::new(&schema)
            .resolve(
                &[
                    Some(DataType::F32),
                    Some(DataType::I64),
                    Some(DataType::I64),
                ],
                &[None],
            )
            .unwrap();

        assert_eq!(bindings.get("T"), Some(DataType::F32));
        assert_eq!(bindings.get("Tind"), Some(DataType::I64));
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    fn test_conflicting_binding() {
        let schema = slice_schema();
        let err = TypeConstraintResolver::new(&schema)
            .resolve(
                &[
                    Some(DataType::F32),
                    Some(DataType::I32),
                    Some(DataType::I64),
                ],
                &[],
            )
            .unwrap_err();

        assert_eq!(
            err,
            ConstraintViolation::Conflict {
                variable: "Tind".to_string(),
                type_a: DataType::I32,
                type_b: DataType::I64,
                slot: "input 2 ('ends')".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_types_leave_variable_open() {
        let schema = slice_schema();
        let bindings = TypeConstraintResolver::new(&schema)
            .resolve(&[None, None, Some(DataType::I32)], &[None])
            .unwrap();

        assert!(!bindings.is_bound("T"));
        assert_eq!(bindings.get("Tind"), Some(DataType::I32));
    }

    #[test]
    fn test_disallowed_type() {
        let schema = slice_schema();
        let err = TypeConstraintResolver::new(&schema)
            .resolve(&[Some(DataType::F32), Some(DataType::F32)], &[])
            .unwrap_err();

        assert!(matches!(
            err,
            ConstraintViolation::Disallowed { ref variable, dtype: DataType::F32, .. } if variable == "Tind"
        ));
    }

    #[test]
    fn test_output_checked_against_input_binding() {
        let schema = slice_schema();
        let resolver = TypeConstraintResolver::new(&schema);
        let mut bindings = resolver.resolve(&[Some(DataType::F16)], &[None]).unwrap();

        assert!(
            resolver
                .check_outputs(&mut bindings, &[Some(DataType::F16)])
                .is_ok()
        );
        let err = resolver
            .check_outputs(&mut bindings, &[Some(DataType::F64)])
            .unwrap_err();
        assert!(matches!(
            err,
            ConstraintViolation::Conflict {
                type_a: DataType::F16,
                type_b: DataType::F64,
                ..
            }
        ));
    }

    #[test]
    fn test_fixed_slot_type() {
        let schema = SchemaBuilder::new("Shape", 1)
            .input(0, "data", "", "T", FormalArity::Single)
            .output(0, "shape", "", "tensor(int64)", FormalArity::Single)
            .type_constraint("T", onyxia_onnx::all_tensor_types(), "")
            .build()
            .unwrap();
        let resolver = TypeConstraintResolver::new(&schema);

        assert!(resolver.resolve(&[None], &[Some(DataType::I64)]).is_ok());
        assert_eq!(
            resolver
                .resolve(&[None], &[Some(DataType::I32)])
                .unwrap_err(),
            ConstraintViolation::FixedType {
                expected: DataType::I64,
                actual: DataType::I32,
                slot: "output 0 ('shape')".to_string(),
            }
        );
    }

    #[test]
    fn test_variadic_operands_share_variable() {
        let schema = SchemaBuilder::new("Sum", 8)
            .input(0, "data_0", "", "T", FormalArity::Variadic)
            .output(0, "sum", "", "T", FormalArity::Single)
            .type_constraint("T", ["tensor(float)", "tensor(double)"], "")
            .build()
            .unwrap();
        let resolver = TypeConstraintResolver::new(&schema);

        let ok = [Some(DataType::F64), None, Some(DataType::F64)];
        assert!(resolver.resolve(&ok, &[]).is_ok());

        let mixed = [Some(DataType::F64), Some(DataType::F32)];
        assert!(resolver.resolve(&mixed, &[]).is_err());
    }
}
