//! Inference function contract and the per-node inference context.
//!
//! An [`InferenceFunction`] reads a node's attributes and the known types and
//! shapes of its inputs through an [`InferenceContext`], and writes element
//! types and shapes for the node's outputs. Writes land in the context only;
//! the driving pass decides whether they reach the graph.

use crate::constraints::TypeBindings;
use crate::error::InferenceFailure;
use crate::schema::OpSchema;
use onyxia_onnx::{AttributeValue, DataType, Dimension, Node, TensorInfo, TensorShape};

/// How an inference function finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceOutcome {
    /// Outputs were computed from what is known.
    Inferred,
    /// Shapes depend on tensor contents only known at run time.
    Deferred,
}

/// Shape and type inference for one operator family.
///
/// Implementations must be pure: the same context contents always give the
/// same writes and outcome.
///
/// # Example
///
/// ```
/// use onyxia_schema::{InferenceContext, InferenceFailure, InferenceFunction, InferenceOutcome};
///
/// struct FirstInputType;
///
/// impl InferenceFunction for FirstInputType {
///     fn name(&self) -> &str {
///         "first_input_type"
///     }
///
///     fn infer(&self, ctx: &mut InferenceContext<'_>) -> Result<InferenceOutcome, InferenceFailure> {
///         onyxia_schema::propagate_elem_type_from_input_to_output(ctx, 0, 0)?;
///         Ok(InferenceOutcome::Inferred)
///     }
/// }
/// ```
pub trait InferenceFunction: Send + Sync {
    /// Name used in logs and debug output.
    fn name(&self) -> &str;

    /// Compute output types and shapes.
    fn infer(&self, ctx: &mut InferenceContext<'_>) -> Result<InferenceOutcome, InferenceFailure>;
}

/// Element type and shape of one operand, each possibly unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TensorType {
    pub dtype: Option<DataType>,
    pub shape: TensorShape,
}

impl TensorType {
    pub fn new(dtype: Option<DataType>, shape: TensorShape) -> Self {
        Self { dtype, shape }
    }
}

impl From<&TensorInfo> for TensorType {
    fn from(info: &TensorInfo) -> Self {
        Self {
            dtype: info.dtype,
            shape: info.shape.clone(),
        }
    }
}

/// Read view of one node and its inputs, write view of its outputs.
pub struct InferenceContext<'a> {
    node: &'a Node,
    schema: &'a OpSchema,
    bindings: &'a TypeBindings,
    inputs: Vec<Option<TensorType>>,
    outputs: Vec<TensorType>,
}

impl<'a> InferenceContext<'a> {
    /// Create a context.
    ///
    /// `inputs` has one entry per node input, `None` for absent operands.
    /// `outputs` starts as the descriptors already declared for the node's
    /// outputs; shape updates merge with them.
    pub fn new(
        node: &'a Node,
        schema: &'a OpSchema,
        bindings: &'a TypeBindings,
        inputs: Vec<Option<TensorType>>,
        outputs: Vec<TensorType>,
    ) -> Self {
        Self {
            node,
            schema,
            bindings,
            inputs,
            outputs,
        }
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn schema(&self) -> &'a OpSchema {
        self.schema
    }

    // --- Attribute accessors ---

    /// Attribute value from the node, or the schema default when absent.
    pub fn attribute(&self, name: &str) -> Option<&'a AttributeValue> {
        self.node
            .attributes
            .get(name)
            .or_else(|| self.schema.attribute(name)?.default_value())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Get an INT attribute.
    pub fn attr_int(&self, name: &str) -> Result<Option<i64>, InferenceFailure> {
        match self.attribute(name) {
            None => Ok(None),
            Some(AttributeValue::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(kind_mismatch(name, "INT", other)),
        }
    }

    /// Get an INTS attribute.
    pub fn attr_ints(&self, name: &str) -> Result<Option<&'a [i64]>, InferenceFailure> {
        match self.attribute(name) {
            None => Ok(None),
            Some(AttributeValue::Ints(v)) => Ok(Some(v)),
            Some(other) => Err(kind_mismatch(name, "INTS", other)),
        }
    }

    /// Get a FLOAT attribute.
    pub fn attr_float(&self, name: &str) -> Result<Option<f32>, InferenceFailure> {
        match self.attribute(name) {
            None => Ok(None),
            Some(AttributeValue::Float(v)) => Ok(Some(*v)),
            Some(other) => Err(kind_mismatch(name, "FLOAT", other)),
        }
    }

    // --- Input accessors ---

    /// Number of input operands, absent ones included.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Check if input `index` is present.
    pub fn has_input(&self, index: usize) -> bool {
        matches!(self.inputs.get(index), Some(Some(_)))
    }

    /// Element type of input `index`, if present and known.
    pub fn input_type(&self, index: usize) -> Option<DataType> {
        self.inputs.get(index)?.as_ref()?.dtype
    }

    /// Shape of input `index`, if present and at least its rank is known.
    pub fn input_shape(&self, index: usize) -> Option<&TensorShape> {
        let shape = &self.inputs.get(index)?.as_ref()?.shape;
        shape.is_ranked().then_some(shape)
    }

    pub fn has_input_shape(&self, index: usize) -> bool {
        self.input_shape(index).is_some()
    }

    /// Type bound to a constraint variable before inference ran.
    pub fn bound_type(&self, variable: &str) -> Option<DataType> {
        self.bindings.get(variable)
    }

    // --- Output accessors ---

    pub fn output_type(&self, index: usize) -> Option<DataType> {
        self.outputs.get(index)?.dtype
    }

    pub fn output_shape(&self, index: usize) -> Option<&TensorShape> {
        self.outputs.get(index).map(|output| &output.shape)
    }

    /// Set the element type of output `index`.
    ///
    /// Fails if the output already carries a different declared type.
    pub fn set_output_type(&mut self, index: usize, dtype: DataType) -> Result<(), InferenceFailure> {
        let output = self.output_mut(index)?;
        match output.dtype {
            Some(existing) if existing != dtype => Err(InferenceFailure::new(format!(
                "output {} is declared as {}, inferred {}",
                index, existing, dtype
            ))),
            _ => {
                output.dtype = Some(dtype);
                Ok(())
            }
        }
    }

    /// Replace the shape of output `index`.
    pub fn set_output_shape(
        &mut self,
        index: usize,
        shape: TensorShape,
    ) -> Result<(), InferenceFailure> {
        self.output_mut(index)?.shape = shape;
        Ok(())
    }

    /// Merge `shape` into the shape already known for output `index`.
    ///
    /// See [`merge_shapes`] for the rules.
    pub fn update_output_shape(
        &mut self,
        index: usize,
        shape: &TensorShape,
    ) -> Result<(), InferenceFailure> {
        let output = self.output_mut(index)?;
        let merged = merge_shapes(&output.shape, shape)
            .map_err(|e| InferenceFailure::new(format!("output {}: {}", index, e.message)))?;
        output.shape = merged;
        Ok(())
    }

    /// Consume the context, returning the staged output descriptors.
    pub fn into_outputs(self) -> Vec<TensorType> {
        self.outputs
    }

    fn output_mut(&mut self, index: usize) -> Result<&mut TensorType, InferenceFailure> {
        let count = self.outputs.len();
        self.outputs.get_mut(index).ok_or_else(|| {
            InferenceFailure::new(format!(
                "output index {} out of range, node has {} outputs",
                index, count
            ))
        })
    }
}

fn kind_mismatch(name: &str, expected: &str, actual: &AttributeValue) -> InferenceFailure {
    InferenceFailure::new(format!(
        "attribute '{}' should be {}, got {}",
        name,
        expected,
        actual.kind()
    ))
}

/// Merge two partial descriptions of the same shape.
///
/// An unknown shape takes the other side. Ranked shapes must agree in rank;
/// per dimension a known size wins over a symbol, a symbol over an unknown,
/// and two different sizes or symbols are a failure.
pub fn merge_shapes(
    existing: &TensorShape,
    inferred: &TensorShape,
) -> Result<TensorShape, InferenceFailure> {
    let (current, new) = match (existing, inferred) {
        (TensorShape::Unknown, other) | (other, TensorShape::Unknown) => return Ok(other.clone()),
        (TensorShape::Ranked(a), TensorShape::Ranked(b)) => (a, b),
    };

    if current.len() != new.len() {
        return Err(InferenceFailure::new(format!(
            "rank mismatch: existing shape {} has rank {}, inferred {} has rank {}",
            existing,
            current.len(),
            inferred,
            new.len()
        )));
    }

    current
        .iter()
        .zip(new)
        .enumerate()
        .map(|(axis, (a, b))| merge_dimension(a, b, axis))
        .collect::<Result<Vec<_>, _>>()
        .map(TensorShape::Ranked)
}

fn merge_dimension(
    a: &Dimension,
    b: &Dimension,
    axis: usize,
) -> Result<Dimension, InferenceFailure> {
    match (a, b) {
        (Dimension::Unknown, other) | (other, Dimension::Unknown) => Ok(other.clone()),
        (Dimension::Static(x), Dimension::Static(y)) if x != y => Err(InferenceFailure::new(
            format!("dimension {} is {} but inferred {}", axis, x, y),
        )),
        (Dimension::Named(x), Dimension::Named(y)) if x != y => Err(InferenceFailure::new(
            format!("dimension {} is '{}' but inferred '{}'", axis, x, y),
        )),
        (Dimension::Static(n), _) | (_, Dimension::Static(n)) => Ok(Dimension::Static(*n)),
        (named, _) => Ok(named.clone()),
    }
}

// --- Helpers shared by inference functions ---

/// Copy the element type of input `input` to output `output`.
///
/// Does nothing when the input is absent or its type is unknown.
pub fn propagate_elem_type_from_input_to_output(
    ctx: &mut InferenceContext<'_>,
    input: usize,
    output: usize,
) -> Result<(), InferenceFailure> {
    match ctx.input_type(input) {
        Some(dtype) => ctx.set_output_type(output, dtype),
        None => Ok(()),
    }
}

/// Copy the shape of input `input` to output `output`.
///
/// Does nothing when the input's rank is unknown.
pub fn propagate_shape_from_input_to_output(
    ctx: &mut InferenceContext<'_>,
    input: usize,
    output: usize,
) -> Result<(), InferenceFailure> {
    match ctx.input_shape(input).cloned() {
        Some(shape) => ctx.update_output_shape(output, &shape),
        None => Ok(()),
    }
}

/// Pass-through: element type and shape of input 0 become those of output 0.
pub fn propagate_shape_and_type_from_first_input(
    ctx: &mut InferenceContext<'_>,
) -> Result<(), InferenceFailure> {
    propagate_elem_type_from_input_to_output(ctx, 0, 0)?;
    propagate_shape_from_input_to_output(ctx, 0, 0)
}

/// Convert shape attribute values to dimensions, rejecting negative values.
pub fn dims_from_ints(values: &[i64]) -> Result<Vec<Dimension>, InferenceFailure> {
    values
        .iter()
        .map(|&v| {
            if v < 0 {
                return Err(InferenceFailure::new(format!(
                    "Negative values are not allowed in a shape specification, got {}",
                    v
                )));
            }
            usize::try_from(v).map(Dimension::Static).map_err(|_| {
                InferenceFailure::new(format!(
                    "Dimension {} in a shape specification does not fit in usize",
                    v
                ))
            })
        })
        .collect()
}

/// Set output `output` to the shape given by INTS attribute `attr`.
pub fn propagate_shape_from_attribute_to_output(
    ctx: &mut InferenceContext<'_>,
    attr: &str,
    output: usize,
) -> Result<(), InferenceFailure> {
    let values = ctx.attr_ints(attr)?.ok_or_else(|| {
        InferenceFailure::new(format!("attribute '{}' is required to infer the shape", attr))
    })?;
    let dims = dims_from_ints(values)?;
    ctx.update_output_shape(output, &TensorShape::Ranked(dims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SchemaBuilder;
    use crate::schema::{AttrRequirement, FormalArity};
    use onyxia_onnx::AttributeType;

    fn schema() -> OpSchema {
        SchemaBuilder::new("Scale", 1)
            .attr(
                "scale",
                "",
                AttributeType::Float,
                AttrRequirement::OptionalWithDefault(AttributeValue::Float(1.0)),
            )
            .attr("shape", "", AttributeType::Ints, AttrRequirement::OptionalNoDefault)
            .input(0, "input", "", "T", FormalArity::Single)
            .output(0, "output", "", "T", FormalArity::Single)
            .type_constraint("T", ["tensor(float)", "tensor(double)"], "")
            .build()
            .unwrap()
    }

    fn float_input(dims: &[usize]) -> Option<TensorType> {
        Some(TensorType::new(
            Some(DataType::F32),
            TensorShape::fixed(dims),
        ))
    }

    #[test]
    fn test_attribute_falls_back_to_schema_default() {
        let schema = schema();
        let bindings = TypeBindings::new();
        let node = Node::new("Scale");
        let ctx = InferenceContext::new(&node, &schema, &bindings, vec![], vec![]);
        assert_eq!(ctx.attr_float("scale").unwrap(), Some(1.0));
        assert_eq!(ctx.attr_ints("shape").unwrap(), None);

        let node = Node::new("Scale").with_attr("scale", AttributeValue::Float(0.5));
        let ctx = InferenceContext::new(&node, &schema, &bindings, vec![], vec![]);
        assert_eq!(ctx.attr_float("scale").unwrap(), Some(0.5));
        assert!(ctx.attr_int("scale").is_err());
    }

    #[test]
    fn test_input_accessors() {
        let schema = schema();
        let bindings = TypeBindings::new();
        let node = Node::new("Scale");
        let inputs = vec![
            float_input(&[2, 4]),
            None,
            Some(TensorType::new(Some(DataType::I64), TensorShape::Unknown)),
        ];
        let ctx = InferenceContext::new(&node, &schema, &bindings, inputs, vec![]);

        assert_eq!(ctx.input_count(), 3);
        assert!(ctx.has_input(0));
        assert!(!ctx.has_input(1));
        assert!(!ctx.has_input(7));
        assert_eq!(ctx.input_type(0), Some(DataType::F32));
        assert_eq!(ctx.input_shape(0), Some(&TensorShape::fixed(&[2, 4])));
        assert_eq!(ctx.input_type(2), Some(DataType::I64));
        assert!(!ctx.has_input_shape(2));
        assert!(!ctx.has_input_shape(1));
    }

    #[test]
    fn test_pass_through_helpers() {
        let schema = schema();
        let bindings = TypeBindings::new();
        let node = Node::new("Scale");
        let mut ctx = InferenceContext::new(
            &node,
            &schema,
            &bindings,
            vec![float_input(&[2, 4])],
            vec![TensorType::default()],
        );

        propagate_shape_and_type_from_first_input(&mut ctx).unwrap();
        assert_eq!(
            ctx.into_outputs(),
            vec![TensorType::new(
                Some(DataType::F32),
                TensorShape::fixed(&[2, 4])
            )]
        );
    }

    #[test]
    fn test_set_output_type_respects_declared_type() {
        let schema = schema();
        let bindings = TypeBindings::new();
        let node = Node::new("Scale");
        let declared = TensorType::new(Some(DataType::F64), TensorShape::Unknown);
        let mut ctx = InferenceContext::new(&node, &schema, &bindings, vec![], vec![declared]);

        assert!(ctx.set_output_type(0, DataType::F64).is_ok());
        assert!(ctx.set_output_type(0, DataType::F32).is_err());
        assert!(ctx.set_output_type(1, DataType::F32).is_err());
    }

    #[test]
    fn test_merge_shapes() {
        let named = |n: &str| Dimension::Named(n.to_string());
        let existing = TensorShape::Ranked(vec![named("batch"), Dimension::Unknown]);
        let inferred = TensorShape::Ranked(vec![Dimension::Static(8), Dimension::Static(4)]);
        assert_eq!(
            merge_shapes(&existing, &inferred).unwrap(),
            TensorShape::fixed(&[8, 4])
        );

        let symbolic = TensorShape::Ranked(vec![named("batch"), named("seq")]);
        assert_eq!(
            merge_shapes(&symbolic, &TensorShape::Ranked(vec![Dimension::Unknown; 2])).unwrap(),
            symbolic
        );
        assert_eq!(
            merge_shapes(&TensorShape::Unknown, &symbolic).unwrap(),
            symbolic
        );

        assert!(merge_shapes(&TensorShape::fixed(&[2]), &TensorShape::fixed(&[2, 1])).is_err());
        assert!(merge_shapes(&TensorShape::fixed(&[2]), &TensorShape::fixed(&[3])).is_err());
        assert!(
            merge_shapes(
                &TensorShape::Ranked(vec![named("a")]),
                &TensorShape::Ranked(vec![named("b")])
            )
            .is_err()
        );
    }

    #[test]
    fn test_shape_from_attribute() {
        let schema = schema();
        let bindings = TypeBindings::new();

        let node = Node::new("Scale").with_attr("shape", AttributeValue::Ints(vec![3, 0, 7]));
        let mut ctx =
            InferenceContext::new(&node, &schema, &bindings, vec![], vec![TensorType::default()]);
        propagate_shape_from_attribute_to_output(&mut ctx, "shape", 0).unwrap();
        assert_eq!(ctx.output_shape(0), Some(&TensorShape::fixed(&[3, 0, 7])));

        let node = Node::new("Scale").with_attr("shape", AttributeValue::Ints(vec![3, -2]));
        let mut ctx =
            InferenceContext::new(&node, &schema, &bindings, vec![], vec![TensorType::default()]);
        let err = propagate_shape_from_attribute_to_output(&mut ctx, "shape", 0).unwrap_err();
        assert!(err.message.contains("Negative"));
        assert!(err.message.contains("-2"));

        let node = Node::new("Scale");
        let mut ctx =
            InferenceContext::new(&node, &schema, &bindings, vec![], vec![TensorType::default()]);
        assert!(propagate_shape_from_attribute_to_output(&mut ctx, "shape", 0).is_err());
    }

    #[test]
    fn test_dims_from_ints() {
        assert_eq!(
            dims_from_ints(&[0, 4]).unwrap(),
            vec![Dimension::Static(0), Dimension::Static(4)]
        );

        let err = dims_from_ints(&[2, i64::MIN]).unwrap_err();
        assert!(err.message.starts_with("Negative values are not allowed"));

        #[cfg(target_pointer_width = "32")]
        {
            let err = dims_from_ints(&[i64::MAX]).unwrap_err();
            assert!(err.message.contains("does not fit"));
            assert!(!err.message.contains("Negative"));
        }
    }
}
