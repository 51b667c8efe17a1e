//! Fill-by-shape inference family.
//!
//! Covers: GivenTensorFill

use onyxia_onnx::TensorShape;
use onyxia_schema::{
    InferenceContext, InferenceFailure, InferenceFunction, InferenceOutcome, dims_from_ints,
    propagate_elem_type_from_input_to_output, propagate_shape_from_attribute_to_output,
};

/// Shape inference for operators that fill a tensor of a described shape.
///
/// The output shape comes from, in order of precedence:
/// 1. the `shape` attribute, taken verbatim;
/// 2. nothing, when `input_as_shape` is non-zero (the shape is the input's
///    contents, known only at run time);
/// 3. the input's shape followed by the dimensions in `extra_shape`.
///
/// A negative entry in either attribute fails the node.
#[derive(Debug, Clone, Copy, Default)]
pub struct FillInference;

impl InferenceFunction for FillInference {
    fn name(&self) -> &str {
        "fill"
    }

    fn infer(&self, ctx: &mut InferenceContext<'_>) -> Result<InferenceOutcome, InferenceFailure> {
        propagate_elem_type_from_input_to_output(ctx, 0, 0)?;

        if ctx.has_attribute("shape") {
            propagate_shape_from_attribute_to_output(ctx, "shape", 0)?;
            return Ok(InferenceOutcome::Inferred);
        }

        if ctx.attr_int("input_as_shape")?.unwrap_or(0) != 0 {
            tracing::trace!(
                node = ctx.node().label(),
                "output shape read from input at run time"
            );
            return Ok(InferenceOutcome::Deferred);
        }

        let extra = dims_from_ints(ctx.attr_ints("extra_shape")?.unwrap_or_default())?;

        let Some(TensorShape::Ranked(mut dims)) = ctx.input_shape(0).cloned() else {
            return Ok(InferenceOutcome::Deferred);
        };
        dims.extend(extra);
        ctx.update_output_shape(0, &TensorShape::Ranked(dims))?;
        Ok(InferenceOutcome::Inferred)
    }
}
