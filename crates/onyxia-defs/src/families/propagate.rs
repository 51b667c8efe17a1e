//! Pass-through inference family.
//!
//! Covers: ThresholdedRelu, ScaledTanh, Scale

use onyxia_schema::{
    InferenceContext, InferenceFailure, InferenceFunction, InferenceOutcome,
    propagate_shape_and_type_from_first_input,
};

/// Output 0 takes the element type and shape of input 0.
///
/// All elementwise operators with one input share this inference:
/// whatever is known about the input is known about the output. An input of
/// unknown shape leaves the output shape unknown, which is not a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagateFromFirstInput;

impl InferenceFunction for PropagateFromFirstInput {
    fn name(&self) -> &str {
        "propagate_from_first_input"
    }

    fn infer(&self, ctx: &mut InferenceContext<'_>) -> Result<InferenceOutcome, InferenceFailure> {
        propagate_shape_and_type_from_first_input(ctx)?;
        Ok(InferenceOutcome::Inferred)
    }
}
