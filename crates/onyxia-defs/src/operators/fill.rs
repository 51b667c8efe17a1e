//! GivenTensorFill.

use super::FLOAT_TYPES;
use crate::families::FillInference;
use onyxia_onnx::AttributeType;
use onyxia_schema::{AttrRequirement, FormalArity, SchemaBuilder, SupportLevel};

/// GivenTensorFill-1.
///
/// Fills a tensor with `values`. The shape is given by the `shape`
/// attribute, by the contents of the optional input when `input_as_shape` is
/// set, or by the input's shape extended with `extra_shape`.
pub fn given_tensor_fill() -> SchemaBuilder {
    SchemaBuilder::new("GivenTensorFill", 1)
        .support_level(SupportLevel::Experimental)
        .input(
            0,
            "shape",
            "The shape of filled tensor",
            "T",
            FormalArity::Optional,
        )
        .output(0, "X", "The filled tensor", "T", FormalArity::Single)
        .type_constraint(
            "T",
            FLOAT_TYPES,
            "Constrain input and output types to float tensors.",
        )
        .attr("values", "", AttributeType::Floats, AttrRequirement::OptionalNoDefault)
        .attr("shape", "", AttributeType::Ints, AttrRequirement::OptionalNoDefault)
        .attr("input_as_shape", "", AttributeType::Int, AttrRequirement::OptionalNoDefault)
        .attr("extra_shape", "", AttributeType::Ints, AttrRequirement::OptionalNoDefault)
        .inference_function(FillInference)
}
