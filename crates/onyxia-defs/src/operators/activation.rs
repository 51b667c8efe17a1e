//! Elementwise activation operators: ThresholdedRelu, ScaledTanh, Scale.

use super::FLOAT_TYPES;
use crate::families::PropagateFromFirstInput;
use onyxia_onnx::{AttributeType, AttributeValue};
use onyxia_schema::{AttrRequirement, FormalArity, SchemaBuilder, SupportLevel};

const THRESHOLDED_RELU_DOC: &str = "
ThresholdedRelu takes one input data (Tensor<T>) and produces one output data
(Tensor<T>) where the rectified linear function, y = x for x > alpha, y = 0
otherwise, is applied to the tensor elementwise.
";

const SCALED_TANH_DOC: &str = "
Calculates the scaled hyperbolic tangent of the given input tensor
element-wise, alpha * tanh(beta * x).
";

const SCALE_DOC: &str = "
Scale takes one input data (Tensor<float>) and produces one output data
(Tensor<float>) whose value is the input data tensor scaled element-wise.
";

/// ThresholdedRelu-1.
pub fn thresholded_relu() -> SchemaBuilder {
    SchemaBuilder::new("ThresholdedRelu", 1)
        .support_level(SupportLevel::Experimental)
        .doc(THRESHOLDED_RELU_DOC)
        .attr(
            "alpha",
            "Threshold value",
            AttributeType::Float,
            AttrRequirement::OptionalWithDefault(AttributeValue::Float(1.0)),
        )
        .input(0, "X", "Input tensor", "T", FormalArity::Single)
        .output(0, "Y", "Output tensor", "T", FormalArity::Single)
        .type_constraint(
            "T",
            FLOAT_TYPES,
            "Constrain input and output types to float tensors.",
        )
        .inference_function(PropagateFromFirstInput)
}

/// ScaledTanh-1. Both scaling attributes are optional without defaults.
pub fn scaled_tanh() -> SchemaBuilder {
    SchemaBuilder::new("ScaledTanh", 1)
        .support_level(SupportLevel::Experimental)
        .doc(SCALED_TANH_DOC)
        .attr(
            "alpha",
            "Scaling value",
            AttributeType::Float,
            AttrRequirement::OptionalNoDefault,
        )
        .attr(
            "beta",
            "Scaling value",
            AttributeType::Float,
            AttrRequirement::OptionalNoDefault,
        )
        .input(0, "input", "Input tensor", "T", FormalArity::Single)
        .output(
            0,
            "output",
            "The scaled hyperbolic tangent values of the input tensor computed element-wise",
            "T",
            FormalArity::Single,
        )
        .type_constraint(
            "T",
            FLOAT_TYPES,
            "Constrain input and output types to float tensors.",
        )
        .inference_function(PropagateFromFirstInput)
}

/// Scale-1.
pub fn scale() -> SchemaBuilder {
    SchemaBuilder::new("Scale", 1)
        .support_level(SupportLevel::Experimental)
        .doc(SCALE_DOC)
        .input(0, "input", "Input data to be scaled", "T", FormalArity::Single)
        .output(0, "output", "Output data after scaling", "T", FormalArity::Single)
        .type_constraint(
            "T",
            FLOAT_TYPES,
            "Constrain input and output types to float tensors.",
        )
        .attr(
            "scale",
            "The scale to apply.",
            AttributeType::Float,
            AttrRequirement::OptionalWithDefault(AttributeValue::Float(1.0)),
        )
        .inference_function(PropagateFromFirstInput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use onyxia_onnx::DataType;

    #[test]
    fn test_activation_schemas_build() {
        for builder in [thresholded_relu(), scaled_tanh(), scale()] {
            let schema = builder.build().unwrap();
            assert_eq!(schema.since_version(), 1);
            assert_eq!(schema.support_level(), SupportLevel::Experimental);
            assert!(schema.has_inference_function());
            assert_eq!(
                schema.type_constraint("T").unwrap().allowed,
                vec![DataType::F16, DataType::F32, DataType::F64]
            );
        }
    }

    #[test]
    fn test_scaled_tanh_has_no_defaults() {
        let schema = scaled_tanh().build().unwrap();
        for name in ["alpha", "beta"] {
            let attr = schema.attribute(name).unwrap();
            assert!(!attr.is_required());
            assert_eq!(attr.default_value(), None);
        }
    }
}
