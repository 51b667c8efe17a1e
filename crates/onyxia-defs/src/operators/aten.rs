//! ATen escape hatch.

use onyxia_schema::{FormalArity, SchemaBuilder, SupportLevel};

const ATEN_DOC: &str = "
Experimental allowing ATen operations to be accessed directly from Caffe2
to allow for quick prototyping when ONNX is missing standard versions of
and op";

/// ATen-1.
///
/// Accepts any attributes and any number of inputs and outputs, all sharing
/// one element type.
pub fn aten() -> SchemaBuilder {
    SchemaBuilder::new("ATen", 1)
        .support_level(SupportLevel::Experimental)
        .allow_unchecked_attributes()
        .doc(ATEN_DOC)
        .input(0, "input", "Arbitrary input", "T", FormalArity::Variadic)
        .output(0, "output", "Arbitrary output", "T", FormalArity::Variadic)
        .type_constraint(
            "T",
            [
                "tensor(bool)",
                "tensor(int32)",
                "tensor(int64)",
                "tensor(float16)",
                "tensor(float)",
                "tensor(double)",
            ],
            "Constrain output types to bool, int32, int64, float16, float, double tensors.",
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use onyxia_schema::Permissiveness;

    #[test]
    fn test_aten_is_permissive_and_variadic() {
        let schema = aten().build().unwrap();
        assert_eq!(schema.permissiveness(), Permissiveness::AllowUnchecked);
        assert_eq!(schema.min_inputs(), 0);
        assert_eq!(schema.max_inputs(), None);
        assert_eq!(schema.max_outputs(), None);
        assert_eq!(schema.type_constraint("T").unwrap().allowed.len(), 6);
    }
}
