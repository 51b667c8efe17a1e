//! DynamicSlice.

use onyxia_onnx::all_tensor_types;
use onyxia_schema::{FormalArity, SchemaBuilder, SupportLevel};

const DYNAMIC_SLICE_DOC: &str = "
Produces a slice of the input tensor along multiple axes. Similar to numpy:
https://docs.scipy.org/doc/numpy/reference/arrays.indexing.html
Slices uses `axes`, `starts` and `ends` inputs to specify the start and end
dimension for each axis in the list of axes, it uses this information to
slice the input `data` tensor. If a negative value is passed for any of the
start or end indices, it represent number of elements before the end of that
dimension. If the value passed to start or end is larger than the `n` (the
number of elements in this dimension), it represents `n`. For slicing to the
end of a dimension with unknown size, it is recommended to pass in `INT_MAX`.
If `axes` are omitted, they are set to `[0, ..., ndim-1]`.
Example 1:
  data = [
      [1, 2, 3, 4],
      [5, 6, 7, 8],
  ]
  axes = [0, 1]
  starts = [1, 0]
  ends = [2, 3]
  result = [
      [5, 6, 7],
  ]
Example 2:
  data = [
      [1, 2, 3, 4],
      [5, 6, 7, 8],
  ]
  starts = [0, 1]
  ends = [-1, 1000]
  result = [
      [2, 3, 4],
  ]
";

/// DynamicSlice-1.
///
/// The slice bounds are tensors, so the output shape depends on run-time
/// values and no inference function is declared.
pub fn dynamic_slice() -> SchemaBuilder {
    SchemaBuilder::new("DynamicSlice", 1)
        .doc(DYNAMIC_SLICE_DOC)
        .support_level(SupportLevel::Experimental)
        .input(
            0,
            "data",
            "Tensor of data to extract slices from.",
            "T",
            FormalArity::Single,
        )
        .input(
            1,
            "starts",
            "1-D tensor of starting indices of corresponding axis in `axes`",
            "Tind",
            FormalArity::Single,
        )
        .input(
            2,
            "ends",
            "1-D tensor of ending indices (exclusive) of corresponding axis in axes",
            "Tind",
            FormalArity::Single,
        )
        .input(
            3,
            "axes",
            "1-D tensor of axes that `starts` and `ends` apply to.",
            "Tind",
            FormalArity::Optional,
        )
        .output(0, "output", "Sliced data tensor.", "T", FormalArity::Single)
        .type_constraint(
            "T",
            all_tensor_types(),
            "Constrain input and output types to all tensor types.",
        )
        .type_constraint(
            "Tind",
            ["tensor(int32)", "tensor(int64)"],
            "Constrain indices to integer types",
        )
}
