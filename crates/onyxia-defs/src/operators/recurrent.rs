//! GRUUnit.

use super::FLOAT_TYPES;
use onyxia_onnx::AttributeType;
use onyxia_schema::{AttrRequirement, FormalArity, SchemaBuilder, SupportLevel};

const GRU_UNIT_DOC: &str = "
GRUUnit computes the activations of a standard GRU,
in a sequence-length aware fashion.
Concretely, given the (fused) inputs X (TxNxD), the previous hidden
state (NxD), and the sequence lengths (N), computes the GRU
activations, avoiding computation if the input is invalid (as in, the
value at X[t][n] >= seqLengths[n].
";

/// GRUUnit-1. Declares no inference function.
pub fn gru_unit() -> SchemaBuilder {
    SchemaBuilder::new("GRUUnit", 1)
        .support_level(SupportLevel::Experimental)
        .doc(GRU_UNIT_DOC)
        .attr(
            "drop_states",
            "Bool to determine if hidden state is zeroes or passed along for timesteps past the \
             given sequence_length.",
            AttributeType::Int,
            AttrRequirement::OptionalNoDefault,
        )
        .input(
            0,
            "hidden_prev",
            "The previous GRU hidden state.",
            "T",
            FormalArity::Single,
        )
        .input(
            1,
            "gates",
            "Unactivated gate outputs from forget, update, and output gates, pre-activation.",
            "T",
            FormalArity::Single,
        )
        .input(
            2,
            "seq_lengths",
            "Array of sequence lengths. len(seq_lengths) should equal batch size N.",
            "T",
            FormalArity::Single,
        )
        .input(3, "t", "The timestep for this operation.", "T", FormalArity::Single)
        .output(
            0,
            "hidden",
            "The new GRU hidden state calculated by this op.",
            "T",
            FormalArity::Single,
        )
        .type_constraint(
            "T",
            FLOAT_TYPES,
            "Constrain input and output types to float tensors.",
        )
}
