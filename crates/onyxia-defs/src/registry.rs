//! Experimental operator schema registry.
//!
//! Provides the registration entry point for the 7 experimental operators.

use onyxia_schema::{FrozenRegistry, RegistrationError, SchemaRegistry};

use crate::operators::{
    aten, dynamic_slice, given_tensor_fill, gru_unit, scale, scaled_tanh, thresholded_relu,
};

/// Register the experimental operator schemas into `registry`.
///
/// The registry includes:
/// - 3 elementwise activations (ThresholdedRelu, ScaledTanh, Scale)
/// - 1 fill operator (GivenTensorFill)
/// - 1 recurrent unit (GRUUnit)
/// - 1 escape hatch (ATen)
/// - 1 slicing operator (DynamicSlice)
///
/// Stops at the first schema that fails to build or register.
pub fn register_experimental_schemas(
    registry: &mut SchemaRegistry,
) -> Result<(), RegistrationError> {
    let builders = [
        thresholded_relu(),
        scaled_tanh(),
        given_tensor_fill(),
        scale(),
        gru_unit(),
        aten(),
        dynamic_slice(),
    ];
    for builder in builders {
        builder.finalize(registry)?;
    }

    tracing::debug!(schemas = registry.len(), "registered experimental schemas");
    Ok(())
}

/// Returns a frozen registry holding only the experimental schemas.
///
/// Custom schemas need a fresh [`SchemaRegistry`] passed to
/// [`register_experimental_schemas`] before freezing.
pub fn experimental_schema_registry() -> Result<FrozenRegistry, RegistrationError> {
    let mut registry = SchemaRegistry::new();
    register_experimental_schemas(&mut registry)?;
    Ok(registry.freeze())
}
