//! Schema declarations for the experimental operator set.
//!
//! Experimental operators are not versioned: every declaration here is
//! `since_version = 1` with `SupportLevel::Experimental`. Each function
//! returns an unfinished builder so callers can register it or inspect the
//! built schema directly.

pub mod activation;
pub mod aten;
pub mod fill;
pub mod indexing;
pub mod recurrent;

pub use activation::{scale, scaled_tanh, thresholded_relu};
pub use aten::aten;
pub use fill::given_tensor_fill;
pub use indexing::dynamic_slice;
pub use recurrent::gru_unit;

/// Element types accepted by the floating point experimental operators.
pub(crate) const FLOAT_TYPES: [&str; 3] = ["tensor(float16)", "tensor(float)", "tensor(double)"];
