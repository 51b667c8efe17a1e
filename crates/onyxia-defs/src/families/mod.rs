//! Inference function families shared by several operators.
//!
//! A family implements [`InferenceFunction`](onyxia_schema::InferenceFunction)
//! once; schemas attach an instance when they are built.

pub mod fill;
pub mod propagate;

pub use fill::FillInference;
pub use propagate::PropagateFromFirstInput;
