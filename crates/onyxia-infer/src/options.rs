//! Configuration for the analysis passes.

/// What a pass does when a node produces a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop at the first node with a diagnostic and return it as an error.
    FailFast,
    /// Process every node and return all diagnostics in the report.
    #[default]
    CollectAll,
}

/// What a pass does with a node whose operator has no schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingSchemaPolicy {
    /// Report a `NotFound` diagnostic.
    #[default]
    Error,
    /// Leave the node unresolved without a diagnostic.
    Skip,
}

/// Options shared by the validation and shape inference passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InferenceOptions {
    pub error_policy: ErrorPolicy,
    pub missing_schema: MissingSchemaPolicy,
}

impl InferenceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn with_missing_schema(mut self, policy: MissingSchemaPolicy) -> Self {
        self.missing_schema = policy;
        self
    }

    /// Shorthand for `with_error_policy(ErrorPolicy::FailFast)`.
    pub fn fail_fast(self) -> Self {
        self.with_error_policy(ErrorPolicy::FailFast)
    }
}
