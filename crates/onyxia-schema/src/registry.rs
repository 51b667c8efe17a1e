//! Versioned operator schema registry.
//!
//! A [`SchemaRegistry`] is filled during a single write phase and then turned
//! into a [`FrozenRegistry`] with [`SchemaRegistry::freeze`]. The frozen view
//! has no mutating methods and is cheap to clone and share across threads.

use crate::error::{NotFound, RegistrationError};
use crate::schema::{OpSchema, OperatorId};
use onyxia_onnx::normalize_domain;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

type SchemaKey = (String, String);

/// Registry of operator schemas during the write phase.
///
/// Maps `(domain, op_type)` to every registered version of that operator,
/// ordered by `since_version`.
///
/// # Example
///
/// ```
/// use onyxia_schema::{FormalArity, SchemaBuilder, SchemaRegistry};
///
/// let mut registry = SchemaRegistry::new();
/// for version in [1, 6] {
///     SchemaBuilder::new("Identity", version)
///         .input(0, "input", "", "T", FormalArity::Single)
///         .output(0, "output", "", "T", FormalArity::Single)
///         .type_constraint("T", onyxia_onnx::all_tensor_types(), "")
///         .finalize(&mut registry)?;
/// }
///
/// let registry = registry.freeze();
/// assert_eq!(registry.lookup("", "Identity", 5)?.since_version(), 1);
/// assert_eq!(registry.lookup("ai.onnx", "Identity", 13)?.since_version(), 6);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SchemaRegistry {
    schemas: HashMap<SchemaKey, BTreeMap<i64, OpSchema>>,
}

impl SchemaRegistry {
    /// Create a new empty schema registry.
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Register a schema.
    ///
    /// A schema whose `(domain, name, since_version)` is already present is
    /// rejected and the registry is left unchanged.
    pub fn register(&mut self, schema: OpSchema) -> Result<(), RegistrationError> {
        let id = schema.id();
        let versions = self
            .schemas
            .entry((id.domain.clone(), id.name.clone()))
            .or_default();

        if versions.contains_key(&id.since_version) {
            return Err(RegistrationError::Duplicate { op: id.clone() });
        }

        tracing::trace!(op = %id, "registered schema");
        versions.insert(id.since_version, schema);
        Ok(())
    }

    /// Resolve the schema in effect at `opset_version`.
    ///
    /// This is the registered version with the greatest `since_version` that
    /// does not exceed `opset_version`.
    pub fn lookup(
        &self,
        domain: &str,
        name: &str,
        opset_version: i64,
    ) -> Result<&OpSchema, NotFound> {
        lookup_in(&self.schemas, domain, name, opset_version)
    }

    /// Check if any version of an operator is registered.
    pub fn contains(&self, domain: &str, name: &str) -> bool {
        self.schemas
            .contains_key(&(normalize_domain(domain).to_string(), name.to_string()))
    }

    /// Every registered schema, ordered by domain, name and version.
    pub fn list_all(&self) -> Vec<&OpSchema> {
        list_in(&self.schemas)
    }

    /// Get the number of registered schema versions.
    pub fn len(&self) -> usize {
        self.schemas.values().map(BTreeMap::len).sum()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// End the write phase.
    pub fn freeze(self) -> FrozenRegistry {
        tracing::debug!(schemas = self.len(), "schema registry frozen");
        FrozenRegistry {
            schemas: Arc::new(self.schemas),
        }
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a registry after its write phase.
///
/// Clones share the same schemas. Lookups take no locks.
#[derive(Clone)]
pub struct FrozenRegistry {
    schemas: Arc<HashMap<SchemaKey, BTreeMap<i64, OpSchema>>>,
}

impl FrozenRegistry {
    /// Resolve the schema in effect at `opset_version`.
    pub fn lookup(
        &self,
        domain: &str,
        name: &str,
        opset_version: i64,
    ) -> Result<&OpSchema, NotFound> {
        lookup_in(&self.schemas, domain, name, opset_version)
    }

    /// Fetch one exact schema version.
    pub fn get(&self, id: &OperatorId) -> Option<&OpSchema> {
        self.schemas
            .get(&(id.domain.clone(), id.name.clone()))?
            .get(&id.since_version)
    }

    /// Check if any version of an operator is registered.
    pub fn contains(&self, domain: &str, name: &str) -> bool {
        self.schemas
            .contains_key(&(normalize_domain(domain).to_string(), name.to_string()))
    }

    /// Every registered schema, ordered by domain, name and version.
    pub fn list_all(&self) -> Vec<&OpSchema> {
        list_in(&self.schemas)
    }

    /// Get the number of registered schema versions.
    pub fn len(&self) -> usize {
        self.schemas.values().map(BTreeMap::len).sum()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl std::fmt::Debug for FrozenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrozenRegistry")
            .field("schemas", &self.len())
            .finish()
    }
}

fn lookup_in<'a>(
    schemas: &'a HashMap<SchemaKey, BTreeMap<i64, OpSchema>>,
    domain: &str,
    name: &str,
    opset_version: i64,
) -> Result<&'a OpSchema, NotFound> {
    let domain = normalize_domain(domain);
    schemas
        .get(&(domain.to_string(), name.to_string()))
        .and_then(|versions| versions.range(..=opset_version).next_back())
        .map(|(_, schema)| schema)
        .ok_or_else(|| NotFound {
            domain: domain.to_string(),
            name: name.to_string(),
            version: opset_version,
        })
}

fn list_in(schemas: &HashMap<SchemaKey, BTreeMap<i64, OpSchema>>) -> Vec<&OpSchema> {
    let mut all: Vec<&OpSchema> = schemas.values().flat_map(BTreeMap::values).collect();
    all.sort_by(|a, b| a.id().cmp(b.id()));
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SchemaBuilder;
    use crate::schema::FormalArity;

    fn relu(version: i64) -> OpSchema {
        SchemaBuilder::new("Relu", version)
            .doc(format!("version {}", version))
            .input(0, "X", "", "T", FormalArity::Single)
            .output(0, "Y", "", "T", FormalArity::Single)
            .type_constraint("T", ["tensor(float)"], "")
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_lookup_exact() {
        let mut registry = SchemaRegistry::new();
        registry.register(relu(1)).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("", "Relu"));
        assert!(registry.contains("ai.onnx", "Relu"));
        assert!(!registry.contains("", "Sigmoid"));
        assert_eq!(registry.lookup("", "Relu", 1).unwrap().since_version(), 1);
    }

    #[test]
    fn test_lookup_resolves_greatest_version_not_above_request() {
        let mut registry = SchemaRegistry::new();
        registry.register(relu(6)).unwrap();
        registry.register(relu(1)).unwrap();
        registry.register(relu(13)).unwrap();

        let resolved = |v| registry.lookup("", "Relu", v).map(|s| s.since_version());
        assert_eq!(resolved(1), Ok(1));
        assert_eq!(resolved(5), Ok(1));
        assert_eq!(resolved(6), Ok(6));
        assert_eq!(resolved(12), Ok(6));
        assert_eq!(resolved(20), Ok(13));

        let err = registry.lookup("", "Relu", 0).unwrap_err();
        assert_eq!(err.version, 0);
        assert_eq!(err.name, "Relu");
    }

    #[test]
    fn test_duplicate_leaves_registry_unchanged() {
        let mut registry = SchemaRegistry::new();
        registry.register(relu(1)).unwrap();

        let err = registry
            .register(
                SchemaBuilder::new("Relu", 1)
                    .doc("replacement")
                    .build()
                    .unwrap(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::Duplicate {
                op: OperatorId::new("", "Relu", 1)
            }
        );

        assert_eq!(registry.len(), 1);
        let schema = registry.lookup("", "Relu", 1).unwrap();
        assert_eq!(schema.doc(), "version 1");
        assert_eq!(schema.inputs().len(), 1);
    }

    #[test]
    fn test_list_all_is_ordered() {
        let mut registry = SchemaRegistry::new();
        registry.register(relu(6)).unwrap();
        registry
            .register(SchemaBuilder::new("Abs", 1).build().unwrap())
            .unwrap();
        registry.register(relu(1)).unwrap();
        registry
            .register(
                SchemaBuilder::new("Custom", 1)
                    .domain("com.example")
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let listed: Vec<_> = registry
            .freeze()
            .list_all()
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        assert_eq!(
            listed,
            vec![
                "ai.onnx::Abs-1",
                "ai.onnx::Relu-1",
                "ai.onnx::Relu-6",
                "com.example::Custom-1",
            ]
        );
    }

    #[test]
    fn test_frozen_registry_is_shared() {
        let mut registry = SchemaRegistry::new();
        registry.register(relu(1)).unwrap();
        let frozen = registry.freeze();
        let clone = frozen.clone();

        let a = frozen.lookup("", "Relu", 3).unwrap();
        let b = clone.lookup("", "Relu", 3).unwrap();
        assert!(std::ptr::eq(a, b));
        assert!(frozen.get(&OperatorId::new("ai.onnx", "Relu", 1)).is_some());
        assert!(frozen.get(&OperatorId::new("", "Relu", 3)).is_none());
    }

    #[test]
    fn test_empty_registry() {
        let registry = SchemaRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.freeze().list_all().is_empty());
    }
}
