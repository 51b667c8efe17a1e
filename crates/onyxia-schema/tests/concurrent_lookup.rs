//! Lookups on a frozen registry from many threads at once.

use onyxia_schema::{FormalArity, FrozenRegistry, NotFound, SchemaBuilder, SchemaRegistry};
use std::thread;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn build_registry() -> FrozenRegistry {
    init_tracing();
    let mut registry = SchemaRegistry::new();
    let families: [(&str, &[i64]); 3] = [("Relu", &[1, 6, 13]), ("Scale", &[1]), ("Pad", &[2, 11, 18])];
    for (name, versions) in families {
        for &version in versions {
            SchemaBuilder::new(name, version)
                .input(0, "X", "", "T", FormalArity::Single)
                .output(0, "Y", "", "T", FormalArity::Single)
                .type_constraint("T", ["tensor(float)", "tensor(double)"], "")
                .finalize(&mut registry)
                .unwrap();
        }
    }
    SchemaBuilder::new("Custom", 3)
        .domain("com.example")
        .finalize(&mut registry)
        .unwrap();
    registry.freeze()
}

fn queries() -> Vec<(&'static str, &'static str, i64)> {
    let mut queries = Vec::new();
    for version in 0..=20 {
        for name in ["Relu", "Scale", "Pad", "Missing"] {
            queries.push(("", name, version));
        }
        queries.push(("com.example", "Custom", version));
        queries.push(("ai.onnx", "Relu", version));
    }
    queries
}

fn resolve_all(registry: &FrozenRegistry) -> Vec<Result<i64, NotFound>> {
    queries()
        .into_iter()
        .map(|(domain, name, version)| {
            registry
                .lookup(domain, name, version)
                .map(|schema| schema.since_version())
        })
        .collect()
}

#[test]
fn test_concurrent_lookups_match_single_threaded() {
    let registry = build_registry();
    let baseline = resolve_all(&registry);

    thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                scope.spawn(move || resolve_all(&registry))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), baseline);
        }
    });
}

#[test]
fn test_lookup_properties_hold_for_every_version() {
    let registry = build_registry();

    for schema in registry.list_all() {
        let exact = registry
            .lookup(schema.domain(), schema.name(), schema.since_version())
            .unwrap();
        assert_eq!(exact.id(), schema.id());
    }

    // Resolved version never decreases as the requested version grows
    for name in ["Relu", "Scale", "Pad"] {
        let mut last = 0;
        for version in 1..=20 {
            if let Ok(schema) = registry.lookup("", name, version) {
                assert!(schema.since_version() <= version);
                assert!(schema.since_version() >= last);
                last = schema.since_version();
            }
        }
    }

    assert!(registry.lookup("", "Pad", 1).is_err());
    assert!(registry.lookup("", "Relu", 0).is_err());
    assert!(registry.lookup("", "Custom", 5).is_err());
}
