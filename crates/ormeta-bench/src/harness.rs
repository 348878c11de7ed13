//! Benchmark harness helpers.

use std::sync::{Arc, Once};

use ormeta_core::{EntityGraph, MetadataGraph};
use tracing_subscriber::EnvFilter;

use crate::fixtures::{generate_schema, Scale};

static TRACING: Once = Once::new();

/// Install a fmt subscriber honoring `RUST_LOG`, once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .try_init();
    });
}

/// A registry holding the generated schema, not yet finalized.
pub fn registered(scale: Scale) -> MetadataGraph {
    let mut graph = MetadataGraph::new();
    graph
        .register_all(generate_schema(scale))
        .expect("generated schema has unique names");
    graph
}

/// The generated schema, finalized.
pub fn finalized(scale: Scale) -> Arc<EntityGraph> {
    registered(scale)
        .finalize()
        .expect("generated schema resolves")
}
