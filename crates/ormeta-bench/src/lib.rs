//! ORMETA Benchmark Suite
//!
//! Criterion benchmarks for the metadata engine over synthetic schemas.
//!
//! # Benchmark Categories
//!
//! - **Finalize**: full resolution of registered declarations
//! - **Snapshot**: binary and JSON snapshot encoding, fingerprinting

pub mod fixtures;
pub mod harness;

pub use fixtures::{generate_schema, Scale};
pub use harness::{finalized, init_tracing, registered};
