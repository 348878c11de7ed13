//! ORMETA Core - entity metadata resolution for an object-relational mapper.
//!
//! Declarations (builder calls or JSON records) go in, a frozen
//! [`EntityGraph`] comes out. Between the two, [`MetadataGraph::finalize`]
//! normalizes every property, decides the owning side of every relation,
//! merges inherited properties and links deferred entity references.
//!
//! ```ignore
//! use ormeta_core::{p, EntityRef, EntitySchema, MetadataGraph};
//!
//! let mut graph = MetadataGraph::new();
//! graph.register(
//!     EntitySchema::new("Node")
//!         .with_property("id", p::integer().primary())
//!         .with_property("parent", p::many_to_one(EntityRef::deferred(|| "Node".into())).nullable(true))
//!         .with_property("children", p::one_to_many("Node", "parent")),
//! )?;
//! let graph = graph.finalize()?;
//! ```

pub mod config;
pub mod declaration;
pub mod error;
pub mod graph;
pub mod input;
pub mod metadata;
mod resolve;
pub mod snapshot;
pub mod value;

pub use config::{InverseNaming, ResolverConfig};
pub use declaration::factory as p;
pub use declaration::{
    define_properties, EntityRef, EntitySchema, EnumItems, PropertyGroup, PropertyOptions,
    SchemaDocument, Thunk,
};
pub use error::{InputError, InputErrors, MetadataError, SchemaValidationError};
pub use graph::{EntityGraph, FlatColumn, MetadataGraph};
pub use input::Record;
pub use metadata::{
    BackReference, DeferMode, EntityId, EntityMetadata, EnumItem, EnumMetadata, Lazy, LazyError,
    PropertyKind, PropertyMetadata, ReferentialAction, RelationMetadata, ScalarType, ValueShape,
};
pub use snapshot::{EntitySnapshot, GraphSnapshot, PropertySnapshot};
pub use value::{Hook, Value};
