//! Canonical entity metadata.
//!
//! These are the records the resolver produces and downstream consumers
//! (query building, hydration, change tracking, DDL) read.

mod entity;
mod lazy;
mod property;
mod relation;
mod shape;
mod types;

pub use entity::{BackReference, EntityMetadata};
pub use lazy::{Lazy, LazyError};
pub use property::{EnumItem, EnumMetadata, PropertyMetadata};
pub use relation::RelationMetadata;
pub use shape::ValueShape;
pub use types::{DeferMode, EntityId, PropertyKind, ReferentialAction, ScalarType};
