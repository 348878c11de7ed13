//! Declaration front-ends.
//!
//! Both the builder API ([`factory`]) and the JSON documents accepted by
//! [`EntitySchema::from_json`] produce the same raw records:
//! an [`EntitySchema`] holding an ordered map of [`PropertyOptions`].

pub mod factory;
mod options;
mod schema;

pub use options::PropertyOptions;
pub use schema::{define_properties, EntitySchema, PropertyGroup, SchemaDocument};

use crate::value::Value;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::sync::Arc;

/// A zero-argument deferred computation producing an entity reference.
#[derive(Clone)]
pub struct Thunk(Arc<dyn Fn() -> EntityRef + Send + Sync>);

impl Thunk {
    /// Wrap a closure.
    pub fn new(f: impl Fn() -> EntityRef + Send + Sync + 'static) -> Self {
        Thunk(Arc::new(f))
    }

    /// Evaluate the thunk.
    pub fn call(&self) -> EntityRef {
        (self.0)()
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Thunk(..)")
    }
}

/// How a relation target (or base entity) is referred to.
#[derive(Debug, Clone)]
pub enum EntityRef {
    /// By registered name.
    Name(String),
    /// By the schema object itself.
    Schema(Arc<EntitySchema>),
    /// Through a thunk evaluated during resolution.
    Deferred(Thunk),
}

impl EntityRef {
    /// Refer to an entity through a thunk.
    pub fn deferred(f: impl Fn() -> EntityRef + Send + Sync + 'static) -> Self {
        EntityRef::Deferred(Thunk::new(f))
    }

    /// The name, if it is known without evaluating a thunk.
    pub fn static_name(&self) -> Option<&str> {
        match self {
            EntityRef::Name(name) => Some(name),
            EntityRef::Schema(schema) => Some(&schema.name),
            EntityRef::Deferred(_) => None,
        }
    }
}

impl From<&str> for EntityRef {
    fn from(value: &str) -> Self {
        EntityRef::Name(value.to_string())
    }
}

impl From<String> for EntityRef {
    fn from(value: String) -> Self {
        EntityRef::Name(value)
    }
}

impl From<Arc<EntitySchema>> for EntityRef {
    fn from(value: Arc<EntitySchema>) -> Self {
        EntityRef::Schema(value)
    }
}

impl From<&Arc<EntitySchema>> for EntityRef {
    fn from(value: &Arc<EntitySchema>) -> Self {
        EntityRef::Schema(Arc::clone(value))
    }
}

impl<'de> Deserialize<'de> for EntityRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(EntityRef::Name)
    }
}

/// Deferred enum mapping: key to stored value, in declaration order.
#[derive(Clone)]
pub struct EnumThunk(Arc<dyn Fn() -> Vec<(String, Value)> + Send + Sync>);

impl EnumThunk {
    /// Evaluate the thunk.
    pub fn call(&self) -> Vec<(String, Value)> {
        (self.0)()
    }
}

impl fmt::Debug for EnumThunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnumThunk(..)")
    }
}

/// Allowed values of an enum property.
#[derive(Debug, Clone)]
pub enum EnumItems {
    /// A literal ordered list.
    Literal(Vec<Value>),
    /// A mapping produced on first use.
    Deferred(EnumThunk),
}

impl EnumItems {
    /// Literal items.
    pub fn literal<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        EnumItems::Literal(items.into_iter().map(Into::into).collect())
    }

    /// Items produced by a thunk on first use.
    pub fn deferred(f: impl Fn() -> Vec<(String, Value)> + Send + Sync + 'static) -> Self {
        EnumItems::Deferred(EnumThunk(Arc::new(f)))
    }
}

impl<'de> Deserialize<'de> for EnumItems {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Value>::deserialize(deserializer).map(EnumItems::Literal)
    }
}
