//! Entity metadata.

use super::property::PropertyMetadata;
use super::types::{EntityId, PropertyKind};
use indexmap::IndexMap;

/// One declared entity type, after resolution.
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    /// Position in the graph.
    pub id: EntityId,
    /// Entity name (unique within the graph).
    pub name: String,
    /// Resolved base entity.
    pub extends: Option<EntityId>,
    /// Abstract entities contribute properties but have no table.
    pub is_abstract: bool,
    /// Embeddable entities are only stored inside their owners.
    pub embeddable: bool,
    /// Explicitly declared without a primary key.
    pub keyless: bool,
    /// Effective properties in declaration order (inherited first).
    pub properties: IndexMap<String, PropertyMetadata>,
    /// Names of primary key properties.
    pub primary_keys: Vec<String>,
    /// Relations on other entities that target this one.
    pub referenced_by: Vec<BackReference>,
}

/// A relation pointing at an entity, recorded on the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackReference {
    /// Entity declaring the relation.
    pub entity: EntityId,
    /// Relation property name.
    pub property: String,
    /// Relation kind.
    pub kind: PropertyKind,
}

impl EntityMetadata {
    /// Create an empty entity shell.
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            extends: None,
            is_abstract: false,
            embeddable: false,
            keyless: false,
            properties: IndexMap::new(),
            primary_keys: Vec::new(),
            referenced_by: Vec::new(),
        }
    }

    /// Get a property by name.
    pub fn property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.get(name)
    }

    /// Check if a property exists.
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Whether this entity is backed by its own table.
    pub fn is_table(&self) -> bool {
        !self.is_abstract && !self.embeddable
    }

    /// All relation properties (excluding embedded).
    pub fn relations(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.values().filter(|p| p.is_relation())
    }

    /// All embedded properties.
    pub fn embedded(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.values().filter(|p| p.is_embedded())
    }

    /// Scalar and enum properties.
    pub fn scalars(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties
            .values()
            .filter(|p| matches!(p.kind, PropertyKind::Scalar | PropertyKind::Enum))
    }

    /// Primary key property definitions.
    pub fn primary_key_properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.primary_keys
            .iter()
            .filter_map(|name| self.properties.get(name))
    }

    /// Properties this entity declares itself (not inherited).
    pub fn own_properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties
            .values()
            .filter(|p| p.declared_by == self.name)
    }

    /// Recompute `primary_keys` from the property flags.
    pub(crate) fn derive_primary_keys(&mut self) {
        self.primary_keys = self
            .properties
            .values()
            .filter(|p| p.primary)
            .map(|p| p.name.clone())
            .collect();
    }
}
