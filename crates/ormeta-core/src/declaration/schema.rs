//! Entity declarations and property groups.

use super::{EntityRef, PropertyOptions};
use crate::error::MetadataError;
use indexmap::IndexMap;
use serde::Deserialize;

/// Raw declaration of one entity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntitySchema {
    /// Entity name.
    pub name: String,
    /// Base entity.
    #[serde(default)]
    pub extends: Option<EntityRef>,
    /// Abstract entities contribute properties but have no table.
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Only stored inside owners through embedded properties.
    #[serde(default)]
    pub embeddable: bool,
    /// Table without a primary key, accepted on purpose.
    #[serde(default)]
    pub keyless: bool,
    /// Declared properties, in declaration order.
    #[serde(default)]
    pub properties: IndexMap<String, PropertyOptions>,
}

impl EntitySchema {
    /// Create an empty entity declaration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends: None,
            is_abstract: false,
            embeddable: false,
            keyless: false,
            properties: IndexMap::new(),
        }
    }

    /// Set the base entity.
    pub fn extends(mut self, base: impl Into<EntityRef>) -> Self {
        self.extends = Some(base.into());
        self
    }

    /// Mark the entity abstract.
    pub fn with_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Mark the entity embeddable.
    pub fn embeddable(mut self) -> Self {
        self.embeddable = true;
        self
    }

    /// Accept the entity without a primary key.
    pub fn keyless(mut self) -> Self {
        self.keyless = true;
        self
    }

    /// Declare a property. A property of the same name is replaced in place.
    pub fn with_property(mut self, name: impl Into<String>, options: PropertyOptions) -> Self {
        self.properties.insert(name.into(), options);
        self
    }

    /// Spread a property group into this declaration, later keys winning.
    pub fn with_group(mut self, group: PropertyGroup) -> Self {
        for (name, options) in group.0 {
            self.properties.insert(name, options);
        }
        self
    }

    /// Get a declared property.
    pub fn property(&self, name: &str) -> Option<&PropertyOptions> {
        self.properties.get(name)
    }

    /// The declared properties as a reusable group.
    pub fn property_group(&self) -> PropertyGroup {
        PropertyGroup(self.properties.clone())
    }

    /// Parse a single entity declaration from JSON.
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// An ordered, independently defined set of properties for mixin-style reuse.
#[derive(Debug, Clone, Default)]
pub struct PropertyGroup(IndexMap<String, PropertyOptions>);

/// Define a property group.
pub fn define_properties<K: Into<String>>(
    properties: impl IntoIterator<Item = (K, PropertyOptions)>,
) -> PropertyGroup {
    let mut group = PropertyGroup::default();
    for (name, options) in properties {
        group.0.insert(name.into(), options);
    }
    group
}

impl PropertyGroup {
    /// Concatenate two groups, keys of `other` winning.
    pub fn merge(mut self, other: PropertyGroup) -> Self {
        for (name, options) in other.0 {
            self.0.insert(name, options);
        }
        self
    }

    /// Get a property.
    pub fn get(&self, name: &str) -> Option<&PropertyOptions> {
        self.0.get(name)
    }

    /// Property names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the group is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A JSON document declaring several entities.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    /// Entity declarations in registration order.
    pub entities: Vec<EntitySchema>,
}

impl SchemaDocument {
    /// Parse a declaration document.
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        Ok(serde_json::from_str(json)?)
    }
}
