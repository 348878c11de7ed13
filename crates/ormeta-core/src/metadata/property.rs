//! Property metadata.

use super::lazy::{Lazy, LazyError};
use super::relation::RelationMetadata;
use super::shape::ValueShape;
use super::types::{EntityId, PropertyKind, ScalarType};
use crate::declaration::EnumItems;
use crate::value::{Hook, Value};
use std::convert::Infallible;

/// One field or relation of an entity, in canonical form.
#[derive(Debug, Clone)]
pub struct PropertyMetadata {
    /// Property name.
    pub name: String,
    /// Property kind.
    pub kind: PropertyKind,
    /// Semantic type tag (scalars only).
    pub scalar_type: Option<ScalarType>,
    /// Whether null is a valid stored value.
    pub nullable: bool,
    /// Whether the value is an array.
    pub array: bool,
    /// Whether the value is wrapped in a lazy reference handle.
    pub reference: bool,
    /// Part of the primary key.
    pub primary: bool,
    /// Relation is exposed as the target's primary key value.
    pub map_to_pk: bool,
    /// Default value applied when none is supplied.
    pub default: Option<Value>,
    /// Hook evaluated on create.
    pub on_create: Option<Hook>,
    /// Hook evaluated on update.
    pub on_update: Option<Hook>,
    /// Relation part (relations and embedded only).
    pub relation: Option<RelationMetadata>,
    /// Enum part (enums only).
    pub enumeration: Option<EnumMetadata>,
    /// Wrapped value shape.
    pub shape: ValueShape,
    /// Entity whose declaration introduced this property.
    pub declared_by: String,
    /// Added by the resolver rather than declared.
    pub synthesized: bool,
}

impl PropertyMetadata {
    /// Check if this is a relation (not embedded).
    pub fn is_relation(&self) -> bool {
        self.kind.is_relation()
    }

    /// Check if this property holds a collection.
    pub fn is_collection(&self) -> bool {
        self.kind.is_collection()
    }

    /// Check if this property is embedded.
    pub fn is_embedded(&self) -> bool {
        self.kind == PropertyKind::Embedded
    }

    /// Whether this side owns the relation. Non-relations never own.
    pub fn owner(&self) -> bool {
        self.relation.as_ref().is_some_and(|r| r.owner)
    }

    /// `mappedBy` of a relation.
    pub fn mapped_by(&self) -> Option<&str> {
        self.relation.as_ref().and_then(|r| r.mapped_by.as_deref())
    }

    /// `inversedBy` of a relation.
    pub fn inversed_by(&self) -> Option<&str> {
        self.relation.as_ref().and_then(|r| r.inversed_by.as_deref())
    }

    /// Resolved target entity, if linked.
    pub fn target_id(&self) -> Option<EntityId> {
        self.relation.as_ref().and_then(RelationMetadata::target_id)
    }

    /// Whether a value is filled in by a default or onCreate hook.
    pub fn has_generated_value(&self) -> bool {
        self.default.is_some() || self.on_create.is_some()
    }

    /// Whether the caller may omit this property when creating an entity.
    pub fn is_optional_on_input(&self) -> bool {
        self.has_generated_value()
            || self.nullable
            || self.synthesized
            || self.is_collection()
            || self.is_auto_increment()
            || (self.kind == PropertyKind::OneToOne && self.mapped_by().is_some())
    }

    /// Whether a read may yield no value.
    pub fn is_nullable_on_read(&self) -> bool {
        self.nullable
    }

    /// Integer primary key, generated by the database when omitted.
    pub fn is_auto_increment(&self) -> bool {
        self.primary && self.scalar_type.as_ref().is_some_and(ScalarType::is_integer)
    }

    /// Whether callers may assign this property directly.
    pub fn is_writable(&self) -> bool {
        !self.is_collection() && !self.synthesized
    }

    /// Whether the property is backed by a column on its own entity.
    pub fn has_column(&self) -> bool {
        match self.kind {
            PropertyKind::OneToMany | PropertyKind::ManyToMany | PropertyKind::Embedded => false,
            PropertyKind::OneToOne => self.owner(),
            _ => true,
        }
    }
}

/// One allowed enum value, with its key for mapped enums.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumItem {
    /// Key of the item (`LOCAL`), absent for literal lists.
    pub key: Option<String>,
    /// Stored value (`'local'`).
    pub value: Value,
}

/// Enum part of a property: declared items plus their lazily resolved form.
#[derive(Debug, Clone)]
pub struct EnumMetadata {
    /// Items as declared.
    pub declared: EnumItems,
    items: Lazy<Vec<EnumItem>>,
}

impl EnumMetadata {
    /// Wrap declared items; nothing is evaluated yet.
    pub fn new(declared: EnumItems) -> Self {
        Self {
            declared,
            items: Lazy::new(),
        }
    }

    /// Resolve the items, evaluating a deferred mapping at most once.
    pub fn items(&self) -> Result<Vec<EnumItem>, LazyError<Infallible>> {
        self.items.force(|| {
            Ok(match &self.declared {
                EnumItems::Literal(values) => values
                    .iter()
                    .map(|value| EnumItem {
                        key: None,
                        value: value.clone(),
                    })
                    .collect(),
                EnumItems::Deferred(thunk) => thunk
                    .call()
                    .into_iter()
                    .map(|(key, value)| EnumItem {
                        key: Some(key),
                        value,
                    })
                    .collect(),
            })
        })
    }

    /// Already resolved items, without forcing.
    pub fn resolved_items(&self) -> Option<Vec<EnumItem>> {
        self.items.get()
    }

    /// Check if `value` is one of the items. Unresolved items are resolved first.
    pub fn contains(&self, value: &Value) -> bool {
        self.items()
            .map(|items| items.iter().any(|item| &item.value == value))
            .unwrap_or(false)
    }
}
