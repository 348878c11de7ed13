//! Portable snapshot of a frozen entity graph.
//!
//! A snapshot is plain data: targets are named instead of referenced by id,
//! lazy cells are flattened to their values and hooks are reduced to flags.
//! It can be written as rkyv bytes or JSON, and hashed into a fingerprint
//! that changes whenever the resolved metadata changes.

use crate::error::MetadataError;
use crate::graph::EntityGraph;
use crate::metadata::{EntityMetadata, PropertyMetadata};
use rkyv::{Archive, Deserialize, Serialize};

/// Snapshot of a whole graph, entities in registration order.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
pub struct GraphSnapshot {
    /// Entities in registration order.
    pub entities: Vec<EntitySnapshot>,
}

/// Snapshot of one entity.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
pub struct EntitySnapshot {
    /// Registered entity name.
    pub name: String,
    /// Name of the direct base, if any.
    pub extends: Option<String>,
    /// Abstract entities have no table of their own.
    pub is_abstract: bool,
    /// Embeddable entities are only stored inside an owner.
    pub embeddable: bool,
    /// Opted out of the primary-key requirement.
    pub keyless: bool,
    /// Primary key property names, declaration order.
    pub primary_keys: Vec<String>,
    /// Effective properties, inherited ones first.
    pub properties: Vec<PropertySnapshot>,
}

/// Snapshot of one property.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
pub struct PropertySnapshot {
    /// Property name.
    pub name: String,
    /// Kind tag (`scalar`, `m:1`, ...).
    pub kind: String,
    /// Canonical scalar type name, `None` for relations.
    pub scalar_type: Option<String>,
    /// The stored value may be null.
    pub nullable: bool,
    /// Holds a list of values.
    pub array: bool,
    /// Wrapped in a reference on read.
    pub reference: bool,
    /// Part of the primary key.
    pub primary: bool,
    /// Relation exposed as the target's primary key value.
    pub map_to_pk: bool,
    /// Default value rendered as a literal.
    pub default: Option<String>,
    /// An `onCreate` hook is attached.
    pub has_on_create: bool,
    /// An `onUpdate` hook is attached.
    pub has_on_update: bool,
    /// Target entity name for relations and embedded properties.
    pub target: Option<String>,
    /// Owning side of a relation.
    pub owner: bool,
    /// Owning property on the target, set on the inverse side.
    pub mapped_by: Option<String>,
    /// Inverse property on the target, set on the owning side.
    pub inversed_by: Option<String>,
    /// Referential action on delete.
    pub delete_rule: Option<String>,
    /// Referential action on update.
    pub update_rule: Option<String>,
    /// Constraint deferral mode.
    pub defer_mode: Option<String>,
    /// Many-to-many collection keeps insertion order.
    pub fixed_order: bool,
    /// Column prefix of an embedded property.
    pub prefix: Option<String>,
    /// Enum items as `KEY=value` for mapped enums, `value` otherwise.
    pub enum_items: Vec<String>,
    /// Rendered value shape, e.g. `Opt<string>`.
    pub shape: String,
    /// Entity whose declaration the property came from.
    pub declared_by: String,
    /// Added by the resolver as an implicit inverse.
    pub synthesized: bool,
}

impl GraphSnapshot {
    /// Copy a frozen graph.
    pub fn from_graph(graph: &EntityGraph) -> Self {
        Self {
            entities: graph
                .entities()
                .map(|entity| EntitySnapshot::from_entity(graph, entity))
                .collect(),
        }
    }

    /// Get an entity snapshot by name.
    pub fn entity(&self, name: &str) -> Option<&EntitySnapshot> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MetadataError> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| MetadataError::Serialization(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MetadataError> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| MetadataError::Deserialization(e.to_string()))
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, MetadataError> {
        serde_json::to_string_pretty(self).map_err(|e| MetadataError::Serialization(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        serde_json::from_str(json).map_err(|e| MetadataError::Deserialization(e.to_string()))
    }

    /// Hex-encoded blake3 hash of the binary form.
    pub fn fingerprint(&self) -> Result<String, MetadataError> {
        let bytes = self.to_bytes()?;
        Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
    }
}

impl EntitySnapshot {
    fn from_entity(graph: &EntityGraph, entity: &EntityMetadata) -> Self {
        Self {
            name: entity.name.clone(),
            extends: entity
                .extends
                .and_then(|id| graph.get(id))
                .map(|base| base.name.clone()),
            is_abstract: entity.is_abstract,
            embeddable: entity.embeddable,
            keyless: entity.keyless,
            primary_keys: entity.primary_keys.clone(),
            properties: entity
                .properties
                .values()
                .map(|property| PropertySnapshot::from_property(graph, property))
                .collect(),
        }
    }

    /// Get a property snapshot by name.
    pub fn property(&self, name: &str) -> Option<&PropertySnapshot> {
        self.properties.iter().find(|p| p.name == name)
    }
}

impl PropertySnapshot {
    fn from_property(graph: &EntityGraph, property: &PropertyMetadata) -> Self {
        let target = graph.target(property).map(|e| e.name.clone());
        let relation = property.relation.as_ref();
        let enum_items = property
            .enumeration
            .as_ref()
            .and_then(|e| e.resolved_items())
            .unwrap_or_default()
            .into_iter()
            .map(|item| match item.key {
                Some(key) => format!("{key}={}", item.value),
                None => item.value.to_string(),
            })
            .collect();

        Self {
            name: property.name.clone(),
            kind: property.kind.as_str().to_string(),
            scalar_type: property.scalar_type.as_ref().map(|t| t.name().to_string()),
            nullable: property.nullable,
            array: property.array,
            reference: property.reference,
            primary: property.primary,
            map_to_pk: property.map_to_pk,
            default: property.default.as_ref().map(ToString::to_string),
            has_on_create: property.on_create.is_some(),
            has_on_update: property.on_update.is_some(),
            shape: property.shape.render(target.as_deref()),
            target,
            owner: property.owner(),
            mapped_by: property.mapped_by().map(str::to_string),
            inversed_by: property.inversed_by().map(str::to_string),
            delete_rule: relation
                .and_then(|r| r.delete_rule.as_ref())
                .map(|a| a.as_str().to_string()),
            update_rule: relation
                .and_then(|r| r.update_rule.as_ref())
                .map(|a| a.as_str().to_string()),
            defer_mode: relation
                .and_then(|r| r.defer_mode)
                .map(|m| m.as_str().to_string()),
            fixed_order: relation.is_some_and(|r| r.fixed_order),
            prefix: relation.and_then(|r| r.prefix.clone()),
            enum_items,
            declared_by: property.declared_by.clone(),
            synthesized: property.synthesized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::factory as p;
    use crate::declaration::EntitySchema;
    use crate::graph::MetadataGraph;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn graph() -> std::sync::Arc<EntityGraph> {
        let mut graph = MetadataGraph::new();
        graph
            .register_all([
                EntitySchema::new("Author")
                    .with_property("id", p::integer().primary())
                    .with_property("books", p::one_to_many("Book", "author")),
                EntitySchema::new("Book")
                    .with_property("id", p::integer().primary())
                    .with_property("author", p::many_to_one("Author").delete_rule("cascade"))
                    .with_property(
                        "scope",
                        p::enumeration_deferred(|| {
                            vec![("LOCAL".to_string(), Value::from("local"))]
                        })
                        .with_default("local"),
                    ),
            ])
            .unwrap();
        graph.finalize().unwrap()
    }

    #[test]
    fn test_snapshot_contents() {
        let snapshot = graph().snapshot();
        let book = snapshot.entity("Book").unwrap();

        assert_eq!(book.primary_keys, vec!["id".to_string()]);
        let author = book.property("author").unwrap();
        assert_eq!(author.kind, "m:1");
        assert_eq!(author.target.as_deref(), Some("Author"));
        assert!(author.owner);
        assert_eq!(author.inversed_by.as_deref(), Some("books"));
        assert_eq!(author.delete_rule.as_deref(), Some("cascade"));

        let scope = book.property("scope").unwrap();
        assert_eq!(scope.enum_items, vec!["LOCAL='local'".to_string()]);
        assert_eq!(scope.default.as_deref(), Some("'local'"));
    }

    #[test]
    fn test_entity_flags_and_origin() {
        let mut graph = MetadataGraph::new();
        graph
            .register_all([
                EntitySchema::new("Base")
                    .with_abstract()
                    .with_property("id", p::integer().primary()),
                EntitySchema::new("Line")
                    .extends("Base")
                    .with_property("text", p::text().nullable(true)),
                EntitySchema::new("Entry").keyless().with_property("at", p::datetime()),
            ])
            .unwrap();
        let snapshot = graph.finalize().unwrap().snapshot();

        let base = snapshot.entity("Base").unwrap();
        assert!(base.is_abstract);
        assert_eq!(base.extends, None);

        let line = snapshot.entity("Line").unwrap();
        assert_eq!(line.extends.as_deref(), Some("Base"));
        assert!(!line.is_abstract && !line.embeddable);
        assert_eq!(line.property("id").map(|p| p.declared_by.as_str()), Some("Base"));
        let text = line.property("text").unwrap();
        assert!(text.nullable);
        assert_eq!(text.declared_by, "Line");

        let entry = snapshot.entity("Entry").unwrap();
        assert!(entry.keyless);
        assert!(entry.primary_keys.is_empty());
    }

    #[test]
    fn test_bytes_and_json() {
        let snapshot = graph().snapshot();

        let bytes = snapshot.to_bytes().unwrap();
        assert_eq!(GraphSnapshot::from_bytes(&bytes).unwrap(), snapshot);

        let json = snapshot.to_json().unwrap();
        assert_eq!(GraphSnapshot::from_json(&json).unwrap(), snapshot);

        assert!(GraphSnapshot::from_bytes(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let first = graph().fingerprint().unwrap();
        let second = graph().fingerprint().unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }
}
