//! Entity metadata graph: the mutable registry and its frozen result.

use crate::config::ResolverConfig;
use crate::declaration::{EntitySchema, SchemaDocument};
use crate::error::MetadataError;
use crate::metadata::{EntityId, EntityMetadata, PropertyMetadata};
use crate::resolve;
use crate::snapshot::GraphSnapshot;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Registry of entity declarations.
///
/// Declarations are collected with [`register`](Self::register) and resolved
/// together by [`finalize`](Self::finalize). Once finalized the registry is
/// frozen: further registrations fail with [`MetadataError::GraphFrozen`].
#[derive(Debug, Default)]
pub struct MetadataGraph {
    config: ResolverConfig,
    declarations: IndexMap<String, EntitySchema>,
    frozen: Option<Arc<EntityGraph>>,
}

impl MetadataGraph {
    /// Create an empty registry with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with a custom configuration.
    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Resolver configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Register an entity declaration.
    pub fn register(&mut self, schema: EntitySchema) -> Result<(), MetadataError> {
        self.ensure_open()?;
        if self.declarations.contains_key(&schema.name) {
            return Err(MetadataError::DuplicateEntity { name: schema.name });
        }
        debug!(entity = %schema.name, properties = schema.properties.len(), "Registered entity");
        self.declarations.insert(schema.name.clone(), schema);
        Ok(())
    }

    /// Register several declarations, stopping at the first lifecycle error.
    pub fn register_all(
        &mut self,
        schemas: impl IntoIterator<Item = EntitySchema>,
    ) -> Result<(), MetadataError> {
        for schema in schemas {
            self.register(schema)?;
        }
        Ok(())
    }

    /// Register every entity of a JSON declaration document.
    pub fn register_document(&mut self, document: SchemaDocument) -> Result<(), MetadataError> {
        self.register_all(document.entities)
    }

    /// Parse and register a JSON declaration document.
    pub fn register_json(&mut self, json: &str) -> Result<(), MetadataError> {
        self.register_document(SchemaDocument::from_json(json)?)
    }

    /// Register a declaration, replacing one of the same name.
    ///
    /// Returns the replaced declaration, if any.
    pub fn replace(&mut self, schema: EntitySchema) -> Result<Option<EntitySchema>, MetadataError> {
        self.ensure_open()?;
        Ok(self.declarations.insert(schema.name.clone(), schema))
    }

    /// Get a registered declaration.
    pub fn declaration(&self, name: &str) -> Option<&EntitySchema> {
        self.declarations.get(name)
    }

    /// Check if an entity name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.declarations.contains_key(name)
    }

    /// Number of registered declarations.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Resolve every registered declaration and freeze the registry.
    ///
    /// Every defect found is reported at once inside
    /// [`MetadataError::SchemaValidation`]. A failed attempt leaves the
    /// registry open and unchanged. Finalizing a frozen registry returns the
    /// same graph again.
    #[instrument(skip(self), fields(entities = self.declarations.len()))]
    pub fn finalize(&mut self) -> Result<Arc<EntityGraph>, MetadataError> {
        if let Some(graph) = &self.frozen {
            debug!("Metadata graph already frozen");
            return Ok(Arc::clone(graph));
        }

        let entities = resolve::resolve(&self.config, self.declarations.values())?;
        let graph = Arc::new(EntityGraph::new(entities));

        info!(
            entities = graph.len(),
            properties = graph.property_count(),
            "Metadata graph frozen"
        );

        self.frozen = Some(Arc::clone(&graph));
        Ok(graph)
    }

    /// The frozen graph, if finalized.
    pub fn graph(&self) -> Option<Arc<EntityGraph>> {
        self.frozen.clone()
    }

    /// Check if the registry has been finalized.
    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    fn ensure_open(&self) -> Result<(), MetadataError> {
        if self.frozen.is_some() {
            return Err(MetadataError::GraphFrozen);
        }
        Ok(())
    }
}

/// A resolved, read-only entity metadata graph.
#[derive(Debug)]
pub struct EntityGraph {
    entities: Vec<EntityMetadata>,
    by_name: HashMap<String, EntityId>,
}

/// One column of an entity after embedded properties are flattened.
#[derive(Debug, Clone)]
pub struct FlatColumn<'g> {
    /// Column name, including embedded prefixes.
    pub column: String,
    /// Property path from the root entity, e.g. `["address", "city"]`.
    pub path: Vec<String>,
    /// The property backing the column.
    pub property: &'g PropertyMetadata,
}

impl EntityGraph {
    pub(crate) fn new(entities: Vec<EntityMetadata>) -> Self {
        let by_name = entities
            .iter()
            .map(|entity| (entity.name.clone(), entity.id))
            .collect();
        Self { entities, by_name }
    }

    /// Get an entity by name.
    pub fn entity(&self, name: &str) -> Option<&EntityMetadata> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// Get an entity by id.
    pub fn get(&self, id: EntityId) -> Option<&EntityMetadata> {
        self.entities.get(id.index())
    }

    /// All entities in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityMetadata> {
        self.entities.iter()
    }

    /// Entities backed by their own table.
    pub fn tables(&self) -> impl Iterator<Item = &EntityMetadata> {
        self.entities.iter().filter(|e| e.is_table())
    }

    /// Entity names in registration order.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the graph has no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Total number of effective properties across all entities.
    pub fn property_count(&self) -> usize {
        self.entities.iter().map(|e| e.properties.len()).sum()
    }

    /// Target entity of a relation or embedded property.
    pub fn target(&self, property: &PropertyMetadata) -> Option<&EntityMetadata> {
        property.target_id().and_then(|id| self.get(id))
    }

    /// The property on the other side of a bidirectional relation.
    pub fn reciprocal(
        &self,
        entity: &str,
        property: &str,
    ) -> Option<(&EntityMetadata, &PropertyMetadata)> {
        let property = self.entity(entity)?.property(property)?;
        let name = property.relation.as_ref()?.reciprocal_name()?;
        let target = self.target(property)?;
        Some((target, target.property(name)?))
    }

    /// Relations declared on (or inherited by) an entity.
    pub fn relations_from(&self, entity: &str) -> Vec<&PropertyMetadata> {
        self.entity(entity)
            .map(|e| e.relations().collect())
            .unwrap_or_default()
    }

    /// Relations on any entity that target this one.
    pub fn relations_to(&self, entity: &str) -> Vec<(&EntityMetadata, &PropertyMetadata)> {
        let Some(entity) = self.entity(entity) else {
            return Vec::new();
        };
        entity
            .referenced_by
            .iter()
            .filter_map(|back| {
                let source = self.get(back.entity)?;
                Some((source, source.property(&back.property)?))
            })
            .collect()
    }

    /// Columns of an entity with embedded properties flattened in.
    ///
    /// An embedded property contributes its target's columns under its
    /// prefix, `<property>_` unless declared otherwise.
    pub fn flatten_embedded(&self, entity: &str) -> Vec<FlatColumn<'_>> {
        let mut columns = Vec::new();
        if let Some(entity) = self.entity(entity) {
            self.flatten_into(entity, "", &[], &mut columns);
        }
        columns
    }

    fn flatten_into<'g>(
        &'g self,
        entity: &'g EntityMetadata,
        prefix: &str,
        path: &[String],
        columns: &mut Vec<FlatColumn<'g>>,
    ) {
        for property in entity.properties.values() {
            let mut property_path = path.to_vec();
            property_path.push(property.name.clone());

            if property.is_embedded() {
                let Some(target) = self.target(property) else {
                    continue;
                };
                let nested = match property.relation.as_ref().and_then(|r| r.prefix.as_deref()) {
                    Some(own) => format!("{prefix}{own}"),
                    None => format!("{prefix}{}_", property.name),
                };
                self.flatten_into(target, &nested, &property_path, columns);
            } else if property.has_column() {
                columns.push(FlatColumn {
                    column: format!("{prefix}{}", property.name),
                    path: property_path,
                    property,
                });
            }
        }
    }

    /// Portable copy of the graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::from_graph(self)
    }

    /// Content hash of the graph's snapshot.
    pub fn fingerprint(&self) -> Result<String, MetadataError> {
        self.snapshot().fingerprint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::factory as p;
    use crate::metadata::PropertyKind;
    use pretty_assertions::assert_eq;

    fn blog() -> MetadataGraph {
        let mut graph = MetadataGraph::new();
        graph
            .register_all([
                EntitySchema::new("Address")
                    .embeddable()
                    .with_property("street", p::string())
                    .with_property("city", p::string()),
                EntitySchema::new("User")
                    .with_property("id", p::integer().primary())
                    .with_property("address", p::embedded("Address"))
                    .with_property("billing", p::embedded("Address").prefix("bill_"))
                    .with_property("posts", p::one_to_many("Post", "author")),
                EntitySchema::new("Post")
                    .with_property("id", p::integer().primary())
                    .with_property("author", p::many_to_one("User")),
            ])
            .unwrap();
        graph
    }

    #[test]
    fn test_register_duplicate() {
        let mut graph = blog();
        let err = graph.register(EntitySchema::new("User")).unwrap_err();
        assert!(matches!(err, MetadataError::DuplicateEntity { ref name } if name == "User"));
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_finalize_freezes() {
        let mut graph = blog();
        let first = graph.finalize().unwrap();
        assert!(graph.is_frozen());

        let err = graph.register(EntitySchema::new("Tag")).unwrap_err();
        assert!(matches!(err, MetadataError::GraphFrozen));
        assert!(matches!(graph.replace(EntitySchema::new("Post")), Err(MetadataError::GraphFrozen)));

        let second = graph.finalize().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failed_finalize_leaves_registry_open() {
        let mut graph = blog();
        graph
            .replace(
                EntitySchema::new("Post")
                    .with_property("id", p::integer().primary())
                    .with_property("author", p::many_to_one("Usr")),
            )
            .unwrap();

        let err = graph.finalize().unwrap_err();
        assert!(err.is_validation());
        assert!(!graph.is_frozen());
        assert!(graph.graph().is_none());

        graph
            .replace(
                EntitySchema::new("Post")
                    .with_property("id", p::integer().primary())
                    .with_property("author", p::many_to_one("User")),
            )
            .unwrap();
        assert!(graph.finalize().is_ok());
    }

    #[test]
    fn test_read_api() {
        let graph = blog().finalize().unwrap();

        assert_eq!(graph.entity_names(), vec!["Address", "User", "Post"]);
        assert_eq!(graph.tables().count(), 2);

        let author = graph.entity("Post").and_then(|e| e.property("author")).unwrap();
        assert_eq!(graph.target(author).map(|e| e.name.as_str()), Some("User"));

        let (target, posts) = graph.reciprocal("Post", "author").unwrap();
        assert_eq!(target.name, "User");
        assert_eq!(posts.kind, PropertyKind::OneToMany);

        let from_user: Vec<_> = graph
            .relations_from("User")
            .iter()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(from_user, vec!["posts".to_string()]);

        let to_user: Vec<_> = graph
            .relations_to("User")
            .iter()
            .map(|(e, p)| format!("{}.{}", e.name, p.name))
            .collect();
        assert_eq!(to_user, vec!["Post.author".to_string()]);
        assert!(graph.relations_to("Nope").is_empty());
    }

    #[test]
    fn test_flatten_embedded() {
        let graph = blog().finalize().unwrap();
        let columns: Vec<_> = graph
            .flatten_embedded("User")
            .into_iter()
            .map(|c| c.column)
            .collect();

        assert_eq!(
            columns,
            vec!["id", "address_street", "address_city", "bill_street", "bill_city"]
        );

        let flat = graph.flatten_embedded("User");
        assert_eq!(flat[1].path, vec!["address".to_string(), "street".to_string()]);
    }

    #[test]
    fn test_register_json() {
        let mut graph = MetadataGraph::with_config(ResolverConfig::lenient());
        graph
            .register_json(r#"{ "entities": [ { "name": "Log", "properties": { "line": { "type": "text" } } } ] }"#)
            .unwrap();

        let graph = graph.finalize().unwrap();
        assert!(graph.entity("Log").is_some_and(|e| e.primary_keys.is_empty()));
    }
}
