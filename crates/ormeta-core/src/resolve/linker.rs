//! Reference linking.
//!
//! Entity references are chased lazily: a relation's target cell is forced
//! the first time a pass needs it, and the final pass here forces whatever
//! is left, resolves enum items and records back-references.

use super::{ancestry, is_invalid, ResolveContext};
use crate::config::ResolverConfig;
use crate::declaration::EntityRef;
use crate::error::MetadataError;
use crate::metadata::{
    BackReference, EntityId, EntityMetadata, EnumMetadata, LazyError, PropertyMetadata,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

/// Resolves declared entity references against the registered names.
#[derive(Clone, Copy)]
pub(crate) struct Linker<'a> {
    max_depth: usize,
    names: &'a HashMap<String, EntityId>,
}

impl<'a> Linker<'a> {
    pub(crate) fn new(config: &ResolverConfig, names: &'a HashMap<String, EntityId>) -> Self {
        Self {
            max_depth: config.max_thunk_depth,
            names,
        }
    }

    /// Chase a reference through any thunks down to a registered entity.
    pub(crate) fn chase(
        &self,
        entity: &str,
        property: &str,
        declared: &EntityRef,
    ) -> Result<EntityId, MetadataError> {
        let mut current = declared.clone();
        let mut depth = 0;
        loop {
            let name = match current {
                EntityRef::Name(name) => name,
                EntityRef::Schema(schema) => schema.name.clone(),
                EntityRef::Deferred(thunk) => {
                    if depth == self.max_depth {
                        return Err(MetadataError::CircularResolution {
                            entity: entity.to_string(),
                            property: property.to_string(),
                            detail: format!(
                                "deferred reference did not settle after {depth} evaluations"
                            ),
                        });
                    }
                    depth += 1;
                    current = thunk.call();
                    continue;
                }
            };

            return self
                .names
                .get(&name)
                .copied()
                .ok_or_else(|| MetadataError::UnknownEntity {
                    entity: entity.to_string(),
                    property: property.to_string(),
                    target: name,
                });
        }
    }

    /// Force the target cell of a relation or embedded property.
    ///
    /// Returns `Ok(None)` for properties without a target.
    pub(crate) fn resolve_target(
        &self,
        entity: &str,
        property: &PropertyMetadata,
    ) -> Result<Option<EntityId>, MetadataError> {
        let Some(relation) = &property.relation else {
            return Ok(None);
        };

        match relation
            .target
            .force(|| self.chase(entity, &property.name, &relation.declared))
        {
            Ok(id) => Ok(Some(id)),
            Err(LazyError::Failed(err)) => Err(err),
            // `chase` never forces a cell; only a caller forcing this cell
            // around `resolve_target` gets here.
            Err(LazyError::Reentered) => Err(MetadataError::CircularResolution {
                entity: entity.to_string(),
                property: property.name.clone(),
                detail: "target was requested while it was being resolved".to_string(),
            }),
        }
    }
}

/// Final linking pass over the merged entities.
#[instrument(skip(ctx), fields(entities = ctx.entities.len()))]
pub(crate) fn run(ctx: &mut ResolveContext<'_>) {
    let linker = Linker::new(ctx.config, &ctx.names);
    let mut forced = 0usize;

    for entity in &ctx.entities {
        for property in entity.own_properties() {
            if property.relation.is_some() {
                if ctx.invalid.contains(&(entity.id, property.name.clone())) {
                    continue;
                }
                match linker.resolve_target(&entity.name, property) {
                    Ok(_) => forced += 1,
                    Err(err) => ctx.errors.push(err),
                }
            }
            if let Some(enumeration) = &property.enumeration {
                if let Some(err) = check_enum(&entity.name, property, enumeration) {
                    ctx.errors.push(err);
                }
            }
        }
    }

    check_embedded(ctx);
    record_back_references(&mut ctx.entities);

    for index in 0..ctx.entities.len() {
        ctx.entities[index].derive_primary_keys();
        let entity = &ctx.entities[index];
        if ctx.config.require_primary_key
            && entity.is_table()
            && !entity.keyless
            && entity.primary_keys.is_empty()
            && !has_invalid_key(ctx, entity.id)
        {
            ctx.errors.push(MetadataError::MissingPrimaryKey {
                entity: entity.name.clone(),
            });
        }
    }

    debug!(forced, "Linked entity references");
}

/// Resolve enum items and check the default against them.
fn check_enum(
    entity: &str,
    property: &PropertyMetadata,
    enumeration: &EnumMetadata,
) -> Option<MetadataError> {
    let items = enumeration.items().ok()?;
    let default = property.default.as_ref()?;
    if default.is_null() || property.array || items.iter().any(|item| &item.value == default) {
        return None;
    }
    Some(MetadataError::Configuration {
        entity: entity.to_string(),
        property: property.name.clone(),
        reason: format!("default {default} is not one of the enum items"),
    })
}

/// Embedded properties must target embeddable entities without cycles, and
/// relations must not target embeddables.
fn check_embedded(ctx: &mut ResolveContext<'_>) {
    let mut edges: HashMap<EntityId, Vec<EntityId>> = HashMap::new();

    for entity in &ctx.entities {
        for property in entity.own_properties() {
            let Some(target) = property.target_id() else {
                continue;
            };
            let target_entity = &ctx.entities[target.index()];
            if property.is_embedded() {
                if !target_entity.embeddable {
                    ctx.errors.push(MetadataError::Configuration {
                        entity: entity.name.clone(),
                        property: property.name.clone(),
                        reason: format!("embedded target {} is not embeddable", target_entity.name),
                    });
                    continue;
                }
                edges.entry(entity.id).or_default().push(target);
            } else if target_entity.embeddable {
                ctx.errors.push(MetadataError::Configuration {
                    entity: entity.name.clone(),
                    property: property.name.clone(),
                    reason: format!(
                        "relation cannot target embeddable {}; use an embedded property",
                        target_entity.name
                    ),
                });
            }
        }
    }

    for entity in &ctx.entities {
        for property in entity.own_properties().filter(|p| p.is_embedded()) {
            let Some(target) = property.target_id() else {
                continue;
            };
            if reaches(&edges, target, entity.id) {
                ctx.errors.push(MetadataError::Configuration {
                    entity: entity.name.clone(),
                    property: property.name.clone(),
                    reason: format!(
                        "embedding {} creates a cycle",
                        ctx.entities[target.index()].name
                    ),
                });
            }
        }
    }
}

/// Whether `to` is reachable from `from` along embedded edges.
fn reaches(edges: &HashMap<EntityId, Vec<EntityId>>, from: EntityId, to: EntityId) -> bool {
    let mut stack = vec![from];
    let mut seen = HashSet::new();
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if seen.insert(current) {
            if let Some(next) = edges.get(&current) {
                stack.extend(next.iter().copied());
            }
        }
    }
    false
}

/// Record every relation on the entity it targets.
fn record_back_references(entities: &mut [EntityMetadata]) {
    let mut back_references: Vec<(EntityId, BackReference)> = Vec::new();
    for entity in entities.iter() {
        for property in entity.relations() {
            if let Some(target) = property.target_id() {
                back_references.push((
                    target,
                    BackReference {
                        entity: entity.id,
                        property: property.name.clone(),
                        kind: property.kind,
                    },
                ));
            }
        }
    }

    for entity in entities.iter_mut() {
        entity.referenced_by.clear();
    }
    for (target, back_reference) in back_references {
        entities[target.index()].referenced_by.push(back_reference);
    }
}

/// Whether a primary key declared on the entity or a base was dropped.
fn has_invalid_key(ctx: &ResolveContext<'_>, entity: EntityId) -> bool {
    ancestry(&ctx.entities, entity).any(|id| {
        ctx.declarations[id.index()]
            .properties
            .iter()
            .any(|(name, options)| {
                options.primary && is_invalid(&ctx.entities, &ctx.invalid, id, name)
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::factory as p;
    use crate::metadata::PropertyKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn names() -> HashMap<String, EntityId> {
        HashMap::from([("Node".to_string(), EntityId(0)), ("Leaf".to_string(), EntityId(1))])
    }

    #[test]
    fn test_chase_names_schemas_and_thunks() {
        let config = ResolverConfig::default();
        let names = names();
        let linker = Linker::new(&config, &names);

        assert_eq!(linker.chase("A", "b", &EntityRef::from("Leaf")).unwrap(), EntityId(1));

        let schema = Arc::new(crate::declaration::EntitySchema::new("Node"));
        assert_eq!(linker.chase("A", "b", &EntityRef::from(&schema)).unwrap(), EntityId(0));

        let nested = EntityRef::deferred(|| EntityRef::deferred(|| "Leaf".into()));
        assert_eq!(linker.chase("A", "b", &nested).unwrap(), EntityId(1));
    }

    #[test]
    fn test_chase_unknown_name() {
        let config = ResolverConfig::default();
        let names = names();
        let linker = Linker::new(&config, &names);

        let err = linker.chase("Post", "author", &EntityRef::from("Usr")).unwrap_err();
        assert_eq!(err.to_string(), "Post.author: unknown target entity 'Usr'");
    }

    fn endless() -> EntityRef {
        EntityRef::deferred(endless)
    }

    #[test]
    fn test_chase_depth_limit() {
        let config = ResolverConfig::default().max_thunk_depth(4);
        let names = names();
        let linker = Linker::new(&config, &names);

        let err = linker.chase("Node", "next", &endless()).unwrap_err();
        assert!(matches!(err, MetadataError::CircularResolution { .. }));
        assert!(err.to_string().contains("after 4 evaluations"));
    }

    #[test]
    fn test_resolve_target_memoizes() {
        let config = ResolverConfig::default();
        let names = names();
        let linker = Linker::new(&config, &names);

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let options = p::many_to_one(EntityRef::deferred(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            "Node".into()
        }));
        let property = super::super::normalizer::normalize("Node", "parent", &options).unwrap();

        assert_eq!(linker.resolve_target("Node", &property).unwrap(), Some(EntityId(0)));
        assert_eq!(linker.resolve_target("Node", &property).unwrap(), Some(EntityId(0)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(property.kind, PropertyKind::ManyToOne);
        assert_eq!(property.target_id(), Some(EntityId(0)));
    }

    #[test]
    fn test_resolve_target_inside_its_own_cell() {
        let config = ResolverConfig::default();
        let names = names();
        let linker = Linker::new(&config, &names);
        let options = p::many_to_one("Node");
        let property = super::super::normalizer::normalize("Node", "parent", &options).unwrap();
        let cell = property.relation.as_ref().map(|r| r.target.clone()).unwrap();

        let outcome = cell.force(|| {
            linker
                .resolve_target("Node", &property)
                .map(|target| target.unwrap_or(EntityId(0)))
        });

        match outcome {
            Err(LazyError::Failed(err)) => {
                assert!(matches!(err, MetadataError::CircularResolution { .. }));
                assert!(err.to_string().contains("requested while it was being resolved"));
            }
            other => panic!("Expected a circular resolution error, got {other:?}"),
        }
        assert!(!cell.is_resolved());
        assert_eq!(linker.resolve_target("Node", &property).unwrap(), Some(EntityId(0)));
    }

    #[test]
    fn test_reaches() {
        let edges = HashMap::from([
            (EntityId(0), vec![EntityId(1)]),
            (EntityId(1), vec![EntityId(2)]),
        ]);
        assert!(reaches(&edges, EntityId(0), EntityId(2)));
        assert!(!reaches(&edges, EntityId(2), EntityId(0)));
    }
}
