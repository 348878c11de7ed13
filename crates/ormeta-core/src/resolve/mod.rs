//! Resolution passes run by [`MetadataGraph::finalize`].
//!
//! Passes run in order over the whole registered set:
//! normalize, link bases, merge inheritance, resolve relations, link
//! references. Property-level errors are collected into an [`ErrorSink`]
//! and surfaced together.
//!
//! [`MetadataGraph::finalize`]: crate::MetadataGraph::finalize

mod inheritance;
mod linker;
mod normalizer;
mod relation;

use crate::config::ResolverConfig;
use crate::declaration::EntitySchema;
use crate::error::{MetadataError, SchemaValidationError};
use crate::metadata::{EntityId, EntityMetadata, PropertyMetadata};
use linker::Linker;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Error collector; an error with the same rendering is kept once.
#[derive(Debug, Default)]
pub(crate) struct ErrorSink {
    errors: Vec<MetadataError>,
    seen: HashSet<String>,
}

impl ErrorSink {
    pub(crate) fn push(&mut self, error: MetadataError) {
        if self.seen.insert(error.to_string()) {
            self.errors.push(error);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.errors.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn into_inner(self) -> Vec<MetadataError> {
        self.errors
    }
}

/// Mutable state shared by the passes of one `finalize()` attempt.
pub(crate) struct ResolveContext<'a> {
    pub(crate) config: &'a ResolverConfig,
    pub(crate) declarations: Vec<&'a EntitySchema>,
    pub(crate) names: HashMap<String, EntityId>,
    pub(crate) entities: Vec<EntityMetadata>,
    /// Properties dropped by an earlier error; lookups of them stay silent.
    pub(crate) invalid: HashSet<(EntityId, String)>,
    pub(crate) errors: ErrorSink,
}

impl<'a> ResolveContext<'a> {
    /// Register every entity name before any property is looked at.
    pub(crate) fn new(
        config: &'a ResolverConfig,
        declarations: impl IntoIterator<Item = &'a EntitySchema>,
    ) -> Self {
        let declarations: Vec<&EntitySchema> = declarations.into_iter().collect();
        let mut names = HashMap::with_capacity(declarations.len());
        let mut entities = Vec::with_capacity(declarations.len());
        for (index, schema) in declarations.iter().enumerate() {
            let id = EntityId(index);
            names.insert(schema.name.clone(), id);
            let mut entity = EntityMetadata::new(id, schema.name.clone());
            entity.is_abstract = schema.is_abstract;
            entity.embeddable = schema.embeddable;
            entity.keyless = schema.keyless;
            entities.push(entity);
        }

        Self {
            config,
            declarations,
            names,
            entities,
            invalid: HashSet::new(),
            errors: ErrorSink::default(),
        }
    }
}

/// Run every pass and return the resolved entities, or every error found.
pub(crate) fn resolve<'a>(
    config: &'a ResolverConfig,
    declarations: impl IntoIterator<Item = &'a EntitySchema>,
) -> Result<Vec<EntityMetadata>, SchemaValidationError> {
    let mut ctx = ResolveContext::new(config, declarations);

    normalizer::run(&mut ctx);
    inheritance::link_bases(&mut ctx);
    inheritance::merge(&mut ctx);
    relation::run(&mut ctx);
    linker::run(&mut ctx);

    if ctx.errors.is_empty() {
        Ok(ctx.entities)
    } else {
        warn!(errors = ctx.errors.len(), "Metadata resolution failed");
        Err(SchemaValidationError {
            errors: ctx.errors.into_inner(),
        })
    }
}

/// Find a property on an entity or the nearest base declaring it.
pub(crate) fn find_property<'e>(
    entities: &'e [EntityMetadata],
    entity: EntityId,
    name: &str,
) -> Option<(EntityId, &'e PropertyMetadata)> {
    ancestry(entities, entity).find_map(|id| {
        entities[id.0]
            .properties
            .get(name)
            .map(|property| (id, property))
    })
}

/// The entity followed by its bases, nearest first.
pub(crate) fn ancestry(
    entities: &[EntityMetadata],
    entity: EntityId,
) -> impl Iterator<Item = EntityId> + '_ {
    let mut next = Some(entity);
    let mut steps = 0;
    std::iter::from_fn(move || {
        let current = next?;
        // Bases are acyclic once linked; the bound guards a half-linked state.
        steps += 1;
        if steps > entities.len() {
            return None;
        }
        next = entities[current.0].extends;
        Some(current)
    })
}

/// Whether two entities are the same or one inherits from the other.
pub(crate) fn is_related(entities: &[EntityMetadata], a: EntityId, b: EntityId) -> bool {
    ancestry(entities, a).any(|id| id == b) || ancestry(entities, b).any(|id| id == a)
}

/// Whether `name` was dropped from `entity` or one of its bases.
pub(crate) fn is_invalid(
    entities: &[EntityMetadata],
    invalid: &HashSet<(EntityId, String)>,
    entity: EntityId,
    name: &str,
) -> bool {
    ancestry(entities, entity).any(|id| invalid.contains(&(id, name.to_string())))
}
