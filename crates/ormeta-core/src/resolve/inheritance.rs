//! Inheritance: base linking and property merging.

use super::{Linker, ResolveContext};
use crate::error::MetadataError;
use crate::metadata::EntityId;
use indexmap::IndexMap;
use tracing::{debug, instrument};

/// Resolve every `extends` reference and break inheritance cycles.
#[instrument(skip(ctx), fields(entities = ctx.entities.len()))]
pub(crate) fn link_bases(ctx: &mut ResolveContext<'_>) {
    let linker = Linker::new(ctx.config, &ctx.names);

    for (index, schema) in ctx.declarations.iter().enumerate() {
        let Some(base) = &schema.extends else {
            continue;
        };
        match linker.chase(&schema.name, "extends", base) {
            Ok(id) => ctx.entities[index].extends = Some(id),
            Err(MetadataError::UnknownEntity { target, .. }) => {
                ctx.errors.push(MetadataError::UnknownBase {
                    entity: schema.name.clone(),
                    base: target,
                });
            }
            Err(err) => ctx.errors.push(err),
        }
    }

    for index in 0..ctx.entities.len() {
        let mut path = vec![EntityId(index)];
        let mut current = ctx.entities[index].extends;
        while let Some(next) = current {
            if let Some(start) = path.iter().position(|id| *id == next) {
                let chain: Vec<&str> = path[start..]
                    .iter()
                    .chain(std::iter::once(&next))
                    .map(|id| ctx.entities[id.index()].name.as_str())
                    .collect();
                let closing = path[path.len() - 1];
                ctx.errors.push(MetadataError::InheritanceCycle {
                    entity: ctx.entities[next.index()].name.clone(),
                    chain: chain.join(" -> "),
                });
                ctx.entities[closing.index()].extends = None;
                break;
            }
            path.push(next);
            current = ctx.entities[next.index()].extends;
        }
    }
}

/// Fold base properties into every child, bases first.
///
/// A child starts from its base's merged map; its own declarations then
/// replace base entries of the same name whole.
#[instrument(skip(ctx), fields(entities = ctx.entities.len()))]
pub(crate) fn merge(ctx: &mut ResolveContext<'_>) {
    let mut order: Vec<(usize, EntityId)> = ctx
        .entities
        .iter()
        .map(|entity| (super::ancestry(&ctx.entities, entity.id).count(), entity.id))
        .collect();
    order.sort();

    let mut merged = 0usize;
    for (_, id) in order {
        let Some(base) = ctx.entities[id.index()].extends else {
            continue;
        };
        let mut properties: IndexMap<_, _> = ctx.entities[base.index()].properties.clone();
        let own = std::mem::take(&mut ctx.entities[id.index()].properties);
        for (name, property) in own {
            properties.insert(name, property);
        }
        ctx.entities[id.index()].properties = properties;
        merged += 1;
    }

    debug!(merged, "Merged inherited properties");
}
