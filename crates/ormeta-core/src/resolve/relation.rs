//! Relation kind resolution: owning versus inverse side.
//!
//! Every relation is paired with its reciprocal on the target (if any) and
//! both sides are cross-linked: the inverse side carries `mapped_by`, the
//! owning side `inversed_by`. Decisions are collected as patches first and
//! applied once every relation has been looked at, so the outcome does not
//! depend on declaration order.
//!
//! The pass runs on merged entities. A child of an abstract base pairs its
//! own copy of an inherited relation, so two children may each link it to
//! a different inverse. A link made on a concrete base reaches every child
//! still carrying the base's copy.

use super::{ancestry, find_property, is_invalid, is_related, Linker, ResolveContext};
use crate::config::ResolverConfig;
use crate::declaration::EntityRef;
use crate::error::MetadataError;
use crate::metadata::{
    EntityId, EntityMetadata, Lazy, PropertyKind, PropertyMetadata, RelationMetadata, ValueShape,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

type PropertyKey = (EntityId, String);

enum Patch {
    /// Settle ownership of one side and fill in its missing hint.
    Link {
        entity: EntityId,
        property: String,
        owner: bool,
        mapped_by: Option<String>,
        inversed_by: Option<String>,
        source: PropertyKey,
    },
    /// Add an implicit inverse collection to a target entity.
    Synthesize {
        target: EntityId,
        property: PropertyMetadata,
        source: PropertyKey,
    },
}

/// Read-only view shared while deciding ownership.
struct Scope<'a> {
    entities: &'a [EntityMetadata],
    invalid: &'a HashSet<PropertyKey>,
    linker: Linker<'a>,
    config: &'a ResolverConfig,
}

/// Decide ownership of every relation in the registered set.
#[instrument(skip(ctx), fields(entities = ctx.entities.len()))]
pub(crate) fn run(ctx: &mut ResolveContext<'_>) {
    let scope = Scope {
        entities: &ctx.entities,
        invalid: &ctx.invalid,
        linker: Linker::new(ctx.config, &ctx.names),
        config: ctx.config,
    };
    let mut patches = Vec::new();
    let mut failed = Vec::new();
    // Inherited copies of a property that failed on its base are skipped.
    let mut rejected: HashSet<PropertyKey> = HashSet::new();
    let mut resolved = 0usize;

    for id in scope.base_first() {
        let entity = &scope.entities[id.index()];
        for property in entity.relations() {
            let origin = scope.origin(entity.id, property);
            let key = (origin, property.name.clone());
            if scope.invalid.contains(&key)
                || rejected.contains(&key)
                || scope.paired_by_base(entity, property)
            {
                continue;
            }
            let target = match scope.linker.resolve_target(&property.declared_by, property) {
                Ok(Some(target)) => target,
                Ok(None) => continue,
                Err(err) => {
                    rejected.insert(key.clone());
                    failed.push(key);
                    ctx.errors.push(err);
                    continue;
                }
            };
            match scope.pair(entity, property, target, &mut patches) {
                Ok(()) => resolved += 1,
                Err(err) => {
                    if origin == entity.id {
                        rejected.insert(key);
                    }
                    ctx.errors.push(err);
                }
            }
        }
    }

    ctx.invalid.extend(failed);

    let mut decided = HashMap::new();
    let mut synthesized = 0usize;
    for patch in patches {
        match patch {
            Patch::Link {
                entity,
                property,
                owner,
                mapped_by,
                inversed_by,
                source,
            } => {
                for copy in inherited_copies(&ctx.entities, entity, &property) {
                    let result = apply_link(
                        &mut ctx.entities,
                        &mut decided,
                        (copy, property.clone()),
                        owner,
                        mapped_by.clone(),
                        inversed_by.clone(),
                        &source,
                    );
                    if let Err(err) = result {
                        ctx.errors.push(err);
                    }
                }
            }
            Patch::Synthesize {
                target,
                property,
                source,
            } => {
                let holder = &ctx.entities[target.index()];
                if holder.properties.contains_key(&property.name) {
                    ctx.errors.push(MetadataError::Configuration {
                        entity: ctx.entities[source.0.index()].name.clone(),
                        property: source.1,
                        reason: format!(
                            "cannot synthesize inverse '{}' on {}: property already exists",
                            property.name, holder.name
                        ),
                    });
                    continue;
                }
                // Children of the target inherit the inverse unless they
                // already declare the name.
                let heirs: Vec<EntityId> = ctx
                    .entities
                    .iter()
                    .filter(|e| ancestry(&ctx.entities, e.id).any(|id| id == target))
                    .map(|e| e.id)
                    .collect();
                for heir in heirs {
                    let properties = &mut ctx.entities[heir.index()].properties;
                    if !properties.contains_key(&property.name) {
                        properties.insert(property.name.clone(), property.clone());
                    }
                }
                synthesized += 1;
            }
        }
    }

    debug!(resolved, synthesized, "Resolved relation ownership");
}

impl Scope<'_> {
    /// Entity ids ordered so every base comes before its children.
    fn base_first(&self) -> Vec<EntityId> {
        let mut order: Vec<(usize, EntityId)> = self
            .entities
            .iter()
            .map(|entity| (ancestry(self.entities, entity.id).count(), entity.id))
            .collect();
        order.sort();
        order.into_iter().map(|(_, id)| id).collect()
    }

    /// The entity in `entity`'s ancestry that declared `property`.
    fn origin(&self, entity: EntityId, property: &PropertyMetadata) -> EntityId {
        ancestry(self.entities, entity)
            .find(|id| self.entities[id.index()].name == property.declared_by)
            .unwrap_or(entity)
    }

    /// Whether a concrete base pairs the copy of `property` that `entity`
    /// inherits. Children of an abstract base pair their copies themselves.
    fn paired_by_base(&self, entity: &EntityMetadata, property: &PropertyMetadata) -> bool {
        entity.extends.is_some_and(|base| {
            let base = &self.entities[base.index()];
            !base.is_abstract
                && base
                    .properties
                    .get(&property.name)
                    .is_some_and(|p| p.declared_by == property.declared_by)
        })
    }

    /// Decide ownership of `property` and queue the links for both sides.
    fn pair(
        &self,
        entity: &EntityMetadata,
        property: &PropertyMetadata,
        target: EntityId,
        patches: &mut Vec<Patch>,
    ) -> Result<(), MetadataError> {
        let Some(relation) = &property.relation else {
            return Ok(());
        };

        if let Some(mapped_by) = &relation.mapped_by {
            let Some((holder, reciprocal)) =
                self.lookup(entity, property, target, mapped_by, "mappedBy")?
            else {
                return Ok(());
            };
            let Some(other) = self.check_reciprocal(entity, property, holder, reciprocal)? else {
                return Ok(());
            };
            if other.mapped_by.is_some() {
                return Err(self.ambiguous(
                    property,
                    reciprocal,
                    "both sides declare `mappedBy`",
                ));
            }
            if let Some(named) = other.inversed_by.as_ref().filter(|n| **n != property.name) {
                return Err(self.ambiguous(
                    property,
                    reciprocal,
                    &format!("the owning side declares `inversedBy: '{named}'`"),
                ));
            }
            if other.owner_hint == Some(false) {
                return Err(self.ambiguous(
                    property,
                    reciprocal,
                    "both sides declare themselves inverse",
                ));
            }

            let source = (holder, reciprocal.name.as_str());
            patches.push(link(entity.id, property, false, None, None, source));
            patches.push(link(
                holder,
                reciprocal,
                true,
                None,
                Some(property.name.clone()),
                (entity.id, property.name.as_str()),
            ));
            return Ok(());
        }

        if let Some(inversed_by) = &relation.inversed_by {
            let Some((holder, reciprocal)) =
                self.lookup(entity, property, target, inversed_by, "inversedBy")?
            else {
                return Ok(());
            };
            let Some(other) = self.check_reciprocal(entity, property, holder, reciprocal)? else {
                return Ok(());
            };
            if other.inversed_by.is_some() {
                return Err(self.ambiguous(
                    property,
                    reciprocal,
                    "both sides declare `inversedBy`",
                ));
            }
            if let Some(named) = other.mapped_by.as_ref().filter(|n| **n != property.name) {
                return Err(self.ambiguous(
                    property,
                    reciprocal,
                    &format!("the inverse side declares `mappedBy: '{named}'`"),
                ));
            }
            if other.owner_hint == Some(true) {
                return Err(self.ambiguous(
                    property,
                    reciprocal,
                    "both sides declare `owner: true`",
                ));
            }

            let source = (holder, reciprocal.name.as_str());
            patches.push(link(entity.id, property, true, None, None, source));
            patches.push(link(
                holder,
                reciprocal,
                false,
                Some(property.name.clone()),
                None,
                (entity.id, property.name.as_str()),
            ));
            return Ok(());
        }

        match property.kind {
            // Owning; a one-to-many naming it links back on its own.
            PropertyKind::ManyToOne => Ok(()),
            PropertyKind::OneToOne | PropertyKind::ManyToMany => {
                self.pair_unhinted(entity, property, target, patches)
            }
            _ => Ok(()),
        }
    }

    /// One-to-one and many-to-many sides declared without `mappedBy` or
    /// `inversedBy`.
    fn pair_unhinted(
        &self,
        entity: &EntityMetadata,
        property: &PropertyMetadata,
        target: EntityId,
        patches: &mut Vec<Patch>,
    ) -> Result<(), MetadataError> {
        let candidates: Vec<(EntityId, &PropertyMetadata)> = self
            .effective_properties(target)
            .into_iter()
            .filter(|(holder, r)| {
                r.kind == property.kind && !(*holder == entity.id && r.name == property.name)
            })
            .filter(|(holder, r)| {
                self.reciprocal_target(*holder, r)
                    .is_some_and(|t| is_related(self.entities, t, entity.id))
            })
            .collect();

        for (holder, reciprocal) in &candidates {
            if reciprocal.mapped_by() == Some(property.name.as_str()) {
                patches.push(link(
                    entity.id,
                    property,
                    true,
                    None,
                    Some(reciprocal.name.clone()),
                    (*holder, reciprocal.name.as_str()),
                ));
                return Ok(());
            }
            if reciprocal.inversed_by() == Some(property.name.as_str()) {
                patches.push(link(
                    entity.id,
                    property,
                    false,
                    Some(reciprocal.name.clone()),
                    None,
                    (*holder, reciprocal.name.as_str()),
                ));
                return Ok(());
            }
        }

        let open: Vec<(EntityId, &PropertyMetadata)> = candidates
            .into_iter()
            .filter(|(_, r)| r.relation.as_ref().is_some_and(RelationMetadata::is_unhinted))
            .collect();
        let hint = property.relation.as_ref().and_then(|r| r.owner_hint);

        match open.as_slice() {
            [] => {
                if hint == Some(false) {
                    return Err(MetadataError::Configuration {
                        entity: entity.name.clone(),
                        property: property.name.clone(),
                        reason: format!(
                            "`owner: false` requires an owning property on {}",
                            self.entities[target.index()].name
                        ),
                    });
                }
                let source = (entity.id, property.name.as_str());
                patches.push(link(entity.id, property, true, None, None, source));
                // An abstract declarer has no table; each concrete child
                // synthesizes its own inverse.
                if property.kind == PropertyKind::ManyToMany
                    && self.config.synthesize_many_to_many_inverse
                    && !entity.is_abstract
                {
                    self.synthesize_inverse(entity, property, target, patches)?;
                }
                Ok(())
            }
            [(holder, reciprocal)] => {
                let other_hint = reciprocal.relation.as_ref().and_then(|r| r.owner_hint);
                let owner = match (hint, other_hint) {
                    (Some(true), Some(true)) => {
                        return Err(self.ambiguous(
                            property,
                            reciprocal,
                            "both sides declare `owner: true`",
                        ));
                    }
                    (Some(false), Some(false)) => {
                        return Err(self.ambiguous(
                            property,
                            reciprocal,
                            "both sides declare `owner: false`",
                        ));
                    }
                    (None, None) => {
                        return Err(self.ambiguous(
                            property,
                            reciprocal,
                            "both sides are declared without `mappedBy`, `inversedBy` or `owner`",
                        ));
                    }
                    (Some(owner), _) => owner,
                    (None, Some(other)) => !other,
                };

                let (mine, theirs) = if owner {
                    ((None, Some(reciprocal.name.clone())), (Some(property.name.clone()), None))
                } else {
                    ((Some(reciprocal.name.clone()), None), (None, Some(property.name.clone())))
                };
                patches.push(link(
                    entity.id,
                    property,
                    owner,
                    mine.0,
                    mine.1,
                    (*holder, reciprocal.name.as_str()),
                ));
                patches.push(link(
                    *holder,
                    reciprocal,
                    !owner,
                    theirs.0,
                    theirs.1,
                    (entity.id, property.name.as_str()),
                ));
                Ok(())
            }
            [(_, reciprocal), ..] => Err(self.ambiguous(
                property,
                reciprocal,
                "several unhinted reciprocal properties could pair with it",
            )),
        }
    }

    /// Queue an implicit inverse collection on the target of a unilateral
    /// many-to-many relation.
    fn synthesize_inverse(
        &self,
        entity: &EntityMetadata,
        property: &PropertyMetadata,
        target: EntityId,
        patches: &mut Vec<Patch>,
    ) -> Result<(), MetadataError> {
        let target_entity = &self.entities[target.index()];
        let name = self
            .config
            .inverse_naming
            .inverse_name(&entity.name, &property.name);

        if find_property(self.entities, target, &name).is_some() {
            return Err(MetadataError::Configuration {
                entity: entity.name.clone(),
                property: property.name.clone(),
                reason: format!(
                    "cannot synthesize inverse '{name}' on {}: property already exists",
                    target_entity.name
                ),
            });
        }

        patches.push(link(
            entity.id,
            property,
            true,
            None,
            Some(name.clone()),
            (target, name.as_str()),
        ));
        patches.push(Patch::Synthesize {
            target,
            property: synthesized_inverse(entity, property, &target_entity.name, name),
            source: (entity.id, property.name.clone()),
        });
        Ok(())
    }

    /// Look up the property named by a hint, on the target or its bases.
    fn lookup(
        &self,
        entity: &EntityMetadata,
        property: &PropertyMetadata,
        target: EntityId,
        name: &str,
        hint: &'static str,
    ) -> Result<Option<(EntityId, &PropertyMetadata)>, MetadataError> {
        if let Some(found) = find_property(self.entities, target, name) {
            return Ok(Some(found));
        }
        if is_invalid(self.entities, self.invalid, target, name) {
            return Ok(None);
        }
        Err(MetadataError::DanglingMappedBy {
            entity: entity.name.clone(),
            property: property.name.clone(),
            target: self.entities[target.index()].name.clone(),
            inverse: name.to_string(),
            hint,
        })
    }

    /// Check kind and target of a named reciprocal. `None` means the
    /// reciprocal's own target is broken and was reported elsewhere.
    fn check_reciprocal<'p>(
        &self,
        entity: &EntityMetadata,
        property: &PropertyMetadata,
        holder: EntityId,
        reciprocal: &'p PropertyMetadata,
    ) -> Result<Option<&'p RelationMetadata>, MetadataError> {
        let holder_name = &self.entities[holder.index()].name;
        let relation = match &reciprocal.relation {
            Some(relation) if property.kind.reciprocal() == Some(reciprocal.kind) => relation,
            _ => {
                return Err(MetadataError::KindMismatch {
                    entity: entity.name.clone(),
                    property: property.name.clone(),
                    kind: property.kind,
                    other_entity: holder_name.clone(),
                    other_property: reciprocal.name.clone(),
                    other_kind: reciprocal.kind,
                })
            }
        };

        let Some(found) = self.reciprocal_target(holder, reciprocal) else {
            return Ok(None);
        };
        if !is_related(self.entities, found, entity.id) {
            return Err(MetadataError::TargetMismatch {
                entity: entity.name.clone(),
                property: property.name.clone(),
                other_entity: holder_name.clone(),
                other_property: reciprocal.name.clone(),
                found: self.entities[found.index()].name.clone(),
            });
        }
        Ok(Some(relation))
    }

    fn reciprocal_target(
        &self,
        holder: EntityId,
        reciprocal: &PropertyMetadata,
    ) -> Option<EntityId> {
        let origin = self.origin(holder, reciprocal);
        if self.invalid.contains(&(origin, reciprocal.name.clone())) {
            return None;
        }
        self.linker
            .resolve_target(&reciprocal.declared_by, reciprocal)
            .ok()
            .flatten()
    }

    /// Properties visible on an entity, nearest declaration first.
    fn effective_properties(&self, entity: EntityId) -> Vec<(EntityId, &PropertyMetadata)> {
        let mut seen = HashSet::new();
        let mut properties = Vec::new();
        for id in ancestry(self.entities, entity) {
            for property in self.entities[id.index()].properties.values() {
                if seen.insert(property.name.as_str()) {
                    properties.push((id, property));
                }
            }
        }
        properties
    }

    /// Ownership conflict between two sides, named by their declaring
    /// entities in a stable order so both sides report the same error.
    fn ambiguous(
        &self,
        property: &PropertyMetadata,
        reciprocal: &PropertyMetadata,
        reason: &str,
    ) -> MetadataError {
        let mut sides = [
            (property.declared_by.clone(), property.name.clone()),
            (reciprocal.declared_by.clone(), reciprocal.name.clone()),
        ];
        sides.sort();
        let [(entity, property), (other_entity, other_property)] = sides;
        MetadataError::AmbiguousOwnership {
            entity,
            property,
            other_entity,
            other_property,
            reason: reason.to_string(),
        }
    }
}

fn link(
    entity: EntityId,
    property: &PropertyMetadata,
    owner: bool,
    mapped_by: Option<String>,
    inversed_by: Option<String>,
    source: (EntityId, &str),
) -> Patch {
    Patch::Link {
        entity,
        property: property.name.clone(),
        owner,
        mapped_by,
        inversed_by,
        source: (source.0, source.1.to_string()),
    }
}

/// `entity` and every descendant still carrying the copy of `name` it holds.
fn inherited_copies(entities: &[EntityMetadata], entity: EntityId, name: &str) -> Vec<EntityId> {
    let Some(declared_by) = entities[entity.index()]
        .properties
        .get(name)
        .map(|p| p.declared_by.as_str())
    else {
        return vec![entity];
    };
    entities
        .iter()
        .filter(|other| {
            other.id == entity
                || (ancestry(entities, other.id).any(|id| id == entity)
                    && other
                        .properties
                        .get(name)
                        .is_some_and(|p| p.declared_by == declared_by))
        })
        .map(|other| other.id)
        .collect()
}

/// Apply one link, reporting contradictions with earlier links.
fn apply_link(
    entities: &mut [EntityMetadata],
    decided: &mut HashMap<PropertyKey, bool>,
    key: PropertyKey,
    owner: bool,
    mapped_by: Option<String>,
    inversed_by: Option<String>,
    source: &PropertyKey,
) -> Result<(), MetadataError> {
    let other_entity = entities[source.0.index()].name.clone();
    let entity = &mut entities[key.0.index()];
    let entity_name = entity.name.clone();
    let Some(relation) = entity
        .properties
        .get_mut(&key.1)
        .and_then(|p| p.relation.as_mut())
    else {
        return Ok(());
    };

    let conflict = |reason: String| MetadataError::AmbiguousOwnership {
        entity: entity_name.clone(),
        property: key.1.clone(),
        other_entity: other_entity.clone(),
        other_property: source.1.clone(),
        reason,
    };

    if decided.get(&key).is_some_and(|previous| *previous != owner) {
        return Err(conflict("its reciprocals disagree on which side owns".to_string()));
    }
    for (slot, value) in [
        (&mut relation.mapped_by, mapped_by),
        (&mut relation.inversed_by, inversed_by),
    ] {
        if let Some(value) = value {
            match slot {
                Some(existing) if *existing != value => {
                    return Err(conflict(format!("already paired with '{existing}'")));
                }
                _ => *slot = Some(value),
            }
        }
    }

    relation.owner = owner;
    decided.insert(key, owner);
    Ok(())
}

/// Inverse collection added to `target_name` for `entity.property`.
fn synthesized_inverse(
    entity: &EntityMetadata,
    property: &PropertyMetadata,
    target_name: &str,
    name: String,
) -> PropertyMetadata {
    let mut relation = RelationMetadata::new(EntityRef::Name(entity.name.clone()));
    relation.target = Lazy::resolved(entity.id);
    relation.mapped_by = Some(property.name.clone());

    PropertyMetadata {
        name,
        kind: PropertyKind::ManyToMany,
        scalar_type: None,
        nullable: false,
        array: false,
        reference: false,
        primary: false,
        map_to_pk: false,
        default: None,
        on_create: None,
        on_update: None,
        relation: Some(relation),
        enumeration: None,
        shape: ValueShape::base(PropertyKind::ManyToMany, None),
        declared_by: target_name.to_string(),
        synthesized: true,
    }
}
