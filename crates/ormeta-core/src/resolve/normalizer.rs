//! Property descriptor normalization.
//!
//! Turns each raw [`PropertyOptions`] record into a [`PropertyMetadata`],
//! classifying its kind, rejecting options that do not apply to that kind
//! and computing the wrapped value shape.

use super::ResolveContext;
use crate::declaration::PropertyOptions;
use crate::error::MetadataError;
use crate::metadata::{
    EnumMetadata, PropertyKind, PropertyMetadata, ReferentialAction, RelationMetadata, ScalarType,
    ValueShape,
};
use tracing::{debug, instrument};

/// Normalize every declared property of every entity.
#[instrument(skip(ctx), fields(entities = ctx.declarations.len()))]
pub(crate) fn run(ctx: &mut ResolveContext<'_>) {
    let mut normalized = 0usize;
    let mut rejected = 0usize;

    for (index, schema) in ctx.declarations.iter().enumerate() {
        for (name, options) in &schema.properties {
            match normalize(&schema.name, name, options) {
                Ok(property) => {
                    ctx.entities[index]
                        .properties
                        .insert(name.clone(), property);
                    normalized += 1;
                }
                Err(err) => {
                    ctx.invalid.insert((ctx.entities[index].id, name.clone()));
                    ctx.errors.push(err);
                    rejected += 1;
                }
            }
        }
    }

    debug!(normalized, rejected, "Normalized property declarations");
}

/// Normalize one declared property of `entity`.
pub(crate) fn normalize(
    entity: &str,
    name: &str,
    options: &PropertyOptions,
) -> Result<PropertyMetadata, MetadataError> {
    let fail = |reason: String| MetadataError::Configuration {
        entity: entity.to_string(),
        property: name.to_string(),
        reason,
    };

    let kind = classify(options).map_err(|reason| fail(reason.to_string()))?;
    check_applicability(kind, options).map_err(fail)?;

    let scalar_type = match kind {
        PropertyKind::Scalar => options.type_name.as_deref().map(ScalarType::parse),
        _ => None,
    };
    let nullable = options.nullable.unwrap_or(false);
    let optional = options.default.is_some() || options.on_create.is_some();
    let shape = ValueShape::wrap(
        ValueShape::base(kind, scalar_type.as_ref()),
        kind,
        options.array,
        options.reference,
        optional,
        nullable,
    );

    let relation = match &options.entity {
        Some(target) if kind.has_target() => {
            let mut relation = RelationMetadata::new(target.clone());
            relation.owner = kind == PropertyKind::ManyToOne;
            relation.owner_hint = options.owner;
            relation.mapped_by = options.mapped_by.clone();
            relation.inversed_by = options.inversed_by.clone();
            relation.delete_rule = options.delete_rule.clone();
            relation.update_rule = options.update_rule.clone();
            relation.defer_mode = options.defer_mode;
            relation.fixed_order = options.fixed_order;
            relation.prefix = options.prefix.clone();
            Some(relation)
        }
        _ => None,
    };

    let enumeration = match (&options.items, kind) {
        (Some(items), PropertyKind::Enum) => Some(EnumMetadata::new(items.clone())),
        _ => None,
    };

    Ok(PropertyMetadata {
        name: name.to_string(),
        kind,
        scalar_type,
        nullable,
        array: options.array,
        reference: options.reference,
        primary: options.primary,
        map_to_pk: options.map_to_pk,
        default: options.default.clone(),
        on_create: options.on_create.clone(),
        on_update: options.on_update.clone(),
        relation,
        enumeration,
        shape,
        declared_by: entity.to_string(),
        synthesized: false,
    })
}

/// Decide the property kind. Exactly one of `type`, `entity` or `enum`
/// characterizes a property.
fn classify(options: &PropertyOptions) -> Result<PropertyKind, &'static str> {
    let is_enum = options.is_enum || options.kind == Some(PropertyKind::Enum);
    let natures = [options.type_name.is_some(), options.entity.is_some(), is_enum]
        .into_iter()
        .filter(|set| *set)
        .count();
    if natures > 1 {
        return Err("only one of `type`, `entity` or `enum` may be set");
    }

    if options.type_name.is_some() {
        return match options.kind {
            None | Some(PropertyKind::Scalar) => Ok(PropertyKind::Scalar),
            Some(_) => Err("a relation or embedded kind requires `entity`, not `type`"),
        };
    }

    if options.entity.is_some() {
        return match options.kind {
            None => Ok(PropertyKind::ManyToOne),
            Some(kind) if kind.has_target() => Ok(kind),
            Some(_) => Err("`entity` requires a relation or embedded kind"),
        };
    }

    if is_enum {
        if options.kind.is_some_and(|kind| kind != PropertyKind::Enum) {
            return Err("`enum` conflicts with the declared kind");
        }
        if options.items.is_none() {
            return Err("enum properties require `items`");
        }
        return Ok(PropertyKind::Enum);
    }

    match options.kind {
        Some(kind) if kind.has_target() => Err("relation and embedded kinds require `entity`"),
        _ if options.items.is_some() => Err("`items` is only allowed on enum properties"),
        _ => Err("one of `type`, `entity` or `enum` is required"),
    }
}

/// Reject options that do not apply to `kind`.
fn check_applicability(kind: PropertyKind, options: &PropertyOptions) -> Result<(), String> {
    let reject = |option: &str| -> Result<(), String> {
        Err(format!("`{option}` is not allowed on {kind} properties"))
    };
    let relation = kind.is_relation();
    let owning_capable = relation && kind != PropertyKind::OneToMany;

    if options.items.is_some() && kind != PropertyKind::Enum {
        return Err("`items` is only allowed on enum properties".to_string());
    }
    if options.mapped_by.is_some() && (!relation || kind == PropertyKind::ManyToOne) {
        return reject("mappedBy");
    }
    if options.mapped_by.is_some() && options.inversed_by.is_some() {
        return Err("`mappedBy` and `inversedBy` are mutually exclusive".to_string());
    }
    if options.owner == Some(true) && options.mapped_by.is_some() {
        return Err("`owner: true` conflicts with `mappedBy`".to_string());
    }
    if options.owner == Some(false) && options.inversed_by.is_some() {
        return Err("`owner: false` conflicts with `inversedBy`".to_string());
    }
    if options.owner == Some(false) && kind == PropertyKind::ManyToOne {
        return Err("a many-to-one side always owns the relation".to_string());
    }
    if kind == PropertyKind::OneToMany && options.mapped_by.is_none() {
        return Err("one-to-many requires `mappedBy`".to_string());
    }
    if !owning_capable {
        if options.inversed_by.is_some() {
            return reject("inversedBy");
        }
        if options.owner.is_some() {
            return reject("owner");
        }
        if options.delete_rule.is_some() {
            return reject("deleteRule");
        }
        if options.update_rule.is_some() {
            return reject("updateRule");
        }
        if options.defer_mode.is_some() {
            return reject("deferMode");
        }
    }
    if options.fixed_order && kind != PropertyKind::ManyToMany {
        return reject("fixedOrder");
    }
    if options.map_to_pk && !matches!(kind, PropertyKind::ManyToOne | PropertyKind::OneToOne) {
        return reject("mapToPk");
    }
    if options.array && relation {
        return reject("array");
    }
    if options.prefix.is_some() && kind != PropertyKind::Embedded {
        return reject("prefix");
    }
    if kind.is_collection() {
        if options.primary {
            return reject("primary");
        }
        if options.default.is_some() {
            return reject("default");
        }
        if options.on_create.is_some() {
            return reject("onCreate");
        }
    }
    if options.primary && options.nullable == Some(true) {
        return Err("a primary key cannot be nullable".to_string());
    }
    if options.nullable != Some(true)
        && (options.delete_rule == Some(ReferentialAction::SetNull)
            || options.update_rule == Some(ReferentialAction::SetNull))
    {
        return Err("`set null` requires a nullable relation".to_string());
    }

    Ok(())
}
