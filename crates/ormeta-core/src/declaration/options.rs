//! Raw property declaration record.

use super::{EntityRef, EnumItems};
use crate::metadata::{DeferMode, PropertyKind, ReferentialAction};
use crate::value::{Hook, Value};
use serde::Deserialize;

/// Options declared for one property, exactly as a front-end produced them.
///
/// Nothing is validated here; the normalizer turns this record into a
/// [`PropertyMetadata`](crate::PropertyMetadata) or a configuration error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertyOptions {
    /// Declared kind (`"m:1"`, `"1:m"`, ...).
    pub kind: Option<PropertyKind>,
    /// Scalar type name.
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    /// Relation or embedded target.
    pub entity: Option<EntityRef>,
    /// Marks an enum property.
    #[serde(rename = "enum")]
    pub is_enum: bool,
    /// Enum items.
    pub items: Option<EnumItems>,
    /// Nullable in storage.
    pub nullable: Option<bool>,
    /// Array of values.
    pub array: bool,
    /// Wrap in a reference handle.
    #[serde(rename = "ref")]
    pub reference: bool,
    /// Part of the primary key.
    pub primary: bool,
    /// Expose the relation as the target's primary key.
    pub map_to_pk: bool,
    /// Default value.
    pub default: Option<Value>,
    /// Value hook evaluated on create.
    #[serde(skip)]
    pub on_create: Option<Hook>,
    /// Value hook evaluated on update.
    #[serde(skip)]
    pub on_update: Option<Hook>,
    /// Explicit ownership.
    pub owner: Option<bool>,
    /// Owning-side property on the target (inverse sides).
    pub mapped_by: Option<String>,
    /// Inverse-side property on the target (owning sides).
    pub inversed_by: Option<String>,
    /// Referential action on delete.
    pub delete_rule: Option<ReferentialAction>,
    /// Referential action on update.
    pub update_rule: Option<ReferentialAction>,
    /// Constraint checking timing.
    pub defer_mode: Option<DeferMode>,
    /// Persist many-to-many collection order.
    pub fixed_order: bool,
    /// Column prefix for embedded properties.
    pub prefix: Option<String>,
}

impl PropertyOptions {
    /// Scalar property of the given type name.
    pub fn typed(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Default::default()
        }
    }

    /// Relation or embedded property of the given kind.
    pub fn relation(kind: PropertyKind, target: impl Into<EntityRef>) -> Self {
        Self {
            kind: Some(kind),
            entity: Some(target.into()),
            ..Default::default()
        }
    }

    /// Enum property.
    pub fn enumeration(items: EnumItems) -> Self {
        Self {
            is_enum: true,
            items: Some(items),
            ..Default::default()
        }
    }

    /// Set nullability.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Mark as an array.
    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    /// Wrap the value in a reference handle.
    pub fn reference(mut self) -> Self {
        self.reference = true;
        self
    }

    /// Mark as primary key.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Expose the relation as the target's primary key.
    pub fn map_to_pk(mut self) -> Self {
        self.map_to_pk = true;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Set the onCreate hook.
    pub fn on_create(mut self, hook: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.on_create = Some(Hook::new(hook));
        self
    }

    /// Set the onUpdate hook.
    pub fn on_update(mut self, hook: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.on_update = Some(Hook::new(hook));
        self
    }

    /// Declare ownership explicitly.
    pub fn owner(mut self, owner: bool) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Point at the owning-side property on the target.
    pub fn mapped_by(mut self, property: impl Into<String>) -> Self {
        self.mapped_by = Some(property.into());
        self
    }

    /// Point at the inverse-side property on the target.
    pub fn inversed_by(mut self, property: impl Into<String>) -> Self {
        self.inversed_by = Some(property.into());
        self
    }

    /// Set the delete rule.
    pub fn delete_rule(mut self, action: impl Into<ReferentialAction>) -> Self {
        self.delete_rule = Some(action.into());
        self
    }

    /// Set the update rule.
    pub fn update_rule(mut self, action: impl Into<ReferentialAction>) -> Self {
        self.update_rule = Some(action.into());
        self
    }

    /// Set the constraint defer mode.
    pub fn defer_mode(mut self, mode: DeferMode) -> Self {
        self.defer_mode = Some(mode);
        self
    }

    /// Persist collection order.
    pub fn fixed_order(mut self) -> Self {
        self.fixed_order = true;
        self
    }

    /// Set the embedded column prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the declared kind.
    pub fn kind(mut self, kind: PropertyKind) -> Self {
        self.kind = Some(kind);
        self
    }
}
