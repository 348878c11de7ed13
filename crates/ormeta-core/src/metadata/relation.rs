//! Relation metadata carried by relation and embedded properties.

use super::lazy::Lazy;
use super::types::{DeferMode, EntityId, ReferentialAction};
use crate::declaration::EntityRef;

/// Relation-only part of a property.
#[derive(Debug, Clone)]
pub struct RelationMetadata {
    /// Target as declared (name, schema object or thunk).
    pub declared: EntityRef,
    /// Target resolved on first access and memoized.
    pub target: Lazy<EntityId>,
    /// Whether this side holds the foreign key / owns the join table.
    pub owner: bool,
    /// Owning-side property on the target (set on inverse sides).
    pub mapped_by: Option<String>,
    /// Inverse-side property on the target (set on owning sides).
    pub inversed_by: Option<String>,
    /// Action when the referenced row is deleted.
    pub delete_rule: Option<ReferentialAction>,
    /// Action when the referenced key is updated.
    pub update_rule: Option<ReferentialAction>,
    /// Constraint checking timing.
    pub defer_mode: Option<DeferMode>,
    /// Whether many-to-many collection order is persisted.
    pub fixed_order: bool,
    /// Column prefix for embedded properties.
    pub prefix: Option<String>,
    /// Ownership as declared by `owner`, before resolution.
    pub(crate) owner_hint: Option<bool>,
}

impl RelationMetadata {
    /// Create relation metadata for a declared target.
    pub fn new(declared: EntityRef) -> Self {
        Self {
            declared,
            target: Lazy::new(),
            owner: false,
            mapped_by: None,
            inversed_by: None,
            delete_rule: None,
            update_rule: None,
            defer_mode: None,
            fixed_order: false,
            prefix: None,
            owner_hint: None,
        }
    }

    /// Resolved target, if linked.
    pub fn target_id(&self) -> Option<EntityId> {
        self.target.get()
    }

    /// Check if this is the inverse (non-owning) side.
    pub fn is_inverse(&self) -> bool {
        !self.owner
    }

    /// Name of the property on the target that pairs with this one.
    pub fn reciprocal_name(&self) -> Option<&str> {
        self.mapped_by.as_deref().or(self.inversed_by.as_deref())
    }

    /// Check if the relation has no declared hints at all.
    pub(crate) fn is_unhinted(&self) -> bool {
        self.mapped_by.is_none() && self.inversed_by.is_none()
    }
}
