//! Wrapped value shapes.
//!
//! A property's shape is built from its base (scalar, enum, entity or
//! collection) by wrapping in a fixed order: array, reference, optional,
//! nullable. A reference never wraps a collection.

use super::types::{PropertyKind, ScalarType};
use std::fmt;

/// The shape of a property value as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueShape {
    /// A scalar value.
    Scalar(ScalarType),
    /// One of the enum items.
    Enum,
    /// A single related or embedded entity.
    Entity,
    /// A collection of related entities.
    Collection,
    /// An array of the inner shape.
    Array(Box<ValueShape>),
    /// A lazy reference handle around the inner shape.
    Ref(Box<ValueShape>),
    /// Optional on input: a default or onCreate hook fills it in.
    Opt(Box<ValueShape>),
    /// Nullable in storage.
    Nullable(Box<ValueShape>),
}

impl ValueShape {
    /// Wrap a base shape according to the property modifiers.
    pub fn wrap(
        base: ValueShape,
        kind: PropertyKind,
        array: bool,
        reference: bool,
        optional: bool,
        nullable: bool,
    ) -> Self {
        let mut shape = base;
        if array {
            shape = ValueShape::Array(Box::new(shape));
        }
        if reference && !kind.is_collection() {
            shape = ValueShape::Ref(Box::new(shape));
        }
        if optional {
            shape = ValueShape::Opt(Box::new(shape));
        }
        if nullable {
            shape = ValueShape::Nullable(Box::new(shape));
        }
        shape
    }

    /// Base shape for a property kind.
    pub fn base(kind: PropertyKind, scalar: Option<&ScalarType>) -> Self {
        match kind {
            PropertyKind::Scalar => {
                ValueShape::Scalar(scalar.cloned().unwrap_or(ScalarType::Unknown))
            }
            PropertyKind::Enum => ValueShape::Enum,
            PropertyKind::OneToMany | PropertyKind::ManyToMany => ValueShape::Collection,
            PropertyKind::ManyToOne | PropertyKind::OneToOne | PropertyKind::Embedded => {
                ValueShape::Entity
            }
        }
    }

    /// Check if the outermost wrapper admits null.
    pub fn is_nullable(&self) -> bool {
        matches!(self, ValueShape::Nullable(_))
    }

    /// Check if the value may be omitted on input because it is filled in.
    pub fn is_opt(&self) -> bool {
        match self {
            ValueShape::Opt(_) => true,
            ValueShape::Nullable(inner) => inner.is_opt(),
            _ => false,
        }
    }

    /// Check if a reference handle appears anywhere in the shape.
    pub fn is_reference(&self) -> bool {
        match self {
            ValueShape::Ref(_) => true,
            ValueShape::Array(inner) | ValueShape::Opt(inner) | ValueShape::Nullable(inner) => {
                inner.is_reference()
            }
            _ => false,
        }
    }

    /// Render the shape, naming the target entity where known.
    pub fn render(&self, target: Option<&str>) -> String {
        let target = target.unwrap_or("entity");
        match self {
            ValueShape::Scalar(scalar) => scalar.name().to_string(),
            ValueShape::Enum => "enum".to_string(),
            ValueShape::Entity => target.to_string(),
            ValueShape::Collection => format!("Collection<{target}>"),
            ValueShape::Array(inner) => format!("{}[]", inner.render(Some(target))),
            ValueShape::Ref(inner) => format!("Ref<{}>", inner.render(Some(target))),
            ValueShape::Opt(inner) => format!("Opt<{}>", inner.render(Some(target))),
            ValueShape::Nullable(inner) => format!("{} | null", inner.render(Some(target))),
        }
    }
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_string() -> ValueShape {
        ValueShape::base(PropertyKind::Scalar, Some(&ScalarType::String))
    }

    #[test]
    fn test_wrapping_order() {
        let shape = ValueShape::wrap(
            scalar_string(),
            PropertyKind::Scalar,
            false,
            true,
            true,
            true,
        );
        assert_eq!(shape.to_string(), "Opt<Ref<string>> | null");
        assert!(shape.is_nullable());
        assert!(shape.is_opt());
        assert!(shape.is_reference());
    }

    #[test]
    fn test_reference_skips_collections() {
        let shape = ValueShape::wrap(
            ValueShape::base(PropertyKind::OneToMany, None),
            PropertyKind::OneToMany,
            false,
            true,
            false,
            true,
        );
        assert_eq!(shape.render(Some("Book")), "Collection<Book> | null");
        assert!(!shape.is_reference());
    }

    #[test]
    fn test_array_inside_reference() {
        let shape = ValueShape::wrap(
            ValueShape::base(PropertyKind::Enum, None),
            PropertyKind::Enum,
            true,
            true,
            false,
            false,
        );
        assert_eq!(shape.to_string(), "Ref<enum[]>");
        assert!(!shape.is_opt());
    }

    #[test]
    fn test_plain_relation() {
        let shape = ValueShape::wrap(
            ValueShape::base(PropertyKind::ManyToOne, None),
            PropertyKind::ManyToOne,
            false,
            true,
            false,
            false,
        );
        assert_eq!(shape.render(Some("Bar")), "Ref<Bar>");
    }
}
