//! Core error types.

use crate::metadata::PropertyKind;
use thiserror::Error;

/// Metadata declaration and resolution errors.
///
/// Property-level variants are collected during [`finalize`] and surfaced
/// together inside [`MetadataError::SchemaValidation`]. Lifecycle variants
/// (`DuplicateEntity`, `GraphFrozen`) are returned immediately.
///
/// [`finalize`]: crate::MetadataGraph::finalize
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Contradictory or inapplicable options on one property.
    #[error("{entity}.{property}: invalid configuration: {reason}")]
    Configuration {
        /// Declaring entity.
        entity: String,
        /// Offending property.
        property: String,
        /// What is wrong.
        reason: String,
    },

    /// Both sides of a relation claim the same role.
    #[error(
        "{entity}.{property} and {other_entity}.{other_property}: ambiguous ownership: {reason}"
    )]
    AmbiguousOwnership {
        /// First side of the pair.
        entity: String,
        /// First side's property.
        property: String,
        /// Second side of the pair.
        other_entity: String,
        /// Second side's property.
        other_property: String,
        /// Why neither side can be picked.
        reason: String,
    },

    /// `mappedBy`/`inversedBy` names a property the target does not have.
    #[error("{entity}.{property}: {hint} '{inverse}' does not exist on {target}")]
    DanglingMappedBy {
        /// Declaring entity.
        entity: String,
        /// Offending property.
        property: String,
        /// Target entity searched.
        target: String,
        /// Name that was looked up.
        inverse: String,
        /// Which hint carried the name (`mappedBy` or `inversedBy`).
        hint: &'static str,
    },

    /// The reciprocal property exists but has an incompatible kind.
    #[error(
        "{entity}.{property} ({kind}) cannot pair with {other_entity}.{other_property} ({other_kind})"
    )]
    KindMismatch {
        /// Declaring entity.
        entity: String,
        /// Offending property.
        property: String,
        /// Its kind.
        kind: PropertyKind,
        /// Entity holding the reciprocal.
        other_entity: String,
        /// Reciprocal property.
        other_property: String,
        /// Reciprocal kind.
        other_kind: PropertyKind,
    },

    /// The reciprocal property targets an unrelated entity.
    #[error(
        "{entity}.{property}: reciprocal {other_entity}.{other_property} targets {found}, not {entity}"
    )]
    TargetMismatch {
        /// Declaring entity.
        entity: String,
        /// Offending property.
        property: String,
        /// Entity holding the reciprocal.
        other_entity: String,
        /// Reciprocal property.
        other_property: String,
        /// Entity the reciprocal actually targets.
        found: String,
    },

    /// A deferred reference did not settle within the depth bound, or a
    /// target cell was forced from inside its own resolution.
    #[error("{entity}.{property}: circular resolution: {detail}")]
    CircularResolution {
        /// Declaring entity.
        entity: String,
        /// Property whose reference did not settle.
        property: String,
        /// What was being resolved.
        detail: String,
    },

    /// A relation target resolved to a name that was never registered.
    #[error("{entity}.{property}: unknown target entity '{target}'")]
    UnknownEntity {
        /// Declaring entity.
        entity: String,
        /// Offending property.
        property: String,
        /// Name the target resolved to.
        target: String,
    },

    /// `extends` names an entity that was never registered.
    #[error("entity '{entity}' extends unknown entity '{base}'")]
    UnknownBase {
        /// Child entity.
        entity: String,
        /// Missing base name.
        base: String,
    },

    /// `extends` chain loops back on itself.
    #[error("entity '{entity}' has an inheritance cycle: {chain}")]
    InheritanceCycle {
        /// Entity where the cycle was detected.
        entity: String,
        /// The chain, rendered as `A -> B -> A`.
        chain: String,
    },

    /// A table-backed entity ended up without a primary key.
    #[error("entity '{entity}' has no primary key")]
    MissingPrimaryKey {
        /// Entity name.
        entity: String,
    },

    /// An entity name was registered twice.
    #[error("entity '{name}' is already registered")]
    DuplicateEntity {
        /// Entity name.
        name: String,
    },

    /// The graph was already finalized.
    #[error("metadata graph is frozen")]
    GraphFrozen,

    /// Aggregate of every collected resolution error.
    #[error(transparent)]
    SchemaValidation(#[from] SchemaValidationError),

    /// A JSON declaration document could not be decoded.
    #[error("invalid declaration document: {0}")]
    Declaration(#[from] serde_json::Error),

    /// Snapshot serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Snapshot deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl MetadataError {
    /// Entity the error is attributed to, if any.
    pub fn entity(&self) -> Option<&str> {
        match self {
            MetadataError::Configuration { entity, .. }
            | MetadataError::AmbiguousOwnership { entity, .. }
            | MetadataError::DanglingMappedBy { entity, .. }
            | MetadataError::KindMismatch { entity, .. }
            | MetadataError::TargetMismatch { entity, .. }
            | MetadataError::CircularResolution { entity, .. }
            | MetadataError::UnknownEntity { entity, .. }
            | MetadataError::UnknownBase { entity, .. }
            | MetadataError::InheritanceCycle { entity, .. }
            | MetadataError::MissingPrimaryKey { entity } => Some(entity),
            MetadataError::DuplicateEntity { name } => Some(name),
            _ => None,
        }
    }

    /// Property the error is attributed to, if any.
    pub fn property(&self) -> Option<&str> {
        match self {
            MetadataError::Configuration { property, .. }
            | MetadataError::AmbiguousOwnership { property, .. }
            | MetadataError::DanglingMappedBy { property, .. }
            | MetadataError::KindMismatch { property, .. }
            | MetadataError::TargetMismatch { property, .. }
            | MetadataError::CircularResolution { property, .. }
            | MetadataError::UnknownEntity { property, .. } => Some(property),
            _ => None,
        }
    }

    /// Whether this is the aggregate validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, MetadataError::SchemaValidation(_))
    }

    /// The collected errors, if this is the aggregate validation error.
    pub fn validation_errors(&self) -> &[MetadataError] {
        match self {
            MetadataError::SchemaValidation(aggregate) => &aggregate.errors,
            _ => &[],
        }
    }
}

/// Every defect found by a single `finalize()` call.
#[derive(Debug, Error)]
pub struct SchemaValidationError {
    /// Individual errors in discovery order.
    pub errors: Vec<MetadataError>,
}

impl SchemaValidationError {
    /// Number of collected errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no errors were collected.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors attributed to the given entity.
    pub fn for_entity<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a MetadataError> {
        self.errors.iter().filter(move |e| e.entity() == Some(entity))
    }
}

impl std::fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "schema validation failed with {} error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

/// Errors raised while applying entity metadata to caller input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// A required property was not supplied.
    #[error("{entity}.{property} is required")]
    MissingRequired {
        /// Entity name.
        entity: String,
        /// Property name.
        property: String,
    },

    /// A non-nullable property was given null.
    #[error("{entity}.{property} cannot be null")]
    NullViolation {
        /// Entity name.
        entity: String,
        /// Property name.
        property: String,
    },

    /// The input names a property the entity does not have.
    #[error("{entity} has no property '{property}'")]
    UnknownProperty {
        /// Entity name.
        entity: String,
        /// Property name.
        property: String,
    },

    /// The property holds a collection and cannot be assigned directly.
    #[error("{entity}.{property} is a collection and cannot be assigned")]
    NotWritable {
        /// Entity name.
        entity: String,
        /// Property name.
        property: String,
    },
}

/// All input errors found for one record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid input for {entity}: {}", render_list(.errors))]
pub struct InputErrors {
    /// Entity name.
    pub entity: String,
    /// Individual errors in property order.
    pub errors: Vec<InputError>,
}

fn render_list(errors: &[InputError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_entity_and_property() {
        let err = MetadataError::DanglingMappedBy {
            entity: "Author".to_string(),
            property: "books".to_string(),
            target: "Book".to_string(),
            inverse: "writer".to_string(),
            hint: "mappedBy",
        };
        let text = err.to_string();
        assert!(text.contains("Author.books"));
        assert!(text.contains("mappedBy 'writer'"));
        assert_eq!(err.entity(), Some("Author"));
        assert_eq!(err.property(), Some("books"));
    }

    #[test]
    fn test_aggregate_lists_every_error() {
        let aggregate = SchemaValidationError {
            errors: vec![
                MetadataError::MissingPrimaryKey {
                    entity: "Tag".to_string(),
                },
                MetadataError::UnknownEntity {
                    entity: "Post".to_string(),
                    property: "author".to_string(),
                    target: "Usr".to_string(),
                },
            ],
        };
        let text = aggregate.to_string();
        assert!(text.starts_with("schema validation failed with 2 error(s)"));
        assert!(text.contains("entity 'Tag' has no primary key"));
        assert!(text.contains("Post.author: unknown target entity 'Usr'"));
        assert_eq!(aggregate.for_entity("Post").count(), 1);

        let err = MetadataError::from(aggregate);
        assert!(err.is_validation());
        assert_eq!(err.validation_errors().len(), 2);
    }

    #[test]
    fn test_input_errors_display() {
        let errors = InputErrors {
            entity: "User".to_string(),
            errors: vec![
                InputError::MissingRequired {
                    entity: "User".to_string(),
                    property: "email".to_string(),
                },
                InputError::NullViolation {
                    entity: "User".to_string(),
                    property: "name".to_string(),
                },
            ],
        };
        assert_eq!(
            errors.to_string(),
            "invalid input for User: User.email is required; User.name cannot be null"
        );
    }
}
