//! Runtime input preparation.
//!
//! Applies defaults and hooks to caller-supplied records and enforces
//! nullability before they reach the write path.

use crate::error::{InputError, InputErrors};
use crate::metadata::{EntityMetadata, PropertyMetadata};
use crate::value::Value;
use indexmap::IndexMap;

/// Property values keyed by property name.
pub type Record = IndexMap<String, Value>;

impl EntityMetadata {
    /// Prepare a record for insertion.
    ///
    /// Absent properties are filled from their `onCreate` hook, then their
    /// default, then null when nullable. Auto-increment keys and inverse
    /// one-to-one sides may stay absent. The result lists properties in
    /// declaration order.
    pub fn prepare_create(&self, mut record: Record) -> Result<Record, InputErrors> {
        let mut errors = Vec::new();
        let mut prepared = Record::with_capacity(record.len());

        for property in self.properties.values() {
            let supplied = record.shift_remove(&property.name);
            if !property.is_writable() {
                if supplied.is_some() {
                    errors.push(self.not_writable(property));
                }
                continue;
            }

            match supplied {
                Some(value) => {
                    if value.is_null() && !property.nullable {
                        errors.push(self.null_violation(property));
                    } else {
                        prepared.insert(property.name.clone(), value);
                    }
                }
                None => {
                    if let Some(value) = generated_value(property) {
                        prepared.insert(property.name.clone(), value);
                    } else if !property.is_optional_on_input() {
                        errors.push(InputError::MissingRequired {
                            entity: self.name.clone(),
                            property: property.name.clone(),
                        });
                    }
                }
            }
        }

        errors.extend(record.into_keys().map(|property| InputError::UnknownProperty {
            entity: self.name.clone(),
            property,
        }));
        self.finish(prepared, errors)
    }

    /// Prepare a set of changes for an update.
    ///
    /// `onUpdate` hooks run for every property the caller did not change.
    pub fn prepare_update(&self, mut changes: Record) -> Result<Record, InputErrors> {
        let mut errors = Vec::new();
        let mut prepared = Record::with_capacity(changes.len());

        for property in self.properties.values() {
            match changes.shift_remove(&property.name) {
                Some(_) if !property.is_writable() => errors.push(self.not_writable(property)),
                Some(value) if value.is_null() && !property.nullable => {
                    errors.push(self.null_violation(property))
                }
                Some(value) => {
                    prepared.insert(property.name.clone(), value);
                }
                None => {
                    if let Some(hook) = &property.on_update {
                        prepared.insert(property.name.clone(), hook.call());
                    }
                }
            }
        }

        errors.extend(changes.into_keys().map(|property| InputError::UnknownProperty {
            entity: self.name.clone(),
            property,
        }));
        self.finish(prepared, errors)
    }

    fn finish(&self, prepared: Record, errors: Vec<InputError>) -> Result<Record, InputErrors> {
        if errors.is_empty() {
            Ok(prepared)
        } else {
            Err(InputErrors {
                entity: self.name.clone(),
                errors,
            })
        }
    }

    fn not_writable(&self, property: &PropertyMetadata) -> InputError {
        InputError::NotWritable {
            entity: self.name.clone(),
            property: property.name.clone(),
        }
    }

    fn null_violation(&self, property: &PropertyMetadata) -> InputError {
        InputError::NullViolation {
            entity: self.name.clone(),
            property: property.name.clone(),
        }
    }
}

/// Value filled in for an absent property on create.
fn generated_value(property: &PropertyMetadata) -> Option<Value> {
    if let Some(hook) = &property.on_create {
        return Some(hook.call());
    }
    if let Some(default) = &property.default {
        return Some(default.clone());
    }
    property.nullable.then_some(Value::Null)
}
