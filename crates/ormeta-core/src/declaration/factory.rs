//! Builder front-end: one factory per property type.
//!
//! Re-exported at the crate root as `p`, so declarations read
//! `p::string().nullable(true)` or `p::one_to_many("Book", "author")`.

use super::{EntityRef, EnumItems, PropertyOptions};
use crate::metadata::PropertyKind;
use crate::value::Value;

macro_rules! scalar_factories {
    ($($(#[$doc:meta])* $fn_name:ident => $type_name:literal;)*) => {
        $(
            $(#[$doc])*
            pub fn $fn_name() -> PropertyOptions {
                PropertyOptions::typed($type_name)
            }
        )*
    };
}

scalar_factories! {
    /// Variable length string.
    string => "string";
    /// Unbounded text.
    text => "text";
    /// Fixed length string.
    character => "character";
    /// UUID.
    uuid => "uuid";
    /// 32-bit integer.
    integer => "integer";
    /// 16-bit integer.
    smallint => "smallint";
    /// 8-bit integer.
    tinyint => "tinyint";
    /// 24-bit integer.
    mediumint => "mediumint";
    /// 64-bit integer.
    bigint => "bigint";
    /// Single precision float.
    float => "float";
    /// Double precision float.
    double => "double";
    /// Fixed-precision decimal.
    decimal => "decimal";
    /// Boolean.
    boolean => "boolean";
    /// Calendar date.
    date => "date";
    /// Time of day.
    time => "time";
    /// Date and time.
    datetime => "datetime";
    /// Time interval.
    interval => "interval";
    /// JSON document.
    json => "json";
    /// Binary large object.
    blob => "blob";
    /// Byte array.
    uint8array => "uint8array";
    /// Array of strings.
    array => "array";
    /// Untyped.
    unknown => "unknown";
}

/// Scalar of any type name, including custom mapped types.
pub fn property(type_name: impl Into<String>) -> PropertyOptions {
    PropertyOptions::typed(type_name)
}

/// Many-to-one relation; owning unless hinted otherwise.
pub fn many_to_one(target: impl Into<EntityRef>) -> PropertyOptions {
    PropertyOptions::relation(PropertyKind::ManyToOne, target)
}

/// One-to-one relation.
pub fn one_to_one(target: impl Into<EntityRef>) -> PropertyOptions {
    PropertyOptions::relation(PropertyKind::OneToOne, target)
}

/// One-to-many relation; always the inverse of `target.mapped_by`.
pub fn one_to_many(target: impl Into<EntityRef>, mapped_by: impl Into<String>) -> PropertyOptions {
    PropertyOptions::relation(PropertyKind::OneToMany, target).mapped_by(mapped_by)
}

/// Many-to-many relation.
pub fn many_to_many(target: impl Into<EntityRef>) -> PropertyOptions {
    PropertyOptions::relation(PropertyKind::ManyToMany, target)
}

/// Embedded entity.
pub fn embedded(target: impl Into<EntityRef>) -> PropertyOptions {
    PropertyOptions::relation(PropertyKind::Embedded, target)
}

/// Enum with literal items.
pub fn enumeration<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> PropertyOptions {
    PropertyOptions::enumeration(EnumItems::literal(items))
}

/// Enum whose key to value mapping is produced on first use.
pub fn enumeration_deferred(
    items: impl Fn() -> Vec<(String, Value)> + Send + Sync + 'static,
) -> PropertyOptions {
    PropertyOptions::enumeration(EnumItems::deferred(items))
}
