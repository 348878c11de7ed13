//! Core type definitions for entity metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic type tag of a scalar property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Variable length string.
    String,
    /// Unbounded text.
    Text,
    /// Fixed length character string.
    Character,
    /// UUID (128-bit identifier).
    Uuid,
    /// 32-bit integer.
    Integer,
    /// 16-bit integer.
    SmallInt,
    /// 8-bit integer.
    TinyInt,
    /// 24-bit integer.
    MediumInt,
    /// 64-bit integer.
    BigInt,
    /// Single precision float.
    Float,
    /// Double precision float.
    Double,
    /// Fixed-precision decimal.
    Decimal,
    /// Boolean value.
    Boolean,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    DateTime,
    /// Time interval.
    Interval,
    /// JSON document.
    Json,
    /// Binary large object.
    Blob,
    /// Byte array.
    Uint8Array,
    /// Array of strings.
    Array,
    /// Untyped.
    Unknown,
    /// A user-defined mapped type, kept by name.
    Custom(String),
}

impl ScalarType {
    /// Resolve a declared type name. Unknown names become [`ScalarType::Custom`].
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "string" => ScalarType::String,
            "text" => ScalarType::Text,
            "character" | "char" => ScalarType::Character,
            "uuid" => ScalarType::Uuid,
            "integer" | "int" => ScalarType::Integer,
            "smallint" => ScalarType::SmallInt,
            "tinyint" => ScalarType::TinyInt,
            "mediumint" => ScalarType::MediumInt,
            "bigint" => ScalarType::BigInt,
            "float" => ScalarType::Float,
            "double" | "number" => ScalarType::Double,
            "decimal" => ScalarType::Decimal,
            "boolean" | "bool" => ScalarType::Boolean,
            "date" if name == "Date" => ScalarType::DateTime,
            "date" => ScalarType::Date,
            "time" => ScalarType::Time,
            "datetime" => ScalarType::DateTime,
            "interval" => ScalarType::Interval,
            "json" => ScalarType::Json,
            "blob" => ScalarType::Blob,
            "uint8array" => ScalarType::Uint8Array,
            "array" => ScalarType::Array,
            "unknown" => ScalarType::Unknown,
            _ => ScalarType::Custom(name.to_string()),
        }
    }

    /// Canonical name of the type.
    pub fn name(&self) -> &str {
        match self {
            ScalarType::String => "string",
            ScalarType::Text => "text",
            ScalarType::Character => "character",
            ScalarType::Uuid => "uuid",
            ScalarType::Integer => "integer",
            ScalarType::SmallInt => "smallint",
            ScalarType::TinyInt => "tinyint",
            ScalarType::MediumInt => "mediumint",
            ScalarType::BigInt => "bigint",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
            ScalarType::Decimal => "decimal",
            ScalarType::Boolean => "boolean",
            ScalarType::Date => "date",
            ScalarType::Time => "time",
            ScalarType::DateTime => "datetime",
            ScalarType::Interval => "interval",
            ScalarType::Json => "json",
            ScalarType::Blob => "blob",
            ScalarType::Uint8Array => "uint8array",
            ScalarType::Array => "array",
            ScalarType::Unknown => "unknown",
            ScalarType::Custom(name) => name,
        }
    }

    /// Check if this type belongs to the integer family (auto-increment capable).
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ScalarType::Integer
                | ScalarType::SmallInt
                | ScalarType::TinyInt
                | ScalarType::MediumInt
                | ScalarType::BigInt
        )
    }

    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        self.is_integer()
            || matches!(
                self,
                ScalarType::Float | ScalarType::Double | ScalarType::Decimal
            )
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalarType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ScalarType::parse(s))
    }
}

/// Kind of a property: scalar, enum, embedded, or one of the four relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    /// Plain column.
    #[serde(rename = "scalar")]
    Scalar,
    /// Enumerated column.
    #[serde(rename = "enum")]
    Enum,
    /// Target properties flattened into the owner's columns.
    #[serde(rename = "embedded")]
    Embedded,
    /// Many-to-one (foreign key on this side).
    #[serde(rename = "m:1")]
    ManyToOne,
    /// One-to-one.
    #[serde(rename = "1:1")]
    OneToOne,
    /// One-to-many (inverse of a many-to-one).
    #[serde(rename = "1:m")]
    OneToMany,
    /// Many-to-many (join table).
    #[serde(rename = "m:n")]
    ManyToMany,
}

impl PropertyKind {
    /// Check if this kind is one of the four relation kinds.
    pub fn is_relation(&self) -> bool {
        matches!(
            self,
            PropertyKind::ManyToOne
                | PropertyKind::OneToOne
                | PropertyKind::OneToMany
                | PropertyKind::ManyToMany
        )
    }

    /// Check if this kind holds a collection of related entities.
    pub fn is_collection(&self) -> bool {
        matches!(self, PropertyKind::OneToMany | PropertyKind::ManyToMany)
    }

    /// Check if this kind points at a target entity (relations and embedded).
    pub fn has_target(&self) -> bool {
        self.is_relation() || *self == PropertyKind::Embedded
    }

    /// The kind a bidirectional counterpart must have.
    pub fn reciprocal(&self) -> Option<PropertyKind> {
        match self {
            PropertyKind::ManyToOne => Some(PropertyKind::OneToMany),
            PropertyKind::OneToMany => Some(PropertyKind::ManyToOne),
            PropertyKind::OneToOne => Some(PropertyKind::OneToOne),
            PropertyKind::ManyToMany => Some(PropertyKind::ManyToMany),
            _ => None,
        }
    }

    /// Short tag as used in declarations.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKind::Scalar => "scalar",
            PropertyKind::Enum => "enum",
            PropertyKind::Embedded => "embedded",
            PropertyKind::ManyToOne => "m:1",
            PropertyKind::OneToOne => "1:1",
            PropertyKind::OneToMany => "1:m",
            PropertyKind::ManyToMany => "m:n",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Referential action applied by a foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReferentialAction {
    /// Propagate the change.
    Cascade,
    /// Do nothing (checked at end of statement).
    NoAction,
    /// Set the foreign key to null.
    SetNull,
    /// Set the foreign key to its default.
    SetDefault,
    /// Refuse the change.
    Restrict,
    /// Dialect-specific action, kept verbatim.
    Custom(String),
}

impl ReferentialAction {
    /// Action as written in DDL.
    pub fn as_str(&self) -> &str {
        match self {
            ReferentialAction::Cascade => "cascade",
            ReferentialAction::NoAction => "no action",
            ReferentialAction::SetNull => "set null",
            ReferentialAction::SetDefault => "set default",
            ReferentialAction::Restrict => "restrict",
            ReferentialAction::Custom(action) => action,
        }
    }
}

impl From<&str> for ReferentialAction {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "cascade" => ReferentialAction::Cascade,
            "no action" => ReferentialAction::NoAction,
            "set null" => ReferentialAction::SetNull,
            "set default" => ReferentialAction::SetDefault,
            "restrict" => ReferentialAction::Restrict,
            _ => ReferentialAction::Custom(value.to_string()),
        }
    }
}

impl From<String> for ReferentialAction {
    fn from(value: String) -> Self {
        ReferentialAction::from(value.as_str())
    }
}

impl From<ReferentialAction> for String {
    fn from(value: ReferentialAction) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a constraint is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeferMode {
    /// Checked after each statement.
    Immediate,
    /// Checked at transaction commit.
    Deferred,
}

impl DeferMode {
    /// Mode as written in DDL.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeferMode::Immediate => "immediate",
            DeferMode::Deferred => "deferred",
        }
    }
}

/// Index of an entity within a resolved graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    /// Position of the entity in registration order.
    pub fn index(&self) -> usize {
        self.0
    }
}
