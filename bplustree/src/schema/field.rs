//! Field declarations.

use std::fmt;
use std::str::FromStr;

use crate::schema::SchemaError;
use crate::schema::value::Value;

/// Width of the length prefix written before every string.
pub const STRING_LENGTH_PREFIX: usize = 4;

/// Worst-case UTF-8 width of one character.
const MAX_UTF8_CHAR_WIDTH: usize = 4;

/// Scalar type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// 32-bit signed integer, 4 bytes.
    Integer,
    /// 32-bit IEEE-754 float, 4 bytes.
    Decimal,
    /// UTF-8 string holding at most `declared_length` characters.
    String(u32),
    /// Boolean, 1 byte.
    Bool,
}

impl FieldType {
    /// Largest number of bytes one value of this type can occupy on disk.
    ///
    /// Strings are written as a 4-byte length prefix plus their UTF-8 bytes,
    /// so the bound is the prefix plus four bytes per declared character.
    #[must_use]
    pub const fn max_encoded_size(self) -> usize {
        match self {
            Self::Integer | Self::Decimal => 4,
            Self::Bool => 1,
            Self::String(declared_length) => STRING_LENGTH_PREFIX
                .saturating_add((declared_length as usize).saturating_mul(MAX_UTF8_CHAR_WIDTH)),
        }
    }

    /// Check whether a value has this field type.
    #[must_use]
    pub const fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Integer, Value::Integer(_))
                | (Self::Decimal, Value::Decimal(_))
                | (Self::String(_), Value::String(_))
                | (Self::Bool, Value::Bool(_))
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Decimal => write!(f, "decimal"),
            Self::String(len) => write!(f, "string({len})"),
            Self::Bool => write!(f, "bool"),
        }
    }
}

impl FromStr for FieldType {
    type Err = SchemaError;

    /// Parse a type declaration: `integer`, `decimal`, `bool` or `string(N)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let declaration = s.trim().to_ascii_lowercase();
        match declaration.as_str() {
            "integer" | "int" => Ok(Self::Integer),
            "decimal" | "float" => Ok(Self::Decimal),
            "bool" | "boolean" => Ok(Self::Bool),
            _ => declaration
                .strip_prefix("string(")
                .and_then(|rest| rest.strip_suffix(')'))
                .and_then(|len| len.trim().parse::<u32>().ok())
                .map(Self::String)
                .ok_or_else(|| SchemaError::UnsupportedType(s.to_string())),
        }
    }
}

/// A named, typed column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    field_type: FieldType,
}

impl Field {
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    #[must_use]
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    #[must_use]
    pub fn decimal(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Decimal)
    }

    #[must_use]
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Bool)
    }

    #[must_use]
    pub fn string(name: impl Into<String>, declared_length: u32) -> Self {
        Self::new(name, FieldType::String(declared_length))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        self.field_type
    }

    #[must_use]
    pub const fn max_encoded_size(&self) -> usize {
        self.field_type.max_encoded_size()
    }
}
