//! Record schema model.
//!
//! A [`TableSpec`] fixes the ordered, typed fields of every record stored in a
//! tree. A [`KeySpec`] names the subset of those fields that forms the index key.

mod field;
mod table;
mod value;

pub use field::{Field, FieldType, STRING_LENGTH_PREFIX};
pub use table::{KeySpec, TableSpec};
pub use value::{Key, Record, Value};

pub(crate) use value::format_tuple;

/// Errors raised while declaring a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The table has no fields.
    EmptyTable,
    /// The key names no fields.
    EmptyKey,
    /// A field name appears twice.
    DuplicateField(String),
    /// A key field is not part of the table.
    UnknownKeyField(String),
    /// A type declaration could not be parsed.
    UnsupportedType(String),
    /// A worst-case record or key does not leave room for two entries per block.
    TooWide { what: &'static str, size: usize },
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTable => write!(f, "table spec has no fields"),
            Self::EmptyKey => write!(f, "key spec has no fields"),
            Self::DuplicateField(name) => write!(f, "duplicate field: {name}"),
            Self::UnknownKeyField(name) => write!(f, "key field not in table: {name}"),
            Self::UnsupportedType(ty) => write!(f, "unsupported field type: {ty}"),
            Self::TooWide { what, size } => {
                write!(f, "{what} of {size} bytes does not fit two per block")
            }
        }
    }
}

impl std::error::Error for SchemaError {}
