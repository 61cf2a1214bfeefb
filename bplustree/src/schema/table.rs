//! Table and key specifications.

use std::collections::HashMap;

use crate::schema::SchemaError;
use crate::schema::field::Field;
use crate::schema::value::{Key, Value};

/// The ordered field list that defines the shape of a record.
#[derive(Debug, Clone)]
pub struct TableSpec {
    fields: Vec<Field>,
    positions: HashMap<String, usize>,
}

impl TableSpec {
    /// Build a table spec, rejecting empty schemas and duplicate names.
    pub fn new(fields: Vec<Field>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::EmptyTable);
        }

        let mut positions = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if positions.insert(field.name().to_string(), i).is_some() {
                return Err(SchemaError::DuplicateField(field.name().to_string()));
            }
        }

        Ok(Self { fields, positions })
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Ordinal position of a field by name.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Worst-case encoded size of one record.
    #[must_use]
    pub fn max_record_size(&self) -> usize {
        self.fields.iter().map(Field::max_encoded_size).sum()
    }
}

/// The ordered subset of table fields that forms the index key.
///
/// Resolved against a [`TableSpec`] at construction, so every key field is
/// known to exist and its ordinal in the record is cached.
#[derive(Debug, Clone)]
pub struct KeySpec {
    fields: Vec<Field>,
    positions: Vec<usize>,
}

impl KeySpec {
    pub fn new<S: AsRef<str>>(names: &[S], table: &TableSpec) -> Result<Self, SchemaError> {
        if names.is_empty() {
            return Err(SchemaError::EmptyKey);
        }

        let mut fields = Vec::with_capacity(names.len());
        let mut positions = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let position = table
                .position(name)
                .ok_or_else(|| SchemaError::UnknownKeyField(name.to_string()))?;
            if positions.contains(&position) {
                return Err(SchemaError::DuplicateField(name.to_string()));
            }
            fields.push(table.fields()[position].clone());
            positions.push(position);
        }

        Ok(Self { fields, positions })
    }

    /// Key fields in key order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Derive the key of a record by positional lookup.
    ///
    /// The record must already have the table's arity.
    #[must_use]
    pub fn key_of(&self, record: &[Value]) -> Key {
        self.positions.iter().map(|&i| record[i].clone()).collect()
    }

    /// Worst-case encoded size of one key.
    #[must_use]
    pub fn max_key_size(&self) -> usize {
        self.fields.iter().map(Field::max_encoded_size).sum()
    }
}
