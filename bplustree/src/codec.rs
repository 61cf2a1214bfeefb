//! Schema-driven tuple codecs.
//!
//! Tuples are written field by field in declared order:
//! - integer: 4 bytes, big-endian two's complement
//! - decimal: 4 bytes, big-endian IEEE-754 single precision
//! - bool: 1 byte (1 = true, 0 = false)
//! - string: 4-byte big-endian byte length, then the UTF-8 bytes

use crate::schema::{Field, FieldType, KeySpec, Key, Record, TableSpec, Value};

/// Cursor over an encoded byte slice.
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Number of bytes consumed so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.offset
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.bytes.len() - self.offset;
        if len > remaining {
            return Err(CodecError::UnexpectedEnd {
                needed: len,
                remaining,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    fn read_array(&mut self) -> Result<[u8; 4], CodecError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.read_bytes(4)?);
        Ok(buf)
    }
}

/// Append a big-endian `u32`.
pub fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Codec for full records, driven by a [`TableSpec`].
pub struct RecordCodec<'a> {
    fields: &'a [Field],
}

impl<'a> RecordCodec<'a> {
    #[must_use]
    pub fn new(table: &'a TableSpec) -> Self {
        Self {
            fields: table.fields(),
        }
    }

    pub fn read(&self, reader: &mut ByteReader<'_>) -> Result<Record, CodecError> {
        read_tuple(self.fields, reader)
    }

    pub fn write(&self, record: &[Value], out: &mut Vec<u8>) -> Result<(), CodecError> {
        write_tuple(self.fields, record, out)
    }

    /// Check a record against the schema without encoding it.
    pub fn validate(&self, record: &[Value]) -> Result<(), CodecError> {
        validate_tuple(self.fields, record)
    }
}

/// Codec for keys, driven by a [`KeySpec`].
pub struct KeyCodec<'a> {
    fields: &'a [Field],
}

impl<'a> KeyCodec<'a> {
    #[must_use]
    pub fn new(key_spec: &'a KeySpec) -> Self {
        Self {
            fields: key_spec.fields(),
        }
    }

    pub fn read(&self, reader: &mut ByteReader<'_>) -> Result<Key, CodecError> {
        read_tuple(self.fields, reader)
    }

    pub fn write(&self, key: &[Value], out: &mut Vec<u8>) -> Result<(), CodecError> {
        write_tuple(self.fields, key, out)
    }

    pub fn validate(&self, key: &[Value]) -> Result<(), CodecError> {
        validate_tuple(self.fields, key)
    }
}

fn read_tuple(fields: &[Field], reader: &mut ByteReader<'_>) -> Result<Vec<Value>, CodecError> {
    fields.iter().map(|field| read_value(field, reader)).collect()
}

fn read_value(field: &Field, reader: &mut ByteReader<'_>) -> Result<Value, CodecError> {
    match field.field_type() {
        FieldType::Integer => Ok(Value::Integer(reader.read_i32()?)),
        FieldType::Decimal => Ok(Value::Decimal(reader.read_f32()?)),
        FieldType::Bool => Ok(Value::Bool(reader.read_u8()? != 0)),
        FieldType::String(_) => {
            let len = reader.read_u32()? as usize;
            let bytes = reader.read_bytes(len)?;
            let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8 {
                field: field.name().to_string(),
            })?;
            Ok(Value::String(s.to_string()))
        }
    }
}

fn validate_tuple(fields: &[Field], values: &[Value]) -> Result<(), CodecError> {
    if fields.len() != values.len() {
        return Err(CodecError::ArityMismatch {
            expected: fields.len(),
            actual: values.len(),
        });
    }
    for (field, value) in fields.iter().zip(values) {
        validate_value(field, value)?;
    }
    Ok(())
}

fn validate_value(field: &Field, value: &Value) -> Result<(), CodecError> {
    let field_type = field.field_type();
    if !field_type.accepts(value) {
        return Err(CodecError::TypeMismatch {
            field: field.name().to_string(),
            expected: field_type,
            actual: value.type_name(),
        });
    }
    if let (FieldType::String(declared), Value::String(s)) = (field_type, value) {
        let chars = s.chars().count();
        if chars > declared as usize {
            return Err(CodecError::StringTooLong {
                field: field.name().to_string(),
                declared,
                actual: chars,
            });
        }
    }
    Ok(())
}

fn write_tuple(fields: &[Field], values: &[Value], out: &mut Vec<u8>) -> Result<(), CodecError> {
    validate_tuple(fields, values)?;
    for value in values {
        match value {
            Value::Integer(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::Decimal(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::Bool(v) => out.push(u8::from(*v)),
            Value::String(s) => {
                // Length fits: validation bounds it by the declared u32 char count.
                #[allow(clippy::cast_possible_truncation)]
                let len = s.len() as u32;
                put_u32(out, len);
                out.extend_from_slice(s.as_bytes());
            }
        }
    }
    Ok(())
}

/// Errors raised while encoding or decoding tuples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The input ended before a value was complete.
    UnexpectedEnd { needed: usize, remaining: usize },
    /// The tuple has the wrong number of values.
    ArityMismatch { expected: usize, actual: usize },
    /// A value's runtime type is not supported by its field.
    TypeMismatch {
        field: String,
        expected: FieldType,
        actual: &'static str,
    },
    /// A string field holds bytes that are not UTF-8.
    InvalidUtf8 { field: String },
    /// A string exceeds its declared length.
    StringTooLong {
        field: String,
        declared: u32,
        actual: usize,
    },
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedEnd { needed, remaining } => {
                write!(f, "unexpected end of data: need {needed} bytes, {remaining} left")
            }
            Self::ArityMismatch { expected, actual } => {
                write!(f, "expected {expected} values, got {actual}")
            }
            Self::TypeMismatch {
                field,
                expected,
                actual,
            } => write!(f, "field {field} expects {expected}, got {actual}"),
            Self::InvalidUtf8 { field } => write!(f, "field {field} is not valid UTF-8"),
            Self::StringTooLong {
                field,
                declared,
                actual,
            } => write!(
                f,
                "field {field} holds {actual} characters, declared length is {declared}"
            ),
        }
    }
}

impl std::error::Error for CodecError {}
