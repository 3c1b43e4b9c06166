use crate::error::{OrmError, Result};
use std::fmt::Write as _;

/// Core value types exchanged with the database.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

/// Declared storage type of a mapped attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Text,
    Real,
    Blob,
    Boolean,
}

impl DataType {
    /// Numeric columns are written without quotes.
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Integer | DataType::Real)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Text => "TEXT",
            DataType::Real => "REAL",
            DataType::Blob => "BLOB",
            DataType::Boolean => "BOOLEAN",
        }
    }
}

impl Value {
    /// Name of the runtime type held, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
            Value::Boolean(_) => "BOOLEAN",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Renders the value as a SQL literal, choosing quoting from its own type.
    ///
    /// Embedded quotes are not escaped. Only feed this trusted data.
    pub fn to_query_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Text(s) => quote(s),
            Value::Boolean(b) => quote(&b.to_string()),
            Value::Blob(bytes) => hex_literal(bytes),
        }
    }

    /// Renders the value as a literal for a column declared as `data_type`.
    pub fn to_column_literal(&self, data_type: DataType) -> String {
        match self {
            Value::Null | Value::Blob(_) => self.to_query_literal(),
            _ if data_type.is_numeric() => self.unquoted(),
            _ => quote(&self.unquoted()),
        }
    }

    fn unquoted(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Boolean(b) => b.to_string(),
            Value::Blob(bytes) => hex_literal(bytes),
        }
    }

    /// Converts a stored value into the representation `target` expects.
    ///
    /// Returns `None` when the pairing is not in the conversion table.
    pub fn coerce(self, target: DataType) -> Option<Value> {
        match (self, target) {
            (Value::Integer(i), DataType::Integer) => Some(Value::Integer(i)),
            (Value::Integer(i), DataType::Real) => exact_real(i).map(Value::Real),
            (Value::Integer(0), DataType::Boolean) => Some(Value::Boolean(false)),
            (Value::Integer(1), DataType::Boolean) => Some(Value::Boolean(true)),
            (Value::Real(f), DataType::Real) => Some(Value::Real(f)),
            (Value::Text(s), DataType::Text) => Some(Value::Text(s)),
            (Value::Text(s), DataType::Boolean) => match s.as_str() {
                "true" => Some(Value::Boolean(true)),
                "false" => Some(Value::Boolean(false)),
                _ => None,
            },
            (Value::Boolean(b), DataType::Boolean) => Some(Value::Boolean(b)),
            (Value::Blob(b), DataType::Blob) => Some(Value::Blob(b)),
            _ => None,
        }
    }
}

/// Integers beyond 2^53 have no exact `f64` and are refused.
fn exact_real(i: i64) -> Option<f64> {
    let f = i as f64;
    (f as i128 == i128::from(i)).then_some(f)
}

fn quote(s: &str) -> String {
    format!("'{s}'")
}

fn hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 3);
    out.push_str("X'");
    for byte in bytes {
        let _ = write!(out, "{byte:02X}");
    }
    out.push('\'');
    out
}

impl From<rusqlite::types::ValueRef<'_>> for Value {
    fn from(value: rusqlite::types::ValueRef<'_>) -> Self {
        use rusqlite::types::ValueRef;
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

/// Rust types that can back a mapped attribute.
pub trait SqlType: Sized {
    const DATA_TYPE: DataType;

    fn into_value(self) -> Value;

    /// Extracts the Rust value from an already-coerced [`Value`].
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(expected: DataType, got: &Value) -> Result<T> {
    Err(OrmError::reflection(format!(
        "expected {} value, got {}",
        expected.as_str(),
        got.type_name()
    )))
}

impl SqlType for i64 {
    const DATA_TYPE: DataType = DataType::Integer;

    fn into_value(self) -> Value {
        Value::Integer(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            other => mismatch(Self::DATA_TYPE, &other),
        }
    }
}

impl SqlType for i32 {
    const DATA_TYPE: DataType = DataType::Integer;

    fn into_value(self) -> Value {
        Value::Integer(self.into())
    }

    fn from_value(value: Value) -> Result<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide)
            .map_err(|_| OrmError::reflection(format!("integer {wide} does not fit in i32")))
    }
}

impl SqlType for f64 {
    const DATA_TYPE: DataType = DataType::Real;

    fn into_value(self) -> Value {
        Value::Real(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Real(f) => Ok(f),
            other => mismatch(Self::DATA_TYPE, &other),
        }
    }
}

impl SqlType for f32 {
    const DATA_TYPE: DataType = DataType::Real;

    fn into_value(self) -> Value {
        Value::Real(self.into())
    }

    fn from_value(value: Value) -> Result<Self> {
        let wide = f64::from_value(value)?;
        if wide.is_finite() && !(f64::from(f32::MIN)..=f64::from(f32::MAX)).contains(&wide) {
            return Err(OrmError::reflection(format!("real {wide} does not fit in f32")));
        }
        Ok(wide as f32)
    }
}

impl SqlType for String {
    const DATA_TYPE: DataType = DataType::Text;

    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => mismatch(Self::DATA_TYPE, &other),
        }
    }
}

impl SqlType for bool {
    const DATA_TYPE: DataType = DataType::Boolean;

    fn into_value(self) -> Value {
        Value::Boolean(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => mismatch(Self::DATA_TYPE, &other),
        }
    }
}

impl SqlType for Vec<u8> {
    const DATA_TYPE: DataType = DataType::Blob;

    fn into_value(self) -> Value {
        Value::Blob(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(b) => Ok(b),
            other => mismatch(Self::DATA_TYPE, &other),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_unquoted() {
        assert_eq!(Value::Integer(42).to_query_literal(), "42");
        assert_eq!(Value::Real(2.75).to_query_literal(), "2.75");
    }

    #[test]
    fn text_renders_single_quoted_without_escaping() {
        assert_eq!(Value::from("Alice").to_query_literal(), "'Alice'");
        assert_eq!(Value::from("O'Brien").to_query_literal(), "'O'Brien'");
    }

    #[test]
    fn other_types_render_quoted() {
        assert_eq!(Value::Boolean(true).to_query_literal(), "'true'");
        assert_eq!(Value::Blob(vec![0x0a, 0xff]).to_query_literal(), "X'0AFF'");
        assert_eq!(Value::Null.to_query_literal(), "NULL");
    }

    #[test]
    fn declared_type_drives_quoting() {
        assert_eq!(Value::Integer(7).to_column_literal(DataType::Text), "'7'");
        assert_eq!(Value::from("12").to_column_literal(DataType::Integer), "12");
        assert_eq!(Value::Boolean(false).to_column_literal(DataType::Boolean), "'false'");
    }

    #[test]
    fn coercion_table() {
        assert_eq!(Value::Integer(3).coerce(DataType::Real), Some(Value::Real(3.0)));
        assert_eq!(Value::Integer(1).coerce(DataType::Boolean), Some(Value::Boolean(true)));
        assert_eq!(Value::from("false").coerce(DataType::Boolean), Some(Value::Boolean(false)));
        assert_eq!(Value::Integer(2).coerce(DataType::Boolean), None);
        assert_eq!(Value::Real(1.5).coerce(DataType::Integer), None);
        assert_eq!(Value::from("x").coerce(DataType::Integer), None);
        assert_eq!(Value::Null.coerce(DataType::Text), None);
    }

    #[test]
    fn narrowing_out_of_range_is_reflection_error() {
        let err = i32::from_value(Value::Integer(i64::MAX)).unwrap_err();
        assert!(matches!(err, OrmError::Reflection(_)));
        assert_eq!(i32::from_value(Value::Integer(-5)).unwrap(), -5);

        let err = f32::from_value(Value::Real(1e300)).unwrap_err();
        assert!(matches!(err, OrmError::Reflection(_)));
        assert!(matches!(
            f32::from_value(Value::Real(-1e300)),
            Err(OrmError::Reflection(_))
        ));
        assert_eq!(f32::from_value(Value::Real(72.25)).unwrap(), 72.25);
    }

    #[test]
    fn inexact_integer_widening_is_refused() {
        assert_eq!(
            Value::Integer(1 << 53).coerce(DataType::Real),
            Some(Value::Real(9007199254740992.0))
        );
        assert_eq!(Value::Integer((1 << 53) + 1).coerce(DataType::Real), None);
        assert_eq!(Value::Integer(i64::MAX).coerce(DataType::Real), None);
    }
}
