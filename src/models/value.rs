//! Column values moved between entities and SQL statements.
//!
//! Generated accessors hand out [`Value`]s when reading a field and accept
//! them when assigning one, so no runtime type inspection is needed.

use crate::error::{DaoError, DaoResult};
use crate::models::datetime::NormalDatetime;
use serde::Serialize;

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value
    Null,
    Bool(bool),
    /// Signed integer (stored as i64 for maximum range)
    Int(i64),
    /// Unsigned integer that may not fit in i64 (BIGINT UNSIGNED)
    UInt(u64),
    Float(f64),
    Text(String),
    /// Binary data (base64 encoded when logged)
    Bytes(#[serde(serialize_with = "base64_bytes::serialize")] Vec<u8>),
    Datetime(NormalDatetime),
    Json(serde_json::Value),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Datetime(_) => "datetime",
            Self::Json(_) => "json",
        }
    }

    /// The timestamp held by this value, if it is one.
    pub fn as_datetime(&self) -> Option<&NormalDatetime> {
        match self {
            Self::Datetime(dt) => Some(dt),
            _ => None,
        }
    }
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }

            impl From<Option<$ty>> for Value {
                fn from(v: Option<$ty>) -> Self {
                    v.map_or(Value::Null, Value::from)
                }
            }
        )+
    };
}

impl_from_value! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    u64 => UInt,
    f32 => Float,
    f64 => Float,
    String => Text,
    Vec<u8> => Bytes,
    NormalDatetime => Datetime,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl TryFrom<Value> for bool {
    type Error = DaoError;

    fn try_from(value: Value) -> DaoResult<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::Int(v) => Ok(v != 0),
            Value::UInt(v) => Ok(v != 0),
            other => Err(DaoError::type_mismatch("bool", other.type_name())),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = DaoError;

    fn try_from(value: Value) -> DaoResult<Self> {
        match value {
            Value::Int(v) => Ok(v),
            Value::UInt(v) => i64::try_from(v).map_err(|_| DaoError::type_mismatch("i64", "uint")),
            Value::Bool(v) => Ok(i64::from(v)),
            other => Err(DaoError::type_mismatch("i64", other.type_name())),
        }
    }
}

impl TryFrom<Value> for i32 {
    type Error = DaoError;

    fn try_from(value: Value) -> DaoResult<Self> {
        let wide = i64::try_from(value)?;
        i32::try_from(wide).map_err(|_| DaoError::type_mismatch("i32", "int"))
    }
}

impl TryFrom<Value> for u64 {
    type Error = DaoError;

    fn try_from(value: Value) -> DaoResult<Self> {
        match value {
            Value::UInt(v) => Ok(v),
            Value::Int(v) => u64::try_from(v).map_err(|_| DaoError::type_mismatch("u64", "int")),
            other => Err(DaoError::type_mismatch("u64", other.type_name())),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = DaoError;

    fn try_from(value: Value) -> DaoResult<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => Err(DaoError::type_mismatch("f64", other.type_name())),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = DaoError;

    fn try_from(value: Value) -> DaoResult<Self> {
        match value {
            Value::Text(v) => Ok(v),
            Value::Bytes(v) => {
                String::from_utf8(v).map_err(|_| DaoError::type_mismatch("utf-8 text", "bytes"))
            }
            other => Err(DaoError::type_mismatch("text", other.type_name())),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = DaoError;

    fn try_from(value: Value) -> DaoResult<Self> {
        match value {
            Value::Bytes(v) => Ok(v),
            Value::Text(v) => Ok(v.into_bytes()),
            other => Err(DaoError::type_mismatch("bytes", other.type_name())),
        }
    }
}

impl TryFrom<Value> for NormalDatetime {
    type Error = DaoError;

    fn try_from(value: Value) -> DaoResult<Self> {
        match value {
            Value::Datetime(v) => Ok(v),
            // NULL scans into the zero timestamp
            Value::Null => Ok(NormalDatetime::ZERO),
            Value::Text(v) => NormalDatetime::parse(&v)
                .map_err(|_| DaoError::type_mismatch("datetime", "text")),
            other => Err(DaoError::type_mismatch("datetime", other.type_name())),
        }
    }
}

macro_rules! impl_try_from_nullable {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl TryFrom<Value> for Option<$ty> {
                type Error = DaoError;

                fn try_from(value: Value) -> DaoResult<Self> {
                    match value {
                        Value::Null => Ok(None),
                        other => <$ty>::try_from(other).map(Some),
                    }
                }
            }
        )+
    };
}

impl_try_from_nullable!(bool, i64, i32, u64, f64, String, Vec<u8>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_primitives() {
        assert_eq!(Value::from(7_i32), Value::Int(7));
        assert_eq!(Value::from(7_u64), Value::UInt(7));
        assert_eq!(Value::from("abc"), Value::Text("abc".to_string()));
        assert_eq!(Value::from(None::<String>), Value::Null);
    }

    #[test]
    fn test_try_from_mismatch() {
        let err = String::try_from(Value::Int(1)).unwrap_err();
        assert!(matches!(
            err,
            DaoError::TypeMismatch {
                expected: "text",
                found: "int"
            }
        ));
    }

    #[test]
    fn test_nullable_conversion() {
        assert_eq!(Option::<i64>::try_from(Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::try_from(Value::Int(3)).unwrap(), Some(3));
    }

    #[test]
    fn test_uint_overflow_into_i64() {
        assert!(i64::try_from(Value::UInt(u64::MAX)).is_err());
    }

    #[test]
    fn test_null_scans_into_zero_datetime() {
        let dt = NormalDatetime::try_from(Value::Null).unwrap();
        assert!(dt.is_zero());
    }

    #[test]
    fn test_serialize_bytes_as_base64() {
        let json = serde_json::to_string(&Value::Bytes(vec![1, 2, 3])).unwrap();
        assert_eq!(json, "\"AQID\"");
    }

    #[test]
    fn test_serialize_args_for_logging() {
        let args = vec![Value::Int(1), Value::Null, Value::from("x")];
        assert_eq!(serde_json::to_string(&args).unwrap(), "[1,null,\"x\"]");
    }
}
