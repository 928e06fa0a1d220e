use std::fmt;

use accord_schema::{Primitive, TypeRef};

/// A dynamically typed value held by a positional envelope member.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value: `()`, `None`, or an unset user-defined type.
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Tuple(Vec<Value>),
}

impl Value {
    /// The value a default-constructed member of type `ty` holds.
    pub fn default_for(ty: &TypeRef) -> Value {
        match ty {
            TypeRef::Primitive(p) => match p {
                Primitive::Bool => Value::Bool(false),
                Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::I64 => Value::Int(0),
                Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64 => {
                    Value::UInt(0)
                }
                Primitive::F32 | Primitive::F64 => Value::Float(0.0),
                Primitive::Char => Value::Char('\0'),
                Primitive::String => Value::String(String::new()),
                Primitive::Bytes => Value::Bytes(Vec::new()),
            },
            TypeRef::List(_) => Value::List(Vec::new()),
            TypeRef::Map(_, _) => Value::Map(Vec::new()),
            TypeRef::Tuple(elements) => {
                Value::Tuple(elements.iter().map(Value::default_for).collect())
            }
            _ => Value::Null,
        }
    }

    /// Whether this value can be stored in a member of type `ty`.
    ///
    /// User-defined types are opaque here and accept any value; their
    /// structure is the marshaller's business.
    pub fn conforms_to(&self, ty: &TypeRef) -> bool {
        match (self, ty) {
            (_, TypeRef::Named { .. }) => true,
            (Value::Null, TypeRef::Unit | TypeRef::Option(_)) => true,
            (v, TypeRef::Option(inner)) => v.conforms_to(inner),
            (Value::Bool(_), TypeRef::Primitive(Primitive::Bool)) => true,
            (Value::Int(v), TypeRef::Primitive(p)) => int_fits(i128::from(*v), *p),
            (Value::UInt(v), TypeRef::Primitive(p)) => int_fits(i128::from(*v), *p),
            (Value::Float(_), TypeRef::Primitive(Primitive::F32 | Primitive::F64)) => true,
            (Value::Char(_), TypeRef::Primitive(Primitive::Char)) => true,
            (Value::String(_), TypeRef::Primitive(Primitive::String)) => true,
            (Value::Bytes(_), TypeRef::Primitive(Primitive::Bytes)) => true,
            (Value::Bytes(_), TypeRef::List(inner)) => {
                **inner == TypeRef::Primitive(Primitive::U8)
            }
            (Value::List(items), TypeRef::List(inner)) => {
                items.iter().all(|item| item.conforms_to(inner))
            }
            (Value::Map(pairs), TypeRef::Map(k, v)) => pairs
                .iter()
                .all(|(key, value)| key.conforms_to(k) && value.conforms_to(v)),
            (Value::Tuple(items), TypeRef::Tuple(elements)) => {
                items.len() == elements.len()
                    && items.iter().zip(elements).all(|(item, ty)| item.conforms_to(ty))
            }
            _ => false,
        }
    }
}

fn int_fits(v: i128, p: Primitive) -> bool {
    let (min, max): (i128, i128) = match p {
        Primitive::I8 => (i8::MIN.into(), i8::MAX.into()),
        Primitive::I16 => (i16::MIN.into(), i16::MAX.into()),
        Primitive::I32 => (i32::MIN.into(), i32::MAX.into()),
        Primitive::I64 => (i64::MIN.into(), i64::MAX.into()),
        Primitive::U8 => (0, u8::MAX.into()),
        Primitive::U16 => (0, u16::MAX.into()),
        Primitive::U32 => (0, u32::MAX.into()),
        Primitive::U64 => (0, u64::MAX.into()),
        _ => return false,
    };
    (min..=max).contains(&v)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "{v:?}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::List(items) => write!(f, "[{} items]", items.len()),
            Value::Map(pairs) => write!(f, "{{{} entries}}", pairs.len()),
            Value::Tuple(items) => write!(f, "({} items)", items.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
