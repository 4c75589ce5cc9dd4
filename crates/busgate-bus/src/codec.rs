//! Conversion between JSON and D-Bus values.
//!
//! Outgoing arguments are marshalled against the method's declared type
//! signature. Incoming values are converted structurally: integers become
//! JSON numbers, arrays and structs become JSON arrays, dictionaries become
//! JSON objects with stringified keys, and variants are unwrapped.

use std::fmt;

use serde_json::{Map, Number, Value as Json};
use zbus::zvariant::{Array, Dict, ObjectPath, Signature, Structure, StructureBuilder, Value};

use crate::error::{BusError, Result};

/// A parsed D-Bus type signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    /// `y`
    Byte,
    /// `b`
    Boolean,
    /// `n`
    Int16,
    /// `q`
    UInt16,
    /// `i`
    Int32,
    /// `u`
    UInt32,
    /// `x`
    Int64,
    /// `t`
    UInt64,
    /// `d`
    Double,
    /// `s`
    String,
    /// `o`
    ObjectPath,
    /// `g`
    Signature,
    /// `v`
    Variant,
    /// `h`
    UnixFd,
    /// `a<T>`
    Array(Box<TypeSpec>),
    /// `a{KV}`
    Dict(Box<TypeSpec>, Box<TypeSpec>),
    /// `(...)`
    Struct(Vec<TypeSpec>),
}

impl TypeSpec {
    /// Parse exactly one complete type.
    ///
    /// # Errors
    ///
    /// Returns `BusError::InvalidArgument` if `signature` is malformed or
    /// holds more or fewer than one complete type.
    pub fn parse(signature: &str) -> Result<Self> {
        let mut types = Self::parse_many(signature)?;
        if types.len() != 1 {
            return Err(BusError::InvalidArgument(format!(
                "expected a single complete type, got {signature:?}"
            )));
        }
        Ok(types.remove(0))
    }

    /// Parse a sequence of complete types.
    ///
    /// # Errors
    ///
    /// Returns `BusError::InvalidArgument` if `signature` is malformed.
    pub fn parse_many(signature: &str) -> Result<Vec<Self>> {
        let mut parser = Parser {
            chars: signature.as_bytes(),
            pos: 0,
            source: signature,
        };
        let mut types = Vec::new();
        while !parser.done() {
            types.push(parser.next_type()?);
        }
        Ok(types)
    }

    /// Returns true for types that may be dictionary keys.
    #[must_use]
    pub const fn is_basic(&self) -> bool {
        !matches!(
            self,
            Self::Variant | Self::Array(_) | Self::Dict(..) | Self::Struct(_)
        )
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte => f.write_str("y"),
            Self::Boolean => f.write_str("b"),
            Self::Int16 => f.write_str("n"),
            Self::UInt16 => f.write_str("q"),
            Self::Int32 => f.write_str("i"),
            Self::UInt32 => f.write_str("u"),
            Self::Int64 => f.write_str("x"),
            Self::UInt64 => f.write_str("t"),
            Self::Double => f.write_str("d"),
            Self::String => f.write_str("s"),
            Self::ObjectPath => f.write_str("o"),
            Self::Signature => f.write_str("g"),
            Self::Variant => f.write_str("v"),
            Self::UnixFd => f.write_str("h"),
            Self::Array(elem) => write!(f, "a{elem}"),
            Self::Dict(key, value) => write!(f, "a{{{key}{value}}}"),
            Self::Struct(fields) => {
                f.write_str("(")?;
                for field in fields {
                    write!(f, "{field}")?;
                }
                f.write_str(")")
            }
        }
    }
}

struct Parser<'a> {
    chars: &'a [u8],
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
    fn done(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, what: &str) -> BusError {
        BusError::InvalidArgument(format!(
            "invalid signature {:?} at offset {}: {what}",
            self.source, self.pos
        ))
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.chars.get(self.pos).copied();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn peek(&self) -> Option<u8> {
        self.chars.get(self.pos).copied()
    }

    fn next_type(&mut self) -> Result<TypeSpec> {
        let Some(c) = self.bump() else {
            return Err(self.error("unexpected end"));
        };
        let spec = match c {
            b'y' => TypeSpec::Byte,
            b'b' => TypeSpec::Boolean,
            b'n' => TypeSpec::Int16,
            b'q' => TypeSpec::UInt16,
            b'i' => TypeSpec::Int32,
            b'u' => TypeSpec::UInt32,
            b'x' => TypeSpec::Int64,
            b't' => TypeSpec::UInt64,
            b'd' => TypeSpec::Double,
            b's' => TypeSpec::String,
            b'o' => TypeSpec::ObjectPath,
            b'g' => TypeSpec::Signature,
            b'v' => TypeSpec::Variant,
            b'h' => TypeSpec::UnixFd,
            b'a' => {
                if self.peek() == Some(b'{') {
                    self.pos += 1;
                    let key = self.next_type()?;
                    if !key.is_basic() {
                        return Err(self.error("dictionary key must be a basic type"));
                    }
                    let value = self.next_type()?;
                    if self.bump() != Some(b'}') {
                        return Err(self.error("expected '}'"));
                    }
                    TypeSpec::Dict(Box::new(key), Box::new(value))
                } else {
                    TypeSpec::Array(Box::new(self.next_type()?))
                }
            }
            b'(' => {
                let mut fields = Vec::new();
                loop {
                    match self.peek() {
                        Some(b')') => {
                            self.pos += 1;
                            break;
                        }
                        Some(_) => fields.push(self.next_type()?),
                        None => return Err(self.error("unterminated struct")),
                    }
                }
                if fields.is_empty() {
                    return Err(self.error("empty struct"));
                }
                TypeSpec::Struct(fields)
            }
            other => {
                return Err(self.error(&format!("unknown type code {:?}", char::from(other))));
            }
        };
        Ok(spec)
    }
}

/// Marshal positional JSON arguments into a call body.
///
/// Returns `None` when there are no arguments.
///
/// # Errors
///
/// Returns `BusError::InvalidArgument` if the counts differ or any value does
/// not fit its declared type.
pub fn encode_arguments(signature: &[String], args: &[Json]) -> Result<Option<Structure<'static>>> {
    if signature.len() != args.len() {
        return Err(BusError::InvalidArgument(format!(
            "expected {} arguments, got {}",
            signature.len(),
            args.len()
        )));
    }
    if args.is_empty() {
        return Ok(None);
    }

    let mut builder = StructureBuilder::new();
    for (position, (sig, arg)) in signature.iter().zip(args).enumerate() {
        let spec = TypeSpec::parse(sig)?;
        let value = json_to_value(arg, &spec).map_err(|err| match err {
            BusError::InvalidArgument(msg) => {
                BusError::InvalidArgument(format!("argument {position}: {msg}"))
            }
            other => other,
        })?;
        builder.push_value(value);
    }
    Ok(Some(builder.build()))
}

/// Convert a JSON value to a D-Bus value of the given type.
///
/// # Errors
///
/// Returns `BusError::InvalidArgument` if the JSON does not fit `spec`.
pub fn json_to_value(json: &Json, spec: &TypeSpec) -> Result<Value<'static>> {
    let mismatch = || BusError::InvalidArgument(format!("cannot convert {json} to type '{spec}'"));

    let value = match spec {
        TypeSpec::Byte => Value::U8(integer(json, spec)?),
        TypeSpec::Boolean => Value::Bool(json.as_bool().ok_or_else(mismatch)?),
        TypeSpec::Int16 => Value::I16(integer(json, spec)?),
        TypeSpec::UInt16 => Value::U16(integer(json, spec)?),
        TypeSpec::Int32 => Value::I32(integer(json, spec)?),
        TypeSpec::UInt32 => Value::U32(integer(json, spec)?),
        TypeSpec::Int64 => Value::I64(integer(json, spec)?),
        TypeSpec::UInt64 => Value::U64(integer(json, spec)?),
        TypeSpec::Double => Value::F64(json.as_f64().ok_or_else(mismatch)?),
        TypeSpec::String => Value::from(json.as_str().ok_or_else(mismatch)?.to_string()),
        TypeSpec::ObjectPath => {
            let text = json.as_str().ok_or_else(mismatch)?.to_string();
            Value::ObjectPath(ObjectPath::try_from(text)?)
        }
        TypeSpec::Signature => {
            let text = json.as_str().ok_or_else(mismatch)?.to_string();
            Value::Signature(Signature::try_from(text)?)
        }
        TypeSpec::Variant => Value::Value(Box::new(infer_value(json)?)),
        TypeSpec::UnixFd => {
            return Err(BusError::InvalidArgument(
                "file descriptors cannot be passed over HTTP".to_string(),
            ));
        }
        TypeSpec::Array(elem) => {
            let items = json.as_array().ok_or_else(mismatch)?;
            let mut array = Array::new(Signature::try_from(elem.to_string())?);
            for item in items {
                array.append(json_to_value(item, elem)?)?;
            }
            Value::Array(array)
        }
        TypeSpec::Dict(key, val) => {
            let entries = json.as_object().ok_or_else(mismatch)?;
            let mut dict = Dict::new(
                Signature::try_from(key.to_string())?,
                Signature::try_from(val.to_string())?,
            );
            for (k, v) in entries {
                dict.append(dict_key(k, key)?, json_to_value(v, val)?)?;
            }
            Value::Dict(dict)
        }
        TypeSpec::Struct(fields) => {
            let items = json.as_array().ok_or_else(mismatch)?;
            if items.len() != fields.len() {
                return Err(mismatch());
            }
            let mut builder = StructureBuilder::new();
            for (item, field) in items.iter().zip(fields) {
                builder.push_value(json_to_value(item, field)?);
            }
            Value::Structure(builder.build())
        }
    };
    Ok(value)
}

/// Infer a D-Bus value for a variant argument from the JSON shape alone.
///
/// # Errors
///
/// Returns `BusError::InvalidArgument` for `null`, which has no D-Bus form.
pub fn infer_value(json: &Json) -> Result<Value<'static>> {
    let value = match json {
        Json::Null => {
            return Err(BusError::InvalidArgument(
                "null cannot be sent as a variant".to_string(),
            ));
        }
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::I64(i)
            } else if let Some(u) = n.as_u64() {
                Value::U64(u)
            } else {
                Value::F64(n.as_f64().unwrap_or_default())
            }
        }
        Json::String(s) => Value::from(s.clone()),
        Json::Array(items) => {
            let mut array = Array::new(Signature::try_from("v")?);
            for item in items {
                array.append(Value::Value(Box::new(infer_value(item)?)))?;
            }
            Value::Array(array)
        }
        Json::Object(entries) => {
            let mut dict = Dict::new(Signature::try_from("s")?, Signature::try_from("v")?);
            for (k, v) in entries {
                dict.append(Value::from(k.clone()), Value::Value(Box::new(infer_value(v)?)))?;
            }
            Value::Dict(dict)
        }
    };
    Ok(value)
}

/// Convert a D-Bus value to JSON.
#[must_use]
pub fn value_to_json(value: &Value<'_>) -> Json {
    match value {
        Value::U8(v) => Json::from(*v),
        Value::Bool(v) => Json::Bool(*v),
        Value::I16(v) => Json::from(*v),
        Value::U16(v) => Json::from(*v),
        Value::I32(v) => Json::from(*v),
        Value::U32(v) => Json::from(*v),
        Value::I64(v) => Json::from(*v),
        Value::U64(v) => Json::from(*v),
        Value::F64(v) => Number::from_f64(*v).map_or(Json::Null, Json::Number),
        Value::Str(s) => Json::String(s.as_str().to_string()),
        Value::Signature(s) => Json::String(s.as_str().to_string()),
        Value::ObjectPath(p) => Json::String(p.as_str().to_string()),
        Value::Value(inner) => value_to_json(inner),
        Value::Array(array) => Json::Array(array.iter().map(value_to_json).collect()),
        Value::Dict(dict) => {
            let mut map = Map::new();
            for (k, v) in dict.iter() {
                map.insert(key_to_string(k), value_to_json(v));
            }
            Json::Object(map)
        }
        Value::Structure(structure) => {
            Json::Array(structure.fields().iter().map(value_to_json).collect())
        }
        other => Json::String(other.to_string()),
    }
}

fn key_to_string(key: &Value<'_>) -> String {
    match value_to_json(key) {
        Json::String(s) => s,
        other => other.to_string(),
    }
}

fn dict_key(key: &str, spec: &TypeSpec) -> Result<Value<'static>> {
    match spec {
        TypeSpec::String | TypeSpec::ObjectPath | TypeSpec::Signature => {
            json_to_value(&Json::String(key.to_string()), spec)
        }
        _ => {
            let parsed: Json = serde_json::from_str(key).map_err(|_| {
                BusError::InvalidArgument(format!("dictionary key {key:?} is not a '{spec}'"))
            })?;
            json_to_value(&parsed, spec)
        }
    }
}

fn integer<T>(json: &Json, spec: &TypeSpec) -> Result<T>
where
    T: TryFrom<i128>,
{
    let out_of_range = || BusError::InvalidArgument(format!("{json} is not a valid '{spec}'"));
    let wide = match json {
        Json::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .ok_or_else(out_of_range)?,
        _ => return Err(out_of_range()),
    };
    T::try_from(wide).map_err(|_| out_of_range())
}
