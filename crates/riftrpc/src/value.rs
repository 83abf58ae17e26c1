//! Data model: plain values, resource identities, and the tagged union.

use std::collections::BTreeMap;

use riftpack::Decoder;
use riftpack::Encoder;
use riftpack::Tag;

use crate::error::Error;
use crate::error::Result;

/// Plain, engine-agnostic data.
///
/// This is everything the protocol can carry *by copy*: scalars, strings,
/// and sequences/mappings of the same. Nested values are untagged — a list
/// cannot smuggle a resource reference; references exist only at the top
/// level of a call's arguments and result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub(crate) fn encode(&self, enc: &mut Encoder) -> Result<()> {
        match self {
            Value::Unit => enc.unit()?,
            Value::Bool(b) => enc.bool(*b)?,
            Value::Int(n) => enc.s64(*n)?,
            Value::Float(x) => enc.f64(*x)?,
            Value::Str(s) => enc.str(s)?,
            Value::List(items) => {
                enc.list_begin()?;
                for item in items {
                    item.encode(enc)?;
                }
                enc.list_end()?;
            }
            Value::Map(entries) => {
                enc.map_begin()?;
                for (key, value) in entries {
                    enc.variant_begin(key)?;
                    value.encode(enc)?;
                    enc.variant_end()?;
                }
                enc.map_end()?;
            }
        }
        Ok(())
    }

    pub(crate) fn decode(dec: &mut Decoder<'_>) -> Result<Value> {
        match dec.peek_tag()? {
            Tag::Unit => {
                dec.unit()?;
                Ok(Value::Unit)
            }
            Tag::BoolTrue | Tag::BoolFalse => Ok(Value::Bool(dec.bool()?)),
            Tag::S64 => Ok(Value::Int(dec.s64()?)),
            Tag::F64 => Ok(Value::Float(dec.f64()?)),
            Tag::Str => Ok(Value::Str(dec.str()?.to_string())),
            Tag::List => {
                let mut items = Vec::new();
                let mut list = dec.list()?;
                while let Some(mut item) = list.next()? {
                    items.push(Value::decode(&mut item)?);
                }
                Ok(Value::List(items))
            }
            Tag::Map => {
                let mut entries = BTreeMap::new();
                let mut map = dec.map()?;
                while let Some((key, mut val)) = map.next()? {
                    entries.insert(key.to_string(), Value::decode(&mut val)?);
                }
                Ok(Value::Map(entries))
            }
            tag => Err(Error::Malformed(format!(
                "tag {:?} is not a plain value",
                tag
            ))),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// The identity of an engine-owned resource: `(type_tag, name)`.
///
/// The type tag is a `:`-joined hierarchy string running from the generic
/// container kind to the most specific kind the host knows about. The name
/// is the resource's current name within its native collection. Identities
/// are recomputed from the live object on demand, never cached on it, so a
/// rename yields a *different* identity rather than a dangling one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    pub type_tag: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(type_tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            name: name.into(),
        }
    }

    /// The first segment of the type tag — the owning native collection.
    pub fn base(&self) -> &str {
        self.type_tag.split(':').next().unwrap_or(&self.type_tag)
    }

    pub(crate) fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.list_begin()?;
        enc.str(&self.type_tag)?;
        enc.str(&self.name)?;
        enc.list_end()?;
        Ok(())
    }

    pub(crate) fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        let mut list = dec.list()?;
        let type_tag = list
            .next()?
            .ok_or_else(|| Error::Malformed("reference missing type tag".into()))?
            .str()?
            .to_string();
        let name = list
            .next()?
            .ok_or_else(|| Error::Malformed("reference missing name".into()))?
            .str()?
            .to_string();
        Ok(Self { type_tag, name })
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.type_tag, self.name)
    }
}

/// Strong type for module identifiers.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct ModuleId(pub u32);

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "module-{}", self.0)
    }
}

/// The tagged union every top-level argument and result travels as.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// Plain data, passed by copy.
    Value(Value),
    /// A handle to an engine-owned resource, passed by identity.
    Reference(ResourceId),
    /// A failure of invoked module code; the payload is an opaque
    /// diagnostic, surfaced verbatim and never parsed.
    Error(String),
}

impl WireValue {
    pub fn encode(&self, enc: &mut Encoder) -> Result<()> {
        match self {
            WireValue::Value(v) => {
                enc.variant_begin("value")?;
                v.encode(enc)?;
                enc.variant_end()?;
            }
            WireValue::Reference(id) => {
                enc.variant_begin("reference")?;
                id.encode(enc)?;
                enc.variant_end()?;
            }
            WireValue::Error(diagnostic) => {
                enc.variant_begin("error")?;
                enc.str(diagnostic)?;
                enc.variant_end()?;
            }
        }
        Ok(())
    }

    pub fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        let (tag, mut payload) = dec.variant()?;
        match tag {
            "value" => Ok(WireValue::Value(Value::decode(&mut payload)?)),
            "reference" => Ok(WireValue::Reference(ResourceId::decode(&mut payload)?)),
            "error" => Ok(WireValue::Error(payload.str()?.to_string())),
            _ => Err(Error::UnknownVariant(format!("wire value: {}", tag))),
        }
    }
}
