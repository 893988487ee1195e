//! Literal codec seam between value objects on the wire and [`Value`]
//! scalars on the object side.
//!
//! Real per-datatype conversion rules (string to date, enum to IRI, ...)
//! belong to external collaborators; the engine only fixes the interface and
//! ships a passthrough default.

use serde_json::Value as Json;

use crate::error::Error;
use crate::mapping::Value;
use crate::nodes::LiteralValue;
use crate::serializer_options::SerializerOptions;

/// Converts between raw `@value` payloads and object-side scalars.
pub trait LiteralCodec {
    /// Decode the payload of a value object, given its optional `@type` and
    /// `@language` tags.
    fn decode(
        &self,
        raw: &Json,
        datatype: Option<&str>,
        language: Option<&str>,
    ) -> Result<Value, Error>;

    /// Encode an object-side scalar for emission, given the attribute's
    /// declared datatype.
    fn encode(&self, value: &Value, datatype: Option<&str>) -> Result<LiteralValue, Error>;
}

/// The built-in passthrough codec.
///
/// Scalars ride through unchanged; datatype and language tags are carried as
/// metadata but never reinterpreted. A temporal format override is accepted
/// for API compatibility with richer codecs and kept alongside the values it
/// would apply to.
#[derive(Clone, Debug, Default)]
pub struct DefaultCodec {
    temporal_format: Option<String>,
}

impl DefaultCodec {
    pub fn from_options(options: &SerializerOptions) -> Self {
        DefaultCodec {
            temporal_format: options.temporal_format.clone(),
        }
    }

    pub fn temporal_format(&self) -> Option<&str> {
        self.temporal_format.as_deref()
    }
}

impl LiteralCodec for DefaultCodec {
    fn decode(
        &self,
        raw: &Json,
        _datatype: Option<&str>,
        _language: Option<&str>,
    ) -> Result<Value, Error> {
        match raw {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Boolean(*b)),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i))
                } else if let Some(d) = n.as_f64() {
                    Ok(Value::Double(d))
                } else {
                    Err(Error::malformed(format!("unrepresentable number {n}")))
                }
            }
            Json::String(s) => Ok(Value::String(s.clone())),
            _ => Err(Error::malformed("@value payload must be a scalar")),
        }
    }

    fn encode(&self, value: &Value, _datatype: Option<&str>) -> Result<LiteralValue, Error> {
        match value {
            Value::Boolean(b) => Ok(LiteralValue::Boolean(*b)),
            Value::Integer(i) => Ok(LiteralValue::Integer(*i)),
            Value::Double(d) => Ok(LiteralValue::Double(*d)),
            Value::String(s) => Ok(LiteralValue::String(s.clone())),
            other => Err(Error::msg(format!(
                "value {other:?} is not a literal and cannot be encoded as one"
            ))),
        }
    }
}
