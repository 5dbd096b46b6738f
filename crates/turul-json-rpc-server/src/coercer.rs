//! Raw value coercion onto declared field shapes.

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::schema::{DefaultValue, PrimitiveKind, TypeShape};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct CoercionError {
    /// Path below the field being coerced, empty when the field itself failed
    pub path: Vec<String>,
    pub message: String,
}

impl CoercionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
        }
    }

    fn cannot_convert(raw: &Value, target: &str) -> Self {
        Self::new(format!("Cannot convert {} to {}", raw, target))
    }

    fn within(mut self, field: &str) -> Self {
        self.path.insert(0, field.to_string());
        self
    }

    /// Full dotted path given the top-level field name.
    pub fn field_path(&self, field: &str) -> String {
        std::iter::once(field)
            .chain(self.path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Turns an accepted raw value into the representation its declared type
/// deserializes from.
pub trait Coercer: Send + Sync {
    fn coerce(&self, raw: &Value, shape: &TypeShape) -> Result<Value, CoercionError>;
}

/// Default coercer matching the loose-type widening table.
#[derive(Debug, Clone, Copy, Default)]
pub struct LooseCoercer;

impl Coercer for LooseCoercer {
    fn coerce(&self, raw: &Value, shape: &TypeShape) -> Result<Value, CoercionError> {
        match shape {
            TypeShape::Primitive(kind) => coerce_primitive(raw, *kind),
            TypeShape::Union(members) => {
                if raw.is_null()
                    && members
                        .iter()
                        .any(|m| matches!(m, TypeShape::Primitive(PrimitiveKind::Null)))
                {
                    return Ok(Value::Null);
                }
                let mut last_error = None;
                for member in members {
                    match self.coerce(raw, member) {
                        Ok(value) => return Ok(value),
                        Err(e) => last_error = Some(e),
                    }
                }
                Err(last_error.unwrap_or_else(|| CoercionError::cannot_convert(raw, "union")))
            }
            TypeShape::BackedEnum { cases, .. } => {
                if cases.contains(raw) {
                    Ok(raw.clone())
                } else {
                    Err(CoercionError::new(format!(
                        "{} is not a valid choice, expected one of {}",
                        raw,
                        Value::Array(cases.clone())
                    )))
                }
            }
            TypeShape::Nested(nested) => {
                let Some(object) = raw.as_object() else {
                    return Err(CoercionError::cannot_convert(raw, "object"));
                };
                let mut coerced: Map<String, Value> = object.clone();
                for declaration in (nested.declarations)() {
                    match object.get(declaration.name) {
                        Some(value) => {
                            let value = self
                                .coerce(value, &declaration.shape)
                                .map_err(|e| e.within(declaration.name))?;
                            coerced.insert(declaration.name.to_string(), value);
                        }
                        None => {
                            if let Some(DefaultValue::Value(default)) = &declaration.default {
                                coerced.insert(declaration.name.to_string(), default.clone());
                            }
                        }
                    }
                }
                Ok(Value::Object(coerced))
            }
            TypeShape::Unsupported(_) => Ok(raw.clone()),
        }
    }
}

fn coerce_primitive(raw: &Value, kind: PrimitiveKind) -> Result<Value, CoercionError> {
    match kind {
        PrimitiveKind::Int => match raw {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(raw.clone()),
            Value::Number(n) => n
                .as_f64()
                .and_then(integral)
                .map(Value::from)
                .ok_or_else(|| CoercionError::cannot_convert(raw, "int")),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral))
                    .map(Value::from)
                    .ok_or_else(|| CoercionError::cannot_convert(raw, "int"))
            }
            _ => Err(CoercionError::cannot_convert(raw, "int")),
        },
        PrimitiveKind::Float => match raw {
            Value::Number(_) => Ok(raw.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| CoercionError::cannot_convert(raw, "float")),
            _ => Err(CoercionError::cannot_convert(raw, "float")),
        },
        PrimitiveKind::String => match raw {
            Value::String(_) => Ok(raw.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            _ => Err(CoercionError::cannot_convert(raw, "string")),
        },
        PrimitiveKind::Bool => match raw {
            Value::Bool(_) => Ok(raw.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(CoercionError::cannot_convert(raw, "bool")),
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(Value::Bool(true)),
                "0" | "false" | "no" | "off" | "" => Ok(Value::Bool(false)),
                _ => Err(CoercionError::cannot_convert(raw, "bool")),
            },
            _ => Err(CoercionError::cannot_convert(raw, "bool")),
        },
        PrimitiveKind::Array => match raw {
            Value::Array(_) => Ok(raw.clone()),
            _ => Err(CoercionError::cannot_convert(raw, "array")),
        },
        PrimitiveKind::Null => match raw {
            Value::Null => Ok(Value::Null),
            _ => Err(CoercionError::cannot_convert(raw, "null")),
        },
    }
}

/// `i64::MAX as f64` rounds up to 2^63, which is already out of range.
fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64)
        .then_some(f as i64)
}
