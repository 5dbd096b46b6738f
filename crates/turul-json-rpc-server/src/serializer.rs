//! Result graph → plain JSON, with depth and cycle guards.

use serde_json::{Map, Number, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::result::ResultValue;

/// Why a result graph could not be turned into plain data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializationError {
    #[error("Maximum serialization depth of {max_depth} exceeded at {path}")]
    DepthExceeded { max_depth: usize, path: String },
    #[error("Circular reference to {type_name} detected at {path}")]
    CycleDetected {
        type_name: &'static str,
        path: String,
    },
    #[error("Value of type {type_name} at {path} cannot be serialized")]
    Unserializable {
        type_name: &'static str,
        path: String,
    },
}

impl SerializationError {
    pub fn path(&self) -> &str {
        match self {
            SerializationError::DepthExceeded { path, .. }
            | SerializationError::CycleDetected { path, .. }
            | SerializationError::Unserializable { path, .. } => path,
        }
    }
}

/// Converts [`ResultValue`] graphs into `serde_json::Value`.
///
/// Every container (sequence, map, node, plain-data value, nested JSON)
/// counts as one level; a chain of exactly `max_depth` containers succeeds.
#[derive(Debug, Clone, Copy)]
pub struct ResultSerializer {
    max_depth: usize,
}

impl Default for ResultSerializer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DEPTH)
    }
}

impl ResultSerializer {
    pub const DEFAULT_MAX_DEPTH: usize = 32;

    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn serialize(&self, value: &ResultValue) -> Result<Value, SerializationError> {
        let mut walk = Walk {
            max_depth: self.max_depth,
            path: vec!["$".to_string()],
            ancestors: Vec::new(),
        };
        walk.value(value, 0).inspect_err(|e| error!("Result serialization failed: {}", e))
    }
}

struct Walk {
    max_depth: usize,
    path: Vec<String>,
    /// Identities of the shared nodes on the current path
    ancestors: Vec<*const ()>,
}

impl Walk {
    fn path(&self) -> String {
        self.path.concat()
    }

    fn enter(&self, depth: usize) -> Result<usize, SerializationError> {
        let depth = depth + 1;
        if depth > self.max_depth {
            return Err(SerializationError::DepthExceeded {
                max_depth: self.max_depth,
                path: self.path(),
            });
        }
        Ok(depth)
    }

    fn push_identity(
        &mut self,
        identity: *const (),
        type_name: &'static str,
    ) -> Result<(), SerializationError> {
        if self.ancestors.contains(&identity) {
            return Err(SerializationError::CycleDetected {
                type_name,
                path: self.path(),
            });
        }
        self.ancestors.push(identity);
        Ok(())
    }

    fn scoped<F>(&mut self, segment: String, f: F) -> Result<Value, SerializationError>
    where
        F: FnOnce(&mut Self) -> Result<Value, SerializationError>,
    {
        self.path.push(segment);
        let result = f(self);
        self.path.pop();
        result
    }

    fn value(&mut self, value: &ResultValue, depth: usize) -> Result<Value, SerializationError> {
        match value {
            ResultValue::Null => Ok(Value::Null),
            ResultValue::Bool(b) => Ok(Value::Bool(*b)),
            ResultValue::Int(i) => Ok(Value::from(*i)),
            ResultValue::UInt(u) => Ok(Value::from(*u)),
            ResultValue::Float(f) => Number::from_f64(*f).map(Value::Number).ok_or_else(|| {
                SerializationError::Unserializable {
                    type_name: "non-finite float",
                    path: self.path(),
                }
            }),
            ResultValue::String(s) => Ok(Value::String(s.clone())),
            ResultValue::Timestamp(ts) => Ok(Value::String(ts.to_rfc3339())),
            ResultValue::Enum { name, backing } => Ok(backing
                .clone()
                .unwrap_or_else(|| Value::String((*name).to_string()))),
            ResultValue::Opaque(type_name) => Err(SerializationError::Unserializable {
                type_name: *type_name,
                path: self.path(),
            }),
            ResultValue::Sequence(items) => {
                let depth = self.enter(depth)?;
                self.sequence(items, depth)
            }
            ResultValue::Map(entries) => {
                let depth = self.enter(depth)?;
                self.entries(entries, depth)
            }
            ResultValue::Json(json) => self.json(json, depth),
            ResultValue::Node(node) => {
                let depth = self.enter(depth)?;
                self.push_identity(Arc::as_ptr(node) as *const (), node.type_name())?;
                let result = self.entries(&node.fields(), depth);
                self.ancestors.pop();
                result
            }
            ResultValue::Plain(plain) => {
                let depth = self.enter(depth)?;
                self.push_identity(Arc::as_ptr(plain) as *const (), plain.type_name())?;
                let representation = plain.to_plain_data();
                // The representation replaces the value at the same level
                let result = self.value(&representation, depth - 1);
                self.ancestors.pop();
                result
            }
        }
    }

    fn sequence(&mut self, items: &[ResultValue], depth: usize) -> Result<Value, SerializationError> {
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            out.push(self.scoped(format!("[{}]", index), |walk| walk.value(item, depth))?);
        }
        Ok(Value::Array(out))
    }

    fn entries(
        &mut self,
        entries: &[(String, ResultValue)],
        depth: usize,
    ) -> Result<Value, SerializationError> {
        let mut out = Map::new();
        for (key, item) in entries {
            let value = self.scoped(format!(".{}", key), |walk| walk.value(item, depth))?;
            out.insert(key.clone(), value);
        }
        Ok(Value::Object(out))
    }

    fn json(&mut self, json: &Value, depth: usize) -> Result<Value, SerializationError> {
        match json {
            Value::Array(items) => {
                let depth = self.enter(depth)?;
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    out.push(self.scoped(format!("[{}]", index), |walk| walk.json(item, depth))?);
                }
                Ok(Value::Array(out))
            }
            Value::Object(map) => {
                let depth = self.enter(depth)?;
                let mut out = Map::new();
                for (key, item) in map {
                    let value = self.scoped(format!(".{}", key), |walk| walk.json(item, depth))?;
                    out.insert(key.clone(), value);
                }
                Ok(Value::Object(out))
            }
            scalar => Ok(scalar.clone()),
        }
    }
}
