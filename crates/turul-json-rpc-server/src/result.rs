//! Result graphs returned by methods
//!
//! A method hands back anything implementing [`ToResultValue`]. Scalars,
//! collections and plain JSON convert directly; structured results implement
//! [`ResultNode`] (usually via `#[derive(ResultNode)]`) and are shared through
//! `Arc`, which is also what gives them an identity for cycle detection.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// A structured result object.
///
/// Only the fields returned by [`ResultNode::fields`] reach the wire; the
/// derive macro emits `pub` fields and honours `#[result(skip)]` and
/// `#[result(rename = "...")]`.
pub trait ResultNode: Send + Sync + 'static {
    fn type_name(&self) -> &'static str;

    /// Exposed fields, in output order.
    fn fields(&self) -> Vec<(String, ResultValue)>;
}

/// Values that know their own plain-data representation.
///
/// The serializer asks for the representation first and then recurses into
/// whatever comes back.
pub trait ToPlainData: Send + Sync + 'static {
    fn type_name(&self) -> &'static str;

    fn to_plain_data(&self) -> ResultValue;
}

/// Enums whose variants carry a wire value.
pub trait BackedEnum {
    /// The variant identifier
    fn case_name(&self) -> &'static str;

    /// The backing primitive, `None` for plain enumerants.
    fn backing_value(&self) -> Option<Value>;
}

/// A node in a result graph, before serialization.
#[derive(Clone)]
pub enum ResultValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Sequence(Vec<ResultValue>),
    /// Keyed map; key order is kept
    Map(Vec<(String, ResultValue)>),
    /// Already-plain JSON
    Json(Value),
    Node(Arc<dyn ResultNode>),
    Plain(Arc<dyn ToPlainData>),
    Timestamp(DateTime<Utc>),
    Enum {
        name: &'static str,
        backing: Option<Value>,
    },
    /// A value with no plain representation (handles, resources)
    Opaque(&'static str),
}

impl ResultValue {
    pub fn node<T: ResultNode>(node: T) -> Self {
        ResultValue::Node(Arc::new(node))
    }

    pub fn plain<T: ToPlainData>(value: T) -> Self {
        ResultValue::Plain(Arc::new(value))
    }

    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ResultValue)>,
    {
        ResultValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResultValue::Null => "null",
            ResultValue::Bool(_) => "bool",
            ResultValue::Int(_) | ResultValue::UInt(_) => "int",
            ResultValue::Float(_) => "float",
            ResultValue::String(_) => "string",
            ResultValue::Sequence(_) => "sequence",
            ResultValue::Map(_) => "map",
            ResultValue::Json(_) => "json",
            ResultValue::Node(node) => node.type_name(),
            ResultValue::Plain(value) => value.type_name(),
            ResultValue::Timestamp(_) => "timestamp",
            ResultValue::Enum { name, .. } => *name,
            ResultValue::Opaque(type_name) => *type_name,
        }
    }
}

impl fmt::Debug for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultValue::Null => f.write_str("Null"),
            ResultValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            ResultValue::Int(i) => f.debug_tuple("Int").field(i).finish(),
            ResultValue::UInt(u) => f.debug_tuple("UInt").field(u).finish(),
            ResultValue::Float(x) => f.debug_tuple("Float").field(x).finish(),
            ResultValue::String(s) => f.debug_tuple("String").field(s).finish(),
            ResultValue::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
            ResultValue::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            ResultValue::Json(value) => f.debug_tuple("Json").field(value).finish(),
            // Nodes may be cyclic, never walk them here
            ResultValue::Node(node) => write!(f, "Node({})", node.type_name()),
            ResultValue::Plain(value) => write!(f, "Plain({})", value.type_name()),
            ResultValue::Timestamp(ts) => f.debug_tuple("Timestamp").field(ts).finish(),
            ResultValue::Enum { name, backing } => f
                .debug_struct("Enum")
                .field("name", name)
                .field("backing", backing)
                .finish(),
            ResultValue::Opaque(type_name) => write!(f, "Opaque({})", type_name),
        }
    }
}

/// Conversion into a result graph node.
pub trait ToResultValue {
    fn to_result_value(&self) -> ResultValue;
}

impl ToResultValue for ResultValue {
    fn to_result_value(&self) -> ResultValue {
        self.clone()
    }
}

impl ToResultValue for () {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::Null
    }
}

impl ToResultValue for bool {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::Bool(*self)
    }
}

macro_rules! signed_result {
    ($($ty:ty),+) => {
        $(impl ToResultValue for $ty {
            fn to_result_value(&self) -> ResultValue {
                ResultValue::Int(*self as i64)
            }
        })+
    };
}

macro_rules! unsigned_result {
    ($($ty:ty),+) => {
        $(impl ToResultValue for $ty {
            fn to_result_value(&self) -> ResultValue {
                ResultValue::UInt(*self as u64)
            }
        })+
    };
}

signed_result!(i8, i16, i32, i64, isize);
unsigned_result!(u8, u16, u32, u64, usize);

impl ToResultValue for f32 {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::Float(f64::from(*self))
    }
}

impl ToResultValue for f64 {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::Float(*self)
    }
}

impl ToResultValue for String {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::String(self.clone())
    }
}

impl ToResultValue for str {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::String(self.to_string())
    }
}

impl<T: ToResultValue + ?Sized> ToResultValue for &T {
    fn to_result_value(&self) -> ResultValue {
        (**self).to_result_value()
    }
}

impl ToResultValue for Value {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::Json(self.clone())
    }
}

impl ToResultValue for Map<String, Value> {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::Json(Value::Object(self.clone()))
    }
}

impl ToResultValue for DateTime<Utc> {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::Timestamp(*self)
    }
}

impl<T: ToResultValue> ToResultValue for Option<T> {
    fn to_result_value(&self) -> ResultValue {
        match self {
            Some(value) => value.to_result_value(),
            None => ResultValue::Null,
        }
    }
}

impl<T: ToResultValue> ToResultValue for Vec<T> {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::Sequence(self.iter().map(ToResultValue::to_result_value).collect())
    }
}

impl<T: ToResultValue> ToResultValue for VecDeque<T> {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::Sequence(self.iter().map(ToResultValue::to_result_value).collect())
    }
}

impl<T: ToResultValue> ToResultValue for [T] {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::Sequence(self.iter().map(ToResultValue::to_result_value).collect())
    }
}

impl<T: ToResultValue> ToResultValue for BTreeMap<String, T> {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_result_value()))
                .collect(),
        )
    }
}

impl<T: ResultNode> ToResultValue for Arc<T> {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::Node(self.clone())
    }
}

impl<T: ToResultValue + ?Sized> ToResultValue for Box<T> {
    fn to_result_value(&self) -> ResultValue {
        (**self).to_result_value()
    }
}

// Interior mutability is how result graphs close a cycle
impl<T: ToResultValue + ?Sized> ToResultValue for Mutex<T> {
    fn to_result_value(&self) -> ResultValue {
        self.lock().to_result_value()
    }
}

impl<T: ToResultValue + ?Sized> ToResultValue for RwLock<T> {
    fn to_result_value(&self) -> ResultValue {
        self.read().to_result_value()
    }
}

/// An ordered list result that renders itself as a plain sequence.
#[derive(Debug, Clone, Default)]
pub struct ArrayResult {
    items: Vec<ResultValue>,
}

impl ArrayResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: impl ToResultValue) {
        self.items.push(item.to_result_value());
    }

    pub fn with(mut self, item: impl ToResultValue) -> Self {
        self.push(item);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: ToResultValue> FromIterator<T> for ArrayResult {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(|item| item.to_result_value()).collect(),
        }
    }
}

impl ToPlainData for ArrayResult {
    fn type_name(&self) -> &'static str {
        "ArrayResult"
    }

    fn to_plain_data(&self) -> ResultValue {
        ResultValue::Sequence(self.items.clone())
    }
}

impl ToResultValue for ArrayResult {
    fn to_result_value(&self) -> ResultValue {
        ResultValue::Plain(Arc::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Owner {
        name: String,
    }

    impl ResultNode for Owner {
        fn type_name(&self) -> &'static str {
            "Owner"
        }

        fn fields(&self) -> Vec<(String, ResultValue)> {
            vec![("name".to_string(), self.name.to_result_value())]
        }
    }

    #[test]
    fn test_scalar_conversions() {
        assert!(matches!(42u32.to_result_value(), ResultValue::UInt(42)));
        assert!(matches!((-1i16).to_result_value(), ResultValue::Int(-1)));
        assert!(matches!(None::<String>.to_result_value(), ResultValue::Null));
        assert!(matches!("x".to_result_value(), ResultValue::String(s) if s == "x"));
    }

    #[test]
    fn test_arc_nodes_share_identity() {
        let owner = Arc::new(Owner {
            name: "ada".to_string(),
        });
        let (ResultValue::Node(a), ResultValue::Node(b)) =
            (owner.to_result_value(), owner.to_result_value())
        else {
            panic!("expected nodes");
        };
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(format!("{:?}", ResultValue::Node(a)), "Node(Owner)");
    }

    #[test]
    fn test_array_result_collects_items() {
        let array: ArrayResult = vec![1, 2, 3].into_iter().collect();
        assert_eq!(array.len(), 3);
        let ResultValue::Sequence(items) = array.to_plain_data() else {
            panic!("expected a sequence");
        };
        assert!(matches!(items[2], ResultValue::Int(3)));
        assert_eq!(array.to_result_value().kind(), "ArrayResult");
    }

    #[test]
    fn test_json_passthrough() {
        let value = json!({"a": [1, 2]});
        assert!(matches!(value.to_result_value(), ResultValue::Json(v) if v == value));
    }
}
