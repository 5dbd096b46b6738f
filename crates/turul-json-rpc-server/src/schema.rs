//! Parameter schema derivation
//!
//! A parameter type describes its own fields through [`RpcParams`] (normally
//! generated by `#[derive(RpcParams)]`). This module reflects those
//! declarations into a [`ParameterSchema`]: one [`FieldRule`] per field plus
//! the read-only metadata documentation tooling consumes.
//!
//! ## Loose-type widening
//!
//! Front ends routinely send `"1"`, `1` or `1.0` for the same numeric field,
//! and `1` or `"1"` for booleans. Primitive rules are therefore widened
//! through [`LOOSE_TYPE_WIDENING`]; the coercer later turns the accepted raw
//! value into the declared type, and rejects it if that is impossible.

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error};

/// Builtin kinds a raw JSON value can be checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Int,
    Float,
    Bool,
    Array,
    Null,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Array => "array",
            PrimitiveKind::Null => "null",
        }
    }

    /// Whether a raw JSON value is of this kind.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            PrimitiveKind::String => value.is_string(),
            PrimitiveKind::Int => value.is_i64() || value.is_u64(),
            PrimitiveKind::Float => value.is_number(),
            PrimitiveKind::Bool => value.is_boolean(),
            PrimitiveKind::Array => value.is_array(),
            PrimitiveKind::Null => value.is_null(),
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared primitive → kinds accepted on the wire.
pub const LOOSE_TYPE_WIDENING: &[(PrimitiveKind, &[PrimitiveKind])] = &[
    (
        PrimitiveKind::Int,
        &[PrimitiveKind::Int, PrimitiveKind::Float, PrimitiveKind::String],
    ),
    (
        PrimitiveKind::Float,
        &[PrimitiveKind::Float, PrimitiveKind::Int, PrimitiveKind::String],
    ),
    (
        PrimitiveKind::String,
        &[PrimitiveKind::String, PrimitiveKind::Int, PrimitiveKind::Float],
    ),
    (
        PrimitiveKind::Bool,
        &[PrimitiveKind::Bool, PrimitiveKind::Int, PrimitiveKind::String],
    ),
];

/// Kinds accepted for a declared primitive.
pub fn widened_kinds(kind: PrimitiveKind) -> Vec<PrimitiveKind> {
    LOOSE_TYPE_WIDENING
        .iter()
        .find(|(declared, _)| *declared == kind)
        .map(|(_, accepted)| accepted.to_vec())
        .unwrap_or_else(|| vec![kind])
}

/// A nested parameter type, reflected lazily.
#[derive(Clone, Copy)]
pub struct NestedType {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub declarations: fn() -> Vec<FieldDeclaration>,
}

impl NestedType {
    pub fn of<T: RpcParams>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            declarations: T::declarations,
        }
    }
}

impl fmt::Debug for NestedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedType")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// The shape a field was declared with
#[derive(Debug, Clone)]
pub enum TypeShape {
    Primitive(PrimitiveKind),
    Union(Vec<TypeShape>),
    BackedEnum {
        backing: PrimitiveKind,
        cases: Vec<Value>,
    },
    Nested(NestedType),
    /// Bound as-is, never validated
    Unsupported(&'static str),
}

/// Types that can appear as a parameter field.
pub trait DeclaredType {
    fn type_shape() -> TypeShape;
}

macro_rules! declared_primitive {
    ($kind:expr => $($ty:ty),+ $(,)?) => {
        $(impl DeclaredType for $ty {
            fn type_shape() -> TypeShape {
                TypeShape::Primitive($kind)
            }
        })+
    };
}

declared_primitive!(PrimitiveKind::String => String, char, chrono::DateTime<chrono::Utc>, chrono::NaiveDate);
declared_primitive!(PrimitiveKind::Int => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
declared_primitive!(PrimitiveKind::Float => f32, f64);
declared_primitive!(PrimitiveKind::Bool => bool);
declared_primitive!(PrimitiveKind::Null => ());

impl<T> DeclaredType for Vec<T> {
    fn type_shape() -> TypeShape {
        TypeShape::Primitive(PrimitiveKind::Array)
    }
}

impl<T> DeclaredType for VecDeque<T> {
    fn type_shape() -> TypeShape {
        TypeShape::Primitive(PrimitiveKind::Array)
    }
}

impl<T> DeclaredType for HashSet<T> {
    fn type_shape() -> TypeShape {
        TypeShape::Primitive(PrimitiveKind::Array)
    }
}

impl<T> DeclaredType for BTreeSet<T> {
    fn type_shape() -> TypeShape {
        TypeShape::Primitive(PrimitiveKind::Array)
    }
}

impl<T: DeclaredType> DeclaredType for Option<T> {
    fn type_shape() -> TypeShape {
        match T::type_shape() {
            // Anything goes already, null included
            TypeShape::Unsupported(name) => TypeShape::Unsupported(name),
            shape => TypeShape::Union(vec![shape, TypeShape::Primitive(PrimitiveKind::Null)]),
        }
    }
}

impl<T: DeclaredType> DeclaredType for Box<T> {
    fn type_shape() -> TypeShape {
        T::type_shape()
    }
}

impl DeclaredType for Value {
    fn type_shape() -> TypeShape {
        TypeShape::Unsupported("json value")
    }
}

impl DeclaredType for serde_json::Map<String, Value> {
    fn type_shape() -> TypeShape {
        TypeShape::Unsupported("map")
    }
}

impl<K, V> DeclaredType for HashMap<K, V> {
    fn type_shape() -> TypeShape {
        TypeShape::Unsupported("map")
    }
}

impl<K, V> DeclaredType for BTreeMap<K, V> {
    fn type_shape() -> TypeShape {
        TypeShape::Unsupported("map")
    }
}

/// Constraint attached to a field with `#[param(...)]`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "constraint", content = "value")]
pub enum Constraint {
    Min(f64),
    Max(f64),
    MinLength(usize),
    MaxLength(usize),
    NotBlank,
    Pattern(&'static str),
}

impl Constraint {
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::Min(_) => "min",
            Constraint::Max(_) => "max",
            Constraint::MinLength(_) => "min_length",
            Constraint::MaxLength(_) => "max_length",
            Constraint::NotBlank => "not_blank",
            Constraint::Pattern(_) => "pattern",
        }
    }
}

/// How a missing field gets its value
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Inserted into the bag before deserialization
    Value(Value),
    /// Filled in by the type's own `Default` during deserialization
    Implicit,
}

impl DefaultValue {
    /// Default taken from any serializable value, as written in `#[param(default = ...)]`.
    pub fn of<T: Serialize>(value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => DefaultValue::Value(value),
            Err(e) => {
                error!("Declared default cannot be represented as JSON: {}", e);
                DefaultValue::Implicit
            }
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            DefaultValue::Value(value) => Some(value),
            DefaultValue::Implicit => None,
        }
    }
}

/// Deserializes one field value on its own, to name the field when
/// deserializing the whole parameter object fails.
#[derive(Clone, Copy)]
pub struct FieldDecoder {
    type_name: &'static str,
    decode: fn(&Value) -> Result<(), String>,
}

impl FieldDecoder {
    pub fn of<T: DeserializeOwned>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            decode: decode_as::<T>,
        }
    }

    pub fn decode(&self, value: &Value) -> Result<(), String> {
        (self.decode)(value)
    }
}

fn decode_as<T: DeserializeOwned>(value: &Value) -> Result<(), String> {
    T::deserialize(value).map(drop).map_err(|e| e.to_string())
}

impl fmt::Debug for FieldDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldDecoder<{}>", self.type_name)
    }
}

// One decoder per target type
impl PartialEq for FieldDecoder {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

/// One declared field of a parameter type
#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub name: &'static str,
    pub type_name: &'static str,
    pub shape: TypeShape,
    pub optional: bool,
    pub default: Option<DefaultValue>,
    pub description: Option<&'static str>,
    pub constraints: Vec<Constraint>,
    pub decoder: Option<FieldDecoder>,
}

impl FieldDeclaration {
    pub fn new(name: &'static str, type_name: &'static str, shape: TypeShape) -> Self {
        Self {
            name,
            type_name,
            shape,
            optional: false,
            default: None,
            description: None,
            constraints: Vec::new(),
            decoder: None,
        }
    }

    pub fn of<T: DeclaredType>(name: &'static str) -> Self {
        Self::new(name, std::any::type_name::<T>(), T::type_shape())
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Let binding failures of this field be reported under its name.
    pub fn with_decoder<T: DeserializeOwned>(mut self) -> Self {
        self.decoder = Some(FieldDecoder::of::<T>());
        self
    }

    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

/// A parameter object: deserializable, and able to describe its fields.
pub trait RpcParams: DeserializeOwned + Send + 'static {
    fn declarations() -> Vec<FieldDeclaration>;
}

/// Parameter type for methods that take nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
pub struct NoParams {}

impl RpcParams for NoParams {
    fn declarations() -> Vec<FieldDeclaration> {
        Vec::new()
    }
}

/// Derived validation rule for one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRule {
    Primitive(PrimitiveKind),
    /// At least one member must validate
    UnionOf(Vec<FieldRule>),
    EnumBackingType(PrimitiveKind),
    Composite(Arc<ParameterSchema>),
}

/// A field of a derived schema, with its documentation metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    name: &'static str,
    type_name: &'static str,
    rule: Option<FieldRule>,
    shape: TypeShape,
    required: bool,
    default: Option<DefaultValue>,
    description: Option<&'static str>,
    constraints: Vec<Constraint>,
    decoder: Option<FieldDecoder>,
}

impl PartialEq for TypeShape {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeShape::Primitive(a), TypeShape::Primitive(b)) => a == b,
            (TypeShape::Union(a), TypeShape::Union(b)) => a == b,
            (
                TypeShape::BackedEnum { backing: a, cases: ca },
                TypeShape::BackedEnum { backing: b, cases: cb },
            ) => a == b && ca == cb,
            (TypeShape::Nested(a), TypeShape::Nested(b)) => a.type_id == b.type_id,
            (TypeShape::Unsupported(a), TypeShape::Unsupported(b)) => a == b,
            _ => false,
        }
    }
}

impl SchemaField {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// `None` for shapes that are bound without validation.
    pub fn rule(&self) -> Option<&FieldRule> {
        self.rule.as_ref()
    }

    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn description(&self) -> Option<&'static str> {
        self.description
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint_names(&self) -> Vec<&'static str> {
        self.constraints.iter().map(Constraint::name).collect()
    }

    pub fn decoder(&self) -> Option<&FieldDecoder> {
        self.decoder.as_ref()
    }
}

/// Composite schema of a parameter type, fields in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSchema {
    type_name: &'static str,
    fields: Vec<SchemaField>,
}

impl ParameterSchema {
    /// Derive without caching.
    pub fn derive<T: RpcParams>() -> Self {
        let mut path = vec![TypeId::of::<T>()];
        derive_schema(std::any::type_name::<T>(), T::declarations(), &mut path)
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.field(name).and_then(SchemaField::rule)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.iter().filter(|field| field.required)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn derive_schema(
    type_name: &'static str,
    declarations: Vec<FieldDeclaration>,
    path: &mut Vec<TypeId>,
) -> ParameterSchema {
    let fields = declarations
        .into_iter()
        .map(|declaration| {
            let rule = derive_rule(&declaration.shape, path);
            if rule.is_none() {
                debug!(
                    "Field '{}' of {} has no derivable rule, binding without validation",
                    declaration.name, type_name
                );
            }
            SchemaField {
                name: declaration.name,
                type_name: declaration.type_name,
                required: declaration.is_required(),
                rule,
                shape: declaration.shape,
                default: declaration.default,
                description: declaration.description,
                constraints: declaration.constraints,
                decoder: declaration.decoder,
            }
        })
        .collect();

    ParameterSchema { type_name, fields }
}

/// Derive the rule for one declared shape.
///
/// Types already on `path` (self-referential nesting) only get an object
/// check, so derivation always terminates.
pub fn derive_rule(shape: &TypeShape, path: &mut Vec<TypeId>) -> Option<FieldRule> {
    match shape {
        TypeShape::BackedEnum { backing, .. } => Some(FieldRule::EnumBackingType(*backing)),
        TypeShape::Union(members) => {
            let mut rules: Vec<FieldRule> = Vec::new();
            for member in members {
                // Members without a rule are left out; the rest still catch a mismatch
                let Some(rule) = derive_rule(member, path) else {
                    continue;
                };
                match rule {
                    FieldRule::UnionOf(inner) => {
                        for rule in inner {
                            if !rules.contains(&rule) {
                                rules.push(rule);
                            }
                        }
                    }
                    other => {
                        if !rules.contains(&other) {
                            rules.push(other);
                        }
                    }
                }
            }
            match rules.len() {
                0 => None,
                1 => rules.pop(),
                _ => Some(FieldRule::UnionOf(rules)),
            }
        }
        TypeShape::Nested(nested) => {
            if path.contains(&nested.type_id) {
                // Recursive reference: only the object shape is checked
                return Some(FieldRule::Composite(Arc::new(ParameterSchema {
                    type_name: nested.type_name,
                    fields: Vec::new(),
                })));
            }
            path.push(nested.type_id);
            let schema = derive_schema(nested.type_name, (nested.declarations)(), path);
            path.pop();
            Some(FieldRule::Composite(Arc::new(schema)))
        }
        TypeShape::Primitive(kind) => {
            let accepted = widened_kinds(*kind);
            if accepted.len() == 1 {
                Some(FieldRule::Primitive(*kind))
            } else {
                Some(FieldRule::UnionOf(
                    accepted.into_iter().map(FieldRule::Primitive).collect(),
                ))
            }
        }
        TypeShape::Unsupported(_) => None,
    }
}

/// Schema cache keyed by parameter type identity.
///
/// Derivation is deterministic, so two threads racing on the same key both
/// produce an equivalent schema and the later insert simply wins.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<TypeId, Arc<ParameterSchema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static SchemaRegistry {
        static GLOBAL: OnceLock<SchemaRegistry> = OnceLock::new();
        GLOBAL.get_or_init(SchemaRegistry::new)
    }

    pub fn schema_for<T: RpcParams>(&self) -> Arc<ParameterSchema> {
        let key = TypeId::of::<T>();
        if let Some(schema) = self.schemas.read().get(&key) {
            return schema.clone();
        }

        debug!("Deriving parameter schema for {}", std::any::type_name::<T>());
        let schema = Arc::new(ParameterSchema::derive::<T>());
        self.schemas.write().insert(key, schema.clone());
        schema
    }

    pub fn len(&self) -> usize {
        self.schemas.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.read().is_empty()
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("cached", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Address {
        city: String,
        zip: Option<String>,
    }

    impl DeclaredType for Address {
        fn type_shape() -> TypeShape {
            TypeShape::Nested(NestedType::of::<Address>())
        }
    }

    impl RpcParams for Address {
        fn declarations() -> Vec<FieldDeclaration> {
            vec![
                FieldDeclaration::of::<String>("city"),
                FieldDeclaration::of::<Option<String>>("zip").optional(true),
            ]
        }
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Profile {
        name: String,
        age: u32,
        active: bool,
        tags: Vec<String>,
        address: Address,
        extra: Value,
        limit: i64,
    }

    impl RpcParams for Profile {
        fn declarations() -> Vec<FieldDeclaration> {
            vec![
                FieldDeclaration::of::<String>("name").with_constraint(Constraint::NotBlank),
                FieldDeclaration::of::<u32>("age"),
                FieldDeclaration::of::<bool>("active"),
                FieldDeclaration::of::<Vec<String>>("tags"),
                FieldDeclaration::of::<Address>("address"),
                FieldDeclaration::of::<Value>("extra").optional(true),
                FieldDeclaration::of::<i64>("limit")
                    .with_default(DefaultValue::Value(json!(10))),
            ]
        }
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Tree {
        label: String,
        parent: Option<Box<Tree>>,
    }

    impl DeclaredType for Tree {
        fn type_shape() -> TypeShape {
            TypeShape::Nested(NestedType::of::<Tree>())
        }
    }

    impl RpcParams for Tree {
        fn declarations() -> Vec<FieldDeclaration> {
            vec![
                FieldDeclaration::of::<String>("label"),
                FieldDeclaration::of::<Option<Box<Tree>>>("parent").optional(true),
            ]
        }
    }

    fn union(kinds: &[PrimitiveKind]) -> FieldRule {
        FieldRule::UnionOf(kinds.iter().copied().map(FieldRule::Primitive).collect())
    }

    #[test]
    fn test_numeric_and_string_fields_are_widened() {
        let schema = ParameterSchema::derive::<Profile>();
        use PrimitiveKind::*;
        assert_eq!(schema.rule("age"), Some(&union(&[Int, Float, String])));
        assert_eq!(schema.rule("name"), Some(&union(&[String, Int, Float])));
        assert_eq!(schema.rule("active"), Some(&union(&[Bool, Int, String])));
        assert_eq!(schema.rule("tags"), Some(&FieldRule::Primitive(Array)));
    }

    #[test]
    fn test_required_flags() {
        let schema = ParameterSchema::derive::<Profile>();
        let required: Vec<_> = schema.required_fields().map(SchemaField::name).collect();
        assert_eq!(required, vec!["name", "age", "active", "tags", "address"]);
        assert!(!schema.field("limit").unwrap().is_required());
    }

    #[test]
    fn test_unsupported_shape_has_no_rule() {
        let schema = ParameterSchema::derive::<Profile>();
        let extra = schema.field("extra").unwrap();
        assert!(extra.rule().is_none());
    }

    #[test]
    fn test_nested_type_becomes_composite() {
        let schema = ParameterSchema::derive::<Profile>();
        let Some(FieldRule::Composite(address)) = schema.rule("address") else {
            panic!("address should be composite");
        };
        assert_eq!(address.len(), 2);
        use PrimitiveKind::*;
        assert_eq!(
            address.rule("zip"),
            Some(&union(&[String, Int, Float, Null]))
        );
    }

    #[test]
    fn test_self_referential_nesting_terminates() {
        let schema = ParameterSchema::derive::<Tree>();
        let Some(FieldRule::UnionOf(members)) = schema.rule("parent") else {
            panic!("parent should be a union");
        };
        assert!(matches!(&members[0], FieldRule::Composite(inner) if inner.is_empty()));
        assert_eq!(members[1], FieldRule::Primitive(PrimitiveKind::Null));
    }

    #[test]
    fn test_optional_json_value_stays_unconstrained() {
        let shape = <Option<Value> as DeclaredType>::type_shape();
        assert!(matches!(shape, TypeShape::Unsupported("json value")));
        assert_eq!(derive_rule(&shape, &mut Vec::new()), None);
    }

    #[test]
    fn test_union_keeps_members_that_have_a_rule() {
        let shape = TypeShape::Union(vec![
            <i64 as DeclaredType>::type_shape(),
            <Value as DeclaredType>::type_shape(),
        ]);
        use PrimitiveKind::*;
        assert_eq!(
            derive_rule(&shape, &mut Vec::new()),
            Some(union(&[Int, Float, String]))
        );

        let only_unsupported = TypeShape::Union(vec![
            <Value as DeclaredType>::type_shape(),
            <HashMap<std::string::String, i64> as DeclaredType>::type_shape(),
        ]);
        assert_eq!(derive_rule(&only_unsupported, &mut Vec::new()), None);
    }

    #[test]
    fn test_constraint_names_exposed() {
        let schema = ParameterSchema::derive::<Profile>();
        assert_eq!(schema.field("name").unwrap().constraint_names(), vec!["not_blank"]);
        assert_eq!(
            schema.field("limit").unwrap().default(),
            Some(&DefaultValue::Value(json!(10)))
        );
    }

    #[test]
    fn test_registry_caches_by_type() {
        let registry = SchemaRegistry::new();
        let first = registry.schema_for::<Profile>();
        let second = registry.schema_for::<Profile>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }
}
