//! Parameter binding: bag → validated, coerced parameter instance.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::coercer::{Coercer, LooseCoercer};
use crate::error::RpcError;
use crate::request::RequestParams;
use crate::schema::{DefaultValue, ParameterSchema, RpcParams, SchemaRegistry};
use crate::validator::{SchemaValidator, Validator, Violation};

/// A parameter instance together with the coerced bag it was built from.
#[derive(Debug, Clone)]
pub struct BoundParams<T> {
    pub value: T,
    pub raw: Map<String, Value>,
}

/// Binds parameter bags onto [`RpcParams`] types.
///
/// Binding is fail-fast: the first problem found, in field declaration order,
/// is the one reported.
#[derive(Clone)]
pub struct ParameterBinder {
    registry: Arc<SchemaRegistry>,
    validator: Arc<dyn Validator>,
    coercer: Arc<dyn Coercer>,
}

impl Default for ParameterBinder {
    fn default() -> Self {
        Self::new(
            Arc::new(SchemaRegistry::new()),
            Arc::new(SchemaValidator),
            Arc::new(LooseCoercer),
        )
    }
}

impl ParameterBinder {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        validator: Arc<dyn Validator>,
        coercer: Arc<dyn Coercer>,
    ) -> Self {
        Self {
            registry,
            validator,
            coercer,
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn schema_for<T: RpcParams>(&self) -> Arc<ParameterSchema> {
        self.registry.schema_for::<T>()
    }

    pub fn bind<T: RpcParams>(&self, params: &RequestParams) -> Result<BoundParams<T>, RpcError> {
        let schema = self.registry.schema_for::<T>();
        debug!(
            "Binding {} {} parameters onto {}",
            params.len(),
            if params.is_positional() { "positional" } else { "named" },
            schema.type_name()
        );
        let bag = self.collect(params, &schema);
        let raw = self.check_and_coerce(bag, &schema)?;

        match serde_json::from_value::<T>(Value::Object(raw.clone())) {
            Ok(value) => Ok(BoundParams { value, raw }),
            Err(e) => Err(locate_failure(&raw, &schema)
                .unwrap_or_else(|| RpcError::invalid_params(format!("Invalid params: {}", e)))),
        }
    }

    /// Pick the bag entries naming declared fields and fill in declared defaults.
    fn collect(&self, params: &RequestParams, schema: &ParameterSchema) -> Map<String, Value> {
        let mut bag = Map::new();
        match params {
            RequestParams::Object(named) => {
                for field in schema.fields() {
                    if let Some(value) = named.get(field.name()) {
                        bag.insert(field.name().to_string(), value.clone());
                    }
                }
                for key in named.keys().filter(|key| schema.field(key).is_none()) {
                    debug!("Ignoring unknown parameter '{}' for {}", key, schema.type_name());
                }
            }
            RequestParams::Array(positional) => {
                for (field, value) in schema.fields().iter().zip(positional) {
                    bag.insert(field.name().to_string(), value.clone());
                }
                if positional.len() > schema.len() {
                    debug!(
                        "Ignoring {} extra positional parameters for {}",
                        positional.len() - schema.len(),
                        schema.type_name()
                    );
                }
            }
        }

        for field in schema.fields() {
            if bag.contains_key(field.name()) {
                continue;
            }
            if let Some(DefaultValue::Value(default)) = field.default() {
                bag.insert(field.name().to_string(), default.clone());
            }
        }
        bag
    }

    fn check_and_coerce(
        &self,
        mut bag: Map<String, Value>,
        schema: &ParameterSchema,
    ) -> Result<Map<String, Value>, RpcError> {
        for field in schema.required_fields() {
            match bag.get(field.name()) {
                None | Some(Value::Null) => return Err(violation(Violation::empty(field.name()))),
                Some(_) => {}
            }
        }

        for field in schema.fields() {
            let (Some(value), Some(rule)) = (bag.get(field.name()), field.rule()) else {
                continue;
            };
            let violations = self
                .validator
                .validate(field.name(), value, rule, field.constraints());
            if let Some(first) = violations.into_iter().next() {
                return Err(violation(first));
            }
        }

        for field in schema.fields() {
            let Some(value) = bag.get(field.name()) else {
                continue;
            };
            let coerced = self
                .coercer
                .coerce(value, field.shape())
                .map_err(|e| RpcError::invalid_param(e.field_path(field.name()), e.message))?;
            bag.insert(field.name().to_string(), coerced);
        }
        Ok(bag)
    }
}

/// First field, in declaration order, whose value does not deserialize on its own.
fn locate_failure(raw: &Map<String, Value>, schema: &ParameterSchema) -> Option<RpcError> {
    schema.fields().iter().find_map(|field| {
        let value = raw.get(field.name())?;
        let message = field.decoder()?.decode(value).err()?;
        debug!("Parameter '{}' failed to deserialize: {}", field.name(), message);
        Some(RpcError::invalid_param(
            field.name(),
            format!("Invalid params: {}", message),
        ))
    })
}

fn violation(violation: Violation) -> RpcError {
    debug!("Parameter '{}' rejected: {}", violation.field, violation.message);
    RpcError::invalid_param(violation.field, violation.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsonRpcErrorCode;
    use crate::schema::{Constraint, DeclaredType, FieldDeclaration, NestedType, TypeShape};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Paging {
        page: u32,
        #[serde(default)]
        size: u32,
        sort: String,
    }

    impl RpcParams for Paging {
        fn declarations() -> Vec<FieldDeclaration> {
            vec![
                FieldDeclaration::of::<u32>("page").with_constraint(Constraint::Min(1.0)),
                FieldDeclaration::of::<u32>("size").with_default(DefaultValue::Implicit),
                FieldDeclaration::of::<String>("sort")
                    .with_default(DefaultValue::Value(json!("asc"))),
            ]
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
    }

    impl DeclaredType for Point {
        fn type_shape() -> TypeShape {
            TypeShape::Nested(NestedType::of::<Point>())
        }
    }

    impl RpcParams for Point {
        fn declarations() -> Vec<FieldDeclaration> {
            vec![FieldDeclaration::of::<i64>("x"), FieldDeclaration::of::<i64>("y")]
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Move {
        to: Point,
        fast: bool,
    }

    impl RpcParams for Move {
        fn declarations() -> Vec<FieldDeclaration> {
            vec![FieldDeclaration::of::<Point>("to"), FieldDeclaration::of::<bool>("fast")]
        }
    }

    #[derive(Debug, Deserialize)]
    struct Volume {
        level: u8,
        label: String,
    }

    impl RpcParams for Volume {
        fn declarations() -> Vec<FieldDeclaration> {
            vec![
                FieldDeclaration::of::<u8>("level").with_decoder::<u8>(),
                FieldDeclaration::of::<String>("label").with_decoder::<String>(),
            ]
        }
    }

    fn named(value: Value) -> RequestParams {
        match value {
            Value::Object(map) => RequestParams::Object(map),
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let bound = ParameterBinder::default()
            .bind::<Paging>(&named(json!({"page": "2"})))
            .unwrap();
        assert_eq!(
            bound.value,
            Paging {
                page: 2,
                size: 0,
                sort: "asc".to_string()
            }
        );
    }

    #[test]
    fn test_missing_required_field() {
        let error = ParameterBinder::default()
            .bind::<Paging>(&named(json!({"sort": "desc"})))
            .unwrap_err();
        assert_eq!(error.code(), JsonRpcErrorCode::InvalidParams);
        assert_eq!(error.message(), "field page cannot be empty");
        assert_eq!(error.data().unwrap()["field"], "page");
    }

    #[test]
    fn test_first_violation_wins() {
        let error = ParameterBinder::default()
            .bind::<Paging>(&named(json!({"page": 0, "sort": true})))
            .unwrap_err();
        assert_eq!(error.data().unwrap()["field"], "page");
        assert_eq!(error.message(), "This value should be 1 or more.");
    }

    #[test]
    fn test_coercion_failure_is_reported_per_field() {
        let error = ParameterBinder::default()
            .bind::<Paging>(&named(json!({"page": "first"})))
            .unwrap_err();
        assert_eq!(error.code(), JsonRpcErrorCode::InvalidParams);
        assert_eq!(error.data().unwrap()["field"], "page");
    }

    #[test]
    fn test_positional_params_bind_in_declaration_order() {
        let bound = ParameterBinder::default()
            .bind::<Paging>(&RequestParams::Array(vec![json!(3), json!(50), json!("desc")]))
            .unwrap();
        assert_eq!(bound.value.page, 3);
        assert_eq!(bound.value.size, 50);
        assert_eq!(bound.value.sort, "desc");
    }

    #[test]
    fn test_nested_composite() {
        let binder = ParameterBinder::default();
        let bound = binder
            .bind::<Move>(&named(json!({"to": {"x": "1", "y": 2.0}, "fast": "1"})))
            .unwrap();
        assert_eq!(bound.value.to, Point { x: 1, y: 2 });
        assert!(bound.value.fast);

        let error = binder
            .bind::<Move>(&named(json!({"to": {"x": 1}, "fast": true})))
            .unwrap_err();
        assert_eq!(error.message(), "field to.y cannot be empty");
        assert_eq!(error.data().unwrap()["field"], "to.y");
    }

    #[test]
    fn test_deserialization_failure_names_the_field() {
        let binder = ParameterBinder::default();
        let bound = binder
            .bind::<Volume>(&named(json!({"level": "7", "label": "low"})))
            .unwrap();
        assert_eq!(bound.value.level, 7);
        assert_eq!(bound.value.label, "low");

        // An int, but out of range for u8
        let error = binder
            .bind::<Volume>(&named(json!({"level": 300, "label": "loud"})))
            .unwrap_err();
        assert_eq!(error.code(), JsonRpcErrorCode::InvalidParams);
        assert_eq!(error.data().unwrap()["field"], "level");
        assert!(error.message().starts_with("Invalid params: invalid value: integer `300`"));
    }
}
