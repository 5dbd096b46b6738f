//! Callable methods and their registration form.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::binder::ParameterBinder;
use crate::error::{BoxError, RpcError};
use crate::request::{RequestEnvelope, RequestParams};
use crate::result::{ResultValue, ToResultValue};
use crate::schema::{Constraint, ParameterSchema, RpcParams};
use crate::types::RequestId;

/// What a method knows about the call it is serving
#[derive(Debug, Clone, PartialEq)]
pub struct CallContext {
    pub method: String,
    /// Normalized request id, `None` for notifications
    pub id: Option<RequestId>,
}

impl CallContext {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

impl From<&RequestEnvelope> for CallContext {
    fn from(envelope: &RequestEnvelope) -> Self {
        Self {
            method: envelope.method().to_string(),
            id: envelope.id().cloned(),
        }
    }
}

/// A JSON-RPC method with a typed parameter object
///
/// Returning an [`RpcError`] (boxed) reports that failure as-is; any other
/// error is reported as an internal error.
#[async_trait]
pub trait RpcMethod: Send + Sync + 'static {
    type Params: RpcParams;
    type Output: ToResultValue + Send;

    async fn call(&self, params: Self::Params, ctx: CallContext) -> Result<Self::Output, BoxError>;

    fn description(&self) -> Option<&'static str> {
        None
    }
}

/// A closure-backed method
pub struct FunctionMethod<P, O, F> {
    handler: F,
    description: Option<&'static str>,
    _marker: PhantomData<fn(P) -> O>,
}

impl<P, O, F, Fut> FunctionMethod<P, O, F>
where
    P: RpcParams,
    O: ToResultValue + Send + 'static,
    F: Fn(P, CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, BoxError>> + Send + 'static,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            description: None,
            _marker: PhantomData,
        }
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

#[async_trait]
impl<P, O, F, Fut> RpcMethod for FunctionMethod<P, O, F>
where
    P: RpcParams,
    O: ToResultValue + Send + 'static,
    F: Fn(P, CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, BoxError>> + Send + 'static,
{
    type Params = P;
    type Output = O;

    async fn call(&self, params: P, ctx: CallContext) -> Result<O, BoxError> {
        (self.handler)(params, ctx).await
    }

    fn description(&self) -> Option<&'static str> {
        self.description
    }
}

/// Read-only view of one declared parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInfo {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub type_name: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

/// Read-only method metadata for documentation tooling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    pub params_type: &'static str,
    pub params: Vec<ParameterInfo>,
}

impl MethodDescriptor {
    pub fn new(name: &str, description: Option<&'static str>, schema: &ParameterSchema) -> Self {
        let params = schema
            .fields()
            .iter()
            .map(|field| ParameterInfo {
                name: field.name(),
                type_name: field.type_name(),
                required: field.is_required(),
                default: field.default().and_then(|d| d.as_value()).cloned(),
                description: field.description(),
                constraints: field.constraints().to_vec(),
            })
            .collect();
        Self {
            name: name.to_string(),
            description,
            params_type: schema.type_name(),
            params,
        }
    }
}

/// Parameters bound for one call, type-erased until execution
pub struct BoundCall {
    params: Box<dyn Any + Send>,
    pub raw: Map<String, Value>,
}

/// Object-safe form of [`RpcMethod`] stored by the dispatcher.
pub trait ErasedMethod: Send + Sync {
    fn describe(&self, name: &str, binder: &ParameterBinder) -> MethodDescriptor;

    fn bind(&self, binder: &ParameterBinder, params: &RequestParams) -> Result<BoundCall, RpcError>;

    fn execute(&self, call: BoundCall, ctx: CallContext) -> BoxFuture<'_, Result<ResultValue, BoxError>>;
}

pub(crate) struct MethodAdapter<M>(pub(crate) M);

impl<M: RpcMethod> ErasedMethod for MethodAdapter<M> {
    fn describe(&self, name: &str, binder: &ParameterBinder) -> MethodDescriptor {
        MethodDescriptor::new(name, self.0.description(), &binder.schema_for::<M::Params>())
    }

    fn bind(&self, binder: &ParameterBinder, params: &RequestParams) -> Result<BoundCall, RpcError> {
        let bound = binder.bind::<M::Params>(params)?;
        Ok(BoundCall {
            params: Box::new(bound.value),
            raw: bound.raw,
        })
    }

    fn execute(&self, call: BoundCall, ctx: CallContext) -> BoxFuture<'_, Result<ResultValue, BoxError>> {
        Box::pin(async move {
            let params = call.params.downcast::<M::Params>().map_err(|_| {
                RpcError::internal(format!(
                    "bound parameters are not {}",
                    std::any::type_name::<M::Params>()
                ))
            })?;
            let output = self.0.call(*params, ctx).await?;
            Ok(output.to_result_value())
        })
    }
}

pub(crate) fn erase<M: RpcMethod>(method: M) -> Arc<dyn ErasedMethod> {
    Arc::new(MethodAdapter(method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DefaultValue, FieldDeclaration};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Greet {
        name: String,
        greeting: String,
    }

    impl RpcParams for Greet {
        fn declarations() -> Vec<FieldDeclaration> {
            vec![
                FieldDeclaration::of::<String>("name").with_description("Who to greet"),
                FieldDeclaration::of::<String>("greeting")
                    .with_default(DefaultValue::Value(json!("Hello"))),
            ]
        }
    }

    fn greet_method() -> Arc<dyn ErasedMethod> {
        erase(
            FunctionMethod::new(|p: Greet, _ctx: CallContext| async move {
                Ok::<_, BoxError>(format!("{}, {}!", p.greeting, p.name))
            })
            .with_description("Say hello"),
        )
    }

    #[tokio::test]
    async fn test_bind_and_execute() {
        let binder = ParameterBinder::default();
        let method = greet_method();
        let params = RequestParams::Object(
            json!({"name": "Ada"}).as_object().cloned().unwrap_or_default(),
        );
        let call = method.bind(&binder, &params).unwrap();
        assert_eq!(call.raw["greeting"], "Hello");

        let ctx = CallContext {
            method: "greet".to_string(),
            id: Some(RequestId::Number(1)),
        };
        let result = method.execute(call, ctx).await.unwrap();
        assert!(matches!(result, ResultValue::String(s) if s == "Hello, Ada!"));
    }

    #[test]
    fn test_descriptor() {
        let descriptor = greet_method().describe("greet", &ParameterBinder::default());
        assert_eq!(descriptor.description, Some("Say hello"));
        assert_eq!(descriptor.params.len(), 2);
        assert!(descriptor.params[0].required);
        assert_eq!(descriptor.params[1].default, Some(json!("Hello")));

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["params"][0]["description"], "Who to greet");
        assert_eq!(json["params"][0]["type"], "alloc::string::String");
    }
}
