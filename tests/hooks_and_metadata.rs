//! Invocation Hook and Method Metadata Tests
//!
//! Event sinks steering and observing calls through the dispatcher, trait
//! based methods, and the read-only `describe` view.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use turul_json_rpc_server::prelude::*;
use turul_json_rpc_server::{Constraint, MethodDescriptor};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("turul_json_rpc_server=debug")
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Deserialize, RpcParams)]
struct Transfer {
    #[param(description = "Source account")]
    from: String,
    #[param(description = "Target account")]
    to: String,
    #[param(min = 0.01, description = "Amount to move")]
    amount: f64,
    #[param(default = "AUD")]
    currency: String,
    memo: Option<String>,
}

/// Trait based method
struct TransferMethod;

#[async_trait]
impl RpcMethod for TransferMethod {
    type Params = Transfer;
    type Output = Value;

    async fn call(&self, params: Transfer, ctx: CallContext) -> Result<Value, BoxError> {
        tracing::info!("transfer {} -> {}", params.from, params.to);
        Ok(json!({
            "method": ctx.method,
            "moved": params.amount,
            "currency": params.currency,
            "memo": params.memo,
        }))
    }

    fn description(&self) -> Option<&'static str> {
        Some("Move funds between accounts")
    }
}

/// Denies `admin.*`, answers `cached` itself, stamps `stamped` results and
/// records every completion.
#[derive(Default)]
struct AuditSink {
    completions: Mutex<Vec<String>>,
    bound: Mutex<Vec<Map<String, Value>>>,
}

#[async_trait]
impl EventSink for AuditSink {
    async fn before_invoke(
        &self,
        envelope: &RequestEnvelope,
        target: &MethodDescriptor,
    ) -> HookDecision {
        if envelope.method().starts_with("admin.") {
            return HookDecision::Fail(RpcError::access_denied(format!(
                "'{}' requires an administrator",
                target.name
            )));
        }
        if envelope.method() == "cached" {
            return HookDecision::Override("from cache".to_result_value());
        }
        HookDecision::Continue
    }

    async fn after_invoke(
        &self,
        envelope: &RequestEnvelope,
        _target: &MethodDescriptor,
        params: &Map<String, Value>,
        _result: &ResultValue,
    ) -> HookDecision {
        self.bound.lock().push(params.clone());
        match envelope.method() {
            "stamped" => {
                HookDecision::Override(ResultValue::map([("stamped", ResultValue::Bool(true))]))
            }
            // Only reached if the refund itself succeeded
            "refund" => HookDecision::Fail(RpcError::application(9, "audit rewrote the refund")),
            _ => HookDecision::Continue,
        }
    }

    async fn on_success(
        &self,
        _envelope: &RequestEnvelope,
        target: &MethodDescriptor,
        _result: &ResultValue,
        timing: InvocationTiming,
    ) {
        assert!(timing.finished_at >= timing.started_at);
        self.completions.lock().push(format!("ok:{}", target.name));
    }

    async fn on_failure(
        &self,
        _envelope: &RequestEnvelope,
        target: &MethodDescriptor,
        error: &RpcError,
        _timing: InvocationTiming,
    ) {
        self.completions
            .lock()
            .push(format!("err:{}:{}", target.name, error.code().code()));
    }
}

fn dispatcher(sink: Arc<AuditSink>) -> JsonRpcDispatcher {
    JsonRpcDispatcher::builder()
        .method("transfer", TransferMethod)
        .function("admin.reset", |_: NoParams, _ctx: CallContext| async move {
            Ok::<_, BoxError>("reset")
        })
        .function("cached", |_: NoParams, _ctx: CallContext| async move {
            Ok::<_, BoxError>("computed")
        })
        .function("stamped", |_: NoParams, _ctx: CallContext| async move {
            Ok::<_, BoxError>(1)
        })
        .function("refund", |_: NoParams, _ctx: CallContext| async move {
            Err::<(), BoxError>(RpcError::application(4100, "Refund window closed").into())
        })
        .event_sink(sink)
        .build()
}

async fn call(dispatcher: &JsonRpcDispatcher, method: &str, params: Value) -> JsonRpcMessage {
    let body = dispatcher
        .handle_value(json!({"jsonrpc": "2.0", "method": method, "params": params, "id": 1}))
        .await
        .unwrap();
    body.messages()[0].clone()
}

#[tokio::test]
async fn test_before_hook_denies_access() {
    init_tracing();
    let sink = Arc::new(AuditSink::default());
    let dispatcher = dispatcher(sink.clone());

    let message = call(&dispatcher, "admin.reset", json!({})).await;
    let error = message.error_object().unwrap();
    assert_eq!(error.code, ACCESS_DENIED);
    assert_eq!(error.message, "'admin.reset' requires an administrator");

    // Denied calls never bind, so the after hook is skipped
    assert!(sink.bound.lock().is_empty());
    assert_eq!(*sink.completions.lock(), vec!["err:admin.reset:-32001"]);
}

#[tokio::test]
async fn test_before_hook_can_answer_instead_of_the_method() {
    let sink = Arc::new(AuditSink::default());
    let message = call(&dispatcher(sink.clone()), "cached", json!({})).await;
    assert_eq!(message.result(), Some(&json!("from cache")));
    assert_eq!(*sink.completions.lock(), vec!["ok:cached"]);
}

#[tokio::test]
async fn test_after_hook_sees_bound_params_and_can_replace_result() {
    let sink = Arc::new(AuditSink::default());
    let dispatcher = dispatcher(sink.clone());

    let message = call(&dispatcher, "stamped", json!({})).await;
    assert_eq!(message.result(), Some(&json!({"stamped": true})));

    let message = call(
        &dispatcher,
        "transfer",
        json!({"from": "a", "to": "b", "amount": "2.5", "ignored": true}),
    )
    .await;
    assert_eq!(
        message.result(),
        Some(&json!({"method": "transfer", "moved": 2.5, "currency": "AUD", "memo": null}))
    );

    let bound = sink.bound.lock();
    let transfer = bound.last().unwrap();
    // Coerced, defaulted, and without unknown keys
    assert_eq!(transfer.get("amount"), Some(&json!(2.5)));
    assert_eq!(transfer.get("currency"), Some(&json!("AUD")));
    assert!(transfer.get("ignored").is_none());
}

#[tokio::test]
async fn test_failed_execution_bypasses_after_hook() {
    let sink = Arc::new(AuditSink::default());
    let message = call(&dispatcher(sink.clone()), "refund", json!({})).await;

    let error = message.error_object().unwrap();
    assert_eq!(error.code, 4100);
    assert_eq!(error.message, "Refund window closed");
    assert!(sink.bound.lock().is_empty());
    assert_eq!(*sink.completions.lock(), vec!["err:refund:4100"]);
}

#[tokio::test]
async fn test_failures_are_reported_to_the_sink() {
    let sink = Arc::new(AuditSink::default());
    let message = call(
        &dispatcher(sink.clone()),
        "transfer",
        json!({"from": "a", "to": "b", "amount": 0}),
    )
    .await;

    assert_eq!(message.error_object().unwrap().code, INVALID_PARAMS);
    assert_eq!(*sink.completions.lock(), vec!["err:transfer:-32602"]);
}

#[test]
fn test_describe_exposes_parameter_metadata() {
    let dispatcher = dispatcher(Arc::new(AuditSink::default()));
    assert_eq!(
        dispatcher.registered_methods(),
        vec!["admin.reset", "cached", "refund", "stamped", "transfer"]
    );

    let descriptor = dispatcher.describe("transfer").unwrap();
    assert_eq!(descriptor.name, "transfer");
    assert_eq!(descriptor.description, Some("Move funds between accounts"));

    let names: Vec<_> = descriptor.params.iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["from", "to", "amount", "currency", "memo"]);

    let amount = &descriptor.params[2];
    assert!(amount.required);
    assert_eq!(amount.description, Some("Amount to move"));
    assert_eq!(amount.constraints, vec![Constraint::Min(0.01)]);

    let currency = &descriptor.params[3];
    assert!(!currency.required);
    assert_eq!(currency.default, Some(json!("AUD")));

    assert!(!descriptor.params[4].required);

    let wire = serde_json::to_value(&descriptor).unwrap();
    assert_eq!(wire["params"][0]["type"], "alloc::string::String");
    assert_eq!(wire["params"][2]["constraints"][0], json!({"constraint": "min", "value": 0.01}));

    assert!(dispatcher.describe("unknown").is_none());
}
