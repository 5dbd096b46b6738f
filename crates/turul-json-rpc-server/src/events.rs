//! Invocation events
//!
//! An [`EventSink`] observes every invocation the pipeline runs. The two
//! hooks around execution can steer it by returning a [`HookDecision`]; the
//! completion callbacks are observation only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::RpcError;
use crate::method::MethodDescriptor;
use crate::request::RequestEnvelope;
use crate::result::ResultValue;

/// What a hook wants the pipeline to do next
#[derive(Debug, Clone, Default)]
pub enum HookDecision {
    #[default]
    Continue,
    /// Finish with this success value instead
    Override(ResultValue),
    /// Finish with this failure instead
    Fail(RpcError),
}

/// Start and end of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationTiming {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl InvocationTiming {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    /// Before binding. `Override` and `Fail` skip binding, execution and the
    /// after hook.
    async fn before_invoke(
        &self,
        _envelope: &RequestEnvelope,
        _target: &MethodDescriptor,
    ) -> HookDecision {
        HookDecision::Continue
    }

    /// After a successful execution, with the coerced parameters the method
    /// was bound from and the candidate result. Failed executions never
    /// reach this hook.
    async fn after_invoke(
        &self,
        _envelope: &RequestEnvelope,
        _target: &MethodDescriptor,
        _params: &Map<String, Value>,
        _result: &ResultValue,
    ) -> HookDecision {
        HookDecision::Continue
    }

    async fn on_success(
        &self,
        _envelope: &RequestEnvelope,
        _target: &MethodDescriptor,
        _result: &ResultValue,
        _timing: InvocationTiming,
    ) {
    }

    async fn on_failure(
        &self,
        _envelope: &RequestEnvelope,
        _target: &MethodDescriptor,
        _error: &RpcError,
        _timing: InvocationTiming,
    ) {
    }
}

/// Sink that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {}
