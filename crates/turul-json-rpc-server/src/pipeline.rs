//! Invocation pipeline: before hook → bind → execute → after hook.

use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

use crate::binder::ParameterBinder;
use crate::error::RpcError;
use crate::events::{EventSink, HookDecision, InvocationTiming, NoopSink};
use crate::method::{CallContext, ErasedMethod, MethodDescriptor};
use crate::request::RequestEnvelope;
use crate::result::ResultValue;

/// Result of running one envelope through the pipeline
#[derive(Debug, Clone)]
pub enum InvocationOutcome {
    Success(ResultValue),
    Failure(RpcError),
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&RpcError> {
        match self {
            InvocationOutcome::Failure(error) => Some(error),
            InvocationOutcome::Success(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct InvocationPipeline {
    binder: ParameterBinder,
    sink: Arc<dyn EventSink>,
}

impl Default for InvocationPipeline {
    fn default() -> Self {
        Self::new(ParameterBinder::default(), Arc::new(NoopSink))
    }
}

impl InvocationPipeline {
    pub fn new(binder: ParameterBinder, sink: Arc<dyn EventSink>) -> Self {
        Self { binder, sink }
    }

    pub fn binder(&self) -> &ParameterBinder {
        &self.binder
    }

    /// Run one envelope against its resolved method.
    pub async fn invoke(
        &self,
        envelope: &RequestEnvelope,
        method: &dyn ErasedMethod,
    ) -> InvocationOutcome {
        let started_at = Utc::now();
        let target = method.describe(envelope.method(), &self.binder);
        let outcome = self.run(envelope, &target, method).await;
        let timing = InvocationTiming {
            started_at,
            finished_at: Utc::now(),
        };

        match &outcome {
            InvocationOutcome::Success(value) => {
                self.sink.on_success(envelope, &target, value, timing).await;
            }
            InvocationOutcome::Failure(failure) => {
                if failure.is_internal() {
                    error!("Method '{}' failed: {}", envelope.method(), failure);
                } else {
                    debug!("Method '{}' failed: {}", envelope.method(), failure);
                }
                self.sink.on_failure(envelope, &target, failure, timing).await;
            }
        }
        outcome
    }

    async fn run(
        &self,
        envelope: &RequestEnvelope,
        target: &MethodDescriptor,
        method: &dyn ErasedMethod,
    ) -> InvocationOutcome {
        match self.sink.before_invoke(envelope, target).await {
            HookDecision::Continue => {}
            HookDecision::Override(value) => {
                debug!("Before hook short-circuited '{}'", envelope.method());
                return InvocationOutcome::Success(value);
            }
            HookDecision::Fail(failure) => {
                debug!("Before hook rejected '{}': {}", envelope.method(), failure);
                return InvocationOutcome::Failure(failure);
            }
        }

        let call = match method.bind(&self.binder, envelope.params()) {
            Ok(call) => call,
            Err(failure) => return InvocationOutcome::Failure(failure),
        };
        let raw = call.raw.clone();

        let execution = AssertUnwindSafe(method.execute(call, CallContext::from(envelope)));
        let candidate = match execution.catch_unwind().await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => return InvocationOutcome::Failure(RpcError::classify(e)),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Method '{}' panicked: {}", envelope.method(), message);
                return InvocationOutcome::Failure(RpcError::internal(format!(
                    "method panicked: {}",
                    message
                )));
            }
        };

        match self.sink.after_invoke(envelope, target, &raw, &candidate).await {
            HookDecision::Continue => InvocationOutcome::Success(candidate),
            HookDecision::Override(value) => {
                debug!("After hook replaced the result of '{}'", envelope.method());
                InvocationOutcome::Success(value)
            }
            HookDecision::Fail(failure) => {
                debug!("After hook rejected '{}': {}", envelope.method(), failure);
                InvocationOutcome::Failure(failure)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
