//! Checks over observed runtime behavior

use crate::observer::RuntimeContext;

/// Holds once an invocation returned at all, whether with an output or a
/// thrown error.
pub(super) fn resolver_callable(context: &RuntimeContext) -> bool {
    context.callable
}

/// An observed error must carry a declared code. No error passes.
pub(super) fn failure_code_declared(context: &RuntimeContext) -> bool {
    match &context.error {
        None => true,
        Some(error) => error
            .code
            .as_deref()
            .is_some_and(|code| context.metadata.declares_failure(code)),
    }
}

/// Invoking with `{}` must throw, whatever the resolver returned instead.
pub(super) fn rejects_missing_required_input(context: &RuntimeContext) -> bool {
    context.threw
}

/// Retry evidence stays within the declared limit for the observed code.
/// No error, or a code with no declared limit, leaves nothing to violate.
pub(super) fn retry_within_declared_limit(context: &RuntimeContext) -> bool {
    match (context.declared_retry_limit(), context.retry) {
        (Some(limit), Some(evidence)) => evidence.count() <= limit,
        _ => true,
    }
}

pub(super) fn output_is_object(context: &RuntimeContext) -> bool {
    context.output.as_ref().is_some_and(|output| output.is_object())
}

/// Every declared output name is a key of the actual output. Values are not
/// checked.
pub(super) fn output_fields_declared(context: &RuntimeContext) -> bool {
    let Some(output) = context.output.as_ref().and_then(|output| output.as_object()) else {
        return false;
    };
    context
        .metadata
        .declared_output_names()
        .into_iter()
        .all(|name| output.contains_key(name))
}

/// At least two outputs were recorded and all serialize identically.
pub(super) fn deterministic_output(context: &RuntimeContext) -> bool {
    match context.serialized_outputs.split_first() {
        Some((first, rest)) if !rest.is_empty() => rest.iter().all(|other| other == first),
        _ => false,
    }
}

/// The resolver's state fingerprint is unchanged across the observation.
/// Resolvers that expose no fingerprint have nothing to compare.
pub(super) fn no_global_mutation(context: &RuntimeContext) -> bool {
    context.state_before == context.state_after
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{InvocationPolicy, RetryEvidence, RuntimeObserver};
    use crate::resolver::{Resolver, ResolverError};
    use crate::target::ResolverContract;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Returns a fixed value or throws a fixed error.
    struct Scripted {
        result: Result<Value, ResolverError>,
    }

    #[async_trait]
    impl Resolver for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn invoke(&self, _input: Value) -> Result<Value, ResolverError> {
            self.result.clone()
        }
    }

    /// Returns a value that changes on every call, the way a clock would.
    struct Ticking {
        tick: AtomicU64,
    }

    #[async_trait]
    impl Resolver for Ticking {
        fn name(&self) -> &str {
            "ticking"
        }

        async fn invoke(&self, _input: Value) -> Result<Value, ResolverError> {
            let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
            let tick = self.tick.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "generatedAt": now, "tick": tick }))
        }

        fn state_fingerprint(&self) -> Option<Value> {
            Some(json!(self.tick.load(Ordering::SeqCst)))
        }
    }

    fn metadata() -> ResolverContract {
        ResolverContract::new(json!({
            "outputs": [ { "name": "sum", "type": "number" } ],
            "failures": [ { "code": "E_INPUT", "retries": 0 }, { "code": "E_UPSTREAM", "retries": 2 } ]
        }))
    }

    async fn observe(result: Result<Value, ResolverError>, policy: InvocationPolicy) -> RuntimeContext {
        RuntimeObserver::new(policy)
            .observe_with(&Scripted { result }, metadata())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_callable_requires_a_settled_invocation() {
        let thrown = observe(
            Err(ResolverError::with_code("E_INPUT", "sum requires a")),
            InvocationPolicy::Once,
        )
        .await;
        assert!(resolver_callable(&thrown));

        let mut never_invoked = thrown;
        never_invoked.callable = false;
        never_invoked.invocations = 0;
        assert!(!resolver_callable(&never_invoked));
    }

    #[tokio::test]
    async fn test_plausible_output_does_not_count_as_rejection() {
        let context = observe(Ok(json!({ "sum": 0 })), InvocationPolicy::Once).await;
        assert!(resolver_callable(&context));
        assert!(!rejects_missing_required_input(&context));
        assert!(output_is_object(&context));
        assert!(output_fields_declared(&context));
        assert!(failure_code_declared(&context));
        assert!(retry_within_declared_limit(&context));
    }

    #[tokio::test]
    async fn test_declared_rejection() {
        let context = observe(
            Err(ResolverError::with_code("E_INPUT", "missing sum operands")),
            InvocationPolicy::Once,
        )
        .await;
        assert!(rejects_missing_required_input(&context));
        assert!(failure_code_declared(&context));
        assert!(retry_within_declared_limit(&context));
        assert!(!output_is_object(&context));
        assert!(!output_fields_declared(&context));
    }

    #[tokio::test]
    async fn test_undeclared_code() {
        let context = observe(
            Err(ResolverError::with_code("E_SURPRISE", "boom")),
            InvocationPolicy::Once,
        )
        .await;
        assert!(!failure_code_declared(&context));
        // nothing declared for the code, so no bound to violate
        assert!(retry_within_declared_limit(&context));

        let uncoded = observe(Err(ResolverError::new("boom")), InvocationPolicy::Once).await;
        assert!(!failure_code_declared(&uncoded));
        assert!(retry_within_declared_limit(&uncoded));
    }

    #[tokio::test]
    async fn test_reported_retries_over_limit() {
        let context = observe(
            Err(ResolverError::with_code("E_UPSTREAM", "gave up").with_attempts(5)),
            InvocationPolicy::Once,
        )
        .await;
        assert_eq!(context.retry, Some(RetryEvidence::Reported(5)));
        assert!(!retry_within_declared_limit(&context));

        let inferred = observe(
            Err(ResolverError::with_code("E_UPSTREAM", "gave up")),
            InvocationPolicy::Once,
        )
        .await;
        assert!(retry_within_declared_limit(&inferred));
    }

    #[tokio::test]
    async fn test_output_shape() {
        let array = observe(Ok(json!([1, 2])), InvocationPolicy::Once).await;
        assert!(!output_is_object(&array));
        let null = observe(Ok(Value::Null), InvocationPolicy::Once).await;
        assert!(!output_is_object(&null));
        let missing_field = observe(Ok(json!({ "total": 1 })), InvocationPolicy::Once).await;
        assert!(output_is_object(&missing_field));
        assert!(!output_fields_declared(&missing_field));
    }

    #[tokio::test]
    async fn test_pure_resolver_is_deterministic() {
        let context = observe(Ok(json!({ "sum": 4 })), InvocationPolicy::Repeated(3)).await;
        assert_eq!(context.serialized_outputs.len(), 3);
        assert!(deterministic_output(&context));
        assert!(no_global_mutation(&context));
    }

    #[tokio::test]
    async fn test_single_output_is_not_evidence_of_determinism() {
        let context = observe(Ok(json!({ "sum": 4 })), InvocationPolicy::Once).await;
        assert!(!deterministic_output(&context));
    }

    #[tokio::test]
    async fn test_time_dependent_resolver_fails_determinism_and_mutation() {
        let resolver = Ticking {
            tick: AtomicU64::new(0),
        };
        let context = RuntimeObserver::new(InvocationPolicy::Repeated(3))
            .observe(&resolver)
            .await
            .unwrap();
        assert!(!deterministic_output(&context));
        assert!(!no_global_mutation(&context));
    }
}
