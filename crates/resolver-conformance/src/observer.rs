//! Runtime observation: invoke a resolver under controlled conditions and
//! keep the evidence for runtime assertions.

use crate::config::ConformanceConfig;
use crate::error::{ConformanceError, ConformanceResult};
use crate::resolver::{declared_metadata, Resolver, ResolverError};
use crate::target::ResolverContract;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// How many times a suite invokes the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationPolicy {
    Once,
    Repeated(usize),
}

impl InvocationPolicy {
    /// Repeated for the configured determinism suite id (exact match), once
    /// for everything else.
    pub fn for_suite(test_id: Option<&str>, config: &ConformanceConfig) -> Self {
        if test_id == Some(config.determinism_suite_id.as_str()) {
            Self::Repeated(config.determinism_repetitions.max(2))
        } else {
            Self::Once
        }
    }

    pub fn repetitions(&self) -> usize {
        match self {
            Self::Once => 1,
            Self::Repeated(n) => *n,
        }
    }
}

/// Where a retry count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "count", rename_all = "snake_case")]
pub enum RetryEvidence {
    /// The resolver's error reported how many attempts it made
    Reported(u32),
    /// Nothing was reported; the declared limit stands in as an upper bound
    InferredFromDeclaration(u32),
}

impl RetryEvidence {
    pub fn count(&self) -> u32 {
        match self {
            Self::Reported(n) | Self::InferredFromDeclaration(n) => *n,
        }
    }

    pub fn is_inferred(&self) -> bool {
        matches!(self, Self::InferredFromDeclaration(_))
    }
}

/// Evidence from one observation cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeContext {
    pub resolver_name: String,
    pub metadata: ResolverContract,
    pub policy: InvocationPolicy,
    /// Set once an invocation has returned, with an output or an error
    pub callable: bool,
    /// Invocations actually made (stops at the first error)
    pub invocations: usize,
    pub threw: bool,
    pub error: Option<ResolverError>,
    /// Output of the last successful invocation
    pub output: Option<Value>,
    pub outputs: Vec<Value>,
    /// Serialized form of each output, for determinism comparison
    pub serialized_outputs: Vec<String>,
    pub retry: Option<RetryEvidence>,
    pub state_before: Option<Value>,
    pub state_after: Option<Value>,
}

impl RuntimeContext {
    fn new(resolver_name: &str, metadata: ResolverContract, policy: InvocationPolicy) -> Self {
        Self {
            resolver_name: resolver_name.to_string(),
            metadata,
            policy,
            callable: false,
            invocations: 0,
            threw: false,
            error: None,
            output: None,
            outputs: Vec::new(),
            serialized_outputs: Vec::new(),
            retry: None,
            state_before: None,
            state_after: None,
        }
    }

    /// The declared retry limit for the observed error's code, if any.
    pub fn declared_retry_limit(&self) -> Option<u32> {
        let code = self.error.as_ref()?.code.as_deref()?;
        self.metadata
            .declared_failure(code)
            .map(|failure| failure.retries)
    }

    fn record_output(&mut self, output: Value) -> ConformanceResult<()> {
        let serialized = serde_json::to_string(&output).map_err(|err| {
            ConformanceError::Observation(format!(
                "could not serialize output of invocation {}: {}",
                self.invocations, err
            ))
        })?;
        self.serialized_outputs.push(serialized);
        self.outputs.push(output.clone());
        self.output = Some(output);
        Ok(())
    }

    fn record_error(&mut self, error: ResolverError) {
        self.threw = true;
        self.retry = error.code.as_deref().and_then(|code| {
            self.metadata.declared_failure(code).map(|declared| match error.attempts {
                Some(attempts) => RetryEvidence::Reported(attempts),
                None => RetryEvidence::InferredFromDeclaration(declared.retries),
            })
        });
        self.error = Some(error);
    }
}

/// Invokes a resolver with an empty input and records what happens.
#[derive(Debug, Clone)]
pub struct RuntimeObserver {
    policy: InvocationPolicy,
}

impl RuntimeObserver {
    pub fn new(policy: InvocationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> InvocationPolicy {
        self.policy
    }

    /// Observe against the resolver's own declared metadata.
    pub async fn observe(&self, resolver: &dyn Resolver) -> ConformanceResult<RuntimeContext> {
        let metadata = declared_metadata(resolver).await;
        self.observe_with(resolver, metadata).await
    }

    /// Observe against explicitly supplied metadata.
    pub async fn observe_with(
        &self,
        resolver: &dyn Resolver,
        metadata: ResolverContract,
    ) -> ConformanceResult<RuntimeContext> {
        let mut context = RuntimeContext::new(resolver.name(), metadata, self.policy);
        context.state_before = resolver.state_fingerprint();

        for round in 1..=self.policy.repetitions() {
            tracing::debug!(resolver = resolver.name(), round, "invoking resolver with empty input");
            context.invocations = round;

            let settled = resolver.invoke(json!({})).await;
            context.callable = true;

            match settled {
                Ok(output) => context.record_output(output)?,
                Err(error) => {
                    tracing::debug!(
                        resolver = resolver.name(),
                        code = error.code.as_deref().unwrap_or("-"),
                        "resolver threw: {}",
                        error
                    );
                    context.record_error(error);
                    break;
                }
            }
        }

        context.state_after = resolver.state_fingerprint();
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        calls: AtomicUsize,
        fail_on: Option<usize>,
        attempts: Option<u32>,
    }

    impl Counter {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
                attempts: None,
            }
        }
    }

    #[async_trait]
    impl Resolver for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        async fn invoke(&self, _input: Value) -> Result<Value, ResolverError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(call) == self.fail_on {
                let err = ResolverError::with_code("E_LIMIT", "limit reached");
                return Err(match self.attempts {
                    Some(n) => err.with_attempts(n),
                    None => err,
                });
            }
            Ok(json!({ "call": call }))
        }

        async fn declaration(&self) -> Option<Value> {
            Some(json!({ "failures": [ { "code": "E_LIMIT", "retries": 4 } ] }))
        }

        fn state_fingerprint(&self) -> Option<Value> {
            Some(json!(self.calls.load(Ordering::SeqCst)))
        }
    }

    #[test]
    fn test_policy_selection_is_exact() {
        let config = ConformanceConfig::default();
        assert_eq!(
            InvocationPolicy::for_suite(Some("R-011-determinism"), &config),
            InvocationPolicy::Repeated(3)
        );
        assert_eq!(
            InvocationPolicy::for_suite(Some("R-011-determinism-extra"), &config),
            InvocationPolicy::Once
        );
        assert_eq!(InvocationPolicy::for_suite(None, &config), InvocationPolicy::Once);
    }

    #[test]
    fn test_policy_never_repeats_fewer_than_twice() {
        let config = ConformanceConfig {
            determinism_repetitions: 1,
            ..Default::default()
        };
        assert_eq!(
            InvocationPolicy::for_suite(Some("R-011-determinism"), &config).repetitions(),
            2
        );
    }

    #[tokio::test]
    async fn test_single_invocation() {
        let resolver = Counter::new(None);
        let context = RuntimeObserver::new(InvocationPolicy::Once)
            .observe(&resolver)
            .await
            .unwrap();
        assert!(context.callable);
        assert!(!context.threw);
        assert_eq!(context.invocations, 1);
        assert_eq!(context.output, Some(json!({ "call": 1 })));
        assert_eq!(context.outputs.len(), 1);
        assert_eq!(context.state_before, Some(json!(0)));
        assert_eq!(context.state_after, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_repeated_invocation_collects_every_output() {
        let resolver = Counter::new(None);
        let context = RuntimeObserver::new(InvocationPolicy::Repeated(3))
            .observe(&resolver)
            .await
            .unwrap();
        assert_eq!(context.invocations, 3);
        assert_eq!(context.serialized_outputs.len(), 3);
        assert_eq!(context.output, Some(json!({ "call": 3 })));
    }

    #[tokio::test]
    async fn test_first_error_stops_repetition() {
        let resolver = Counter::new(Some(2));
        let context = RuntimeObserver::new(InvocationPolicy::Repeated(3))
            .observe(&resolver)
            .await
            .unwrap();
        assert!(context.threw);
        assert!(context.callable);
        assert_eq!(context.invocations, 2);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
        assert_eq!(context.outputs.len(), 1);
        assert_eq!(context.retry, Some(RetryEvidence::InferredFromDeclaration(4)));
        assert_eq!(context.declared_retry_limit(), Some(4));
    }

    #[tokio::test]
    async fn test_reported_attempts_take_precedence() {
        let mut resolver = Counter::new(Some(1));
        resolver.attempts = Some(2);
        let context = RuntimeObserver::new(InvocationPolicy::Once)
            .observe(&resolver)
            .await
            .unwrap();
        assert_eq!(context.retry, Some(RetryEvidence::Reported(2)));
        assert!(!context.retry.unwrap().is_inferred());
    }

    #[tokio::test]
    async fn test_undeclared_code_leaves_retry_empty() {
        let resolver = Counter::new(Some(1));
        let context = RuntimeObserver::new(InvocationPolicy::Once)
            .observe_with(&resolver, ResolverContract::new(json!({ "failures": [] })))
            .await
            .unwrap();
        assert!(context.threw);
        assert!(context.retry.is_none());
        assert!(context.declared_retry_limit().is_none());
    }
}
