//! Applies a suite's assertions to its target

use crate::registry::AssertionRegistry;
use crate::spec::{Assertion, Severity, TestSpec};
use crate::target::Target;
use serde::{Deserialize, Serialize};

/// One failed assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub id: String,
    pub severity: Severity,
    pub message: String,
}

impl Failure {
    fn new(assertion: &Assertion, message: impl Into<String>) -> Self {
        Self {
            id: assertion.id.clone(),
            severity: assertion.severity,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.id, self.message)
    }
}

/// Outcome of evaluating one suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub ok: bool,
    pub message: String,
    pub failures: Vec<Failure>,
}

impl Verdict {
    fn from_failures(failures: Vec<Failure>) -> Self {
        if failures.is_empty() {
            return Self {
                ok: true,
                message: "All assertions passed".to_string(),
                failures,
            };
        }
        let message = failures
            .iter()
            .map(Failure::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            ok: false,
            message,
            failures,
        }
    }

    /// Failures recorded with fatal severity.
    pub fn fatal_failures(&self) -> impl Iterator<Item = &Failure> {
        self.failures
            .iter()
            .filter(|failure| failure.severity == Severity::Fatal)
    }
}

/// Evaluates every assertion of a [`TestSpec`] against a [`Target`].
///
/// Assertions are independent: each one is checked in declaration order and
/// a failure, an unknown kind or an authoring error never stops the rest.
/// Severity is carried through to the report but does not change `ok`.
#[derive(Debug, Clone, Copy)]
pub struct AssertionEvaluator {
    registry: &'static AssertionRegistry,
}

impl AssertionEvaluator {
    pub fn new() -> Self {
        Self {
            registry: AssertionRegistry::global(),
        }
    }

    pub fn evaluate(&self, spec: &TestSpec, target: &Target) -> Verdict {
        if spec.assertions.is_empty() {
            return Verdict {
                ok: true,
                message: "No assertions defined".to_string(),
                failures: Vec::new(),
            };
        }

        let failures: Vec<Failure> = spec
            .assertions
            .iter()
            .filter_map(|assertion| self.check(assertion, target))
            .collect();

        Verdict::from_failures(failures)
    }

    fn check(&self, assertion: &Assertion, target: &Target) -> Option<Failure> {
        let Some(kind) = self.registry.lookup(&assertion.kind) else {
            tracing::warn!(id = %assertion.id, kind = %assertion.kind, "unknown assertion type");
            return Some(Failure::new(
                assertion,
                format!("Unknown assertion type: {}", assertion.kind),
            ));
        };

        match self.registry.evaluate(kind, target, assertion) {
            Ok(true) => None,
            Ok(false) => Some(Failure::new(assertion, assertion.failure_message())),
            Err(err) => Some(Failure::new(assertion, err.to_string())),
        }
    }
}

impl Default for AssertionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
