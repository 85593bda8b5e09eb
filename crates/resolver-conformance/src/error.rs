//! Error types for conformance runs

use crate::target::TargetShape;
use std::path::PathBuf;

/// Errors that stop a single suite before or during target acquisition.
///
/// Everything except [`ConformanceError::Observation`] is a fixture or load
/// problem: the suite counts as failed and the run moves on. `Observation`
/// is a defect in the engine's own bookkeeping and is reported as a crash.
#[derive(Debug, thiserror::Error)]
pub enum ConformanceError {
    #[error("Test spec not found: {}", .0.display())]
    SpecNotFound(PathBuf),

    #[error("Invalid test spec {}: {source}", path.display())]
    InvalidSpec {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Fixture file missing: {}", .0.display())]
    FixtureMissing(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load resolver contract {}: {source}", path.display())]
    InvalidContract {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unrecognized fixture in suite {0}")]
    UnrecognizedFixture(String),

    #[error("Resolver '{0}' does not expose a workflow parser")]
    NoWorkflowParser(String),

    #[error("Parse failed for {suite}: {message}")]
    Parse { suite: String, message: String },

    #[error("Runtime observation failed: {0}")]
    Observation(String),
}

impl ConformanceError {
    /// Whether the error is an engine defect rather than a fixture problem.
    pub fn is_crash(&self) -> bool {
        matches!(self, Self::Observation(_))
    }
}

/// Result type alias for conformance operations
pub type ConformanceResult<T> = Result<T, ConformanceError>;

/// Assertion authoring problems found while evaluating a check.
///
/// These never abort a suite; the evaluator turns them into failure records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssertionError {
    #[error("assertion kind '{kind}' applies to {expected} targets, got {actual}")]
    IncompatibleTarget {
        kind: &'static str,
        expected: TargetShape,
        actual: TargetShape,
    },

    #[error("assertion kind '{kind}' requires parameter '{param}'")]
    MissingParameter {
        kind: &'static str,
        param: &'static str,
    },

    #[error("assertion kind '{kind}' has invalid parameter '{param}': {reason}")]
    InvalidParameter {
        kind: &'static str,
        param: &'static str,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_observation_is_a_crash() {
        assert!(ConformanceError::Observation("bad".into()).is_crash());
        assert!(!ConformanceError::SpecNotFound(PathBuf::from("x/test.json")).is_crash());
        assert!(!ConformanceError::UnrecognizedFixture("R-001".into()).is_crash());
    }

    #[test]
    fn test_assertion_error_display() {
        let err = AssertionError::IncompatibleTarget {
            kind: "step_type",
            expected: TargetShape::Workflow,
            actual: TargetShape::Metadata,
        };
        assert_eq!(
            err.to_string(),
            "assertion kind 'step_type' applies to workflow AST targets, got resolver metadata"
        );
    }
}
