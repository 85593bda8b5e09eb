//! Test suite declarations: `test.json` as loaded from a suite directory

use crate::error::{AssertionError, ConformanceError, ConformanceResult};
use crate::registry::AssertionKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// How much a failing assertion matters to the report reader.
///
/// Severity is carried through to failure records; it never changes whether
/// a suite passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Fatal,
    #[serde(alias = "warning", alias = "warn", alias = "info")]
    Advisory,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Fatal => "fatal",
            Severity::Advisory => "advisory",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single declarative check.
///
/// The kind is kept as the raw string from the spec file so that an
/// unregistered kind surfaces as a failure at evaluation time instead of
/// rejecting the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    pub id: String,

    #[serde(rename = "type", alias = "kind")]
    pub kind: String,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub expected: Option<Value>,

    #[serde(default, rename = "stepIndex", alias = "step_index")]
    pub step_index: Option<i64>,

    #[serde(default)]
    pub expected_substring: Option<String>,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub field: Option<String>,
}

impl Assertion {
    /// Create an assertion with no expected-value fields.
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            severity: Severity::Fatal,
            description: None,
            expected: None,
            step_index: None,
            expected_substring: None,
            path: None,
            field: None,
        }
    }

    pub fn with_expected(mut self, expected: Value) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_step_index(mut self, index: i64) -> Self {
        self.step_index = Some(index);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_expected_substring(mut self, needle: impl Into<String>) -> Self {
        self.expected_substring = Some(needle.into());
        self
    }

    /// The message recorded when this assertion's check returns false.
    pub fn failure_message(&self) -> String {
        match &self.description {
            Some(description) if !description.is_empty() => description.clone(),
            _ => format!("Assertion failed: {}", self.id),
        }
    }

    pub(crate) fn require_expected(&self, kind: AssertionKind) -> Result<&Value, AssertionError> {
        self.expected
            .as_ref()
            .ok_or(AssertionError::MissingParameter {
                kind: kind.as_str(),
                param: "expected",
            })
    }

    /// `expected` as a list of strings.
    pub(crate) fn expected_strings(&self, kind: AssertionKind) -> Result<Vec<&str>, AssertionError> {
        let invalid = |reason: &str| AssertionError::InvalidParameter {
            kind: kind.as_str(),
            param: "expected",
            reason: reason.to_string(),
        };
        self.require_expected(kind)?
            .as_array()
            .ok_or_else(|| invalid("expected an array of strings"))?
            .iter()
            .map(|item| item.as_str().ok_or_else(|| invalid("expected an array of strings")))
            .collect()
    }

    pub(crate) fn require_step_index(&self, kind: AssertionKind) -> Result<i64, AssertionError> {
        self.step_index.ok_or(AssertionError::MissingParameter {
            kind: kind.as_str(),
            param: "stepIndex",
        })
    }

    pub(crate) fn require_field(&self, kind: AssertionKind) -> Result<&str, AssertionError> {
        self.field.as_deref().ok_or(AssertionError::MissingParameter {
            kind: kind.as_str(),
            param: "field",
        })
    }

    pub(crate) fn require_path(&self, kind: AssertionKind) -> Result<&str, AssertionError> {
        self.path.as_deref().ok_or(AssertionError::MissingParameter {
            kind: kind.as_str(),
            param: "path",
        })
    }

    pub(crate) fn require_substring(&self, kind: AssertionKind) -> Result<&str, AssertionError> {
        self.expected_substring
            .as_deref()
            .ok_or(AssertionError::MissingParameter {
                kind: kind.as_str(),
                param: "expected_substring",
            })
    }
}

/// One fixture entry under `fixtures.inputs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver_contract: Option<String>,
}

/// Where a fixture points, resolved relative to the suite directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureSource<'a> {
    Workflow(&'a str),
    ResolverContract(&'a str),
}

impl Fixture {
    pub fn workflow(path: impl Into<String>) -> Self {
        Self {
            workflow: Some(path.into()),
            resolver_contract: None,
        }
    }

    pub fn resolver_contract(path: impl Into<String>) -> Self {
        Self {
            workflow: None,
            resolver_contract: Some(path.into()),
        }
    }

    /// A workflow reference wins when both are present.
    pub fn source(&self) -> Option<FixtureSource<'_>> {
        if let Some(workflow) = self.workflow.as_deref() {
            return Some(FixtureSource::Workflow(workflow));
        }
        self.resolver_contract
            .as_deref()
            .map(FixtureSource::ResolverContract)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub inputs: Vec<Fixture>,
}

/// One suite's declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub fixtures: Fixtures,

    pub assertions: Vec<Assertion>,
}

impl TestSpec {
    /// Parse a spec file's contents. `path` is only used for diagnostics.
    pub fn from_json_str(contents: &str, path: &Path) -> ConformanceResult<Self> {
        serde_json::from_str(contents).map_err(|source| ConformanceError::InvalidSpec {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The configured fixture: the first entry of `fixtures.inputs`.
    pub fn primary_fixture(&self) -> Option<&Fixture> {
        self.fixtures.inputs.first()
    }

    pub fn is_runtime(&self, runtime_category: &str) -> bool {
        self.category.as_deref() == Some(runtime_category)
    }
}
