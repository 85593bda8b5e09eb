//! The three shapes an assertion can be evaluated against

use crate::error::{ConformanceError, ConformanceResult};
use crate::observer::RuntimeContext;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Discriminant of [`Target`], used to route and to report mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetShape {
    Workflow,
    Metadata,
    Runtime,
}

impl TargetShape {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Workflow => "workflow AST",
            Self::Metadata => "resolver metadata",
            Self::Runtime => "runtime context",
        }
    }
}

impl fmt::Display for TargetShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What one suite evaluates. Exactly one shape is active.
#[derive(Debug, Clone)]
pub enum Target {
    /// Parsed workflow plus the parser's status (warnings and extras)
    Workflow { ast: WorkflowAst, status: ParseStatus },
    /// A resolver declaration loaded as-is
    Metadata(ResolverContract),
    /// Evidence gathered by invoking the resolver
    Runtime(RuntimeContext),
}

impl Target {
    pub fn shape(&self) -> TargetShape {
        match self {
            Target::Workflow { .. } => TargetShape::Workflow,
            Target::Metadata(_) => TargetShape::Metadata,
            Target::Runtime(_) => TargetShape::Runtime,
        }
    }
}

/// Reads `null` or a mistyped value as the default, so a malformed field
/// fails the assertions that read it rather than the whole parse.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Like [`lenient`], element by element, so positions are preserved.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

/// Structural view of a parsed workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowAst {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub allowed_resolvers: Vec<String>,

    #[serde(default, deserialize_with = "lenient_seq")]
    pub steps: Vec<WorkflowStep>,

    #[serde(default, deserialize_with = "lenient")]
    pub return_values: Vec<String>,
}

impl WorkflowAst {
    /// Step at a declared position; negative or past-the-end yields `None`.
    pub fn step(&self, index: i64) -> Option<&WorkflowStep> {
        usize::try_from(index).ok().and_then(|i| self.steps.get(i))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub step_type: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub save_as: Option<String>,

    /// `None` when the step declares no policies at all.
    #[serde(default, deserialize_with = "lenient")]
    pub failure_policies: Option<BTreeMap<String, FailurePolicy>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What a step does when a resolver raises a given error code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailurePolicy {
    #[serde(default, deserialize_with = "lenient")]
    pub action: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub count: Option<u64>,
}

/// A parser diagnostic: either a bare string or an object with a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParseWarning {
    Text(String),
    Structured {
        #[serde(default)]
        message: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl Default for ParseWarning {
    fn default() -> Self {
        ParseWarning::Text(String::new())
    }
}

impl ParseWarning {
    pub fn message(&self) -> &str {
        match self {
            ParseWarning::Text(text) => text,
            ParseWarning::Structured { message, .. } => message.as_deref().unwrap_or(""),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            ParseWarning::Text(text) => Value::String(text.clone()),
            ParseWarning::Structured { message, extra } => {
                let mut object = extra.clone();
                if let Some(message) = message {
                    object.insert("message".into(), Value::String(message.clone()));
                }
                Value::Object(object)
            }
        }
    }
}

/// Auxiliary status produced alongside a workflow AST.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseStatus {
    #[serde(default, alias = "__warnings", deserialize_with = "lenient_seq")]
    pub warnings: Vec<ParseWarning>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ParseStatus {
    pub fn with_warnings(warnings: Vec<ParseWarning>) -> Self {
        Self {
            warnings,
            extra: Map::new(),
        }
    }

    /// Tree form used by path lookups: extras plus the warnings array under
    /// both `warnings` and `__warnings`.
    pub fn to_value(&self) -> Value {
        let mut object = self.extra.clone();
        let warnings = Value::Array(self.warnings.iter().map(ParseWarning::to_value).collect());
        object.insert("__warnings".into(), warnings.clone());
        object.insert("warnings".into(), warnings);
        Value::Object(object)
    }
}

/// A declared failure entry, read out of a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredFailure<'a> {
    pub code: &'a str,
    pub retries: u32,
}

/// Read-only view over a resolver declaration.
///
/// The raw JSON is kept so that shape violations (a string where a boolean
/// belongs) are assertion outcomes rather than load errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolverContract(Value);

impl ResolverContract {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    /// Load a contract file as-is.
    pub fn from_json_str(contents: &str, path: &Path) -> ConformanceResult<Self> {
        serde_json::from_str(contents)
            .map(Self)
            .map_err(|source| ConformanceError::InvalidContract {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Declared resolver name (`resolverName`, falling back to `name`).
    pub fn name(&self) -> Option<&str> {
        self.field("resolverName")
            .or_else(|| self.field("name"))
            .and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.field("version").and_then(Value::as_str)
    }

    pub fn inputs(&self) -> Option<&Vec<Value>> {
        self.field("inputs").and_then(Value::as_array)
    }

    pub fn outputs(&self) -> Option<&Vec<Value>> {
        self.field("outputs").and_then(Value::as_array)
    }

    pub fn failures(&self) -> Option<&Vec<Value>> {
        self.field("failures").and_then(Value::as_array)
    }

    /// Names of declared outputs; entries without a string name are skipped.
    pub fn declared_output_names(&self) -> Vec<&str> {
        self.outputs()
            .map(|outputs| {
                outputs
                    .iter()
                    .filter_map(|o| o.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The declared failure entry for `code`, if it has a numeric retry limit.
    pub fn declared_failure(&self, code: &str) -> Option<DeclaredFailure<'_>> {
        self.failures()?.iter().find_map(|entry| {
            let declared = entry.get("code").and_then(Value::as_str)?;
            if declared != code {
                return None;
            }
            let retries = entry.get("retries").and_then(Value::as_f64)?;
            Some(DeclaredFailure {
                code: declared,
                retries: retries.max(0.0).min(u32::MAX as f64) as u32,
            })
        })
    }

    pub fn declares_failure(&self, code: &str) -> bool {
        self.failures().is_some_and(|failures| {
            failures
                .iter()
                .any(|entry| entry.get("code").and_then(Value::as_str) == Some(code))
        })
    }
}
