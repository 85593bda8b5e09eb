//! The implementation under test and the capabilities it may expose

use crate::target::{ParseStatus, ResolverContract, WorkflowAst};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// An error thrown by a resolver invocation.
///
/// `code` is matched against the declared failure list; `attempts` is the
/// number of retries the resolver reports having made, when it tracks them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ResolverError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            attempts: None,
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            attempts: None,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }
}

/// A workflow parser rejected its input outright.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What a parser hands back: the AST plus its status (warnings, extras).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseOutput {
    #[serde(default, deserialize_with = "crate::target::lenient")]
    pub ast: WorkflowAst,

    #[serde(flatten)]
    pub status: ParseStatus,
}

#[async_trait]
pub trait WorkflowParser: Send + Sync {
    async fn parse(&self, source: &str) -> Result<ParseOutput, ParseError>;
}

/// A resolver under certification.
///
/// Only `name` and `invoke` are required. The optional capabilities default
/// to "not provided".
#[async_trait]
pub trait Resolver: Send + Sync {
    fn name(&self) -> &str;

    /// Invoke with one input value. `Err` is a thrown error.
    async fn invoke(&self, input: Value) -> Result<Value, ResolverError>;

    /// Declared metadata (`resolverName`, `inputs`, `outputs`, `failures`...).
    async fn declaration(&self) -> Option<Value> {
        None
    }

    /// Metadata used when no declaration is provided.
    fn describe(&self) -> Value {
        json!({ "resolverName": self.name() })
    }

    fn workflow_parser(&self) -> Option<&dyn WorkflowParser> {
        None
    }

    /// Snapshot of any state the resolver could mutate between invocations.
    fn state_fingerprint(&self) -> Option<Value> {
        None
    }
}

/// The metadata a runtime suite checks against: the declaration when the
/// resolver has one, otherwise its self-description.
pub async fn declared_metadata(resolver: &dyn Resolver) -> ResolverContract {
    match resolver.declaration().await {
        Some(declaration) => ResolverContract::new(declaration),
        None => ResolverContract::new(resolver.describe()),
    }
}
