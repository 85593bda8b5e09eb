//! A resolver backed by an external program
//!
//! The program is run once per operation with the operation name as its only
//! argument:
//!
//! - `invoke`: input JSON on stdin, output JSON on stdout. A non-zero exit is
//!   a thrown error; stderr may carry `{"code", "message", "attempts"}`.
//! - `describe`: prints the declaration. A non-zero exit or empty output means
//!   the resolver has none.
//! - `parse`: workflow source on stdin, `{"ast", "warnings", ...}` on stdout.

use crate::error::{CliError, CliResult};
use async_trait::async_trait;
use resolver_conformance::{ParseError, ParseOutput, Resolver, ResolverError, WorkflowParser};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::OnceCell;

pub struct ProcessResolver {
    program: PathBuf,
    name: String,
    timeout: Option<Duration>,
    declaration: OnceCell<Option<Value>>,
}

impl ProcessResolver {
    /// Resolve `command` against `cwd` when relative; the program must exist.
    pub fn locate(command: &str, cwd: &Path) -> CliResult<Self> {
        let path = Path::new(command);
        let program = if path.is_absolute() {
            path.to_path_buf()
        } else {
            cwd.join(path)
        };

        if !program.is_file() {
            return Err(CliError::ResolverNotFound(program));
        }

        let name = program
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| command.to_string());

        Ok(Self {
            program,
            name,
            timeout: None,
            declaration: OnceCell::new(),
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn run(&self, operation: &str, input: &[u8]) -> io::Result<Output> {
        let mut child = Command::new(&self.program)
            .arg(operation)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let exchange = async move {
            if let Some(mut stdin) = child.stdin.take() {
                // a program that ignores its input may close the pipe early
                match stdin.write_all(input).await {
                    Err(err) if err.kind() != io::ErrorKind::BrokenPipe => return Err(err),
                    _ => {}
                }
            }
            child.wait_with_output().await
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange).await.map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("{} {} timed out after {:?}", self.name, operation, limit),
                )
            })?,
            None => exchange.await,
        }
    }

    async fn describe_process(&self) -> Option<Value> {
        let output = match self.run("describe", b"").await {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(resolver = %self.name, "describe failed: {}", err);
                return None;
            }
        };

        if !output.status.success() || output.stdout.iter().all(u8::is_ascii_whitespace) {
            tracing::debug!(resolver = %self.name, "no declaration provided");
            return None;
        }

        match serde_json::from_slice(&output.stdout) {
            Ok(declaration) => Some(declaration),
            Err(err) => {
                tracing::warn!(resolver = %self.name, "declaration is not valid JSON: {}", err);
                None
            }
        }
    }
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// Decode a thrown error from stderr: the whole stream as JSON, else its last
/// line as JSON, else the raw text.
fn thrown_error(output: &Output) -> ResolverError {
    let text = stderr_text(output);
    let structured = serde_json::from_str::<ResolverError>(&text).ok().or_else(|| {
        text.lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .and_then(|line| serde_json::from_str(line.trim()).ok())
    });

    match structured {
        Some(error) => error,
        None if text.is_empty() => ResolverError::new(format!("resolver exited with {}", output.status)),
        None => ResolverError::new(text),
    }
}

#[async_trait]
impl Resolver for ProcessResolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, input: Value) -> Result<Value, ResolverError> {
        let input = serde_json::to_vec(&input)
            .map_err(|err| ResolverError::new(format!("could not encode input: {}", err)))?;
        let output = self
            .run("invoke", &input)
            .await
            .map_err(|err| ResolverError::new(err.to_string()))?;

        if !output.status.success() {
            return Err(thrown_error(&output));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|err| ResolverError::new(format!("resolver printed invalid JSON: {}", err)))
    }

    async fn declaration(&self) -> Option<Value> {
        self.declaration
            .get_or_init(|| self.describe_process())
            .await
            .clone()
    }

    fn workflow_parser(&self) -> Option<&dyn WorkflowParser> {
        Some(self)
    }
}

#[async_trait]
impl WorkflowParser for ProcessResolver {
    async fn parse(&self, source: &str) -> Result<ParseOutput, ParseError> {
        let output = self
            .run("parse", source.as_bytes())
            .await
            .map_err(|err| ParseError::new(err.to_string()))?;

        if !output.status.success() {
            let text = stderr_text(&output);
            return Err(ParseError::new(if text.is_empty() {
                format!("parser exited with {}", output.status)
            } else {
                text
            }));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|err| ParseError::new(format!("parser printed invalid JSON: {}", err)))
    }
}
