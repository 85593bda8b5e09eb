//! Suite orchestration: load each suite, build its target, evaluate, fold.

use crate::config::ConformanceConfig;
use crate::error::{ConformanceError, ConformanceResult};
use crate::evaluator::{AssertionEvaluator, Verdict};
use crate::observer::{InvocationPolicy, RuntimeObserver};
use crate::resolver::Resolver;
use crate::spec::{FixtureSource, TestSpec};
use crate::target::{ResolverContract, Target, TargetShape};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How one suite ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SuiteStatus {
    Passed,
    /// Evaluated, with at least one failed assertion
    Failed { verdict: Verdict },
    /// Spec or fixture could not be loaded; nothing was evaluated
    LoadFailed { reason: String },
    /// The engine itself failed inside the suite
    Crashed { reason: String },
    /// Not run because an earlier suite failed and the run is fail-fast
    Skipped,
}

impl SuiteStatus {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Whether the suite counts against certification.
    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            Self::Failed { .. } | Self::LoadFailed { .. } | Self::Crashed { .. }
        )
    }
}

/// Per-suite entry of a [`CertificationRun`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteOutcome {
    pub suite: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetShape>,

    #[serde(flatten)]
    pub status: SuiteStatus,

    pub duration: Duration,
}

impl SuiteOutcome {
    fn skipped(suite: &str) -> Self {
        Self {
            suite: suite.to_string(),
            test_id: None,
            target: None,
            status: SuiteStatus::Skipped,
            duration: Duration::ZERO,
        }
    }

    /// One-line reason for a non-passing suite.
    pub fn reason(&self) -> Option<&str> {
        match &self.status {
            SuiteStatus::Failed { verdict } => Some(&verdict.message),
            SuiteStatus::LoadFailed { reason } | SuiteStatus::Crashed { reason } => Some(reason),
            SuiteStatus::Passed | SuiteStatus::Skipped => None,
        }
    }
}

/// Aggregate of one certification run. Outcomes are in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationRun {
    pub resolver: String,
    pub failed: usize,
    pub outcomes: Vec<SuiteOutcome>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl CertificationRun {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_passed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == SuiteStatus::Skipped)
            .count()
    }

    pub fn is_certified(&self) -> bool {
        self.failed == 0
    }
}

struct Evaluated {
    test_id: Option<String>,
    shape: TargetShape,
    verdict: Verdict,
}

/// Runs suites from a directory tree laid out as `<root>/<suite>/test.json`.
pub struct SuiteOrchestrator {
    root: PathBuf,
    config: ConformanceConfig,
    evaluator: AssertionEvaluator,
}

impl SuiteOrchestrator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, ConformanceConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, config: ConformanceConfig) -> Self {
        Self {
            root: root.into(),
            config,
            evaluator: AssertionEvaluator::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ConformanceConfig {
        &self.config
    }

    /// Run every suite in order against one resolver.
    pub async fn run<S: AsRef<str>>(&self, suites: &[S], resolver: &dyn Resolver) -> CertificationRun {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(suites.len());
        let mut failed = 0;

        tracing::info!(
            "Starting certification of {} against {} suite(s)",
            resolver.name(),
            suites.len()
        );

        for suite in suites {
            let suite = suite.as_ref();
            if failed > 0 && !self.config.continue_on_failure {
                outcomes.push(SuiteOutcome::skipped(suite));
                continue;
            }

            let outcome = self.run_suite(suite, resolver).await;
            if outcome.status.is_failed() {
                failed += 1;
            }
            outcomes.push(outcome);
        }

        let run = CertificationRun {
            resolver: resolver.name().to_string(),
            failed,
            outcomes,
            started_at,
            completed_at: Utc::now(),
        };

        tracing::info!(
            "Certification complete: {} passed, {} failed, {} skipped",
            run.passed(),
            run.failed,
            run.skipped()
        );

        run
    }

    /// Run a single suite. Never fails: every problem becomes an outcome.
    pub async fn run_suite(&self, suite: &str, resolver: &dyn Resolver) -> SuiteOutcome {
        let start = Instant::now();
        tracing::debug!(suite, "running suite");

        let attempt = AssertUnwindSafe(self.evaluate_suite(suite, resolver))
            .catch_unwind()
            .await;

        let (test_id, target, status) = match attempt {
            Ok(Ok(evaluated)) => {
                let status = if evaluated.verdict.ok {
                    tracing::info!("✓ {} passed", suite);
                    SuiteStatus::Passed
                } else {
                    tracing::warn!("✗ {} failed: {}", suite, evaluated.verdict.message);
                    SuiteStatus::Failed {
                        verdict: evaluated.verdict,
                    }
                };
                (evaluated.test_id, Some(evaluated.shape), status)
            }
            Ok(Err(err)) if err.is_crash() => {
                tracing::error!("✗ {} crashed: {}", suite, err);
                (None, None, SuiteStatus::Crashed { reason: err.to_string() })
            }
            Ok(Err(err)) => {
                tracing::warn!("✗ {} not evaluated: {}", suite, err);
                (None, None, SuiteStatus::LoadFailed { reason: err.to_string() })
            }
            Err(payload) => {
                let reason = format!("suite panicked: {}", panic_payload_to_string(payload.as_ref()));
                tracing::error!("✗ {} crashed: {}", suite, reason);
                (None, None, SuiteStatus::Crashed { reason })
            }
        };

        SuiteOutcome {
            suite: suite.to_string(),
            test_id,
            target,
            status,
            duration: start.elapsed(),
        }
    }

    async fn evaluate_suite(&self, suite: &str, resolver: &dyn Resolver) -> ConformanceResult<Evaluated> {
        let suite_dir = self.root.join(suite);
        let spec = self.load_spec(&suite_dir).await?;
        let target = self.build_target(suite, &suite_dir, &spec, resolver).await?;
        let verdict = self.evaluator.evaluate(&spec, &target);

        Ok(Evaluated {
            test_id: spec.test_id,
            shape: target.shape(),
            verdict,
        })
    }

    async fn load_spec(&self, suite_dir: &Path) -> ConformanceResult<TestSpec> {
        let path = suite_dir.join(&self.config.spec_file_name);
        let contents = read_file(&path, ConformanceError::SpecNotFound).await?;
        TestSpec::from_json_str(&contents, &path)
    }

    /// Pick the evaluation domain. The runtime category wins over any
    /// fixture; otherwise the first fixture decides.
    async fn build_target(
        &self,
        suite: &str,
        suite_dir: &Path,
        spec: &TestSpec,
        resolver: &dyn Resolver,
    ) -> ConformanceResult<Target> {
        if spec.is_runtime(&self.config.runtime_category) {
            let policy = InvocationPolicy::for_suite(spec.test_id.as_deref(), &self.config);
            let context = RuntimeObserver::new(policy).observe(resolver).await?;
            return Ok(Target::Runtime(context));
        }

        let source = spec
            .primary_fixture()
            .and_then(|fixture| fixture.source())
            .ok_or_else(|| ConformanceError::UnrecognizedFixture(suite.to_string()))?;

        match source {
            FixtureSource::Workflow(relative) => {
                let path = suite_dir.join(relative);
                let workflow_source = read_file(&path, ConformanceError::FixtureMissing).await?;
                let parser = resolver
                    .workflow_parser()
                    .ok_or_else(|| ConformanceError::NoWorkflowParser(resolver.name().to_string()))?;
                let parsed = parser
                    .parse(&workflow_source)
                    .await
                    .map_err(|err| ConformanceError::Parse {
                        suite: suite.to_string(),
                        message: err.message,
                    })?;
                Ok(Target::Workflow {
                    ast: parsed.ast,
                    status: parsed.status,
                })
            }
            FixtureSource::ResolverContract(relative) => {
                let path = suite_dir.join(relative);
                let contents = read_file(&path, ConformanceError::FixtureMissing).await?;
                Ok(Target::Metadata(ResolverContract::from_json_str(&contents, &path)?))
            }
        }
    }
}

async fn read_file(
    path: &Path,
    not_found: fn(PathBuf) -> ConformanceError,
) -> ConformanceResult<String> {
    tokio::fs::read_to_string(path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            not_found(path.to_path_buf())
        } else {
            ConformanceError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
