//! O-lang Resolver Conformance Certification
//!
//! This crate certifies that a resolver satisfies the resolver contract. A
//! certification run is a sequence of independent suites; each suite is one
//! `test.json` declaring a fixture and an ordered list of assertions.
//!
//! # Evaluation Domains
//!
//! - **Workflow**: the resolver's parser turns a workflow source into an AST
//!   and the structural assertions inspect it (allowlist, step shapes,
//!   failure policies, parse warnings)
//! - **Metadata**: a resolver declaration is loaded as raw JSON and its
//!   inputs, outputs and failures are checked for shape
//! - **Runtime**: the resolver is invoked with an empty input, once or
//!   repeatedly, and the observed behavior is checked against its declaration
//!
//! # Example
//!
//! ```rust,ignore
//! use resolver_conformance::{CertificationReport, SuiteOrchestrator};
//!
//! let orchestrator = SuiteOrchestrator::new("./suites");
//! let run = orchestrator.run(&["R-001-allowlist", "R-005-resolver-metadata-contract"], &resolver).await;
//! println!("{}", CertificationReport::from_run(&run).to_text());
//! ```

pub mod checks;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod observer;
pub mod orchestrator;
pub mod path;
pub mod registry;
pub mod reports;
pub mod resolver;
pub mod spec;
pub mod target;

pub use config::ConformanceConfig;
pub use error::{AssertionError, ConformanceError, ConformanceResult};
pub use evaluator::{AssertionEvaluator, Failure, Verdict};
pub use observer::{InvocationPolicy, RetryEvidence, RuntimeContext, RuntimeObserver};
pub use orchestrator::{CertificationRun, SuiteOrchestrator, SuiteOutcome, SuiteStatus};
pub use registry::{AssertionFamily, AssertionKind, AssertionRegistry, UnknownKind};
pub use reports::{badge_svg, CertificationReport, ReportSummary};
pub use resolver::{ParseError, ParseOutput, Resolver, ResolverError, WorkflowParser};
pub use spec::{Assertion, Fixture, Severity, TestSpec};
pub use target::{ParseStatus, ParseWarning, ResolverContract, Target, TargetShape, WorkflowAst};
