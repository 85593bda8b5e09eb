//! Check functions, one per assertion kind
//!
//! Every check is read-only over its target and answers `Ok(false)` for an
//! expected negative case (missing field, out-of-range step). `Err` is
//! reserved for assertions that cannot be evaluated as written.

mod metadata;
mod runtime;
mod structural;

use crate::error::AssertionError;
use crate::observer::RuntimeContext;
use crate::registry::AssertionKind;
use crate::spec::Assertion;
use crate::target::{ParseStatus, ResolverContract, Target, WorkflowAst};
use regex::Regex;
use std::sync::OnceLock;

/// Allowed-resolver names in a workflow: letters and digits only.
pub const WORKFLOW_IDENTIFIER_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9]*$";

/// Field names in resolver metadata: underscores are also allowed.
pub const METADATA_IDENTIFIER_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9_]*$";

fn workflow_identifier() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(WORKFLOW_IDENTIFIER_PATTERN).expect("workflow identifier pattern compiles")
    })
}

fn metadata_identifier() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(METADATA_IDENTIFIER_PATTERN).expect("metadata identifier pattern compiles")
    })
}

pub fn is_workflow_identifier(name: &str) -> bool {
    workflow_identifier().is_match(name)
}

pub fn is_metadata_identifier(name: &str) -> bool {
    metadata_identifier().is_match(name)
}

/// Dispatch one kind to its check. Shape mismatches are reported here too,
/// so the function is safe to call without the registry's pre-check.
pub(crate) fn evaluate(
    kind: AssertionKind,
    target: &Target,
    assertion: &Assertion,
) -> Result<bool, AssertionError> {
    use AssertionKind as K;

    match kind {
        K::AllowedResolversListed => {
            structural::allowed_resolvers_listed(workflow(kind, target)?.0, assertion)
        }
        K::ResolverNamesNormalized => {
            Ok(structural::resolver_names_normalized(workflow(kind, target)?.0))
        }
        K::WorkflowNamePresent => {
            structural::workflow_name_present(workflow(kind, target)?.0, assertion)
        }
        K::WorkflowReturnValues | K::WorkflowReturnValuesEmpty => {
            structural::workflow_return_values(kind, workflow(kind, target)?.0, assertion)
        }
        K::NoParseWarnings => structural::no_parse_warnings(workflow(kind, target)?.1, assertion),
        K::StepType => structural::step_type(workflow(kind, target)?.0, assertion),
        K::StepSaveAs => structural::step_save_as(workflow(kind, target)?.0, assertion),
        K::StepFailurePolicies => {
            structural::step_failure_policies(workflow(kind, target)?.0, assertion)
        }
        K::ContainsWarning => structural::contains_warning(workflow(kind, target)?.1, assertion),
        K::StatusGreaterThan => {
            structural::status_greater_than(workflow(kind, target)?.1, assertion)
        }

        K::ResolverHasField => metadata::resolver_has_field(contract(kind, target)?, assertion),
        K::ResolverInputsValid => Ok(metadata::resolver_inputs_valid(contract(kind, target)?)),
        K::ResolverOutputsValid => Ok(metadata::resolver_outputs_valid(contract(kind, target)?)),
        K::FieldNamesNormalized => {
            metadata::field_names_normalized(contract(kind, target)?, assertion)
        }
        K::ResolverFailuresValid => {
            Ok(metadata::resolver_failures_valid(contract(kind, target)?))
        }

        K::ResolverCallable => Ok(runtime::resolver_callable(runtime_context(kind, target)?)),
        K::FailureCodeDeclared => {
            Ok(runtime::failure_code_declared(runtime_context(kind, target)?))
        }
        K::RejectsMissingRequiredInput => Ok(runtime::rejects_missing_required_input(
            runtime_context(kind, target)?,
        )),
        K::RetryWithinDeclaredLimit => Ok(runtime::retry_within_declared_limit(
            runtime_context(kind, target)?,
        )),
        K::OutputIsObject => Ok(runtime::output_is_object(runtime_context(kind, target)?)),
        K::OutputFieldsDeclared => {
            Ok(runtime::output_fields_declared(runtime_context(kind, target)?))
        }
        K::DeterministicOutput => {
            Ok(runtime::deterministic_output(runtime_context(kind, target)?))
        }
        K::NoGlobalMutation => Ok(runtime::no_global_mutation(runtime_context(kind, target)?)),
    }
}

fn mismatch(kind: AssertionKind, target: &Target) -> AssertionError {
    AssertionError::IncompatibleTarget {
        kind: kind.as_str(),
        expected: kind.target_shape(),
        actual: target.shape(),
    }
}

fn workflow(
    kind: AssertionKind,
    target: &Target,
) -> Result<(&WorkflowAst, &ParseStatus), AssertionError> {
    match target {
        Target::Workflow { ast, status } => Ok((ast, status)),
        _ => Err(mismatch(kind, target)),
    }
}

fn contract(kind: AssertionKind, target: &Target) -> Result<&ResolverContract, AssertionError> {
    match target {
        Target::Metadata(contract) => Ok(contract),
        _ => Err(mismatch(kind, target)),
    }
}

fn runtime_context(kind: AssertionKind, target: &Target) -> Result<&RuntimeContext, AssertionError> {
    match target {
        Target::Runtime(context) => Ok(context),
        _ => Err(mismatch(kind, target)),
    }
}
