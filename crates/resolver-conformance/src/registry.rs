//! The closed set of assertion kinds and their name table
//!
//! Adding a conformance rule means adding a variant here, a name in
//! [`AssertionKind::as_str`], and an arm in the check dispatch. The match in
//! `checks::evaluate` is exhaustive, so a kind without a check does not
//! compile.

use crate::checks;
use crate::error::AssertionError;
use crate::spec::Assertion;
use crate::target::{Target, TargetShape};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Which kind of artifact a family of checks inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionFamily {
    Structural,
    Metadata,
    Runtime,
}

impl AssertionFamily {
    pub fn target_shape(&self) -> TargetShape {
        match self {
            AssertionFamily::Structural => TargetShape::Workflow,
            AssertionFamily::Metadata => TargetShape::Metadata,
            AssertionFamily::Runtime => TargetShape::Runtime,
        }
    }
}

/// Every registered assertion kind. Serializes as its `test.json` name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionKind {
    // Workflow AST
    AllowedResolversListed,
    ResolverNamesNormalized,
    WorkflowNamePresent,
    WorkflowReturnValues,
    WorkflowReturnValuesEmpty,
    NoParseWarnings,
    StepType,
    #[serde(rename = "step_saveas")]
    StepSaveAs,
    StepFailurePolicies,
    ContainsWarning,
    StatusGreaterThan,

    // Resolver metadata
    ResolverHasField,
    ResolverInputsValid,
    ResolverOutputsValid,
    FieldNamesNormalized,
    ResolverFailuresValid,

    // Runtime behavior
    ResolverCallable,
    FailureCodeDeclared,
    RejectsMissingRequiredInput,
    RetryWithinDeclaredLimit,
    OutputIsObject,
    OutputFieldsDeclared,
    DeterministicOutput,
    NoGlobalMutation,
}

impl AssertionKind {
    /// All kinds in registry order.
    pub const ALL: &'static [AssertionKind] = &[
        Self::AllowedResolversListed,
        Self::ResolverNamesNormalized,
        Self::WorkflowNamePresent,
        Self::WorkflowReturnValues,
        Self::WorkflowReturnValuesEmpty,
        Self::NoParseWarnings,
        Self::StepType,
        Self::StepSaveAs,
        Self::StepFailurePolicies,
        Self::ContainsWarning,
        Self::StatusGreaterThan,
        Self::ResolverHasField,
        Self::ResolverInputsValid,
        Self::ResolverOutputsValid,
        Self::FieldNamesNormalized,
        Self::ResolverFailuresValid,
        Self::ResolverCallable,
        Self::FailureCodeDeclared,
        Self::RejectsMissingRequiredInput,
        Self::RetryWithinDeclaredLimit,
        Self::OutputIsObject,
        Self::OutputFieldsDeclared,
        Self::DeterministicOutput,
        Self::NoGlobalMutation,
    ];

    /// The name used in `test.json`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllowedResolversListed => "allowed_resolvers_listed",
            Self::ResolverNamesNormalized => "resolver_names_normalized",
            Self::WorkflowNamePresent => "workflow_name_present",
            Self::WorkflowReturnValues => "workflow_return_values",
            Self::WorkflowReturnValuesEmpty => "workflow_return_values_empty",
            Self::NoParseWarnings => "no_parse_warnings",
            Self::StepType => "step_type",
            Self::StepSaveAs => "step_saveas",
            Self::StepFailurePolicies => "step_failure_policies",
            Self::ContainsWarning => "contains_warning",
            Self::StatusGreaterThan => "status_greater_than",
            Self::ResolverHasField => "resolver_has_field",
            Self::ResolverInputsValid => "resolver_inputs_valid",
            Self::ResolverOutputsValid => "resolver_outputs_valid",
            Self::FieldNamesNormalized => "field_names_normalized",
            Self::ResolverFailuresValid => "resolver_failures_valid",
            Self::ResolverCallable => "resolver_callable",
            Self::FailureCodeDeclared => "failure_code_declared",
            Self::RejectsMissingRequiredInput => "rejects_missing_required_input",
            Self::RetryWithinDeclaredLimit => "retry_within_declared_limit",
            Self::OutputIsObject => "output_is_object",
            Self::OutputFieldsDeclared => "output_fields_declared",
            Self::DeterministicOutput => "deterministic_output",
            Self::NoGlobalMutation => "no_global_mutation",
        }
    }

    pub fn family(&self) -> AssertionFamily {
        match self {
            Self::AllowedResolversListed
            | Self::ResolverNamesNormalized
            | Self::WorkflowNamePresent
            | Self::WorkflowReturnValues
            | Self::WorkflowReturnValuesEmpty
            | Self::NoParseWarnings
            | Self::StepType
            | Self::StepSaveAs
            | Self::StepFailurePolicies
            | Self::ContainsWarning
            | Self::StatusGreaterThan => AssertionFamily::Structural,
            Self::ResolverHasField
            | Self::ResolverInputsValid
            | Self::ResolverOutputsValid
            | Self::FieldNamesNormalized
            | Self::ResolverFailuresValid => AssertionFamily::Metadata,
            Self::ResolverCallable
            | Self::FailureCodeDeclared
            | Self::RejectsMissingRequiredInput
            | Self::RetryWithinDeclaredLimit
            | Self::OutputIsObject
            | Self::OutputFieldsDeclared
            | Self::DeterministicOutput
            | Self::NoGlobalMutation => AssertionFamily::Runtime,
        }
    }

    /// The target shape this kind accepts.
    pub fn target_shape(&self) -> TargetShape {
        self.family().target_shape()
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown assertion type: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for AssertionKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssertionRegistry::global()
            .lookup(s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Name → kind table. Read-only once built; shared process-wide.
#[derive(Debug)]
pub struct AssertionRegistry {
    kinds: HashMap<&'static str, AssertionKind>,
}

impl AssertionRegistry {
    fn build() -> Self {
        let mut kinds = HashMap::with_capacity(AssertionKind::ALL.len());
        for kind in AssertionKind::ALL {
            let previous = kinds.insert(kind.as_str(), *kind);
            debug_assert!(previous.is_none(), "assertion kind {} registered twice", kind);
        }
        Self { kinds }
    }

    /// The process-wide registry.
    pub fn global() -> &'static AssertionRegistry {
        static REGISTRY: OnceLock<AssertionRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::build)
    }

    /// Exact, case-sensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<AssertionKind> {
        self.kinds.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.kinds.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Apply one assertion of a known kind to a target.
    ///
    /// A target of the wrong shape is an authoring error, not a crash.
    pub fn evaluate(
        &self,
        kind: AssertionKind,
        target: &Target,
        assertion: &Assertion,
    ) -> Result<bool, AssertionError> {
        if kind.target_shape() != target.shape() {
            return Err(AssertionError::IncompatibleTarget {
                kind: kind.as_str(),
                expected: kind.target_shape(),
                actual: target.shape(),
            });
        }
        checks::evaluate(kind, target, assertion)
    }
}
