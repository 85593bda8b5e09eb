//! Checks over a parsed workflow and its parse status

use super::is_workflow_identifier;
use crate::error::AssertionError;
use crate::path::PathExpr;
use crate::registry::AssertionKind;
use crate::spec::Assertion;
use crate::target::{ParseStatus, WorkflowAst};
use serde_json::Value;

/// Equal size and every expected member present. Extra members in `actual`
/// are caught by the size comparison.
pub(super) fn same_members(actual: &[String], expected: &[&str]) -> bool {
    actual.len() == expected.len()
        && expected
            .iter()
            .all(|e| actual.iter().any(|a| a.as_str() == *e))
}

pub(super) fn allowed_resolvers_listed(
    ast: &WorkflowAst,
    assertion: &Assertion,
) -> Result<bool, AssertionError> {
    let expected = assertion.expected_strings(AssertionKind::AllowedResolversListed)?;
    Ok(same_members(&ast.allowed_resolvers, &expected))
}

pub(super) fn resolver_names_normalized(ast: &WorkflowAst) -> bool {
    ast.allowed_resolvers
        .iter()
        .all(|name| is_workflow_identifier(name))
}

pub(super) fn workflow_name_present(
    ast: &WorkflowAst,
    assertion: &Assertion,
) -> Result<bool, AssertionError> {
    let expected = assertion.require_expected(AssertionKind::WorkflowNamePresent)?;
    Ok(match (&ast.name, expected) {
        (Some(name), Value::String(expected)) => name == expected,
        _ => false,
    })
}

pub(super) fn workflow_return_values(
    kind: AssertionKind,
    ast: &WorkflowAst,
    assertion: &Assertion,
) -> Result<bool, AssertionError> {
    let expected = assertion.expected_strings(kind)?;
    Ok(same_members(&ast.return_values, &expected))
}

pub(super) fn no_parse_warnings(
    status: &ParseStatus,
    assertion: &Assertion,
) -> Result<bool, AssertionError> {
    let expected = match &assertion.expected {
        None => 0,
        Some(value) => value.as_u64().ok_or_else(|| AssertionError::InvalidParameter {
            kind: AssertionKind::NoParseWarnings.as_str(),
            param: "expected",
            reason: "expected a non-negative warning count".into(),
        })?,
    };
    Ok(status.warnings.len() as u64 == expected)
}

pub(super) fn step_type(ast: &WorkflowAst, assertion: &Assertion) -> Result<bool, AssertionError> {
    let kind = AssertionKind::StepType;
    let index = assertion.require_step_index(kind)?;
    let expected = assertion.require_expected(kind)?;
    Ok(ast
        .step(index)
        .and_then(|step| step.step_type.as_deref())
        .is_some_and(|actual| expected.as_str() == Some(actual)))
}

pub(super) fn step_save_as(
    ast: &WorkflowAst,
    assertion: &Assertion,
) -> Result<bool, AssertionError> {
    let kind = AssertionKind::StepSaveAs;
    let index = assertion.require_step_index(kind)?;
    let expected = assertion.require_expected(kind)?;
    Ok(ast
        .step(index)
        .and_then(|step| step.save_as.as_deref())
        .is_some_and(|actual| expected.as_str() == Some(actual)))
}

fn optional_str_matches(actual: Option<&str>, expected: Option<&Value>) -> bool {
    match (actual, expected) {
        (None, None) => true,
        (Some(actual), Some(Value::String(expected))) => actual == expected,
        _ => false,
    }
}

fn optional_count_matches(actual: Option<u64>, expected: Option<&Value>) -> bool {
    match (actual, expected) {
        (None, None) => true,
        (Some(actual), Some(expected)) => expected.as_u64() == Some(actual),
        _ => false,
    }
}

pub(super) fn step_failure_policies(
    ast: &WorkflowAst,
    assertion: &Assertion,
) -> Result<bool, AssertionError> {
    let kind = AssertionKind::StepFailurePolicies;
    let index = assertion.require_step_index(kind)?;
    let expected = assertion
        .require_expected(kind)?
        .as_object()
        .ok_or_else(|| AssertionError::InvalidParameter {
            kind: kind.as_str(),
            param: "expected",
            reason: "expected an object keyed by error code".into(),
        })?;

    let Some(policies) = ast
        .step(index)
        .and_then(|step| step.failure_policies.as_ref())
    else {
        return Ok(false);
    };

    Ok(expected.iter().all(|(code, wanted)| {
        policies.get(code).is_some_and(|policy| {
            optional_str_matches(policy.action.as_deref(), wanted.get("action"))
                && optional_count_matches(policy.count, wanted.get("count"))
        })
    }))
}

pub(super) fn contains_warning(
    status: &ParseStatus,
    assertion: &Assertion,
) -> Result<bool, AssertionError> {
    let needle = assertion
        .require_substring(AssertionKind::ContainsWarning)?
        .to_lowercase();
    Ok(status
        .warnings
        .iter()
        .any(|warning| warning.message().to_lowercase().contains(&needle)))
}

pub(super) fn status_greater_than(
    status: &ParseStatus,
    assertion: &Assertion,
) -> Result<bool, AssertionError> {
    let kind = AssertionKind::StatusGreaterThan;
    let path = PathExpr::parse(assertion.require_path(kind)?).map_err(|err| {
        AssertionError::InvalidParameter {
            kind: kind.as_str(),
            param: "path",
            reason: err.reason,
        }
    })?;
    let threshold = assertion
        .require_expected(kind)?
        .as_f64()
        .ok_or_else(|| AssertionError::InvalidParameter {
            kind: kind.as_str(),
            param: "expected",
            reason: "expected a number".into(),
        })?;

    let tree = status.to_value();
    Ok(path
        .lookup(&tree)
        .and_then(|value| value.as_f64())
        .is_some_and(|value| value > threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{FailurePolicy, ParseWarning, WorkflowStep};
    use proptest::prelude::*;
    use serde_json::{json, Map};

    fn ast() -> WorkflowAst {
        let mut policies = std::collections::BTreeMap::new();
        policies.insert(
            "E_TIMEOUT".to_string(),
            FailurePolicy {
                action: Some("retry".into()),
                count: Some(3),
            },
        );
        WorkflowAst {
            name: Some("Calculator".into()),
            allowed_resolvers: vec!["add".into(), "multiply".into()],
            steps: vec![
                WorkflowStep {
                    step_type: Some("action".into()),
                    save_as: Some("sum".into()),
                    failure_policies: Some(policies),
                    extra: Map::new(),
                },
                WorkflowStep {
                    step_type: Some("return".into()),
                    ..Default::default()
                },
            ],
            return_values: vec!["sum".into()],
        }
    }

    #[test]
    fn test_allowlist_exact_match() {
        let a = Assertion::new("A", "allowed_resolvers_listed").with_expected(json!(["multiply", "add"]));
        assert!(allowed_resolvers_listed(&ast(), &a).unwrap());
    }

    #[test]
    fn test_allowlist_extra_declared_member_fails() {
        let a = Assertion::new("A", "allowed_resolvers_listed").with_expected(json!(["add"]));
        assert!(!allowed_resolvers_listed(&ast(), &a).unwrap());
    }

    #[test]
    fn test_allowlist_missing_expected_is_authoring_error() {
        let a = Assertion::new("A", "allowed_resolvers_listed");
        assert!(matches!(
            allowed_resolvers_listed(&ast(), &a),
            Err(AssertionError::MissingParameter { param: "expected", .. })
        ));
    }

    #[test]
    fn test_resolver_names_normalized() {
        assert!(resolver_names_normalized(&ast()));
        let mut bad = ast();
        bad.allowed_resolvers.push("http_get".into());
        assert!(!resolver_names_normalized(&bad));
        assert!(resolver_names_normalized(&WorkflowAst::default()));
    }

    #[test]
    fn test_workflow_name() {
        let a = Assertion::new("N", "workflow_name_present").with_expected(json!("Calculator"));
        assert!(workflow_name_present(&ast(), &a).unwrap());
        assert!(!workflow_name_present(&WorkflowAst::default(), &a).unwrap());
    }

    #[test]
    fn test_return_values_empty() {
        let a = Assertion::new("R", "workflow_return_values_empty").with_expected(json!([]));
        assert!(workflow_return_values(
            AssertionKind::WorkflowReturnValuesEmpty,
            &WorkflowAst::default(),
            &a
        )
        .unwrap());
        assert!(!workflow_return_values(AssertionKind::WorkflowReturnValuesEmpty, &ast(), &a).unwrap());
    }

    #[test]
    fn test_step_inspection() {
        let t = Assertion::new("T", "step_type")
            .with_step_index(0)
            .with_expected(json!("action"));
        assert!(step_type(&ast(), &t).unwrap());

        let s = Assertion::new("S", "step_saveas")
            .with_step_index(1)
            .with_expected(json!("sum"));
        assert!(!step_save_as(&ast(), &s).unwrap());

        let out_of_range = Assertion::new("T", "step_type")
            .with_step_index(9)
            .with_expected(json!("action"));
        assert!(!step_type(&ast(), &out_of_range).unwrap());

        let negative = Assertion::new("T", "step_type")
            .with_step_index(-1)
            .with_expected(json!("action"));
        assert!(!step_type(&ast(), &negative).unwrap());
    }

    #[test]
    fn test_step_failure_policies() {
        let ok = Assertion::new("P", "step_failure_policies")
            .with_step_index(0)
            .with_expected(json!({ "E_TIMEOUT": { "action": "retry", "count": 3 } }));
        assert!(step_failure_policies(&ast(), &ok).unwrap());

        let wrong_count = Assertion::new("P", "step_failure_policies")
            .with_step_index(0)
            .with_expected(json!({ "E_TIMEOUT": { "action": "retry", "count": 1 } }));
        assert!(!step_failure_policies(&ast(), &wrong_count).unwrap());

        let unknown_code = Assertion::new("P", "step_failure_policies")
            .with_step_index(0)
            .with_expected(json!({ "E_OTHER": { "action": "abort" } }));
        assert!(!step_failure_policies(&ast(), &unknown_code).unwrap());

        let missing_step = Assertion::new("P", "step_failure_policies")
            .with_step_index(4)
            .with_expected(json!({}));
        assert!(!step_failure_policies(&ast(), &missing_step).unwrap());

        let no_policies = Assertion::new("P", "step_failure_policies")
            .with_step_index(1)
            .with_expected(json!({}));
        assert!(!step_failure_policies(&ast(), &no_policies).unwrap());
        let empty_policies = Assertion::new("P", "step_failure_policies")
            .with_step_index(0)
            .with_expected(json!({}));
        assert!(step_failure_policies(&ast(), &empty_policies).unwrap());
    }

    #[test]
    fn test_warnings() {
        let status = ParseStatus::with_warnings(vec![
            ParseWarning::Text("Unknown keyword 'Stepp'".into()),
            ParseWarning::Structured {
                message: Some("Missing RETURN".into()),
                extra: Map::new(),
            },
        ]);

        let none = Assertion::new("W", "no_parse_warnings");
        assert!(!no_parse_warnings(&status, &none).unwrap());
        assert!(no_parse_warnings(&ParseStatus::default(), &none).unwrap());
        let two = Assertion::new("W", "no_parse_warnings").with_expected(json!(2));
        assert!(no_parse_warnings(&status, &two).unwrap());

        let contains = Assertion::new("C", "contains_warning").with_expected_substring("missing return");
        assert!(contains_warning(&status, &contains).unwrap());
        let absent = Assertion::new("C", "contains_warning").with_expected_substring("syntax");
        assert!(!contains_warning(&status, &absent).unwrap());

        let gt = Assertion::new("G", "status_greater_than")
            .with_path("warnings.length")
            .with_expected(json!(1));
        assert!(status_greater_than(&status, &gt).unwrap());
        let underscored = Assertion::new("G", "status_greater_than")
            .with_path("__warnings.length")
            .with_expected(json!(0));
        assert!(status_greater_than(&status, &underscored).unwrap());
        assert!(!status_greater_than(&ParseStatus::default(), &underscored).unwrap());
        let missing = Assertion::new("G", "status_greater_than")
            .with_path("errors.count")
            .with_expected(json!(0));
        assert!(!status_greater_than(&status, &missing).unwrap());
        let malformed = Assertion::new("G", "status_greater_than")
            .with_path("a..b")
            .with_expected(json!(0));
        assert!(matches!(
            status_greater_than(&status, &malformed),
            Err(AssertionError::InvalidParameter { param: "path", .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_allowlist_matches_set_equality(
            declared in proptest::collection::hash_set("[a-z]{1,4}", 0..6),
            expected in proptest::collection::hash_set("[a-z]{1,4}", 0..6),
        ) {
            let declared: Vec<String> = declared.into_iter().collect();
            let expected_refs: Vec<&str> = expected.iter().map(String::as_str).collect();
            let set_equal = declared.len() == expected.len()
                && declared.iter().all(|d| expected.contains(d));
            prop_assert_eq!(same_members(&declared, &expected_refs), set_equal);
        }

        #[test]
        fn prop_superset_never_passes(
            base in proptest::collection::hash_set("[a-z]{1,4}", 0..5),
            extra in "[A-Z]{1,4}",
        ) {
            let expected: Vec<&str> = base.iter().map(String::as_str).collect();
            let mut declared: Vec<String> = base.iter().cloned().collect();
            declared.push(extra);
            prop_assert!(!same_members(&declared, &expected));
        }
    }
}
