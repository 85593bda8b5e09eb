//! Checks over a resolver's declared metadata

use super::is_metadata_identifier;
use crate::error::AssertionError;
use crate::registry::AssertionKind;
use crate::spec::Assertion;
use crate::target::ResolverContract;
use serde_json::Value;

fn has_string(entry: &Value, key: &str) -> bool {
    entry.get(key).is_some_and(Value::is_string)
}

pub(super) fn resolver_has_field(
    contract: &ResolverContract,
    assertion: &Assertion,
) -> Result<bool, AssertionError> {
    let kind = AssertionKind::ResolverHasField;
    let field = assertion.require_field(kind)?;
    let expected = assertion.require_expected(kind)?;
    Ok(contract.field(field) == Some(expected))
}

/// Every input declares a string name, a string type and a boolean
/// `required` flag. A missing `inputs` array fails.
pub(super) fn resolver_inputs_valid(contract: &ResolverContract) -> bool {
    contract.inputs().is_some_and(|inputs| {
        inputs.iter().all(|input| {
            has_string(input, "name")
                && has_string(input, "type")
                && input.get("required").is_some_and(Value::is_boolean)
        })
    })
}

/// Every output declares a string name and type. A resolver without outputs
/// (absent or null) is vacuously valid; any other non-array value is not.
pub(super) fn resolver_outputs_valid(contract: &ResolverContract) -> bool {
    match contract.field("outputs") {
        None | Some(Value::Null) => true,
        Some(Value::Array(outputs)) => outputs
            .iter()
            .all(|output| has_string(output, "name") && has_string(output, "type")),
        Some(_) => false,
    }
}

pub(super) fn field_names_normalized(
    contract: &ResolverContract,
    assertion: &Assertion,
) -> Result<bool, AssertionError> {
    let field = assertion.require_field(AssertionKind::FieldNamesNormalized)?;
    Ok(match contract.field(field) {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.iter().all(|item| {
            item.get("name")
                .and_then(Value::as_str)
                .is_some_and(is_metadata_identifier)
        }),
        Some(_) => false,
    })
}

/// Failures must be declared, and each carries a string code and a numeric
/// retry limit.
pub(super) fn resolver_failures_valid(contract: &ResolverContract) -> bool {
    contract.failures().is_some_and(|failures| {
        failures.iter().all(|failure| {
            has_string(failure, "code") && failure.get("retries").is_some_and(Value::is_number)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contract() -> ResolverContract {
        ResolverContract::new(json!({
            "resolverName": "weather_lookup",
            "version": "1.2.0",
            "inputs": [
                { "name": "city_name", "type": "string", "required": true },
                { "name": "units", "type": "string", "required": false }
            ],
            "outputs": [ { "name": "temperature", "type": "number" } ],
            "failures": [ { "code": "E_NOT_FOUND", "retries": 0 }, { "code": "E_UPSTREAM", "retries": 3 } ]
        }))
    }

    #[test]
    fn test_has_field() {
        let a = Assertion::new("F", "resolver_has_field")
            .with_field("version")
            .with_expected(json!("1.2.0"));
        assert!(resolver_has_field(&contract(), &a).unwrap());

        let missing = Assertion::new("F", "resolver_has_field")
            .with_field("license")
            .with_expected(json!("MIT"));
        assert!(!resolver_has_field(&contract(), &missing).unwrap());

        let no_field = Assertion::new("F", "resolver_has_field").with_expected(json!("x"));
        assert!(matches!(
            resolver_has_field(&contract(), &no_field),
            Err(AssertionError::MissingParameter { param: "field", .. })
        ));
    }

    #[test]
    fn test_inputs_valid() {
        assert!(resolver_inputs_valid(&contract()));
        assert!(!resolver_inputs_valid(&ResolverContract::new(json!({}))));
        assert!(resolver_inputs_valid(&ResolverContract::new(json!({ "inputs": [] }))));

        let stringly = ResolverContract::new(json!({
            "inputs": [ { "name": "x", "type": "string", "required": "true" } ]
        }));
        assert!(!resolver_inputs_valid(&stringly));

        let untyped = ResolverContract::new(json!({ "inputs": [ { "name": "x", "required": true } ] }));
        assert!(!resolver_inputs_valid(&untyped));

        let null_entry = ResolverContract::new(json!({ "inputs": [ null ] }));
        assert!(!resolver_inputs_valid(&null_entry));
    }

    #[test]
    fn test_outputs_valid() {
        assert!(resolver_outputs_valid(&contract()));
        assert!(resolver_outputs_valid(&ResolverContract::new(json!({}))));
        assert!(resolver_outputs_valid(&ResolverContract::new(json!({ "outputs": [] }))));
        assert!(!resolver_outputs_valid(&ResolverContract::new(json!({ "outputs": "sum" }))));
        assert!(!resolver_outputs_valid(&ResolverContract::new(
            json!({ "outputs": [ { "name": "sum" } ] })
        )));
    }

    #[test]
    fn test_field_names_allow_underscore() {
        let a = Assertion::new("N", "field_names_normalized").with_field("inputs");
        assert!(field_names_normalized(&contract(), &a).unwrap());

        let dashed = ResolverContract::new(json!({ "inputs": [ { "name": "city-name" } ] }));
        assert!(!field_names_normalized(&dashed, &a).unwrap());

        let nameless = ResolverContract::new(json!({ "inputs": [ { "type": "string" } ] }));
        assert!(!field_names_normalized(&nameless, &a).unwrap());

        assert!(field_names_normalized(&ResolverContract::new(json!({})), &a).unwrap());
    }

    #[test]
    fn test_failures_valid() {
        assert!(resolver_failures_valid(&contract()));
        assert!(!resolver_failures_valid(&ResolverContract::new(json!({}))));
        assert!(!resolver_failures_valid(&ResolverContract::new(
            json!({ "failures": [ { "code": "E_X", "retries": "3" } ] })
        )));
        assert!(!resolver_failures_valid(&ResolverContract::new(
            json!({ "failures": [ { "code": 7, "retries": 3 } ] })
        )));
    }
}
