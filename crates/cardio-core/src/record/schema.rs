//! JSON Schema validation for raw input documents.
//!
//! Input files are checked against `schema/raw_input.schema.json` before
//! they are deserialized, so unknown keys and wrong JSON types are reported
//! with their location. Missing fields are left to the record builder.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded input schema (loaded at compile time).
const RAW_INPUT_SCHEMA_JSON: &str = include_str!("../../schema/raw_input.schema.json");

static INPUT_VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Raw input schema unavailable: {0}")]
    Unavailable(String),
}

fn compile_input_schema() -> Result<jsonschema::Validator, String> {
    let schema: serde_json::Value = serde_json::from_str(RAW_INPUT_SCHEMA_JSON)
        .map_err(|e| format!("embedded schema is not JSON: {}", e))?;
    jsonschema::options()
        .build(&schema)
        .map_err(|e| format!("embedded schema does not compile: {}", e))
}

fn input_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    INPUT_VALIDATOR
        .get_or_init(compile_input_schema)
        .as_ref()
        .map_err(|e| SchemaError::Unavailable(e.clone()))
}

/// Validate a raw input document against the schema.
///
/// Returns every violation as `"<message> at <path>"`.
pub fn validate_raw_input_schema(input: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = input_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(input)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_numbers_and_strings_pass() {
        let value = serde_json::json!({
            "age": 63,
            "sex": "1",
            "cp": 3,
            "trestbps": "145",
            "oldpeak": 2.3
        });
        assert!(validate_raw_input_schema(&value).is_ok());
    }

    #[test]
    fn test_nulls_and_missing_keys_pass() {
        // presence is the record builder's concern
        let value = serde_json::json!({ "age": null });
        assert!(validate_raw_input_schema(&value).is_ok());
    }

    #[test]
    fn test_unknown_key_fails() {
        let value = serde_json::json!({ "age": 63, "bmi": 27.1 });
        let errors = validate_raw_input_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_boolean_value_fails() {
        let value = serde_json::json!({ "exang": true });
        let errors = validate_raw_input_schema(&value).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("/exang")));
    }

    #[test]
    fn test_embedded_schema_compiles() {
        assert!(input_validator().is_ok());
    }

    #[test]
    fn test_non_object_fails() {
        let value = serde_json::json!([63, "1"]);
        assert!(validate_raw_input_schema(&value).is_err());
    }
}
