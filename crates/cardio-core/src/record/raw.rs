//! Raw, untyped form values as they arrive from the front end.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::field::Field;
use super::schema::validate_raw_input_schema;

/// Errors that can occur when reading a raw input document.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read input file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Input does not match schema: {}", .0.join("; "))]
    SchemaError(Vec<String>),
}

/// A single scalar as supplied by the form: a number from a slider or a
/// string-encoded code from a selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Number(f64::from(value))
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

/// The 13 raw values of one submission, keyed by column name.
///
/// Absent keys and explicit nulls both deserialize to `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawInput {
    #[serde(default)]
    pub age: Option<RawValue>,
    #[serde(default)]
    pub sex: Option<RawValue>,
    #[serde(default)]
    pub cp: Option<RawValue>,
    #[serde(default)]
    pub trestbps: Option<RawValue>,
    #[serde(default)]
    pub chol: Option<RawValue>,
    #[serde(default)]
    pub fbs: Option<RawValue>,
    #[serde(default)]
    pub restecg: Option<RawValue>,
    #[serde(default)]
    pub thalach: Option<RawValue>,
    #[serde(default)]
    pub exang: Option<RawValue>,
    #[serde(default)]
    pub oldpeak: Option<RawValue>,
    #[serde(default)]
    pub slope: Option<RawValue>,
    #[serde(default)]
    pub ca: Option<RawValue>,
    #[serde(default)]
    pub thal: Option<RawValue>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse raw input from a JSON string, validating it against the input schema.
    pub fn from_json(json: &str) -> Result<Self, InputError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse raw input from a YAML string, validating it against the input schema.
    pub fn from_yaml(yaml: &str) -> Result<Self, InputError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Read raw input from a file. `.yaml` and `.yml` files are read as YAML,
    /// anything else as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            _ => Self::from_json(&contents),
        }
    }

    fn from_value(value: serde_json::Value) -> Result<Self, InputError> {
        validate_raw_input_schema(&value).map_err(InputError::SchemaError)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Value currently held for `field`.
    pub fn get(&self, field: Field) -> Option<&RawValue> {
        self.slot(field).as_ref()
    }

    /// Replace the value held for `field`.
    pub fn set(&mut self, field: Field, value: impl Into<RawValue>) {
        *self.slot_mut(field) = Some(value.into());
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, field: Field, value: impl Into<RawValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Clear the value held for `field`.
    pub fn clear(&mut self, field: Field) {
        *self.slot_mut(field) = None;
    }

    /// Overlay every value present in `other` onto `self`.
    pub fn merge(&mut self, other: RawInput) {
        for field in Field::ALL {
            if let Some(value) = other.slot(field).clone() {
                *self.slot_mut(field) = Some(value);
            }
        }
    }

    fn slot(&self, field: Field) -> &Option<RawValue> {
        match field {
            Field::Age => &self.age,
            Field::Sex => &self.sex,
            Field::ChestPain => &self.cp,
            Field::RestingBloodPressure => &self.trestbps,
            Field::Cholesterol => &self.chol,
            Field::FastingBloodSugar => &self.fbs,
            Field::RestingEcg => &self.restecg,
            Field::MaxHeartRate => &self.thalach,
            Field::ExerciseAngina => &self.exang,
            Field::StDepression => &self.oldpeak,
            Field::Slope => &self.slope,
            Field::MajorVessels => &self.ca,
            Field::Thal => &self.thal,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<RawValue> {
        match field {
            Field::Age => &mut self.age,
            Field::Sex => &mut self.sex,
            Field::ChestPain => &mut self.cp,
            Field::RestingBloodPressure => &mut self.trestbps,
            Field::Cholesterol => &mut self.chol,
            Field::FastingBloodSugar => &mut self.fbs,
            Field::RestingEcg => &mut self.restecg,
            Field::MaxHeartRate => &mut self.thalach,
            Field::ExerciseAngina => &mut self.exang,
            Field::StDepression => &mut self.oldpeak,
            Field::Slope => &mut self.slope,
            Field::MajorVessels => &mut self.ca,
            Field::Thal => &mut self.thal,
        }
    }
}
