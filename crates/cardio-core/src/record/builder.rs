//! Record Builder & Validator.
//!
//! Every raw value is parsed into its declared type independently, the
//! per-field outcomes are collected, and only a fully valid set of 13
//! values is assembled into a [`PatientRecord`].

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use super::codes::{
    CategoricalCode, ChestPain, ExerciseAngina, FastingBloodSugar, MajorVessels, RestingEcg, Sex,
    StSlope, Thalassemia,
};
use super::field::{Field, FieldKind};
use super::raw::{RawInput, RawValue};

lazy_static! {
    // Integer-like strings: optional surrounding whitespace and sign.
    static ref INTEGER_CODE: Regex = Regex::new(r"^\s*[+-]?\d+\s*$").unwrap();
}

/// Why a single field could not be parsed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("{field} is missing")]
    Missing { field: Field },

    #[error("{field}: cannot interpret {value} as {expected}")]
    Unparseable {
        field: Field,
        value: String,
        expected: FieldKind,
    },

    #[error("{field}: {value} is outside {min}..={max}")]
    OutOfRange {
        field: Field,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field}: code {code} is not one of {allowed:?}")]
    UnknownCode {
        field: Field,
        code: i64,
        allowed: &'static [u8],
    },
}

impl FieldError {
    pub fn field(&self) -> Field {
        match self {
            FieldError::Missing { field }
            | FieldError::Unparseable { field, .. }
            | FieldError::OutOfRange { field, .. }
            | FieldError::UnknownCode { field, .. } => *field,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldError::Missing { .. })
    }
}

/// Errors that reject a whole submission.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// One or more fields are absent or null.
    #[error("contains null values: {}", join_fields(.fields))]
    Validation { fields: Vec<Field> },

    /// Every field is present but at least one could not be coerced.
    #[error("{} field(s) failed coercion: {}", .errors.len(), join_errors(.errors))]
    Coercion { errors: Vec<FieldError> },
}

impl RecordError {
    /// Fields implicated in this error, in column order.
    pub fn fields(&self) -> Vec<Field> {
        match self {
            RecordError::Validation { fields } => fields.clone(),
            RecordError::Coercion { errors } => errors.iter().map(FieldError::field).collect(),
        }
    }

    fn from_field_errors(errors: Vec<FieldError>) -> Self {
        let missing: Vec<Field> = errors
            .iter()
            .filter(|e| e.is_missing())
            .map(FieldError::field)
            .collect();

        if missing.is_empty() {
            RecordError::Coercion { errors }
        } else {
            RecordError::Validation { fields: missing }
        }
    }
}

impl From<FieldError> for RecordError {
    fn from(error: FieldError) -> Self {
        RecordError::from_field_errors(vec![error])
    }
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| field.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A value as the classifier sees it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Numeric(f64),
    Categorical(u8),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Numeric(_) => FieldKind::Numeric,
            FieldValue::Categorical(_) => FieldKind::Categorical,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Numeric(v) => Some(*v),
            FieldValue::Categorical(_) => None,
        }
    }

    pub fn as_code(&self) -> Option<u8> {
        match self {
            FieldValue::Numeric(_) => None,
            FieldValue::Categorical(c) => Some(*c),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Numeric(v) => write!(f, "{:?}", v),
            FieldValue::Categorical(c) => write!(f, "{}", c),
        }
    }
}

/// A validated single-row input for the classifier.
///
/// Only [`build_record`] produces this type, so every instance has all 13
/// fields typed and in range. Serializes with the classifier's column names
/// in column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientRecord {
    age: f64,
    sex: Sex,
    #[serde(rename = "cp")]
    chest_pain: ChestPain,
    #[serde(rename = "trestbps")]
    resting_blood_pressure: f64,
    #[serde(rename = "chol")]
    cholesterol: f64,
    #[serde(rename = "fbs")]
    fasting_blood_sugar: FastingBloodSugar,
    #[serde(rename = "restecg")]
    resting_ecg: RestingEcg,
    #[serde(rename = "thalach")]
    max_heart_rate: f64,
    #[serde(rename = "exang")]
    exercise_angina: ExerciseAngina,
    #[serde(rename = "oldpeak")]
    st_depression: f64,
    slope: StSlope,
    #[serde(rename = "ca")]
    major_vessels: MajorVessels,
    thal: Thalassemia,
}

impl PatientRecord {
    pub fn age(&self) -> f64 {
        self.age
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn chest_pain(&self) -> ChestPain {
        self.chest_pain
    }

    pub fn resting_blood_pressure(&self) -> f64 {
        self.resting_blood_pressure
    }

    pub fn cholesterol(&self) -> f64 {
        self.cholesterol
    }

    pub fn fasting_blood_sugar(&self) -> FastingBloodSugar {
        self.fasting_blood_sugar
    }

    pub fn resting_ecg(&self) -> RestingEcg {
        self.resting_ecg
    }

    pub fn max_heart_rate(&self) -> f64 {
        self.max_heart_rate
    }

    pub fn exercise_angina(&self) -> ExerciseAngina {
        self.exercise_angina
    }

    pub fn st_depression(&self) -> f64 {
        self.st_depression
    }

    pub fn slope(&self) -> StSlope {
        self.slope
    }

    pub fn major_vessels(&self) -> MajorVessels {
        self.major_vessels
    }

    pub fn thal(&self) -> Thalassemia {
        self.thal
    }

    /// Value of a single column.
    pub fn value(&self, field: Field) -> FieldValue {
        match field {
            Field::Age => FieldValue::Numeric(self.age),
            Field::Sex => FieldValue::Categorical(self.sex.code()),
            Field::ChestPain => FieldValue::Categorical(self.chest_pain.code()),
            Field::RestingBloodPressure => FieldValue::Numeric(self.resting_blood_pressure),
            Field::Cholesterol => FieldValue::Numeric(self.cholesterol),
            Field::FastingBloodSugar => FieldValue::Categorical(self.fasting_blood_sugar.code()),
            Field::RestingEcg => FieldValue::Categorical(self.resting_ecg.code()),
            Field::MaxHeartRate => FieldValue::Numeric(self.max_heart_rate),
            Field::ExerciseAngina => FieldValue::Categorical(self.exercise_angina.code()),
            Field::StDepression => FieldValue::Numeric(self.st_depression),
            Field::Slope => FieldValue::Categorical(self.slope.code()),
            Field::MajorVessels => FieldValue::Categorical(self.major_vessels.code()),
            Field::Thal => FieldValue::Categorical(self.thal.code()),
        }
    }

    /// All columns in classifier order.
    pub fn columns(&self) -> [(Field, FieldValue); 13] {
        Field::ALL.map(|field| (field, self.value(field)))
    }
}

/// Build and validate a [`PatientRecord`] from raw form values.
///
/// Missing or null fields take precedence: if any field is absent the
/// result is [`RecordError::Validation`] naming every absent column.
/// Otherwise all coercion failures are reported together.
pub fn build_record(input: &RawInput) -> Result<PatientRecord, RecordError> {
    let age = numeric(Field::Age, input);
    let sex = categorical::<Sex>(input);
    let chest_pain = categorical::<ChestPain>(input);
    let resting_blood_pressure = numeric(Field::RestingBloodPressure, input);
    let cholesterol = numeric(Field::Cholesterol, input);
    let fasting_blood_sugar = categorical::<FastingBloodSugar>(input);
    let resting_ecg = categorical::<RestingEcg>(input);
    let max_heart_rate = numeric(Field::MaxHeartRate, input);
    let exercise_angina = categorical::<ExerciseAngina>(input);
    let st_depression = numeric(Field::StDepression, input);
    let slope = categorical::<StSlope>(input);
    let major_vessels = categorical::<MajorVessels>(input);
    let thal = categorical::<Thalassemia>(input);

    let errors: Vec<FieldError> = [
        age.as_ref().err(),
        sex.as_ref().err(),
        chest_pain.as_ref().err(),
        resting_blood_pressure.as_ref().err(),
        cholesterol.as_ref().err(),
        fasting_blood_sugar.as_ref().err(),
        resting_ecg.as_ref().err(),
        max_heart_rate.as_ref().err(),
        exercise_angina.as_ref().err(),
        st_depression.as_ref().err(),
        slope.as_ref().err(),
        major_vessels.as_ref().err(),
        thal.as_ref().err(),
    ]
    .into_iter()
    .flatten()
    .cloned()
    .collect();

    if !errors.is_empty() {
        tracing::debug!(failed = errors.len(), "Patient record rejected");
        return Err(RecordError::from_field_errors(errors));
    }

    Ok(PatientRecord {
        age: age?,
        sex: sex?,
        chest_pain: chest_pain?,
        resting_blood_pressure: resting_blood_pressure?,
        cholesterol: cholesterol?,
        fasting_blood_sugar: fasting_blood_sugar?,
        resting_ecg: resting_ecg?,
        max_heart_rate: max_heart_rate?,
        exercise_angina: exercise_angina?,
        st_depression: st_depression?,
        slope: slope?,
        major_vessels: major_vessels?,
        thal: thal?,
    })
}

/// Parse a numeric field to `f64` and check its declared range.
fn numeric(field: Field, input: &RawInput) -> Result<f64, FieldError> {
    let value = match input.get(field) {
        None => return Err(FieldError::Missing { field }),
        Some(RawValue::Number(n)) => *n,
        Some(RawValue::Text(s)) => s.trim().parse::<f64>().map_err(|_| FieldError::Unparseable {
            field,
            value: format!("{:?}", s),
            expected: FieldKind::Numeric,
        })?,
    };

    // NaN is how a blank numeric cell reaches us
    if value.is_nan() {
        return Err(FieldError::Missing { field });
    }

    if let Some(range) = field.range() {
        if !range.contains(&value) {
            return Err(FieldError::OutOfRange {
                field,
                value,
                min: *range.start(),
                max: *range.end(),
            });
        }
    }

    Ok(value)
}

/// Parse a categorical field into its code type.
fn categorical<T: CategoricalCode>(input: &RawInput) -> Result<T, FieldError> {
    let field = T::FIELD;
    let unparseable = |value: &RawValue| FieldError::Unparseable {
        field,
        value: value.to_string(),
        expected: FieldKind::Categorical,
    };

    let raw = input.get(field).ok_or(FieldError::Missing { field })?;
    let code: i64 = match raw {
        RawValue::Text(s) if INTEGER_CODE.is_match(s) => {
            s.trim().parse().map_err(|_| unparseable(raw))?
        }
        RawValue::Text(_) => return Err(unparseable(raw)),
        RawValue::Number(n) if n.is_nan() => return Err(FieldError::Missing { field }),
        RawValue::Number(n) if n.is_finite() && n.fract() == 0.0 => *n as i64,
        RawValue::Number(_) => return Err(unparseable(raw)),
    };

    u8::try_from(code)
        .ok()
        .and_then(T::from_code)
        .ok_or(FieldError::UnknownCode {
            field,
            code,
            allowed: T::CODES,
        })
}
