//! The fixed column schema shared by the record builder and the classifier.
//!
//! Column names and their order are the contract with the classifier
//! artifact. Every place that enumerates fields goes through [`Field::ALL`].

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::codes::{
    CategoricalCode, ChestPain, ExerciseAngina, FastingBloodSugar, MajorVessels, RestingEcg, Sex,
    StSlope, Thalassemia,
};

/// Semantic class of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Continuous measurement, always stored as `f64`
    Numeric,

    /// Discrete code, never used arithmetically
    Categorical,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Numeric => write!(f, "numeric"),
            FieldKind::Categorical => write!(f, "categorical"),
        }
    }
}

/// One column of a [`PatientRecord`](super::PatientRecord).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Age,
    Sex,
    #[serde(rename = "cp")]
    ChestPain,
    #[serde(rename = "trestbps")]
    RestingBloodPressure,
    #[serde(rename = "chol")]
    Cholesterol,
    #[serde(rename = "fbs")]
    FastingBloodSugar,
    #[serde(rename = "restecg")]
    RestingEcg,
    #[serde(rename = "thalach")]
    MaxHeartRate,
    #[serde(rename = "exang")]
    ExerciseAngina,
    #[serde(rename = "oldpeak")]
    StDepression,
    Slope,
    #[serde(rename = "ca")]
    MajorVessels,
    Thal,
}

impl Field {
    /// All fields in classifier column order.
    pub const ALL: [Field; 13] = [
        Field::Age,
        Field::Sex,
        Field::ChestPain,
        Field::RestingBloodPressure,
        Field::Cholesterol,
        Field::FastingBloodSugar,
        Field::RestingEcg,
        Field::MaxHeartRate,
        Field::ExerciseAngina,
        Field::StDepression,
        Field::Slope,
        Field::MajorVessels,
        Field::Thal,
    ];

    /// Column name expected by the classifier.
    pub fn name(self) -> &'static str {
        match self {
            Field::Age => "age",
            Field::Sex => "sex",
            Field::ChestPain => "cp",
            Field::RestingBloodPressure => "trestbps",
            Field::Cholesterol => "chol",
            Field::FastingBloodSugar => "fbs",
            Field::RestingEcg => "restecg",
            Field::MaxHeartRate => "thalach",
            Field::ExerciseAngina => "exang",
            Field::StDepression => "oldpeak",
            Field::Slope => "slope",
            Field::MajorVessels => "ca",
            Field::Thal => "thal",
        }
    }

    /// Position of this field in [`Field::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Age
            | Field::RestingBloodPressure
            | Field::Cholesterol
            | Field::MaxHeartRate
            | Field::StDepression => FieldKind::Numeric,
            _ => FieldKind::Categorical,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.kind() == FieldKind::Numeric
    }

    /// Prompt shown for this field on the intake form.
    pub fn prompt(self) -> &'static str {
        match self {
            Field::Age => "Age in years",
            Field::Sex => "Gender (1 = male; 0 = female)",
            Field::ChestPain => "Chest pain type",
            Field::RestingBloodPressure => {
                "Resting blood pressure (in mm Hg on admission to the hospital)"
            }
            Field::Cholesterol => "Serum cholesterol in mg/dl",
            Field::FastingBloodSugar => "Fasting blood sugar > 120 mg/dl (1 = true; 0 = false)",
            Field::RestingEcg => "Resting electrocardiographic results",
            Field::MaxHeartRate => "Maximum heart rate achieved",
            Field::ExerciseAngina => "Exercise induced angina (1 = yes; 0 = no)",
            Field::StDepression => "ST depression induced by exercise relative to rest",
            Field::Slope => "The slope of the peak exercise ST segment",
            Field::MajorVessels => "Number of major vessels (0-4) colored by fluoroscopy",
            Field::Thal => "Thalassemia (1 = normal; 2 = fixed defect; 3 = reversible defect)",
        }
    }

    /// Inclusive range accepted for a numeric field, `None` for categorical ones.
    pub fn range(self) -> Option<RangeInclusive<f64>> {
        match self {
            Field::Age => Some(25.0..=80.0),
            Field::RestingBloodPressure => Some(90.0..=200.0),
            Field::Cholesterol => Some(120.0..=570.0),
            Field::MaxHeartRate => Some(70.0..=200.0),
            Field::StDepression => Some(0.0..=7.0),
            _ => None,
        }
    }

    /// Codes accepted for a categorical field, empty for numeric ones.
    pub fn codes(self) -> &'static [u8] {
        match self {
            Field::Sex => Sex::CODES,
            Field::ChestPain => ChestPain::CODES,
            Field::FastingBloodSugar => FastingBloodSugar::CODES,
            Field::RestingEcg => RestingEcg::CODES,
            Field::ExerciseAngina => ExerciseAngina::CODES,
            Field::Slope => StSlope::CODES,
            Field::MajorVessels => MajorVessels::CODES,
            Field::Thal => Thalassemia::CODES,
            _ => &[],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a column name is not part of the schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown field '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Column names in classifier order.
pub fn field_names() -> [&'static str; 13] {
    Field::ALL.map(Field::name)
}
