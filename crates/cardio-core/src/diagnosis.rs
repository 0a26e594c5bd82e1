//! Diagnosis: maps a classifier label to the message shown to the user.
//!
//! There are exactly two branches. "Disease likely" carries specialist
//! links; "disease unlikely" carries none.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::{ClassifierError, LABEL_DISEASE, LABEL_NO_DISEASE};
use crate::record::PatientRecord;
use crate::specialists::SpecialistLink;

/// Outcome of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnosis {
    DiseaseLikely,
    DiseaseUnlikely,
}

impl Diagnosis {
    /// Interpret a classifier label.
    pub fn from_label(label: u8) -> Result<Self, ClassifierError> {
        match label {
            LABEL_DISEASE => Ok(Diagnosis::DiseaseLikely),
            LABEL_NO_DISEASE => Ok(Diagnosis::DiseaseUnlikely),
            other => Err(ClassifierError::InvalidLabel(other)),
        }
    }

    pub fn is_likely(&self) -> bool {
        matches!(self, Diagnosis::DiseaseLikely)
    }

    pub fn headline(&self) -> &'static str {
        match self {
            Diagnosis::DiseaseLikely => "The patient has high chances of having heart disease",
            Diagnosis::DiseaseUnlikely => "The patient does not have heart disease",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnosis::DiseaseLikely => write!(f, "DISEASE LIKELY"),
            Diagnosis::DiseaseUnlikely => write!(f, "DISEASE UNLIKELY"),
        }
    }
}

/// Everything produced by one prediction.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisReport {
    pub diagnosis: Diagnosis,

    /// The record the classifier saw
    pub record: PatientRecord,

    /// Empty unless disease is likely
    pub specialists: Vec<SpecialistLink>,

    /// Name of the classifier that produced the label
    pub classifier: String,

    /// Positive-class probability, when the classifier exposes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,

    pub evaluated_at: DateTime<Utc>,
}

impl DiagnosisReport {
    /// Render the user-facing message.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(self.diagnosis.headline());
        out.push('\n');

        if self.diagnosis.is_likely() {
            out.push_str("---\n");
            out.push_str(
                "If you are a patient, consult with one of the following doctors immediately\n",
            );
            out.push_str("\nSpecialists\n");
            out.push_str(
                "Click on the specialists to get the specialists nearest to your location\n",
            );
            for link in &self.specialists {
                out.push_str(&format!("- [{}]({})\n", link.title, link.url));
            }
            out.push_str("---\n");
        }

        out
    }
}

impl fmt::Display for DiagnosisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{build_record, Field, RawInput};

    fn record() -> PatientRecord {
        let input = RawInput::new()
            .with(Field::Age, 45)
            .with(Field::Sex, "0")
            .with(Field::ChestPain, "1")
            .with(Field::RestingBloodPressure, 120)
            .with(Field::Cholesterol, 200)
            .with(Field::FastingBloodSugar, "0")
            .with(Field::RestingEcg, "1")
            .with(Field::MaxHeartRate, 170)
            .with(Field::ExerciseAngina, "0")
            .with(Field::StDepression, 0.0)
            .with(Field::Slope, "2")
            .with(Field::MajorVessels, "0")
            .with(Field::Thal, "2");
        build_record(&input).unwrap()
    }

    fn report(diagnosis: Diagnosis, specialists: Vec<SpecialistLink>) -> DiagnosisReport {
        DiagnosisReport {
            diagnosis,
            record: record(),
            specialists,
            classifier: "test".to_string(),
            probability: None,
            evaluated_at: Utc::now(),
        }
    }

    #[test]
    fn test_from_label() {
        assert_eq!(Diagnosis::from_label(1).unwrap(), Diagnosis::DiseaseLikely);
        assert_eq!(Diagnosis::from_label(0).unwrap(), Diagnosis::DiseaseUnlikely);
        assert_eq!(
            Diagnosis::from_label(7),
            Err(ClassifierError::InvalidLabel(7))
        );
    }

    #[test]
    fn test_likely_renders_links() {
        let links = vec![
            SpecialistLink {
                title: "Primary Care Doctor".to_string(),
                category: "Primary Care Provider".to_string(),
                url: "https://example.com/pcp".to_string(),
            },
            SpecialistLink {
                title: "Cardiologist".to_string(),
                category: "Cardiologist".to_string(),
                url: "https://example.com/cardio".to_string(),
            },
        ];
        let text = report(Diagnosis::DiseaseLikely, links).render_text();

        assert!(text.starts_with("The patient has high chances of having heart disease"));
        assert!(text.contains("consult with one of the following doctors immediately"));
        assert!(text.contains("- [Primary Care Doctor](https://example.com/pcp)"));
        assert!(text.contains("- [Cardiologist](https://example.com/cardio)"));
    }

    #[test]
    fn test_unlikely_renders_single_line() {
        let text = report(Diagnosis::DiseaseUnlikely, vec![]).render_text();
        assert_eq!(text, "The patient does not have heart disease\n");
    }

    #[test]
    fn test_report_serializes_record_with_codes() {
        let json = serde_json::to_value(report(Diagnosis::DiseaseUnlikely, vec![])).unwrap();
        assert_eq!(json["diagnosis"], "disease_unlikely");
        assert_eq!(json["record"]["thal"], 2);
        assert_eq!(json["record"]["chol"], 200.0);
        assert!(json.get("probability").is_none());
    }
}
