//! Prediction service: record builder → classifier → diagnosis report.
//!
//! The classifier and specialist directory are constructed once by the
//! caller and injected here. The service holds no mutable state, so one
//! instance serves every request.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::classifier::{single_label, Classifier, ClassifierError};
use crate::diagnosis::{Diagnosis, DiagnosisReport};
use crate::record::{build_record, PatientRecord, RawInput, RecordError};
use crate::specialists::{default_categories, SpecialistCategory, SpecialistDirectory};

/// Errors that abort a single prediction.
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Invalid patient record: {0}")]
    Record(#[from] RecordError),

    #[error("Classifier failed: {0}")]
    Classifier(#[from] ClassifierError),
}

/// Runs predictions against an injected classifier.
pub struct PredictionService {
    classifier: Arc<dyn Classifier>,
    directory: Arc<dyn SpecialistDirectory>,
    specialists: Vec<SpecialistCategory>,
}

impl PredictionService {
    /// Create a service recommending the default specialist categories.
    pub fn new(classifier: Arc<dyn Classifier>, directory: Arc<dyn SpecialistDirectory>) -> Self {
        Self {
            classifier,
            directory,
            specialists: default_categories(),
        }
    }

    /// Replace the specialist categories linked when disease is likely.
    pub fn with_specialists(mut self, specialists: Vec<SpecialistCategory>) -> Self {
        self.specialists = specialists;
        self
    }

    /// Validate raw form values and predict.
    pub fn predict(&self, input: &RawInput) -> Result<DiagnosisReport, PredictionError> {
        let record = build_record(input)?;
        self.predict_record(record)
    }

    /// Predict for an already validated record.
    pub fn predict_record(&self, record: PatientRecord) -> Result<DiagnosisReport, PredictionError> {
        let labels = self.classifier.predict(std::slice::from_ref(&record))?;
        let diagnosis = Diagnosis::from_label(single_label(&labels)?)?;
        let probability = self.classifier.probability(&record);

        tracing::info!(
            classifier = self.classifier.name(),
            diagnosis = %diagnosis,
            probability = ?probability,
            "Prediction complete"
        );

        let specialists = if diagnosis.is_likely() {
            self.specialists
                .iter()
                .map(|category| self.directory.link(category))
                .collect()
        } else {
            Vec::new()
        };

        Ok(DiagnosisReport {
            diagnosis,
            record,
            specialists,
            classifier: self.classifier.name().to_string(),
            probability,
            evaluated_at: Utc::now(),
        })
    }
}
