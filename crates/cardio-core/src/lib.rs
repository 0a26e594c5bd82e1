//! # cardio-core
//!
//! Patient record validation and heart-disease classifier runtime.
//!
//! This crate turns 13 raw intake-form values into a typed
//! [`PatientRecord`], runs a pre-trained binary classifier on it, and
//! produces a [`DiagnosisReport`]:
//! - Is every field present, typed and in range?
//! - Does the classifier see its columns in the order it was trained on?
//! - Which specialists should the patient see?
//!
//! ## Key Guarantees
//!
//! 1. **Complete**: a record missing any field is rejected before prediction
//! 2. **Typed**: numeric fields are always `f64`, categorical fields always discrete codes
//! 3. **Schema-locked**: artifacts whose feature list differs from the record schema fail to load
//! 4. **Injected**: the classifier is an explicit dependency, loaded once and shared read-only
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cardio_core::{Field, PredictionService, RawInput, SearchEngineDirectory, TreeEnsemble};
//!
//! let model = TreeEnsemble::from_file("models/heart_gb.json")?;
//! let service = PredictionService::new(Arc::new(model), Arc::new(SearchEngineDirectory::default()));
//!
//! let input = RawInput::new()
//!     .with(Field::Age, 63)
//!     .with(Field::Sex, "1")
//!     // ...the remaining 11 fields
//!     .with(Field::Thal, "1");
//!
//! let report = service.predict(&input)?;
//! println!("{}", report);
//! ```

pub mod classifier;
pub mod config;
pub mod diagnosis;
pub mod record;
pub mod service;
pub mod specialists;

// Re-export main types at crate root
pub use classifier::{ArtifactError, Classifier, ClassifierError, TreeEnsemble};
pub use config::{AppConfig, ConfigError, SpecialistConfig};
pub use diagnosis::{Diagnosis, DiagnosisReport};
pub use record::{
    build_record, Field, FieldError, FieldKind, FieldValue, InputError, PatientRecord, RawInput,
    RawValue, RecordError,
};
pub use service::{PredictionError, PredictionService};
pub use specialists::{
    SearchEngineDirectory, SpecialistCategory, SpecialistDirectory, SpecialistLink,
};

use std::sync::Arc;

/// Build a prediction service from configuration.
///
/// Loads the classifier artifact named by `config.model_path`. A load
/// failure is returned to the caller, which should treat it as fatal.
pub fn service_from_config(config: &AppConfig) -> Result<PredictionService, ArtifactError> {
    let model = TreeEnsemble::from_file(&config.model_path)?;
    let directory = config.specialists.directory();

    Ok(PredictionService::new(Arc::new(model), Arc::new(directory))
        .with_specialists(config.specialists.categories.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn shipped_model_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/heart_gb.json")
    }

    fn scenario_a() -> RawInput {
        RawInput::from_json(
            r#"{
                "age": 63, "sex": "1", "cp": "3", "trestbps": 145, "chol": 233,
                "fbs": "1", "restecg": "0", "thalach": 150, "exang": "0",
                "oldpeak": 2.3, "slope": "0", "ca": "0", "thal": "1"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_end_to_end_disease_likely() {
        let config = AppConfig {
            model_path: shipped_model_path(),
            ..AppConfig::default()
        };
        let service = service_from_config(&config).unwrap();
        let report = service.predict(&scenario_a()).unwrap();

        assert_eq!(report.diagnosis, Diagnosis::DiseaseLikely);
        assert_eq!(report.classifier, "heart_gb");
        assert_eq!(report.specialists.len(), 2);
        assert!(report.probability.unwrap() > 0.5);
        assert!(report.render_text().contains("- [Cardiologist]("));
    }

    #[test]
    fn test_end_to_end_missing_field() {
        let config = AppConfig {
            model_path: shipped_model_path(),
            ..AppConfig::default()
        };
        let service = service_from_config(&config).unwrap();
        let mut input = scenario_a();
        input.clear(Field::Cholesterol);

        let err = service.predict(&input).unwrap_err();
        assert!(err.to_string().contains("contains null values: chol"));
    }

    #[test]
    fn test_missing_artifact_is_fatal() {
        let config = AppConfig {
            model_path: PathBuf::from("/nonexistent/model.json"),
            ..AppConfig::default()
        };
        assert!(matches!(
            service_from_config(&config),
            Err(ArtifactError::IoError { .. })
        ));
    }
}
