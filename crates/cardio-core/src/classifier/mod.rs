//! Classifier abstraction.
//!
//! The classifier is an external collaborator: it receives validated
//! records and returns one binary label per record. This module defines
//! the trait and ships a tree-ensemble implementation that loads a
//! pre-trained artifact from disk.

use thiserror::Error;

use crate::record::PatientRecord;

mod ensemble;

pub use ensemble::{ArtifactError, Node, Tree, TreeEnsemble, ARTIFACT_FORMAT, ARTIFACT_VERSION};

/// Label meaning "no heart disease".
pub const LABEL_NO_DISEASE: u8 = 0;

/// Label meaning "heart disease".
pub const LABEL_DISEASE: u8 = 1;

/// Errors from classifier invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Classifier returned no labels")]
    EmptyOutput,

    #[error("Classifier returned label {0}, expected 0 or 1")]
    InvalidLabel(u8),

    #[error("Classifier returned {actual} labels for {expected} records")]
    LengthMismatch { expected: usize, actual: usize },
}

/// A pre-trained binary classifier.
///
/// Implementations must be read-only after construction so a single
/// instance can serve any number of predictions.
pub trait Classifier: Send + Sync {
    /// Name used in reports and logs.
    fn name(&self) -> &str;

    /// Predict one label in {0, 1} per record, in input order.
    fn predict(&self, records: &[PatientRecord]) -> Result<Vec<u8>, ClassifierError>;

    /// Probability of the positive class, when the model exposes one.
    fn probability(&self, _record: &PatientRecord) -> Option<f64> {
        None
    }
}

/// Check a classifier's output against the labels contract and return the
/// label for a single-record prediction.
pub fn single_label(labels: &[u8]) -> Result<u8, ClassifierError> {
    match labels {
        [] => Err(ClassifierError::EmptyOutput),
        [label] if *label <= LABEL_DISEASE => Ok(*label),
        [label] => Err(ClassifierError::InvalidLabel(*label)),
        more => Err(ClassifierError::LengthMismatch {
            expected: 1,
            actual: more.len(),
        }),
    }
}
