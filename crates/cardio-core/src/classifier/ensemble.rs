//! Gradient-boosted decision-tree ensemble loaded from a JSON artifact.
//!
//! The artifact is trained elsewhere. At load time it is checked against
//! the record schema: its feature list must equal [`Field::ALL`] by name
//! and position, and every split must test a column of the matching kind.
//! A loaded ensemble is immutable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Classifier, ClassifierError, LABEL_DISEASE, LABEL_NO_DISEASE};
use crate::record::{field_names, Field, FieldKind, FieldValue, PatientRecord};

/// Value of the artifact's `format` key.
pub const ARTIFACT_FORMAT: &str = "cardio-tree-ensemble";

/// Highest artifact version this build understands.
pub const ARTIFACT_VERSION: u32 = 1;

/// Errors that can occur when loading a classifier artifact.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to read model artifact {path}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse model artifact: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported artifact format '{format}' version {version}")]
    UnsupportedFormat { format: String, version: u32 },

    #[error("Feature mismatch at position {position}: expected '{expected}', found {found:?}")]
    FeatureMismatch {
        position: usize,
        expected: String,
        found: Option<String>,
    },

    #[error("Invalid model artifact: {0}")]
    Invalid(String),
}

/// A node of a regression tree.
///
/// Split nodes send a record to `yes` when the test holds, else to `no`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "NodeRepr", into = "NodeRepr")]
pub enum Node {
    Leaf {
        leaf: f64,
    },

    /// `value <= threshold`
    Numeric {
        feature: Field,
        threshold: f64,
        yes: usize,
        no: usize,
    },

    /// `code ∈ categories`
    Categorical {
        feature: Field,
        categories: Vec<u8>,
        yes: usize,
        no: usize,
    },
}

// On-disk node shapes. Each rejects keys of the others, so a node can
// match at most one shape.

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LeafRepr {
    leaf: f64,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct NumericRepr {
    feature: Field,
    threshold: f64,
    yes: usize,
    no: usize,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoricalRepr {
    feature: Field,
    categories: Vec<u8>,
    yes: usize,
    no: usize,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NodeRepr {
    Leaf(LeafRepr),
    Numeric(NumericRepr),
    Categorical(CategoricalRepr),
}

impl From<NodeRepr> for Node {
    fn from(repr: NodeRepr) -> Self {
        match repr {
            NodeRepr::Leaf(LeafRepr { leaf }) => Node::Leaf { leaf },
            NodeRepr::Numeric(NumericRepr {
                feature,
                threshold,
                yes,
                no,
            }) => Node::Numeric {
                feature,
                threshold,
                yes,
                no,
            },
            NodeRepr::Categorical(CategoricalRepr {
                feature,
                categories,
                yes,
                no,
            }) => Node::Categorical {
                feature,
                categories,
                yes,
                no,
            },
        }
    }
}

impl From<Node> for NodeRepr {
    fn from(node: Node) -> Self {
        match node {
            Node::Leaf { leaf } => NodeRepr::Leaf(LeafRepr { leaf }),
            Node::Numeric {
                feature,
                threshold,
                yes,
                no,
            } => NodeRepr::Numeric(NumericRepr {
                feature,
                threshold,
                yes,
                no,
            }),
            Node::Categorical {
                feature,
                categories,
                yes,
                no,
            } => NodeRepr::Categorical(CategoricalRepr {
                feature,
                categories,
                yes,
                no,
            }),
        }
    }
}

/// One regression tree; node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    fn validate(&self, tree_index: usize) -> Result<(), ArtifactError> {
        let invalid = |msg: String| ArtifactError::Invalid(format!("tree {}: {}", tree_index, msg));

        if self.nodes.is_empty() {
            return Err(invalid("has no nodes".to_string()));
        }

        let len = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            let (feature, yes, no, expected_kind) = match node {
                Node::Leaf { leaf } => {
                    if !leaf.is_finite() {
                        return Err(invalid(format!("node {} has a non-finite leaf", i)));
                    }
                    continue;
                }
                Node::Numeric {
                    feature,
                    threshold,
                    yes,
                    no,
                } => {
                    if !threshold.is_finite() {
                        return Err(invalid(format!("node {} has a non-finite threshold", i)));
                    }
                    (*feature, *yes, *no, FieldKind::Numeric)
                }
                Node::Categorical {
                    feature,
                    categories,
                    yes,
                    no,
                } => {
                    if let Some(code) = categories.iter().find(|&&c| !feature.codes().contains(&c)) {
                        return Err(invalid(format!(
                            "node {} tests code {} which '{}' never takes",
                            i, code, feature
                        )));
                    }
                    (*feature, *yes, *no, FieldKind::Categorical)
                }
            };

            if feature.kind() != expected_kind {
                return Err(invalid(format!(
                    "node {} applies a {} split to {} field '{}'",
                    i,
                    expected_kind,
                    feature.kind(),
                    feature
                )));
            }

            // Children must come after their parent, which rules out cycles.
            for child in [yes, no] {
                if child <= i || child >= len {
                    return Err(invalid(format!(
                        "node {} points to node {} (must be in {}..{})",
                        i,
                        child,
                        i + 1,
                        len
                    )));
                }
            }
        }

        Ok(())
    }

    /// Leaf value reached by `record`.
    fn leaf_value(&self, record: &PatientRecord) -> f64 {
        // Validation guarantees indices grow strictly and stay in bounds.
        let mut idx = 0;
        loop {
            idx = match &self.nodes[idx] {
                Node::Leaf { leaf } => return *leaf,
                Node::Numeric {
                    feature,
                    threshold,
                    yes,
                    no,
                } => {
                    let goes_yes = match record.value(*feature) {
                        FieldValue::Numeric(v) => v <= *threshold,
                        FieldValue::Categorical(c) => f64::from(c) <= *threshold,
                    };
                    if goes_yes {
                        *yes
                    } else {
                        *no
                    }
                }
                Node::Categorical {
                    feature,
                    categories,
                    yes,
                    no,
                } => {
                    let goes_yes = record
                        .value(*feature)
                        .as_code()
                        .is_some_and(|c| categories.contains(&c));
                    if goes_yes {
                        *yes
                    } else {
                        *no
                    }
                }
            };
        }
    }
}

fn default_threshold() -> f64 {
    0.5
}

/// A gradient-boosted tree ensemble for binary classification.
///
/// `margin = base_score + learning_rate * Σ leaf`, and the positive label
/// is returned when `sigmoid(margin) >= threshold`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeEnsemble {
    format: String,
    version: u32,
    name: String,
    #[serde(default)]
    description: Option<String>,
    features: Vec<String>,
    #[serde(default)]
    base_score: f64,
    learning_rate: f64,
    #[serde(default = "default_threshold")]
    threshold: f64,
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Parse and validate an artifact from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let ensemble: TreeEnsemble = serde_json::from_str(json)?;
        ensemble.validate()?;
        Ok(ensemble)
    }

    /// Load and validate an artifact from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ArtifactError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let ensemble = Self::from_json(&contents)?;

        tracing::info!(
            path = %path.display(),
            name = %ensemble.name,
            trees = ensemble.trees.len(),
            "Loaded classifier artifact"
        );
        Ok(ensemble)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if self.format != ARTIFACT_FORMAT || self.version == 0 || self.version > ARTIFACT_VERSION {
            return Err(ArtifactError::UnsupportedFormat {
                format: self.format.clone(),
                version: self.version,
            });
        }

        self.validate_features()?;

        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ArtifactError::Invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }

        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(ArtifactError::Invalid(format!(
                "threshold must be in (0, 1), got {}",
                self.threshold
            )));
        }

        if !self.base_score.is_finite() {
            return Err(ArtifactError::Invalid("base_score must be finite".to_string()));
        }

        if self.trees.is_empty() {
            return Err(ArtifactError::Invalid("artifact has no trees".to_string()));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i)?;
        }

        Ok(())
    }

    /// Feature names and order must match the record schema exactly.
    fn validate_features(&self) -> Result<(), ArtifactError> {
        let expected = field_names();
        let positions = expected.len().max(self.features.len());

        for position in 0..positions {
            let want = expected.get(position);
            let got = self.features.get(position);
            if want.copied() != got.map(String::as_str) {
                return Err(ArtifactError::FeatureMismatch {
                    position,
                    expected: want.map(|s| s.to_string()).unwrap_or_default(),
                    found: got.cloned(),
                });
            }
        }

        Ok(())
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn node_count(&self) -> usize {
        self.trees.iter().map(|t| t.nodes.len()).sum()
    }

    /// Raw additive score (log-odds) for a record.
    pub fn margin(&self, record: &PatientRecord) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.leaf_value(record)).sum();
        self.base_score + self.learning_rate * sum
    }

    /// Probability of heart disease for a record.
    pub fn positive_probability(&self, record: &PatientRecord) -> f64 {
        1.0 / (1.0 + (-self.margin(record)).exp())
    }

    fn label(&self, record: &PatientRecord) -> u8 {
        if self.positive_probability(record) >= self.threshold {
            LABEL_DISEASE
        } else {
            LABEL_NO_DISEASE
        }
    }
}

impl Classifier for TreeEnsemble {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, records: &[PatientRecord]) -> Result<Vec<u8>, ClassifierError> {
        Ok(records.iter().map(|r| self.label(r)).collect())
    }

    fn probability(&self, record: &PatientRecord) -> Option<f64> {
        Some(self.positive_probability(record))
    }
}
