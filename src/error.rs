use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model artifact not found: {}", path.display())]
    ArtifactMissing {
        path: PathBuf,
    },

    #[error("Malformed model artifact {}: {message}", path.display())]
    ArtifactMalformed {
        path: PathBuf,
        message: String,
    },

    #[error("Dimension mismatch in {artifact}: expected {expected} values, found {found}")]
    DimensionMismatch {
        artifact: String,
        expected: usize,
        found: usize,
    },

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Inference failed: {0}")]
    InferenceError(String),
}

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Model not available. Available models: {available:?}")]
    InvalidModel {
        requested: String,
        available: Vec<String>,
    },

    #[error("Incorrect number of features. Expected: {expected}, Received: {received}")]
    FeatureCountMismatch {
        expected: usize,
        received: usize,
    },

    #[error("{0}")]
    Internal(String),
}

impl PredictionError {
    /// Short label used for the error counter.
    pub fn reason(&self) -> &'static str {
        match self {
            PredictionError::InvalidModel { .. } => "invalid_model",
            PredictionError::FeatureCountMismatch { .. } => "feature_count_mismatch",
            PredictionError::Internal(_) => "internal",
        }
    }
}

#[derive(Error, Debug)]
pub enum CleaningError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Input has no header row: {}", .0.display())]
    EmptyInput(PathBuf),

    #[error("Row {row} has {found} fields, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Failed to persist cleaned output to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_carries_both_counts() {
        let err = PredictionError::FeatureCountMismatch { expected: 12, received: 11 };
        let msg = err.to_string();
        assert!(msg.contains("Expected: 12"));
        assert!(msg.contains("Received: 11"));
    }

    #[test]
    fn invalid_model_message_lists_available_models() {
        let err = PredictionError::InvalidModel {
            requested: "svm".to_string(),
            available: vec!["random_forest".to_string(), "xgboost".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("random_forest"));
        assert!(msg.contains("xgboost"));
        assert_eq!(err.reason(), "invalid_model");
    }
}
