use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ModelsConfig;
use crate::error::ModelError;
use super::models::{LinearRegressionModel, Regressor, StandardScaler, TreeEnsemble};

pub const RANDOM_FOREST: &str = "random_forest";
pub const XGBOOST: &str = "xgboost";
pub const LINEAR_REGRESSION: &str = "linear_regression";

pub struct ModelEntry {
    pub name: String,
    pub predictor: Box<dyn Regressor>,
    /// Whether inputs go through the shared scaler before `predict`.
    pub requires_scaling: bool,
}

impl ModelEntry {
    pub fn new(name: impl Into<String>, predictor: Box<dyn Regressor>, requires_scaling: bool) -> Self {
        Self {
            name: name.into(),
            predictor,
            requires_scaling,
        }
    }
}

/// Read-only set of models, the shared scaler and the expected feature order.
///
/// Built once before the server starts accepting requests and never mutated afterwards.
pub struct ModelRegistry {
    entries: Vec<ModelEntry>,
    scaler: StandardScaler,
    feature_names: Vec<String>,
}

impl ModelRegistry {
    /// Assembles a registry, checking every component against the feature count.
    pub fn new(
        entries: Vec<ModelEntry>,
        scaler: StandardScaler,
        feature_names: Vec<String>,
    ) -> Result<Self, ModelError> {
        let expected = feature_names.len();

        for found in [scaler.mean.len(), scaler.scale.len()] {
            if found != expected {
                return Err(ModelError::DimensionMismatch {
                    artifact: "scaler".to_string(),
                    expected,
                    found,
                });
            }
        }

        for entry in &entries {
            if entry.predictor.input_size() != expected {
                return Err(ModelError::DimensionMismatch {
                    artifact: entry.name.clone(),
                    expected,
                    found: entry.predictor.input_size(),
                });
            }
        }

        Ok(Self {
            entries,
            scaler,
            feature_names,
        })
    }

    /// Loads the three models, the scaler and the feature names from `config.artifact_dir`.
    pub async fn load(config: &ModelsConfig) -> Result<Self, ModelError> {
        info!("Loading model artifacts from {}", config.artifact_dir.display());

        let path = config.artifact_path(&config.feature_names_file);
        let feature_names: Vec<String> = serde_json::from_str(&read_artifact(&path).await?)
            .map_err(|e| malformed(&path, e))?;
        let feature_count = feature_names.len();
        debug!("Expecting {} features", feature_count);

        let path = config.artifact_path(&config.scaler_file);
        let scaler = StandardScaler::from_json(&read_artifact(&path).await?)
            .map_err(|e| malformed(&path, e))?;

        let path = config.artifact_path(&config.random_forest_file);
        let random_forest = TreeEnsemble::from_json(&read_artifact(&path).await?, feature_count)
            .map_err(|e| malformed(&path, e))?;

        let path = config.artifact_path(&config.xgboost_file);
        let xgboost = TreeEnsemble::from_json(&read_artifact(&path).await?, feature_count)
            .map_err(|e| malformed(&path, e))?;

        let path = config.artifact_path(&config.linear_regression_file);
        let linear = LinearRegressionModel::from_json(&read_artifact(&path).await?)
            .map_err(|e| malformed(&path, e))?;

        let entries = vec![
            ModelEntry::new(RANDOM_FOREST, Box::new(random_forest), false),
            ModelEntry::new(XGBOOST, Box::new(xgboost), false),
            ModelEntry::new(LINEAR_REGRESSION, Box::new(linear), true),
        ];

        let registry = Self::new(entries, scaler, feature_names)?;
        info!(
            "All models loaded successfully: {:?} ({} features)",
            registry.names(),
            registry.feature_count()
        );

        Ok(registry)
    }

    /// Model names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    fn entry(&self, name: &str) -> Option<&ModelEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn predict(&self, model_name: &str, features: &[f64]) -> Result<f64, ModelError> {
        let entry = self
            .entry(model_name)
            .ok_or_else(|| ModelError::UnknownModel(model_name.to_string()))?;

        if entry.requires_scaling {
            let scaled = self.scaler.transform(features)?;
            entry.predictor.predict(&scaled)
        } else {
            entry.predictor.predict(features)
        }
    }
}

async fn read_artifact(path: &Path) -> Result<String, ModelError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ModelError::ArtifactMissing {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(malformed(path, e)),
    }
}

fn malformed(path: &Path, err: impl std::fmt::Display) -> ModelError {
    ModelError::ArtifactMalformed {
        path: PathBuf::from(path),
        message: err.to_string(),
    }
}
