use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A trained model that maps one feature vector to a price.
pub trait Regressor: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError>;

    /// Number of features the model was fit on.
    fn input_size(&self) -> usize;
}

fn check_len(expected: usize, features: &[f64]) -> Result<(), ModelError> {
    if features.len() != expected {
        return Err(ModelError::InferenceError(format!(
            "expected {} features, got {}",
            expected,
            features.len()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinearArtifact {
    coefficients: Vec<f64>,
    intercept: f64,
}

// Ordinary least squares weights exported after fitting
#[derive(Debug, Clone)]
pub struct LinearRegressionModel {
    pub coefficients: DVector<f64>,
    pub intercept: f64,
}

impl LinearRegressionModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients: DVector::from_vec(coefficients),
            intercept,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let artifact: LinearArtifact = serde_json::from_str(raw)?;
        Ok(Self::new(artifact.coefficients, artifact.intercept))
    }
}

impl Regressor for LinearRegressionModel {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_len(self.coefficients.len(), features)?;
        let x = DVector::from_vec(features.to_vec());
        Ok(self.coefficients.dot(&x) + self.intercept)
    }

    fn input_size(&self) -> usize {
        self.coefficients.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerArtifact {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// Standardizes raw features with the mean and scale fit during training.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    pub mean: DVector<f64>,
    pub scale: DVector<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        // Constant features were fit with a zero scale; leave them centred but unscaled.
        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();

        Self {
            mean: DVector::from_vec(mean),
            scale: DVector::from_vec(scale),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let artifact: ScalerArtifact = serde_json::from_str(raw)?;
        Ok(Self::new(artifact.mean, artifact.scale))
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_len(self.mean.len(), features)?;
        let x = DVector::from_vec(features.to_vec());
        let scaled = (x - &self.mean).component_div(&self.scale);
        Ok(scaled.iter().copied().collect())
    }
}

/// How per-tree outputs are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Bagged ensembles such as random forests.
    Mean,
    /// Boosted ensembles; outputs are added to `base_score`.
    Sum,
}

/// Which side of a split a value equal to the threshold falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitRule {
    /// `x <= threshold` goes left.
    LessOrEqual,
    /// `x < threshold` goes left.
    Less,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split { feature, left, right, .. } = *node {
                if feature >= feature_count {
                    return Err(format!(
                        "node {} splits on feature {} but only {} features exist",
                        idx, feature, feature_count
                    ));
                }
                // Children must follow their parent, which also rules out cycles.
                for child in [left, right] {
                    if child <= idx || child >= self.nodes.len() {
                        return Err(format!("node {} has invalid child index {}", idx, child));
                    }
                }
            }
        }

        Ok(())
    }

    fn evaluate(&self, features: &[f64], rule: SplitRule) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split { feature, threshold, left, right } => {
                    let x = features[feature];
                    let go_left = match rule {
                        SplitRule::LessOrEqual => x <= threshold,
                        SplitRule::Less => x < threshold,
                    };
                    idx = if go_left { left } else { right };
                }
            }
        }
    }
}

fn default_split() -> SplitRule {
    SplitRule::LessOrEqual
}

/// Tree ensemble covering both the random forest and the gradient boosted model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub aggregation: Aggregation,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default = "default_split")]
    pub split: SplitRule,
    pub trees: Vec<DecisionTree>,
    #[serde(skip)]
    feature_count: usize,
}

impl TreeEnsemble {
    /// Parses and validates an ensemble against the expected feature count.
    pub fn from_json(raw: &str, feature_count: usize) -> Result<Self, String> {
        let mut ensemble: TreeEnsemble = serde_json::from_str(raw).map_err(|e| e.to_string())?;

        if ensemble.trees.is_empty() {
            return Err("ensemble has no trees".to_string());
        }
        for (i, tree) in ensemble.trees.iter().enumerate() {
            tree.validate(feature_count)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }

        ensemble.feature_count = feature_count;
        Ok(ensemble)
    }
}

impl Regressor for TreeEnsemble {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_len(self.feature_count, features)?;

        let total: f64 = self
            .trees
            .iter()
            .map(|tree| tree.evaluate(features, self.split))
            .sum();

        Ok(match self.aggregation {
            Aggregation::Mean => self.base_score + total / self.trees.len() as f64,
            Aggregation::Sum => self.base_score + total,
        })
    }

    fn input_size(&self) -> usize {
        self.feature_count
    }
}
