use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::PredictionError;
use super::registry::ModelRegistry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub prediction: f64,
    pub model_used: String,
    pub timestamp: String,
}

/// One served prediction, as handed to the observability sink.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRecord {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub features: Vec<f64>,
    pub prediction: f64,
    /// Seconds from request start to result.
    pub duration: f64,
}

/// Records buffered for the logging task before new ones are dropped.
pub const SINK_CAPACITY: usize = 1024;

/// Fire-and-forget destination for prediction records.
///
/// Sending never blocks; a full, closed or missing receiver drops the record.
#[derive(Clone, Default)]
pub struct PredictionSink {
    tx: Option<mpsc::Sender<PredictionRecord>>,
}

impl PredictionSink {
    /// Sink that drops every record.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn channel() -> (Self, mpsc::Receiver<PredictionRecord>) {
        Self::with_capacity(SINK_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<PredictionRecord>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx: Some(tx) }, rx)
    }

    /// Spawns a task that writes each record as a structured log line.
    /// Must be called from within a Tokio runtime.
    pub fn spawn_logger() -> Self {
        let (sink, mut rx) = Self::channel();

        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                match serde_json::to_string(&record) {
                    Ok(json) => info!(target: "prediction", "Prediction: {}", json),
                    Err(e) => warn!("Failed to serialize prediction record: {}", e),
                }
            }
            debug!("Prediction log channel closed");
        });

        sink
    }

    pub fn record(&self, record: PredictionRecord) {
        if let Some(tx) = &self.tx {
            if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(record) {
                metrics::counter!("prediction_records_dropped_total").increment(1);
            }
        }
    }
}

/// Validates requests against the registry and dispatches them to a model.
#[derive(Clone)]
pub struct PredictionService {
    registry: Arc<ModelRegistry>,
    sink: PredictionSink,
}

impl PredictionService {
    pub fn new(registry: Arc<ModelRegistry>, sink: PredictionSink) -> Self {
        Self { registry, sink }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn predict_request(
        &self,
        model_name: &str,
        features: Vec<f64>,
    ) -> Result<PredictionResult, PredictionError> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let outcome = self.validate_and_predict(model_name, &features);
        let prediction = match outcome {
            Ok(value) => value,
            Err(e) => {
                metrics::counter!("prediction_errors_total", "reason" => e.reason()).increment(1);
                if let PredictionError::Internal(msg) = &e {
                    error!("Prediction failed for model {}: {}", model_name, msg);
                } else {
                    debug!("Rejected prediction request: {}", e);
                }
                return Err(e);
            }
        };

        let duration = clock.elapsed().as_secs_f64();
        let result = PredictionResult {
            prediction,
            model_used: model_name.to_string(),
            timestamp: started_at.to_rfc3339(),
        };

        metrics::counter!("predictions_total", "model" => model_name.to_string()).increment(1);
        metrics::histogram!("prediction_duration_seconds", "model" => model_name.to_string())
            .record(duration);

        self.sink.record(PredictionRecord {
            request_id: Uuid::new_v4(),
            timestamp: started_at,
            model: model_name.to_string(),
            features,
            prediction,
            duration,
        });

        Ok(result)
    }

    fn validate_and_predict(&self, model_name: &str, features: &[f64]) -> Result<f64, PredictionError> {
        if !self.registry.contains(model_name) {
            return Err(PredictionError::InvalidModel {
                requested: model_name.to_string(),
                available: self.registry.names().into_iter().map(String::from).collect(),
            });
        }

        let expected = self.registry.feature_count();
        if features.len() != expected {
            return Err(PredictionError::FeatureCountMismatch {
                expected,
                received: features.len(),
            });
        }

        let value = self
            .registry
            .predict(model_name, features)
            .map_err(|e| PredictionError::Internal(e.to_string()))?;

        if !value.is_finite() {
            return Err(PredictionError::Internal(format!(
                "Model {} produced a non-finite prediction",
                model_name
            )));
        }

        Ok(value)
    }
}
