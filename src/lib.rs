//! House price prediction service: a model registry and JSON API for serving
//! pre-trained regressors, plus the cleaning pipeline that prepares training data.

pub mod config;
pub mod data;
pub mod error;
pub mod ml;
pub mod telemetry;
pub mod web;

pub use crate::config::Config;
pub use error::{CleaningError, ModelError, PredictionError};
pub use ml::{ModelRegistry, PredictionService, PredictionSink};
pub use web::ApiServer;
