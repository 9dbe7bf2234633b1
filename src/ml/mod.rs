pub mod models;
pub mod predictor;
pub mod registry;

pub use models::{LinearRegressionModel, Regressor, StandardScaler, TreeEnsemble};
pub use predictor::{PredictionRecord, PredictionResult, PredictionService, PredictionSink};
pub use registry::{ModelEntry, ModelRegistry};
