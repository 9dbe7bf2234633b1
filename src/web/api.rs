use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::error::PredictionError;
use crate::ml::registry::RANDOM_FOREST;
use crate::ml::PredictionService;

#[derive(Clone)]
pub struct ApiServer {
    service: Arc<PredictionService>,
    metrics: Option<PrometheusHandle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub features: Vec<f64>,
    #[serde(default = "default_model")]
    pub model_name: String,
}

fn default_model() -> String {
    RANDOM_FOREST.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesResponse {
    pub features: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

impl IntoResponse for PredictionError {
    fn into_response(self) -> Response {
        let status = match self {
            PredictionError::InvalidModel { .. } | PredictionError::FeatureCountMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
            PredictionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl ApiServer {
    pub fn new(service: Arc<PredictionService>) -> Self {
        Self {
            service,
            metrics: None,
        }
    }

    /// Exposes the Prometheus recorder at `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/models", get(get_models))
            .route("/features", get(get_features))
            .route("/predict", post(predict_price))
            .route("/health", get(health_check))
            .route("/metrics", get(render_metrics))
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::custom(panic_response))
            .with_state(self.clone())
    }

    pub async fn serve(&self, listener: TcpListener, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        info!("House price API listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

fn panic_response(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "Internal error during prediction" })),
    )
        .into_response()
}

// API Handlers
async fn root() -> impl IntoResponse {
    Json(json!({ "message": "House Price Prediction API" }))
}

async fn get_models(State(server): State<ApiServer>) -> Json<ModelsResponse> {
    let models = server.service.registry().names().into_iter().map(String::from).collect();
    Json(ModelsResponse { models })
}

async fn get_features(State(server): State<ApiServer>) -> Json<FeaturesResponse> {
    let registry = server.service.registry();
    Json(FeaturesResponse {
        features: registry.feature_names().to_vec(),
        count: registry.feature_count(),
    })
}

async fn predict_price(
    State(server): State<ApiServer>,
    body: Result<Json<PredictionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(request) => request,
        Err(rejection) => return rejection_response(rejection),
    };

    match server.service.predict_request(&request.model_name, request.features) {
        Ok(result) => Json(result).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Keeps axum's status for unreadable bodies but answers in the `{"detail"}` shape.
fn rejection_response(rejection: JsonRejection) -> Response {
    debug!("Rejected request body: {}", rejection.body_text());
    (rejection.status(), Json(json!({ "detail": rejection.body_text() }))).into_response()
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn render_metrics(State(server): State<ApiServer>) -> impl IntoResponse {
    match &server.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "Metrics recorder not installed".to_string()),
    }
}
