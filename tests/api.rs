mod common;

use std::sync::Arc;

use house_price_api::{ApiServer, ModelRegistry, PredictionService, PredictionSink};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn spawn_server() -> String {
    let registry = ModelRegistry::load(&common::fixture_config()).await.unwrap();
    let service = Arc::new(PredictionService::new(Arc::new(registry), PredictionSink::spawn_logger()));
    let server = ApiServer::new(service);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        server.serve(listener, std::future::pending()).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn post_predict(base: &str, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}/predict", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn metadata_endpoints() {
    let base = spawn_server().await;

    let root: Value = reqwest::get(&base).await.unwrap().json().await.unwrap();
    assert_eq!(root, json!({ "message": "House Price Prediction API" }));

    let models: Value = reqwest::get(format!("{}/models", base)).await.unwrap().json().await.unwrap();
    assert_eq!(models, json!({ "models": ["random_forest", "xgboost", "linear_regression"] }));

    let features: Value = reqwest::get(format!("{}/features", base)).await.unwrap().json().await.unwrap();
    assert_eq!(
        features,
        json!({ "features": ["sqft_living", "bedrooms", "bathrooms"], "count": 3 })
    );

    let health: Value = reqwest::get(format!("{}/health", base)).await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "healthy");
    assert!(health["timestamp"].is_string());
}

#[tokio::test]
async fn predicts_with_each_model() {
    let base = spawn_server().await;
    let expected = [
        ("random_forest", 625000.0),
        ("xgboost", 590000.0),
        ("linear_regression", 605000.0),
    ];

    for (model, price) in expected {
        let (status, body) = post_predict(
            &base,
            json!({ "features": [2500.0, 4.0, 2.5], "model_name": model }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"].as_f64(), Some(price));
        assert_eq!(body["model_used"], model);
        assert!(body["timestamp"].is_string());
    }
}

#[tokio::test]
async fn model_name_defaults_to_random_forest() {
    let base = spawn_server().await;
    let (status, body) = post_predict(&base, json!({ "features": [1500.0, 2.0, 1.0] })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_used"], "random_forest");
    assert_eq!(body["prediction"].as_f64(), Some(425000.0));
}

#[tokio::test]
async fn one_feature_short_is_rejected() {
    let base = spawn_server().await;
    let (status, body) = post_predict(
        &base,
        json!({ "features": [2500.0, 4.0], "model_name": "random_forest" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("Expected: 3"), "{}", detail);
    assert!(detail.contains("Received: 2"), "{}", detail);
}

#[tokio::test]
async fn unknown_model_is_rejected_with_valid_names() {
    let base = spawn_server().await;
    let (status, body) = post_predict(
        &base,
        json!({ "features": [2500.0, 4.0, 2.5], "model_name": "svm" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_str().unwrap();
    for name in ["random_forest", "xgboost", "linear_regression"] {
        assert!(detail.contains(name), "{}", detail);
    }
}

#[tokio::test]
async fn concurrent_requests_are_served_independently() {
    let base = spawn_server().await;

    let requests: Vec<_> = (0..16)
        .map(|i| {
            let base = base.clone();
            tokio::spawn(async move {
                let features = if i % 2 == 0 { json!([2500.0, 4.0, 2.5]) } else { json!([2500.0]) };
                post_predict(&base, json!({ "features": features, "model_name": "xgboost" })).await
            })
        })
        .collect();

    for (i, handle) in requests.into_iter().enumerate() {
        let (status, _) = handle.await.unwrap();
        let expected = if i % 2 == 0 { StatusCode::OK } else { StatusCode::BAD_REQUEST };
        assert_eq!(status, expected);
    }
}

#[tokio::test]
async fn malformed_bodies_get_a_json_detail() {
    let base = spawn_server().await;

    for body in [json!({ "features": ["a", 1.0, 2.0] }), json!({ "model_name": "xgboost" })] {
        let (status, reply) = post_predict(&base, body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(reply["detail"].as_str().is_some_and(|d| !d.is_empty()), "{}", reply);
    }

    let response = reqwest::Client::new()
        .post(format!("{}/predict", base))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let reply: Value = response.json().await.unwrap();
    assert!(reply["detail"].is_string());
}

#[tokio::test]
async fn metrics_endpoint_without_recorder() {
    let base = spawn_server().await;
    let response = reqwest::get(format!("{}/metrics", base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
