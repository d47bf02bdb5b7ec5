//! Integration test: HTTP endpoints

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cardiolens::server::{create_router, AppState, ServerConfig};
use common::{degraded_config, scenario_record, Fixture, FEATURES};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app_for(config: &ServerConfig) -> Router {
    let state = Arc::new(AppState::initialize(config));
    create_router(state, config)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 256).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_raw(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_capabilities() {
    let fixture = Fixture::new();
    let (status, body) = send(app_for(&fixture.config()), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["capabilities"]["model"], true);
    assert_eq!(body["capabilities"]["explainer"], true);
    assert_eq!(body["capabilities"]["narrative"], false);
}

#[tokio::test]
async fn test_health_degraded() {
    let (status, body) = send(app_for(&degraded_config()), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["capabilities"]["prediction"], false);
}

#[tokio::test]
async fn test_predict_scenario_contract() {
    let fixture = Fixture::new();
    let (status, body) = send(app_for(&fixture.config()), post_json("/predict", &scenario_record())).await;
    assert_eq!(status, StatusCode::OK);

    let prediction = body["prediction"].as_u64().unwrap();
    assert!(prediction <= 1);

    let low = body["confidence_low_risk"].as_str().unwrap();
    let high = body["confidence_high_risk"].as_str().unwrap();
    assert!(low.ends_with('%') && high.ends_with('%'));
    let total: f64 = low.trim_end_matches('%').parse::<f64>().unwrap()
        + high.trim_end_matches('%').parse::<f64>().unwrap();
    assert!((total - 100.0).abs() < 0.011);

    let shap = body["shap_data"].as_object().unwrap();
    assert_eq!(shap.len(), FEATURES.len());
    for name in FEATURES {
        let v = shap[name].as_f64().unwrap();
        assert!(((v * 1e4).round() / 1e4 - v).abs() < 1e-12, "{} not rounded: {}", name, v);
    }
}

#[tokio::test]
async fn test_predict_is_deterministic() {
    let fixture = Fixture::new();
    let app = app_for(&fixture.config());
    let (_, first) = send(app.clone(), post_json("/predict", &scenario_record())).await;
    let (_, second) = send(app, post_json("/predict", &scenario_record())).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_predict_empty_record() {
    let fixture = Fixture::new();
    let (status, body) = send(app_for(&fixture.config()), post_json("/predict", &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["prediction"].is_u64());
    assert_eq!(body["shap_data"].as_object().unwrap().len(), FEATURES.len());
}

#[tokio::test]
async fn test_predict_unknown_category_is_ignored() {
    let fixture = Fixture::new();
    let mut record = scenario_record();
    record["Sex"] = json!("X");
    let (status, body) = send(app_for(&fixture.config()), post_json("/predict", &record)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["shap_data"]["Sex_M"].is_f64());
}

#[tokio::test]
async fn test_predict_malformed_json() {
    let fixture = Fixture::new();
    let (status, body) = send(app_for(&fixture.config()), post_raw("/predict", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_predict_non_numeric_field() {
    let fixture = Fixture::new();
    let mut record = scenario_record();
    record["Age"] = json!("forty");
    let (status, body) = send(app_for(&fixture.config()), post_json("/predict", &record)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Age"));
}

#[tokio::test]
async fn test_predict_unavailable_before_parsing() {
    let app = app_for(&degraded_config());
    let (status, body) = send(app, post_raw("/predict", "{not json")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("not loaded"));
}

#[tokio::test]
async fn test_plot_data() {
    let fixture = Fixture::new();
    let (status, body) = send(app_for(&fixture.config()), get("/plot_data")).await;
    assert_eq!(status, StatusCode::OK);
    let plots = body.as_object().unwrap();
    assert_eq!(plots.len(), 5);
    let curves = &plots["Cholesterol"];
    for key in ["no_disease_x", "no_disease_y", "heart_disease_x", "heart_disease_y"] {
        assert_eq!(curves[key].as_array().unwrap().len(), 200);
    }
}

#[tokio::test]
async fn test_plot_data_without_dataset() {
    let (status, body) = send(app_for(&degraded_config()), get("/plot_data")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Population data not loaded on server.");
}

#[tokio::test]
async fn test_ai_analysis_without_key() {
    let fixture = Fixture::new();
    let request = json!({"Age": 40, "shap_data": {"Age": 0.2}});
    let (status, body) = send(app_for(&fixture.config()), post_json("/get_ai_analysis", &request)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("GOOGLE_API_KEY"));
}

#[tokio::test]
async fn test_ai_analysis_with_mock_service() {
    use axum::http::Uri;
    use axum::Json;

    let mock = Router::new().fallback(|uri: Uri, Json(body): Json<Value>| async move {
        assert!(uri.path().ends_with(":generateContent"));
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default().to_string();
        assert!(prompt.contains("- Oldpeak (SHAP Value: 0.2500)"));
        Json(json!({"candidates": [{"content": {"parts": [{"text": "## Summary\nLooks fine."}]}}]}))
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, mock).await.unwrap();
    });

    let fixture = Fixture::new();
    let config = ServerConfig {
        google_api_key: Some("test-key".to_string()),
        gemini_base_url: format!("http://{}/v1beta", addr),
        ..fixture.config()
    };
    let request = json!({
        "Age": 52, "Oldpeak": 1.5, "prediction": 1, "confidence": "71.20%",
        "shap_data": {"Oldpeak": 0.25, "Age": 0.05, "Sex_M": 0.001}
    });
    let (status, body) = send(app_for(&config), post_json("/get_ai_analysis", &request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "## Summary\nLooks fine.");
}

#[tokio::test]
async fn test_pages() {
    let fixture = Fixture::new();
    for uri in ["/", "/predictor", "/analysis"] {
        let response = app_for(&fixture.config()).oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 256).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("<html"));
    }
}

#[tokio::test]
async fn test_missing_template_is_404() {
    let (status, body) = send(app_for(&degraded_config()), get("/predictor")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("predictor.html"));
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let app = app_for(&degraded_config());
    let (status, body) = send(app.clone(), get("/no/such/route")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = send(app, get("/predict")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
