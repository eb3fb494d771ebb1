use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::{AppConfig, InferenceMode};
use shared_utils::test_utils::{JwtTestUtils, MockStoreResponses, TestConfig, TestUser};
use triage_cell::router::triage_routes;

async fn create_test_app(config: AppConfig) -> Router {
    triage_routes(Arc::new(config))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn mount_history_sink(mock_server: &MockServer, user_id: &str, entry_type: &str) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/user_history_entries"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::history_row(user_id, entry_type, "2030-01-01T00:00:00Z")
        ])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_predict_ranks_classifier_output() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let app = create_test_app(config.clone()).await;

    let patient = TestUser::patient("asha");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));

    // The classifier replies unsorted; the cell must rank it.
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [
                {"label": "common cold", "probability": 0.12},
                {"label": "influenza", "probability": 0.55},
                {"label": "covid-19", "probability": 0.21},
            ],
            "unrecognized_symptoms": ["wing_pain"]
        })))
        .mount(&mock_server)
        .await;
    mount_history_sink(&mock_server, &patient.id, "inference").await;

    let response = app
        .oneshot(post_json(
            "/predict",
            &token,
            json!({"symptoms": ["fever", "cough", "wing_pain"]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions[0]["label"], json!("influenza"));

    let probabilities: Vec<f64> = predictions
        .iter()
        .map(|p| p["probability"].as_f64().unwrap())
        .collect();
    assert!(probabilities.windows(2).all(|pair| pair[0] >= pair[1]));
    assert!(probabilities.iter().sum::<f64>() <= 1.0);
    assert!(probabilities.iter().all(|p| probabilities[0] >= *p));

    assert_eq!(body["unrecognized_symptoms"], json!(["wing_pain"]));
    assert_eq!(body["history_recorded"], json!(true));
}

#[tokio::test]
async fn test_predict_requires_symptoms() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let app = create_test_app(config.clone()).await;

    let patient = TestUser::patient("asha");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));

    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"predictions": []})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(post_json("/predict", &token, json!({"symptoms": ["  "]})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_is_patient_only() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let app = create_test_app(config.clone()).await;

    let doctor = TestUser::doctor("drpatel");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));

    let response = app
        .oneshot(post_json("/predict", &token, json!({"symptoms": ["fever"]})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_predict_survives_history_outage() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let app = create_test_app(config.clone()).await;

    let patient = TestUser::patient("asha");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));

    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{"label": "influenza", "probability": 0.55}]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/user_history_entries"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "outage"})))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(post_json("/predict", &token, json!({"symptoms": ["fever"]})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["history_recorded"], json!(false));
    assert_eq!(body["predictions"][0]["label"], json!("influenza"));
}

#[tokio::test]
async fn test_classifier_failure_is_bad_gateway() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let app = create_test_app(config.clone()).await;

    let patient = TestUser::patient("asha");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));

    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "model down"})))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(post_json("/predict", &token, json!({"symptoms": ["fever"]})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_prompt_mode_parses_ranked_json() {
    let mock_server = MockServer::start().await;
    let config = TestConfig {
        inference_mode: InferenceMode::Prompt,
        ..TestConfig::with_mock_server(&mock_server.uri())
    }
    .to_app_config();
    let app = create_test_app(config.clone()).await;

    let patient = TestUser::patient("asha");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));

    // The model wraps its JSON in a code fence like real models do.
    let content = "```json\n{\"predictions\": [\
        {\"label\": \"migraine\", \"probability\": 0.3}, \
        {\"label\": \"tension headache\", \"probability\": 0.5}]}\n```";
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": content}}]
        })))
        .mount(&mock_server)
        .await;
    mount_history_sink(&mock_server, &patient.id, "inference").await;

    let response = app
        .oneshot(post_json(
            "/predict",
            &token,
            json!({"symptoms": ["headache"], "specialization_hint": "Neurology"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["predictions"][0]["label"], json!("tension headache"));
    assert_eq!(body["predictions"][1]["label"], json!("migraine"));
}

#[tokio::test]
async fn test_report_analysis_suggests_matching_doctors() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let app = create_test_app(config.clone()).await;

    let patient = TestUser::patient("asha");
    let cardiologist = TestUser::doctor("drpatel");
    let dermatologist = TestUser::doctor("drmenon");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));

    let reply_text = "```json\n{\"specializations\": [\"Cardiology\"], \
        \"explanation\": \"The ECG trace shows an irregular rhythm.\"}\n```";
    Mock::given(method("POST"))
        .and(path("/v1/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": reply_text})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("user_type", "eq.doctor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::doctor_row(&cardiologist.id, &cardiologist.username, "Cardiology"),
            MockStoreResponses::doctor_row(&dermatologist.id, &dermatologist.username, "Dermatology"),
        ])))
        .mount(&mock_server)
        .await;
    mount_history_sink(&mock_server, &patient.id, "report_analysis").await;

    let response = app
        .oneshot(post_json(
            "/report",
            &token,
            json!({
                "file_data": BASE64.encode(b"fake scan bytes"),
                "mime_type": "application/pdf"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["specializations"], json!(["Cardiology"]));
    assert!(body["explanation"].as_str().unwrap().contains("irregular rhythm"));

    let suggested = body["suggested_doctors"].as_array().unwrap();
    assert_eq!(suggested.len(), 1);
    assert_eq!(suggested[0]["username"], json!("drpatel"));
    assert_eq!(body["history_recorded"], json!(true));
}

#[tokio::test]
async fn test_report_analysis_degrades_without_directory() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let app = create_test_app(config.clone()).await;

    let patient = TestUser::patient("asha");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));

    Mock::given(method("POST"))
        .and(path("/v1/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "{\"specializations\": [\"Cardiology\"], \"explanation\": \"x\"}"
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "outage"})))
        .mount(&mock_server)
        .await;
    mount_history_sink(&mock_server, &patient.id, "report_analysis").await;

    let response = app
        .oneshot(post_json(
            "/report",
            &token,
            json!({"file_data": BASE64.encode(b"fake scan bytes")}),
        ))
        .await
        .unwrap();

    // The analysis still lands; only the doctor suggestions are empty.
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["specializations"], json!(["Cardiology"]));
    assert_eq!(body["suggested_doctors"], json!([]));
}

#[tokio::test]
async fn test_unparseable_analyzer_reply_is_bad_gateway() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let app = create_test_app(config.clone()).await;

    let patient = TestUser::patient("asha");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));

    Mock::given(method("POST"))
        .and(path("/v1/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "I was unable to read this report."
        })))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(post_json(
            "/report",
            &token,
            json!({"file_data": BASE64.encode(b"fake scan bytes")}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_chat_assembles_streamed_reply() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let app = create_test_app(config.clone()).await;

    let patient = TestUser::patient("asha");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));

    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Drink \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"plenty \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"of fluids.\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body.as_bytes(), "text/event-stream"),
        )
        .mount(&mock_server)
        .await;
    mount_history_sink(&mock_server, &patient.id, "chatbot").await;

    let response = app
        .oneshot(post_json(
            "/chat",
            &token,
            json!({"messages": [{"role": "user", "content": "I have a mild fever, what should I do?"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["reply"], json!("Drink plenty of fluids."));
    assert_eq!(body["history_recorded"], json!(true));
}

#[tokio::test]
async fn test_chat_requires_messages() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let app = create_test_app(config.clone()).await;

    let patient = TestUser::patient("asha");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));

    let response = app
        .oneshot(post_json("/chat", &token, json!({"messages": []})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transcribe_returns_text() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let app = create_test_app(config.clone()).await;

    let patient = TestUser::patient("asha");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));

    Mock::given(method("POST"))
        .and(path("/v1/transcribe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "patient reports fever since yesterday"
        })))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(post_json(
            "/transcribe",
            &token,
            json!({"audio_data": BASE64.encode(b"fake audio bytes")}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["text"], json!("patient reports fever since yesterday"));
}

#[tokio::test]
async fn test_unauthenticated_requests_are_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let app = create_test_app(config).await;

    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(json!({"symptoms": ["fever"]}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
