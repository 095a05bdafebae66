mod helpers;

use helpers::{markdown_form, setup_test_app, setup_test_app_with, FakeEngine};
use mdconv_core::OutputFormat;
use mdconv_processing::ConversionEngine;
use std::sync::Arc;

#[tokio::test]
async fn test_health_reports_engines() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), 200);

    let data: serde_json::Value = response.json();
    assert_eq!(data["status"], "healthy");
    assert_eq!(data["service"], "markdown-converter");
    assert_eq!(data["storage"], "healthy");
    assert_eq!(data["dependencies"]["pandoc"]["status"], "healthy");
    assert_eq!(data["dependencies"]["pandoc"]["version"], "pandoc 1.0");
    assert_eq!(data["dependencies"]["weasyprint"]["status"], "healthy");
    assert!(data["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_unhealthy_when_engine_missing() {
    let engines: Vec<Arc<dyn ConversionEngine>> = vec![
        Arc::new(FakeEngine::new(OutputFormat::Docx)),
        Arc::new(FakeEngine::failing(OutputFormat::Pdf)),
    ];
    let app = setup_test_app_with(engines, |_| {}).await;

    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), 503);

    let data: serde_json::Value = response.json();
    assert_eq!(data["status"], "unhealthy");
    assert!(data["dependencies"]["weasyprint"]["status"]
        .as_str()
        .unwrap()
        .starts_with("unavailable"));
}

#[tokio::test]
async fn test_security_and_request_id_headers() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get("/health")
        .add_header("X-Request-ID", "req-12345")
        .await;

    assert_eq!(response.header("x-request-id"), "req-12345");
    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert!(response.headers().get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_metrics_snapshot() {
    let app = setup_test_app().await;
    let client = app.client();

    client
        .post("/api/convert")
        .multipart(markdown_form("a.md", "# A", Some("docx,pdf")))
        .await;
    client
        .post("/api/convert")
        .multipart(markdown_form("b.exe", "# B", None))
        .await;

    let response = client.get("/api/metrics").await;
    assert_eq!(response.status_code(), 200);

    let data: serde_json::Value = response.json();
    assert_eq!(data["requests"], 2);
    assert_eq!(data["jobs_created"], 1);
    assert_eq!(data["validation_rejections"], 1);
    assert_eq!(data["formats"]["docx"]["succeeded"], 1);
    assert_eq!(data["formats"]["pdf"]["succeeded"], 1);
}

#[tokio::test]
async fn test_openapi_spec_served() {
    let app = setup_test_app().await;

    let response = app.client().get("/api/openapi.json").await;
    assert_eq!(response.status_code(), 200);

    let data: serde_json::Value = response.json();
    assert!(data["paths"]["/api/convert"].is_object());
}
