mod helpers;

use chrono::{Duration, Utc};
use helpers::{markdown_form, setup_test_app};
use mdconv_core::{JobId, OutputFormat};
use mdconv_infra::SweepService;
use mdconv_storage::JobStore;
use std::sync::Arc;

#[tokio::test]
async fn test_download_headers_and_repeatable() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post("/api/convert")
        .multipart(markdown_form(
            "notes.md",
            "---\ntitle: Team Notes\n---\nBody\n",
            Some("docx"),
        ))
        .await;
    let data: serde_json::Value = response.json();
    let url = data["formats"]["docx"]["download_url"].as_str().unwrap().to_string();
    let size = data["formats"]["docx"]["size"].as_u64().unwrap();

    let first = client.get(&url).await;
    assert_eq!(first.status_code(), 200);
    assert_eq!(
        first.header("content-disposition"),
        "attachment; filename=\"Team_Notes.docx\""
    );
    assert_eq!(first.header("cache-control"), "no-store, no-cache, must-revalidate");
    assert_eq!(first.header("pragma"), "no-cache");
    assert_eq!(
        first.header("content-type"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    assert_eq!(first.as_bytes().len() as u64, size);

    let second = client.get(&url).await;
    assert_eq!(second.status_code(), 200);
    assert_eq!(first.as_bytes(), second.as_bytes());

    assert_eq!(app.state.metrics.snapshot().downloads, 2);
}

#[tokio::test]
async fn test_download_after_retention_is_gone() {
    let app = setup_test_app().await;

    let job = app
        .store
        .create_at(
            vec![OutputFormat::Docx],
            "0".repeat(64),
            "document".to_string(),
            Utc::now() - Duration::hours(25),
        )
        .await
        .unwrap();
    let id = job.id.to_string();
    app.store
        .store(&id, OutputFormat::Docx, b"PK\x03\x04old".to_vec())
        .await
        .unwrap();

    let url = format!("/api/download/{}/docx", id);

    let before_sweep = app.client().get(&url).await;
    assert_eq!(before_sweep.status_code(), 410);
    assert_eq!(before_sweep.json::<serde_json::Value>()["code"], "EXPIRED");

    let sweep = SweepService::new(app.state.store.clone(), std::time::Duration::from_secs(3600));
    let report = sweep.run_once().await.unwrap();
    assert_eq!(report.deleted, 1);
    assert!(!app.store.root().join(&id).exists());

    let after_sweep = app.client().get(&url).await;
    assert_eq!(after_sweep.status_code(), 410);
}

#[tokio::test]
async fn test_sweep_keeps_fresh_jobs() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/convert")
        .multipart(markdown_form("fresh.md", "# Fresh", None))
        .await;
    let data: serde_json::Value = response.json();
    let url = data["formats"]["docx"]["download_url"].as_str().unwrap().to_string();

    let sweep = Arc::new(SweepService::new(
        app.state.store.clone(),
        std::time::Duration::from_secs(3600),
    ));
    let report = sweep.run_once().await.unwrap();
    assert_eq!(report.deleted, 0);

    assert_eq!(app.client().get(&url).await.status_code(), 200);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&format!("/api/download/{}/docx", JobId::generate()))
        .await;

    assert_eq!(response.status_code(), 404);
    assert_eq!(response.json::<serde_json::Value>()["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_job_ids_rejected() {
    let app = setup_test_app().await;
    let client = app.client();

    let id = JobId::generate().to_string();
    for bad in [
        "not-a-job".to_string(),
        id.to_uppercase(),
        id.replace('-', ""),
        "..%2F..%2Fetc".to_string(),
        format!("{}x", &id[..35]),
    ] {
        let response = client.get(&format!("/api/download/{}/docx", bad)).await;
        assert_eq!(response.status_code(), 400, "id {:?}", bad);
        assert_eq!(
            response.json::<serde_json::Value>()["code"],
            "INVALID_JOB_ID"
        );
    }
}

#[tokio::test]
async fn test_unknown_format_rejected() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&format!("/api/download/{}/exe", JobId::generate()))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<serde_json::Value>()["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_unknown_format_not_echoed() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&format!("/api/download/{}/%3Cb%3Ex", JobId::generate()))
        .await;
    assert_eq!(response.status_code(), 400);

    let body = response.text();
    assert!(!body.contains("<b>"));
    let data: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        data["error"],
        "Unknown output format; expected one of docx, pdf, gdocs"
    );
}

#[tokio::test]
async fn test_format_not_requested_is_not_found() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post("/api/convert")
        .multipart(markdown_form("doc.md", "# Only docx", Some("docx")))
        .await;
    let data: serde_json::Value = response.json();
    let job_id = data["job_id"].as_str().unwrap();

    for format in ["pdf", "gdocs"] {
        let response = client
            .get(&format!("/api/download/{}/{}", job_id, format))
            .await;
        assert_eq!(response.status_code(), 404, "format {}", format);
    }
}
