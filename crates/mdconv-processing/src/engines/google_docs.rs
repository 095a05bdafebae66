//! Google Docs export
//!
//! Uploads the assembled HTML to Google Drive with conversion to a native
//! Google Docs document, using the caller's bearer credential.

use super::{CloudCredential, ConversionEngine, EngineError, EngineOutput};
use crate::assembler::AssembledDocument;
use anyhow::{Context, Result};
use async_trait::async_trait;
use mdconv_core::OutputFormat;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const GOOGLE_DOCS_MIME_TYPE: &str = "application/vnd.google-apps.document";
const UPLOAD_PATH: &str = "/upload/drive/v3/files";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
}

pub struct GoogleDocsEngine {
    http_client: reqwest::Client,
    api_base: String,
}

impl GoogleDocsEngine {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for Google Drive API")?;

        Ok(Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn upload_url(&self) -> String {
        format!(
            "{}{}?uploadType=multipart&fields=id,webViewLink",
            self.api_base, UPLOAD_PATH
        )
    }

    /// `multipart/related` body: JSON file metadata, then the HTML media.
    fn multipart_body(name: &str, html: &str, boundary: &str) -> Result<Vec<u8>, EngineError> {
        let metadata = serde_json::json!({
            "name": name,
            "mimeType": GOOGLE_DOCS_MIME_TYPE,
        });
        let metadata = serde_json::to_string(&metadata)
            .map_err(|e| EngineError::Failed(format!("Failed to encode file metadata: {}", e)))?;

        let mut body = Vec::with_capacity(html.len() + metadata.len() + 256);
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.extend_from_slice(metadata.as_bytes());
        body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Type: text/html; charset=UTF-8\r\n\r\n");
        body.extend_from_slice(html.as_bytes());
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
        Ok(body)
    }
}

#[async_trait]
impl ConversionEngine for GoogleDocsEngine {
    fn format(&self) -> OutputFormat {
        OutputFormat::Gdocs
    }

    fn name(&self) -> &'static str {
        "google-docs"
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn convert(
        &self,
        document: &AssembledDocument,
        credential: Option<&CloudCredential>,
    ) -> Result<EngineOutput, EngineError> {
        let credential = credential.ok_or(EngineError::AuthRequired)?;

        let boundary = format!("mdconv-{}", uuid::Uuid::new_v4().simple());
        let body = Self::multipart_body(document.display_name(), &document.html, &boundary)?;

        let response = self
            .http_client
            .post(self.upload_url())
            .bearer_auth(credential.token())
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Failed("Google Drive API request timed out".to_string())
                } else {
                    EngineError::Failed(format!("Failed to send request to Google Drive API: {}", e))
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::info!(status = %status, "Google Drive rejected the credential");
            return Err(EngineError::AuthRequired);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EngineError::Failed(format!(
                "Google Drive API returned error {}: {}",
                status, error_text
            )));
        }

        let file: DriveFile = response
            .json()
            .await
            .map_err(|e| EngineError::Failed(format!("Failed to parse Google Drive API response: {}", e)))?;

        let web_view_link = file
            .web_view_link
            .unwrap_or_else(|| format!("https://docs.google.com/document/d/{}/edit", file.id));

        tracing::info!(file_id = %file.id, "Created Google Docs document");

        Ok(EngineOutput::Link { web_view_link })
    }

    async fn version(&self) -> Result<String, EngineError> {
        Ok("drive-v3".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn document() -> AssembledDocument {
        AssembledDocument {
            title: Some("Quarterly Report".to_string()),
            markdown: "# Q3".to_string(),
            html: "<html><body><h1>Q3</h1></body></html>".to_string(),
        }
    }

    fn engine(base: &str) -> GoogleDocsEngine {
        GoogleDocsEngine::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_requires_credential() {
        let result = engine("http://127.0.0.1:9").convert(&document(), None).await;
        assert!(matches!(result, Err(EngineError::AuthRequired)));
    }

    #[tokio::test]
    async fn test_uploads_and_returns_link() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", UPLOAD_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("uploadType".into(), "multipart".into()),
                Matcher::UrlEncoded("fields".into(), "id,webViewLink".into()),
            ]))
            .match_header("authorization", "Bearer token-123")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/related; boundary=".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#""name":"Quarterly Report""#.to_string()),
                Matcher::Regex(GOOGLE_DOCS_MIME_TYPE.to_string()),
                Matcher::Regex("<h1>Q3</h1>".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"abc","webViewLink":"https://docs.google.com/document/d/abc/edit"}"#)
            .create_async()
            .await;

        let credential = CloudCredential::new("token-123").unwrap();
        let output = engine(&server.url())
            .convert(&document(), Some(&credential))
            .await
            .unwrap();

        assert_eq!(
            output,
            EngineOutput::Link {
                web_view_link: "https://docs.google.com/document/d/abc/edit".to_string()
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_link_built_from_id_when_missing() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", UPLOAD_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id":"xyz"}"#)
            .create_async()
            .await;

        let credential = CloudCredential::new("t").unwrap();
        let output = engine(&server.url())
            .convert(&document(), Some(&credential))
            .await
            .unwrap();
        assert_eq!(
            output,
            EngineOutput::Link {
                web_view_link: "https://docs.google.com/document/d/xyz/edit".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_credential_requires_auth() {
        for status in [401, 403] {
            let mut server = mockito::Server::new_async().await;
            let _mock = server
                .mock("POST", UPLOAD_PATH)
                .match_query(Matcher::Any)
                .with_status(status)
                .with_body(r#"{"error":{"code":401}}"#)
                .create_async()
                .await;

            let credential = CloudCredential::new("expired").unwrap();
            let result = engine(&server.url())
                .convert(&document(), Some(&credential))
                .await;
            assert!(matches!(result, Err(EngineError::AuthRequired)), "status {}", status);
        }
    }

    #[tokio::test]
    async fn test_server_error_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", UPLOAD_PATH)
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("backend error")
            .create_async()
            .await;

        let credential = CloudCredential::new("t").unwrap();
        let result = engine(&server.url())
            .convert(&document(), Some(&credential))
            .await;
        match result {
            Err(EngineError::Failed(msg)) => assert!(msg.contains("500")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
