//! HTTP transport gateway.
//!
//! Talks to the question-answering service over its REST routes: a
//! multipart upload and a JSON question endpoint.

use super::gateway::{Answer, DocumentFile, TransportGateway, UploadReceipt};
use crate::config::ClientConfig;
use crate::error::{ConfigResult, TransportError, TransportResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Wire shape of a successful upload.
#[derive(Debug, Deserialize)]
struct UploadPayload {
    file_id: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    chars_extracted: Option<u64>,
}

/// Wire shape of a question.
#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    file_id: &'a str,
}

/// Wire shape of a successful answer.
#[derive(Debug, Deserialize)]
struct AskPayload {
    answer: String,
    #[serde(default)]
    sources: Vec<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Gateway backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    upload_url: String,
    ask_url: String,
}

impl HttpGateway {
    /// Create a gateway from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &ClientConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            client: config.build_client()?,
            upload_url: config.upload_url(),
            ask_url: config.ask_url(),
        })
    }

    /// Create a gateway that reuses an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            upload_url: config.upload_url(),
            ask_url: config.ask_url(),
        }
    }

    /// URL uploads are posted to.
    #[must_use]
    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// URL questions are posted to.
    #[must_use]
    pub fn ask_url(&self) -> &str {
        &self.ask_url
    }
}

#[async_trait]
impl TransportGateway for HttpGateway {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn upload(&self, file: &DocumentFile) -> TransportResult<UploadReceipt> {
        let part = Part::bytes(file.bytes().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.mime())
            .map_err(|e| TransportError::NetworkUnreachable(format!("invalid upload: {e}")))?;
        let form = Form::new().part("file", part);

        debug!(
            url = %self.upload_url,
            name = %file.name(),
            len = file.bytes().len(),
            "uploading document"
        );

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(unreachable)?;

        let payload: UploadPayload = decode(response).await?;
        if payload.file_id.trim().is_empty() {
            warn!("upload response carried an empty file_id");
            return Err(TransportError::malformed("empty file_id"));
        }

        info!(
            file_id = %payload.file_id,
            chars_extracted = ?payload.chars_extracted,
            "document uploaded"
        );

        Ok(UploadReceipt {
            file_id: payload.file_id,
            server_message: payload.message,
            chars_extracted: payload.chars_extracted,
        })
    }

    async fn ask(&self, question: &str, file_id: &str) -> TransportResult<Answer> {
        debug!(url = %self.ask_url, file_id = %file_id, "asking question");

        let response = self
            .client
            .post(&self.ask_url)
            .json(&AskRequest { question, file_id })
            .send()
            .await
            .map_err(unreachable)?;

        let payload: AskPayload = decode(response).await?;

        if let Some(ref error) = payload.error {
            warn!(error = %error, "server reported an error alongside the answer");
        }

        info!(
            answer_len = payload.answer.len(),
            sources = payload.sources.len(),
            "answer received"
        );

        Ok(Answer {
            text: payload.answer,
            sources: payload.sources.into_iter().map(source_text).collect(),
        })
    }
}

fn unreachable(err: reqwest::Error) -> TransportError {
    warn!(error = %err, "request did not reach the server");
    TransportError::NetworkUnreachable(err.without_url().to_string())
}

/// Check the status and decode a success payload.
async fn decode<T: DeserializeOwned>(response: Response) -> TransportResult<T> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let err = match rejection_message(status, &body) {
            Some(message) => TransportError::rejected_with(status.as_u16(), message),
            None => TransportError::rejected(status.as_u16()),
        };
        warn!(status = %status, error = %err, "server rejected request");
        return Err(err);
    }

    let body = response
        .text()
        .await
        .map_err(|e| TransportError::malformed(format!("unreadable body: {e}")))?;

    serde_json::from_str(&body).map_err(|e| {
        warn!(error = %e, "malformed response payload");
        TransportError::malformed(e.to_string())
    })
}

/// Longest plain-text error body shown as-is.
const MAX_PLAIN_BODY: usize = 200;

/// Extract the server's explanation from an error body.
///
/// The service reports errors as `{"detail": ...}`. Otherwise only a short
/// single-line plain-text body is kept; proxy error pages and other bulky
/// bodies give way to the status reason.
fn rejection_message(status: StatusCode, body: &str) -> Option<String> {
    let body = body.trim();

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(body) {
        match map.get("detail") {
            Some(serde_json::Value::String(detail)) => return Some(detail.clone()),
            Some(detail) => return Some(detail.to_string()),
            None => {}
        }
    }

    let plain = !body.is_empty()
        && !body.starts_with('<')
        && !body.contains('\n')
        && body.chars().count() <= MAX_PLAIN_BODY;

    if plain {
        Some(body.to_string())
    } else {
        status.canonical_reason().map(String::from)
    }
}

fn source_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_urls_from_config() {
        let gateway = HttpGateway::new(&ClientConfig::new("http://localhost:8000/")).unwrap();
        assert_eq!(gateway.upload_url(), "http://localhost:8000/api/documents/upload");
        assert_eq!(gateway.ask_url(), "http://localhost:8000/api/qa/ask");
        assert_eq!(gateway.name(), "http");
    }

    #[test]
    fn test_gateway_with_shared_client() {
        let client = reqwest::Client::new();
        let gateway = HttpGateway::with_client(client, &ClientConfig::new("https://qa.internal"));
        assert_eq!(gateway.upload_url(), "https://qa.internal/api/documents/upload");
        assert_eq!(gateway.ask_url(), "https://qa.internal/api/qa/ask");
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(HttpGateway::new(&ClientConfig::new("localhost")).is_err());
    }

    #[test]
    fn test_rejection_message_prefers_detail() {
        let msg = rejection_message(
            StatusCode::NOT_FOUND,
            r#"{"detail": "Vector store not found. Please upload the document first."}"#,
        );
        assert_eq!(
            msg.as_deref(),
            Some("Vector store not found. Please upload the document first.")
        );
    }

    #[test]
    fn test_rejection_message_fallbacks() {
        assert_eq!(
            rejection_message(StatusCode::BAD_GATEWAY, "upstream down\n").as_deref(),
            Some("upstream down")
        );
        assert_eq!(
            rejection_message(StatusCode::INTERNAL_SERVER_ERROR, "").as_deref(),
            Some("Internal Server Error")
        );
        assert_eq!(
            rejection_message(
                StatusCode::BAD_GATEWAY,
                "<html><body><h1>502 Bad Gateway</h1></body></html>"
            )
            .as_deref(),
            Some("Bad Gateway")
        );
        assert_eq!(
            rejection_message(StatusCode::SERVICE_UNAVAILABLE, "line one\nline two").as_deref(),
            Some("Service Unavailable")
        );
        assert_eq!(
            rejection_message(StatusCode::BAD_GATEWAY, &"x".repeat(MAX_PLAIN_BODY + 1)).as_deref(),
            Some("Bad Gateway")
        );
        let structured = rejection_message(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail": [{"loc": ["body", "file_id"], "msg": "field required"}]}"#,
        )
        .unwrap();
        assert!(structured.contains("field required"));
    }

    #[test]
    fn test_payloads_require_fields() {
        assert!(serde_json::from_str::<UploadPayload>(r#"{"message": "ok"}"#).is_err());
        assert!(serde_json::from_str::<UploadPayload>(r#"{"file_id": 7}"#).is_err());
        assert!(serde_json::from_str::<AskPayload>(r#"{"sources": []}"#).is_err());

        let payload: AskPayload =
            serde_json::from_str(r#"{"answer": "42", "sources": ["p.1", {"page": 2}]}"#).unwrap();
        let sources: Vec<String> = payload.sources.into_iter().map(source_text).collect();
        assert_eq!(sources, vec!["p.1".to_string(), r#"{"page":2}"#.to_string()]);
    }
}
