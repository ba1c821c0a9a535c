//! [`Backend`] implementation over HTTP using `reqwest`.
//!
//! File names are pushed as URL path segments, so names containing spaces,
//! `#` or `/` are percent-encoded the same way a browser's
//! `encodeURIComponent` would.

use super::{Backend, ExtractionResult, PageContent, UploadResponse};
use crate::config::{ContentFormat, ViewerConfig};
use crate::error::ViewerError;
use async_trait::async_trait;
use reqwest::{multipart, Client, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// HTTP client for the extraction backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
    format: ContentFormat,
    timeout_secs: u64,
}

impl HttpBackend {
    /// Build a client from the viewer configuration.
    pub fn new(config: &ViewerConfig) -> Result<Self, ViewerError> {
        let base = Url::parse(&config.server_url).map_err(|e| {
            ViewerError::InvalidConfig(format!("bad server URL '{}': {e}", config.server_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(ViewerError::InvalidConfig(format!(
                "server URL '{}' cannot carry a path",
                config.server_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ViewerError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            format: config.content_format,
            timeout_secs: config.request_timeout_secs,
        })
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn send_error(&self, url: &Url, e: reqwest::Error) -> ViewerError {
        if e.is_timeout() {
            ViewerError::Timeout {
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            ViewerError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }

    /// Send a request and turn non-2xx answers into [`ViewerError::Backend`].
    async fn execute(&self, url: &Url, request: reqwest::RequestBuilder) -> Result<Response, ViewerError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.send_error(url, e))?;
        let status = response.status();
        debug!("{} → {}", url, status);

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ViewerError::Backend {
            status: status.as_u16(),
            detail: error_detail(&body, status.canonical_reason().unwrap_or("request failed")),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ViewerError> {
        let response = self.execute(&url, self.client.get(url.clone())).await?;
        decode(&url, response).await
    }
}

/// Pull the human-readable message out of an error body.
///
/// FastAPI-style backends answer `{"detail": "..."}`; anything else is shown
/// verbatim, and an empty body falls back to the status reason.
fn error_detail(body: &str, fallback: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match value.get("detail") {
            Some(serde_json::Value::String(s)) => return s.clone(),
            Some(other) => return other.to_string(),
            None => {}
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

async fn decode<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T, ViewerError> {
    let bytes = response.bytes().await.map_err(|e| ViewerError::Network {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ViewerError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_files(&self) -> Result<Vec<String>, ViewerError> {
        self.get_json(self.endpoint(&["files"])).await
    }

    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadResponse, ViewerError> {
        let url = self.endpoint(&["upload"]);
        info!("Uploading '{}' ({} bytes)", filename, bytes.len());

        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .map_err(|e| ViewerError::Internal(format!("multipart: {e}")))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .execute(&url, self.client.post(url.clone()).multipart(form))
            .await?;
        decode(&url, response).await
    }

    async fn fetch_file(&self, name: &str) -> Result<Vec<u8>, ViewerError> {
        let url = self.endpoint(&["file", name]);
        let response = self.execute(&url, self.client.get(url.clone())).await?;
        let bytes = response.bytes().await.map_err(|e| ViewerError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    async fn extract(&self, name: &str, page_hint: u32) -> Result<ExtractionResult, ViewerError> {
        let mut url = self.endpoint(&["extract", name]);
        url.query_pairs_mut()
            .append_pair("page_hint", &page_hint.to_string());
        let response = self.execute(&url, self.client.post(url.clone())).await?;
        decode(&url, response).await
    }

    async fn fetch_content(&self, name: &str, page: u32) -> Result<PageContent, ViewerError> {
        let page = page.to_string();
        self.get_json(self.endpoint(&[self.format.fetch_endpoint(), name, &page]))
            .await
    }

    async fn save_content(&self, name: &str, page: u32, content: &str) -> Result<(), ViewerError> {
        let page = page.to_string();
        let url = self.endpoint(&[self.format.save_endpoint(), name, &page]);
        let body = serde_json::json!({ "content": content });
        self.execute(&url, self.client.post(url.clone()).json(&body))
            .await?;
        Ok(())
    }

    async fn force_extract_page(&self, name: &str, page: u32) -> Result<(), ViewerError> {
        let page = page.to_string();
        let url = self.endpoint(&["force-extract-page", name, &page]);
        self.execute(&url, self.client.post(url.clone())).await?;
        Ok(())
    }

    async fn fetch_json(&self, name: &str, page: u32) -> Result<serde_json::Value, ViewerError> {
        let page = page.to_string();
        self.get_json(self.endpoint(&["extracted-json", name, &page]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(url: &str) -> HttpBackend {
        let config = ViewerConfig::builder().server_url(url).build().unwrap();
        HttpBackend::new(&config).unwrap()
    }

    #[test]
    fn endpoint_encodes_file_names() {
        let b = backend("http://localhost:8000");
        let url = b.endpoint(&["file", "my report#1.pdf"]);
        assert_eq!(url.as_str(), "http://localhost:8000/file/my%20report%231.pdf");
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let b = backend("http://localhost:8000/api");
        let url = b.endpoint(&["extracted-markdown", "a.pdf", "3"]);
        assert_eq!(url.as_str(), "http://localhost:8000/api/extracted-markdown/a.pdf/3");
    }

    #[test]
    fn error_detail_prefers_fastapi_detail() {
        assert_eq!(error_detail(r#"{"detail":"File not found"}"#, "Not Found"), "File not found");
        assert_eq!(error_detail("", "Not Found"), "Not Found");
        assert_eq!(error_detail("boom\n", "Internal Server Error"), "boom");
        assert_eq!(error_detail(r#"{"detail":[1,2]}"#, "x"), "[1,2]");
    }
}
