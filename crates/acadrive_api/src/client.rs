use std::net::IpAddr;
use std::sync::Arc;

use acadrive_contract::{ApiError, FileRecord, SearchFilters, Stats, UploadRequest};
use async_trait::async_trait;
use futures::stream;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

pub const LOCAL_BASE_URL: &str = "http://127.0.0.1:8000";
pub const PRODUCTION_BASE_URL: &str = "https://acadrive-api.onrender.com";

const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Receives upload progress as a percentage, 0 to 100, non-decreasing.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// The four remote operations plus the backend health probe. Implemented over
/// HTTP in production and over in-memory fixtures for tests and offline use.
#[async_trait]
pub trait AcadriveApi: Send + Sync {
    /// Multipart POST to `/upload/`. Validation and size-limit failures are
    /// raised before any network activity; progress is reported through
    /// `on_progress` as the body streams out.
    async fn upload_file(
        &self,
        request: UploadRequest,
        on_progress: ProgressFn,
    ) -> Result<FileRecord, ApiError>;

    /// GET `/files/recent`.
    async fn recent_files(&self) -> Result<Vec<FileRecord>, ApiError>;

    /// GET `/search/` with `subject`/`file_type` appended only when set.
    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<FileRecord>, ApiError>;

    /// GET `/stats`. Callers treat failures as non-critical.
    async fn stats(&self) -> Result<Stats, ApiError>;

    /// GET `/health`.
    async fn health(&self) -> Result<(), ApiError>;
}

/// Default API base for a given host: loopback addresses talk to the local
/// development backend, anything else to the fixed production endpoint.
pub fn base_url_for_host(host: &str) -> &'static str {
    let loopback = match host.parse::<IpAddr>() {
        Ok(addr) => addr.is_loopback(),
        Err(_) => host.eq_ignore_ascii_case("localhost"),
    };
    if loopback {
        LOCAL_BASE_URL
    } else {
        PRODUCTION_BASE_URL
    }
}

/// Query parameters for `/search/`, with empty filters left out. Encoding is
/// handled by reqwest's query serializer.
pub fn search_params<'a>(query: &'a str, filters: &'a SearchFilters) -> Vec<(&'static str, &'a str)> {
    let mut params = vec![("query", query)];
    if let Some(subject) = filters.subject.as_deref().filter(|s| !s.is_empty()) {
        params.push(("subject", subject));
    }
    if let Some(file_type) = filters.file_type.as_deref().filter(|s| !s.is_empty()) {
        params.push(("file_type", file_type));
    }
    params
}

pub struct HttpAcadriveApi {
    client: Client,
    base_url: String,
}

impl HttpAcadriveApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl AcadriveApi for HttpAcadriveApi {
    async fn upload_file(
        &self,
        request: UploadRequest,
        on_progress: ProgressFn,
    ) -> Result<FileRecord, ApiError> {
        request.validate()?;
        on_progress(0);

        let total = request.size().max(1);
        let body = progress_body(request.bytes, total, on_progress.clone());
        let part = Part::stream_with_length(body, total)
            .file_name(request.file_name.clone())
            .mime_str(&request.mime_type)
            .map_err(|err| ApiError::Validation(format!("invalid MIME type: {err}")))?;
        let form = Form::new()
            .text("subject", request.subject.clone())
            .part("file", part);

        let response = self
            .client
            .post(self.url("/upload/"))
            .multipart(form)
            .send()
            .await
            .map_err(as_network)?;
        let record: FileRecord = decode_json(response).await?;
        on_progress(100);
        Ok(record)
    }

    async fn recent_files(&self) -> Result<Vec<FileRecord>, ApiError> {
        let response = self
            .client
            .get(self.url("/files/recent"))
            .send()
            .await
            .map_err(as_network)?;
        decode_json(response).await
    }

    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<FileRecord>, ApiError> {
        let response = self
            .client
            .get(self.url("/search/"))
            .query(&search_params(query, filters))
            .send()
            .await
            .map_err(as_network)?;
        decode_json(response).await
    }

    async fn stats(&self) -> Result<Stats, ApiError> {
        let response = self
            .client
            .get(self.url("/stats"))
            .send()
            .await
            .map_err(as_network)?;
        decode_json(response).await
    }

    async fn health(&self) -> Result<(), ApiError> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(as_network)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(server_error(
                status.as_u16(),
                &response.text().await.unwrap_or_default(),
            ))
        }
    }
}

/// Wrap the upload bytes in a chunked stream that reports percent transferred
/// as the transport consumes it. Emitted percentages never decrease.
fn progress_body(bytes: Vec<u8>, total: u64, on_progress: ProgressFn) -> Body {
    let chunks: Vec<Vec<u8>> = bytes
        .chunks(UPLOAD_CHUNK_BYTES)
        .map(|chunk| chunk.to_vec())
        .collect();
    let mut sent: u64 = 0;
    let mut last_percent: u8 = 0;
    let counted = chunks.into_iter().map(move |chunk| {
        sent += chunk.len() as u64;
        let percent = ((sent * 100) / total).min(100) as u8;
        if percent > last_percent {
            last_percent = percent;
            on_progress(percent);
        }
        Ok::<Vec<u8>, std::io::Error>(chunk)
    });
    Body::wrap_stream(stream::iter(counted))
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(server_error(status.as_u16(), &body));
    }
    response
        .json::<T>()
        .await
        .map_err(|err| ApiError::Network(format!("invalid response body: {err}")))
}

/// Non-2xx responses carry an optional JSON `detail` string; fall back to a
/// generic message when it is absent or the body is not JSON.
fn server_error(status: u16, body: &str) -> ApiError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("detail")?.as_str().map(str::to_owned))
        .unwrap_or_else(|| format!("request failed with status {status}"));
    debug!(status, detail = %detail, "server returned an error response");
    ApiError::Server { status, detail }
}

fn as_network(err: reqwest::Error) -> ApiError {
    ApiError::Network(err.to_string())
}
