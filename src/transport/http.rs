//! reqwest-backed [`Transport`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use url::Url;

use super::{ApiRequest, ApiResponse, FileUpload, ProgressFn, RequestBody, Transport};
use crate::error::{ApiError, Result};

/// Upload chunk size; each chunk is one progress tick.
const UPLOAD_CHUNK: usize = 64 * 1024;

/// HTTP transport against one API base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a fixed default deadline per request.
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Self::with_client(base_url, http)
    }

    /// Create a transport with a custom reqwest client.
    pub fn with_client(base_url: impl AsRef<str>, http: reqwest::Client) -> Result<Self> {
        let mut base_url = Url::parse(base_url.as_ref())?;
        // Without a trailing slash `join` would replace the last path segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse> {
        let url = self.url(&request.path)?;
        let mut builder = self.http.request(request.method.clone(), url);

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Multipart(file) => {
                builder.multipart(multipart_form(file, request.progress.clone())?)
            }
        };

        let started = Instant::now();
        let response = builder.send().await.inspect_err(|e| {
            tracing::warn!(
                name: "http.request.failed",
                method = %request.method,
                path = %request.path,
                error = %e,
                "Request did not complete"
            );
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            name: "http.request.completed",
            method = %request.method,
            path = %request.path,
            status,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        );

        Ok(ApiResponse { status, body })
    }
}

fn multipart_form(file: &FileUpload, progress: Option<ProgressFn>) -> Result<Form> {
    let total = file.bytes.len() as u64;
    let bytes = Arc::clone(&file.bytes);

    let chunks = async_stream::stream! {
        let mut sent: u64 = 0;
        for chunk in bytes.chunks(UPLOAD_CHUNK) {
            sent += chunk.len() as u64;
            if let Some(report) = &progress {
                report(percent(sent, total));
            }
            yield Ok::<Vec<u8>, std::io::Error>(chunk.to_vec());
        }
        if total == 0 {
            if let Some(report) = &progress {
                report(100);
            }
        }
    };

    let part = Part::stream_with_length(reqwest::Body::wrap_stream(chunks), total)
        .file_name(file.file_name.clone())
        .mime_str(&file.mime)
        .map_err(|e| ApiError::InvalidInput(format!("invalid content type '{}': {e}", file.mime)))?;

    Ok(Form::new().part(file.field.clone(), part))
}

fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    u8::try_from(sent.saturating_mul(100) / total).unwrap_or(100)
}
