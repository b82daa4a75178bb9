//! Executes `HttpRequest` values against the network.
//!
//! `Transport` is the seam between the I/O-free client and a real HTTP
//! library. Non-2xx responses come back as `Ok(HttpResponse)` so status
//! interpretation stays in `FlippedClient::parse_*`; only failures that
//! produce no response at all are `Err`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpBody, HttpMethod, HttpRequest, HttpResponse, MultipartForm};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::connection(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post | HttpMethod::Upload => self.client.post(&request.url),
        };
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        builder = match request.body {
            HttpBody::Empty => builder,
            HttpBody::Json(body) => builder.body(body),
            HttpBody::Multipart(form) => builder.multipart(to_form(form)?),
        };

        let response = builder.send().await.map_err(|e| {
            warn!(url = %request.url, error = %e, "request did not complete");
            if e.is_timeout() {
                ApiError::connection(format!("timed out: {e}"))
            } else {
                ApiError::connection(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::connection(format!("failed to read body: {e}")))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn to_form(form: MultipartForm) -> Result<Form, ApiError> {
    let mut out = Form::new();
    for (key, value) in form.fields {
        out = out.text(key, value);
    }
    if let Some(file) = form.file {
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)
            .map_err(|_| ApiError::validation("content_type"))?;
        out = out.part(file.field_name, part);
    }
    Ok(out)
}
