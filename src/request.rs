// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Request Module
//!
//! Every builder endpoint answers with the same JSON envelope: either
//! `{ "success": bool, ... }` or `{ "error": "..." }` with a failing status.
//! This module holds the envelope type, the request options, and
//! [`HttpRequestClient`], the `reqwest`-backed [`RequestClient`].

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::core::error::{RequestError, Result, WizardError, GENERIC_FAILURE};
use crate::core::traits::RequestClient;

/// Header marking requests as issued by script rather than navigation.
pub const REQUESTED_WITH: &str = "X-Requested-With";

/// HTTP methods used by the builder endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

/// A file sent as one part of a multipart body.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Name of the file as the user picked it.
    pub file_name: String,
    /// MIME type of the content.
    pub content_type: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl FilePart {
    /// Builds a part from in-memory content.
    pub fn new<N, C>(file_name: N, content_type: C, bytes: Vec<u8>) -> Self
    where
        N: Into<String>,
        C: Into<String>,
    {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, guessing its MIME type from the extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|e| WizardError::io_error(path.to_path_buf(), e))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                WizardError::internal_error(format!(
                    "Not a file path: {}",
                    path.display()
                ))
            })?
            .to_string();
        let content_type = guess_mime(path).to_string();
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }
}

fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Body of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// A JSON document.
    Json(JsonValue),
    /// A multipart form with a single file part under `field`.
    Multipart {
        /// Form field name.
        field: String,
        /// The file.
        file: Box<FilePart>,
    },
}

/// Method and body of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    /// HTTP method.
    pub method: Method,
    /// Request body.
    pub body: RequestBody,
}

impl RequestOptions {
    /// A `POST` without a body.
    pub fn post() -> Self {
        Self {
            method: Method::Post,
            body: RequestBody::Empty,
        }
    }

    /// A `POST` carrying a JSON document.
    pub fn post_json(body: JsonValue) -> Self {
        Self {
            method: Method::Post,
            body: RequestBody::Json(body),
        }
    }

    /// A `POST` carrying one file under `field`.
    pub fn post_file<S: Into<String>>(field: S, file: FilePart) -> Self {
        Self {
            method: Method::Post,
            body: RequestBody::Multipart {
                field: field.into(),
                file: Box::new(file),
            },
        }
    }
}

/// The JSON envelope shared by all endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Whether the server performed the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Failure explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Remaining fields of the response.
    #[serde(flatten)]
    pub payload: Map<String, JsonValue>,
}

impl Envelope {
    /// `true` when the envelope reports `success: true`.
    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }

    /// A string field of the payload.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(JsonValue::as_str)
    }

    /// The error message, or a generic one.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| GENERIC_FAILURE.to_string())
    }
}

/// [`RequestClient`] talking HTTP through `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpRequestClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRequestClient {
    /// Creates a client resolving paths against `base_url`.
    pub fn new<S: Into<String>>(base_url: S, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                WizardError::internal_error(format!(
                    "Failed to build HTTP client: {}",
                    e
                ))
            })?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// The base URL paths are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        _ = headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        _ = headers
            .insert(REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"));
        headers
    }
}

#[async_trait]
impl RequestClient for HttpRequestClient {
    async fn send(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> std::result::Result<Envelope, RequestError> {
        let url = self.url(path);
        let builder = match options.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };
        let builder = match options.body {
            RequestBody::Empty => builder.headers(Self::json_headers()),
            RequestBody::Json(body) => builder
                .headers(Self::json_headers())
                .body(body.to_string()),
            RequestBody::Multipart { field, file } => {
                let FilePart {
                    file_name,
                    content_type,
                    bytes,
                } = *file;
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&content_type)
                    .map_err(|e| RequestError::InvalidRequest(e.to_string()))?;
                builder.multipart(Form::new().part(field, part))
            }
        };

        debug!("{:?} {}", options.method, url);
        let response = builder.send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            RequestError::Transport(e.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        let parsed: std::result::Result<Envelope, _> = serde_json::from_str(&text);

        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|env| env.error)
                .unwrap_or_else(|| GENERIC_FAILURE.to_string());
            error!("Request to {} failed with {}: {}", url, status, message);
            return Err(RequestError::Server {
                status: status.as_u16(),
                message,
            });
        }

        parsed.map_err(|e| RequestError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpRequestClient {
        HttpRequestClient::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_envelope_keeps_extra_fields() {
        let env: Envelope =
            serde_json::from_value(json!({"url": "/static/a.png"})).unwrap();
        assert_eq!(env.success, None);
        assert!(!env.is_success());
        assert_eq!(env.str_field("url"), Some("/static/a.png"));
        assert_eq!(env.error_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(Path::new("a/logo.PNG")), "image/png");
        assert_eq!(guess_mime(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("notes")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_post_json_sends_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sites/7/content"))
            .and(header("content-type", "application/json"))
            .and(header("x-requested-with", "XMLHttpRequest"))
            .and(body_json(json!({"headline": "Hi"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let env = client(&server)
            .send(
                "/api/sites/7/content",
                RequestOptions::post_json(json!({"headline": "Hi"})),
            )
            .await
            .unwrap();
        assert!(env.is_success());
    }

    #[tokio::test]
    async fn test_failing_status_uses_error_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"error": "quota exceeded"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .send("/builder/7/publish", RequestOptions::post())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RequestError::Server {
                status: 500,
                message: "quota exceeded".into()
            }
        );
    }

    #[tokio::test]
    async fn test_failing_status_without_envelope_uses_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = client(&server)
            .send("/builder/7/publish", RequestOptions::post())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn test_success_with_non_json_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .send("/builder/7/publish", RequestOptions::post())
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let client =
            HttpRequestClient::new("http://127.0.0.1:9", Duration::from_secs(2))
                .unwrap();
        let err = client
            .send("/builder/7/publish", RequestOptions::post())
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Transport(_)));
    }

    #[tokio::test]
    async fn test_multipart_upload_returns_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sites/7/upload"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"url": "/uploads/7/logo.png"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let file = FilePart::new("logo.png", "image/png", vec![137, 80, 78, 71]);
        let env = client(&server)
            .send("/api/sites/7/upload", RequestOptions::post_file("image", file))
            .await
            .unwrap();
        assert_eq!(env.str_field("url"), Some("/uploads/7/logo.png"));

        let received = server.received_requests().await.unwrap();
        let content_type = received[0]
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("multipart/form-data"));
        let body = String::from_utf8_lossy(&received[0].body);
        assert!(body.contains("name=\"image\""));
        assert!(body.contains("filename=\"logo.png\""));
    }
}
