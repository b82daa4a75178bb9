//! HTTP exchange types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! `FlippedClient` builds `HttpRequest` values and parses `HttpResponse`
//! values without touching the network; a `Transport` implementation executes
//! the actual I/O. Upload requests carry their multipart form as structured
//! parts rather than pre-encoded bytes, so each transport encodes them with
//! its own HTTP library.

/// Request kind chosen by a domain operation.
///
/// `Upload` travels as `POST` with a `multipart/form-data` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Upload,
}

impl HttpMethod {
    /// The verb written on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post | HttpMethod::Upload => "POST",
        }
    }
}

/// A file attached to a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Multipart form: plain text fields plus at most one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpBody {
    Empty,
    Json(String),
    Multipart(MultipartForm),
}

impl HttpBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, HttpBody::Empty)
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: HttpBody,
}

impl HttpRequest {
    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// Produced by a `Transport` after executing an `HttpRequest`, then handed
/// to `FlippedClient::parse_*` for interpretation.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
