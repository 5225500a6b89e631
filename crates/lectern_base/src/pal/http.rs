/* 📖 # What does the HTTP module provide?

Plain request/response values and the `HttpService` trait. A service is a single
synchronous handler: it receives a whole request (body already read) and returns a whole
response. `RealPal` drives a service from a `tiny_http` server; `MockPal` calls it
directly from tests.
*/

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// HTTP methods understood by lectern services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl HttpMethod {
    /// Parse an HTTP method, case-insensitively.
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "HEAD" => Some(Self::Head),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP headers. Names are compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    inner: HashMap<String, (String, String)>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any header with the same name.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.inner
            .insert(key.to_ascii_lowercase(), (key, value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .get(&key.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(&key.to_ascii_lowercase())
    }

    /// Iterate over `(name, value)` pairs, names as originally inserted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .values()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Request or response body bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpBody(Vec<u8>);

impl HttpBody {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Body as a string if it is valid UTF-8.
    pub fn as_string(&self) -> Option<String> {
        String::from_utf8(self.0.clone()).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for HttpBody {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl From<String> for HttpBody {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&str> for HttpBody {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

/// HTTP request as seen by a service.
///
/// `url` is the raw request target, e.g. `/books/a.fb2?x=1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: HttpMethod,
    url: String,
    headers: HttpHeaders,
    body: HttpBody,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HttpHeaders::new(),
            body: HttpBody::empty(),
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        self.url
            .split_once('?')
            .map_or(self.url.as_str(), |(path, _)| path)
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn body(&self) -> &HttpBody {
        &self.body
    }

    pub fn with_body(mut self, body: impl Into<HttpBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }
}

/// HTTP status codes used by lectern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatusCode {
    Ok = 200,
    NoContent = 204,
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    InternalServerError = 500,
    /// Reported when a service fails to produce any response at all.
    ServiceFailure = 599,
}

impl HttpStatusCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

/// HTTP response produced by a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: HttpStatusCode,
    headers: HttpHeaders,
    body: HttpBody,
}

impl HttpResponse {
    pub fn new(status: HttpStatusCode) -> Self {
        Self {
            status,
            headers: HttpHeaders::new(),
            body: HttpBody::empty(),
        }
    }

    pub fn ok() -> Self {
        Self::new(HttpStatusCode::Ok)
    }

    pub fn no_content() -> Self {
        Self::new(HttpStatusCode::NoContent)
    }

    /// A response with the given status and a JSON body.
    pub fn json(status: HttpStatusCode, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_content_type("application/json; charset=utf-8")
            .with_body(body.into())
    }

    pub fn status(&self) -> HttpStatusCode {
        self.status
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn body(&self) -> &HttpBody {
        &self.body
    }

    pub fn into_body(self) -> HttpBody {
        self.body
    }

    pub fn with_body(mut self, body: impl Into<HttpBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("Content-Type", content_type)
    }
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    /// Port to listen on. If None, the OS assigns an available port.
    pub port: Option<u16>,
    /// Sent in the `Server` response header.
    pub server_name: String,
}

impl HttpServerConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Address to bind, `host:port` (port 0 when the OS should choose).
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port.unwrap_or(0))
    }
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
            server_name: "lectern".to_string(),
        }
    }
}

/// A request handler served by the PAL.
///
/// An `Err` means the service could not produce a response at all; the server answers
/// such requests with status 599. Expected failures (missing book, bad query) should be
/// returned as regular responses with a 4xx/5xx status.
pub trait HttpService: std::fmt::Debug + Send + Sync + 'static {
    fn handle_request(&self, request: HttpRequest) -> crate::LecternResult<HttpResponse>;
}

/// Handle to a running HTTP server. Dropping the last clone stops the accept loop.
#[derive(Debug, Clone)]
pub struct HttpServerHandle {
    port: u16,
    shutdown: Arc<AtomicBool>,
}

impl HttpServerHandle {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Ask the server to stop accepting connections.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Shared flag polled by the accept loop.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }
}

impl Drop for HttpServerHandle {
    fn drop(&mut self) {
        // The accept loop holds its own clone of the flag, so only the last handle counts
        if Arc::strong_count(&self.shutdown) <= 2 {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::parse("GET"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("post"), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::parse("Options"), Some(HttpMethod::Options));
        assert_eq!(HttpMethod::parse("BREW"), None);
        assert_eq!(HttpMethod::Post.to_string(), "POST");
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let mut headers = HttpHeaders::new();
        headers.insert("Content-Type", "application/json");
        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert!(headers.contains("CONTENT-TYPE"));

        headers.insert("content-type", "text/plain");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
    }

    #[test]
    fn test_request_path_strips_query() {
        let request = HttpRequest::new(HttpMethod::Get, "/books/a%20b.fb2?page=2&q=fox");
        assert_eq!(request.path(), "/books/a%20b.fb2");

        let plain = HttpRequest::new(HttpMethod::Get, "/books");
        assert_eq!(plain.path(), "/books");
    }

    #[test]
    fn test_request_body() {
        let request = HttpRequest::new(HttpMethod::Post, "/books/a.fb2/search")
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"word":"fox"}"#);
        assert_eq!(request.body().as_string().as_deref(), Some(r#"{"word":"fox"}"#));
        assert_eq!(request.headers().get("content-type"), Some("application/json"));
    }

    #[test]
    fn test_json_response() {
        let response = HttpResponse::json(HttpStatusCode::NotFound, r#"{"message":"x"}"#);
        assert_eq!(response.status().as_u16(), 404);
        assert_eq!(
            response.headers().get("Content-Type"),
            Some("application/json; charset=utf-8")
        );
        assert_eq!(response.body().len(), 15);
    }

    #[test]
    fn test_server_config_address() {
        assert_eq!(HttpServerConfig::default().address(), "127.0.0.1:0");
        assert_eq!(
            HttpServerConfig::new("0.0.0.0").with_port(3000).address(),
            "0.0.0.0:3000"
        );
    }

    #[test]
    fn test_server_handle_shutdown_on_last_drop() {
        let handle = HttpServerHandle::new(8080);
        let loop_flag = handle.shutdown_flag();
        let clone = handle.clone();
        drop(handle);
        assert!(!loop_flag.load(Ordering::SeqCst));
        drop(clone);
        assert!(loop_flag.load(Ordering::SeqCst));
    }
}
