//! Re-sendable description of an outbound API call.
//!
//! `reqwest::RequestBuilder` is consumed on send, so the client keeps its own
//! descriptor around to rebuild the request after a token refresh.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde::Serialize;
use tracing::warn;

use super::ApiError;

/// Path fragment identifying the login call, which is never refreshed
pub const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    File {
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

/// One part of a multipart/form-data body
#[derive(Debug, Clone)]
pub struct MultipartField {
    pub name: String,
    pub value: FieldValue,
}

impl MultipartField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Text(value.into()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<&str>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::File {
                file_name: file_name.into(),
                mime: mime.map(str::to_string),
                bytes,
            },
        }
    }

    fn to_part(&self) -> Result<Part, ApiError> {
        let part = match &self.value {
            FieldValue::Text(text) => Part::text(text.clone()),
            FieldValue::File {
                file_name,
                mime,
                bytes,
            } => {
                let part = Part::bytes(bytes.clone()).file_name(file_name.clone());
                match mime {
                    Some(mime) => part.mime_str(mime)?,
                    None => part,
                }
            }
        };
        Ok(part)
    }
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
    Multipart(Vec<MultipartField>),
}

/// An outbound request plus the one-shot "already retried" marker.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    /// Path relative to the base endpoint, or an absolute URL
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub timeout: Option<Duration>,
    retried: bool,
}

impl PendingRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            timeout: None,
            retried: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        self.body = RequestBody::Form(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn multipart(mut self, fields: Vec<MultipartField>) -> Self {
        self.body = RequestBody::Multipart(fields);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_login(&self) -> bool {
        self.url.contains(LOGIN_PATH)
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Overwrite the authorization header with a bearer credential
    pub fn set_bearer(&mut self, token: &str) {
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers.insert(header::AUTHORIZATION, value);
            }
            Err(e) => warn!(error = %e, "Stored token is not a valid header value, sending without it"),
        }
    }

    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Join the path onto the base endpoint unless it is already absolute
    pub fn resolve_url(&self, base_url: &str) -> String {
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            self.url.clone()
        } else {
            format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                self.url.trim_start_matches('/')
            )
        }
    }

    pub(crate) fn build(&self, client: &Client, base_url: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        let mut builder = client
            .request(self.method.clone(), self.resolve_url(base_url))
            .headers(self.headers.clone());

        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match &self.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Multipart(fields) => {
                let mut form = Form::new();
                for field in fields {
                    form = form.part(field.name.clone(), field.to_part()?);
                }
                builder.multipart(form)
            }
        };

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = "http://localhost:8000/api/v1";
        assert_eq!(
            PendingRequest::get("/products/").resolve_url(base),
            "http://localhost:8000/api/v1/products/"
        );
        assert_eq!(
            PendingRequest::get("sales/my").resolve_url("http://localhost:8000/api/v1/"),
            "http://localhost:8000/api/v1/sales/my"
        );
        assert_eq!(
            PendingRequest::get("https://files.example.com/a").resolve_url(base),
            "https://files.example.com/a"
        );
    }

    #[test]
    fn test_login_detection() {
        assert!(PendingRequest::post("/auth/login").is_login());
        assert!(PendingRequest::post("http://host/api/v1/auth/login?x=1").is_login());
        assert!(!PendingRequest::post("/auth/refresh").is_login());
        assert!(!PendingRequest::get("/auth/me").is_login());
    }

    #[test]
    fn test_set_bearer_overwrites() {
        let mut request = PendingRequest::get("/auth/me");
        assert_eq!(request.authorization(), None);

        request.set_bearer("A1");
        assert_eq!(request.authorization(), Some("Bearer A1"));

        request.set_bearer("A2");
        assert_eq!(request.authorization(), Some("Bearer A2"));
        assert_eq!(request.headers.len(), 1);
    }

    #[test]
    fn test_invalid_token_is_skipped() {
        let mut request = PendingRequest::get("/auth/me");
        request.set_bearer("bad\ntoken");
        assert_eq!(request.authorization(), None);
    }

    #[test]
    fn test_retried_marker_is_one_shot() {
        let mut request = PendingRequest::get("/sales/");
        assert!(!request.is_retried());
        request.mark_retried();
        assert!(request.is_retried());
        assert!(request.clone().is_retried());
    }

    #[test]
    fn test_query_opt() {
        let request = PendingRequest::get("/products/")
            .query_opt("search", Some("dog food"))
            .query_opt("kind", None::<&str>);
        assert_eq!(request.query, vec![("search".to_string(), "dog food".to_string())]);
    }
}
