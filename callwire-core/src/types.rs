//! Core types for requests, raw responses and annotations.

use crate::body::ResponseBody;
use crate::error::CallError;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use std::borrow::Cow;

/// Outgoing request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl RequestBody {
    /// Create a body with a content type
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            bytes: bytes.into(),
        }
    }

    /// Create a JSON body
    pub fn json(value: &serde_json::Value) -> Result<Self, CallError> {
        Ok(Self::new("application/json", serde_json::to_vec(value)?))
    }
}

/// A fully formed outgoing request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<RequestBody>,
}

impl Request {
    /// Create a new request
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a request by parsing a URL
    pub fn parse(method: Method, url: &str) -> Result<Self, CallError> {
        let url = Url::parse(url)
            .map_err(|e| CallError::invalid_request(format!("Invalid URL {url}: {e}")))?;
        Ok(Self::new(method, url))
    }

    /// Set a header
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }
}

/// Raw response handed over by the transport.
///
/// The body is the single-use stream of the exchange; the classifier takes it
/// out and leaves a detached placeholder behind.
#[derive(Debug)]
pub struct RawResponse {
    request: Request,
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl RawResponse {
    /// Create a raw response with an empty body
    pub fn new(request: Request, status: StatusCode) -> Self {
        Self {
            request,
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::empty(),
        }
    }

    /// Set a header
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace all headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the body
    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Take the body out, leaving an inert placeholder with the same metadata
    pub fn take_body(&mut self) -> ResponseBody {
        self.body.detach()
    }
}

/// Marker attached to an operation declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    name: Cow<'static, str>,
    value: Option<String>,
}

impl Annotation {
    /// Hand the raw body to the converter without buffering it first
    pub const STREAMING: Annotation = Annotation::named("streaming");

    /// Deliver async callbacks on the transport thread, bypassing the callback executor
    pub const SKIP_CALLBACK_EXECUTOR: Annotation = Annotation::named("skip_callback_executor");

    /// Create an annotation without a value
    pub const fn named(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            value: None,
        }
    }

    /// Create an annotation with an owned name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            value: None,
        }
    }

    /// Set the value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Check whether an annotation with the same name is present
    pub fn is_present(&self, annotations: &[Annotation]) -> bool {
        annotations.iter().any(|a| a.name == self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parse() {
        let req = Request::parse(Method::GET, "https://api.example.com/users/7")
            .unwrap()
            .with_header(
                reqwest::header::ACCEPT,
                HeaderValue::from_static("application/json"),
            );

        assert_eq!(req.method(), &Method::GET);
        assert_eq!(req.url().path(), "/users/7");
        assert_eq!(req.headers()["accept"], "application/json");
        assert!(req.body().is_none());

        let err = Request::parse(Method::GET, "not a url").unwrap_err();
        assert!(matches!(err, CallError::InvalidRequest(_)));
    }

    #[test]
    fn test_annotation_presence() {
        let annotations = vec![Annotation::new("streaming"), Annotation::new("cache").with_value("60")];

        assert!(Annotation::STREAMING.is_present(&annotations));
        assert!(!Annotation::SKIP_CALLBACK_EXECUTOR.is_present(&annotations));
        assert_eq!(annotations[1].value(), Some("60"));
    }

    #[test]
    fn test_take_body_leaves_placeholder() {
        let req = Request::parse(Method::GET, "http://localhost/").unwrap();
        let mut raw = RawResponse::new(req, StatusCode::OK)
            .with_body(ResponseBody::from_bytes(Some("text/plain".into()), "hello"));

        let mut body = raw.take_body();
        assert_eq!(body.text().unwrap(), "hello");

        assert!(raw.body().is_detached());
        assert_eq!(raw.body().content_type(), Some("text/plain"));
        assert_eq!(raw.body().content_length(), Some(5));
    }
}
