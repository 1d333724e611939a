//! Typed results and response classification.

use crate::body::ResponseBody;
use crate::converter::Converter;
use crate::error::CallError;
use crate::types::{RawResponse, Request};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::fmt;

/// Typed result of one exchange.
///
/// A successful response carries the converted body (absent for 204/205), an
/// unsuccessful one carries the fully buffered error body. Status and headers
/// are always available.
pub struct Response<T> {
    raw: RawResponse,
    body: Option<T>,
    error_body: Option<ResponseBody>,
}

impl<T> Response<T> {
    /// Create a successful response; the status must be 2xx
    pub fn success(body: Option<T>, raw: RawResponse) -> Result<Self, CallError> {
        if !raw.status().is_success() {
            return Err(CallError::illegal_state(format!(
                "Successful response must have a 2xx status, got {}",
                raw.status()
            )));
        }
        Ok(Self {
            raw,
            body,
            error_body: None,
        })
    }

    /// Create an error response; the status must not be 2xx
    pub fn error(body: ResponseBody, raw: RawResponse) -> Result<Self, CallError> {
        if raw.status().is_success() {
            return Err(CallError::illegal_state(format!(
                "Error response must not have a 2xx status, got {}",
                raw.status()
            )));
        }
        Ok(Self {
            raw,
            body: None,
            error_body: Some(body),
        })
    }

    pub fn status(&self) -> StatusCode {
        self.raw.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.raw.headers()
    }

    /// The request that produced this response
    pub fn request(&self) -> &Request {
        self.raw.request()
    }

    /// Whether the status is in the 2xx range
    pub fn is_successful(&self) -> bool {
        self.raw.status().is_success()
    }

    /// The raw response; its body is a detached placeholder
    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    pub fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Option<T> {
        self.body
    }

    pub fn error_body(&self) -> Option<&ResponseBody> {
        self.error_body.as_ref()
    }

    pub fn error_body_mut(&mut self) -> Option<&mut ResponseBody> {
        self.error_body.as_mut()
    }

    pub fn into_error_body(self) -> Option<ResponseBody> {
        self.error_body
    }
}

impl<T: fmt::Debug> fmt::Debug for Response<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.raw.status())
            .field("url", &self.raw.request().url().as_str())
            .field("body", &self.body)
            .field("error_body", &self.error_body)
            .finish()
    }
}

/// Classify a raw response and convert its body.
///
/// The body stream is moved out of `raw` before anything reads it, so the
/// raw response kept inside the result can never become a second consumer.
pub fn parse_response<T>(
    mut raw: RawResponse,
    converter: &dyn Converter<T>,
) -> Result<Response<T>, CallError> {
    let body = raw.take_body();
    let status = raw.status();

    if !status.is_success() {
        // Buffer the entire body so it stays readable after the connection is gone.
        let buffered = body.buffer()?;
        return Response::error(buffered, raw);
    }

    if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
        drop(body);
        return Response::success(None, raw);
    }

    let (body, caught) = body.catching();
    match converter.convert(body) {
        Ok(value) => Response::success(Some(value), raw),
        // A failing source outranks whatever the converter made of it.
        Err(e) => Err(caught.take().unwrap_or(e)),
    }
}
