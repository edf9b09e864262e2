// SPDX-License-Identifier: MIT OR Apache-2.0
//! Classification of raw Jenkins HTTP responses.
//!
//! Every operation first turns the transport's response into a
//! [`ResponseOutcome`] and then matches on it, so status handling lives in
//! one place instead of a chain of per-status callbacks.

use nestor_error::{ErrorCode, NestorError, Result};
use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::sync::LazyLock;

static HTML_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<h1>Error</h1>.+</p>").expect("static regex"));

static PARAGRAPH_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?p>").expect("static regex"));

/// A successful response, fully buffered.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status (always 2xx).
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body decoded as UTF-8 (lossy).
    pub body: String,
}

impl RawResponse {
    /// Value of a header as a string, if present and valid ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// What a Jenkins response means, independent of which operation issued it.
#[derive(Debug, Clone)]
pub enum ResponseOutcome {
    /// 2xx.
    Success(RawResponse),
    /// 404.
    NotFound,
    /// 403: Jenkins wants credentials.
    AuthRequired,
    /// 401: the credentials were rejected.
    AuthFailed,
    /// 405: the request shape was refused (a parameterised job triggered
    /// without parameters).
    ValidationFailed(String),
    /// An error status carrying a Jenkins HTML error page; holds the
    /// extracted message.
    ServerError(String),
    /// Any other status.
    Unexpected(StatusCode),
}

impl ResponseOutcome {
    /// Classify a status, headers and body.
    pub fn classify(status: StatusCode, headers: HeaderMap, body: String) -> Self {
        match status.as_u16() {
            200..=299 => Self::Success(RawResponse {
                status,
                headers,
                body,
            }),
            401 => Self::AuthFailed,
            403 => Self::AuthRequired,
            404 => Self::NotFound,
            405 => Self::ValidationFailed(
                extract_html_error(&body).unwrap_or_else(|| "method not allowed".to_string()),
            ),
            _ => match extract_html_error(&body) {
                Some(message) if status.is_client_error() || status.is_server_error() => {
                    Self::ServerError(message)
                }
                _ => Self::Unexpected(status),
            },
        }
    }

    /// Buffer a transport response and classify it.
    pub async fn from_response(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(NestorError::transport)?;
        let body = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Self::classify(status, headers, body))
    }

    /// Unwrap a success, mapping every other outcome to its error.
    ///
    /// `not_found` supplies the operation-specific 404 error.
    pub fn into_success(self, not_found: impl FnOnce() -> NestorError) -> Result<RawResponse> {
        match self {
            Self::Success(raw) => Ok(raw),
            Self::NotFound => Err(not_found()),
            Self::AuthRequired => Err(NestorError::authentication_required()),
            Self::AuthFailed => Err(NestorError::authentication_failed()),
            Self::ValidationFailed(message) => {
                Err(NestorError::new(ErrorCode::UnexpectedStatus, message).with_context("status", 405))
            }
            Self::ServerError(message) => Err(NestorError::new(ErrorCode::ServerError, message)),
            Self::Unexpected(status) => Err(unexpected_status(status)),
        }
    }
}

/// Error for a status the operation has no meaning for.
pub fn unexpected_status(status: StatusCode) -> NestorError {
    NestorError::new(
        ErrorCode::UnexpectedStatus,
        format!("unexpected status {}", status.as_u16()),
    )
    .with_context("status", status.as_u16())
}

/// Pull the message out of a Jenkins HTML error page.
///
/// Jenkins renders failures as `<h1>Error</h1><p>message</p>`; the heading
/// and paragraph tags are stripped. Returns `None` if the body has no such
/// block.
pub fn extract_html_error(body: &str) -> Option<String> {
    let found = HTML_ERROR.find(body)?;
    let without_heading = found.as_str().replacen("<h1>Error</h1>", "", 1);
    Some(PARAGRAPH_TAGS.replace_all(&without_heading, "").into_owned())
}
