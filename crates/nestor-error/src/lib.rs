// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error taxonomy with stable error codes for the nestor Jenkins client.
//!
//! Every nestor error carries an [`ErrorCode`] (a machine-readable, stable
//! string tag), the human-readable message that is shown to users, an
//! optional cause, and arbitrary key-value context. The constructors at the
//! bottom of this file produce the fixed messages Jenkins users expect
//! (`Job foo does not exist`, ...).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Network, DNS or TLS failures reported by the HTTP transport.
    Transport,
    /// Jenkins rejected or demanded credentials.
    Auth,
    /// A job, view or build does not exist.
    NotFound,
    /// The request was refused as invalid (e.g. missing build parameters).
    Validation,
    /// Jenkins answered with something the client could not use.
    Protocol,
    /// UDP server discovery failed.
    Discovery,
    /// Client configuration errors.
    Config,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transport => "transport",
            Self::Auth => "auth",
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Protocol => "protocol",
            Self::Discovery => "discovery",
            Self::Config => "config",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Transport --
    /// The HTTP transport failed before a response arrived.
    Transport,

    // -- Auth --
    /// HTTP 401: the credentials embedded in the URL were rejected.
    AuthenticationFailed,
    /// HTTP 403: Jenkins wants credentials that were not supplied.
    AuthenticationRequired,

    // -- NotFound --
    /// The named job does not exist.
    JobNotFound,
    /// The named view does not exist.
    ViewNotFound,
    /// The job has no last build.
    BuildNotFound,

    // -- Validation --
    /// HTTP 405 on a build trigger: the job is parameterised.
    BuildParametersRequired,

    // -- Protocol --
    /// Jenkins returned its HTML error page.
    ServerError,
    /// Jenkins returned a status code no operation expects.
    UnexpectedStatus,
    /// The response body could not be decoded.
    InvalidResponse,
    /// The server did not identify itself as Jenkins.
    NotJenkins,

    // -- Discovery --
    /// No Jenkins instance replied to the UDP probe in time.
    DiscoveryTimeout,
    /// The UDP socket failed or the reply could not be parsed.
    DiscoveryFailed,

    // -- Config --
    /// A monitor schedule is not a valid cron expression.
    InvalidSchedule,
    /// Client configuration is invalid.
    ConfigInvalid,

    // -- Internal --
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport => ErrorCategory::Transport,

            Self::AuthenticationFailed | Self::AuthenticationRequired => ErrorCategory::Auth,

            Self::JobNotFound | Self::ViewNotFound | Self::BuildNotFound => {
                ErrorCategory::NotFound
            }

            Self::BuildParametersRequired => ErrorCategory::Validation,

            Self::ServerError | Self::UnexpectedStatus | Self::InvalidResponse | Self::NotJenkins => {
                ErrorCategory::Protocol
            }

            Self::DiscoveryTimeout | Self::DiscoveryFailed => ErrorCategory::Discovery,

            Self::InvalidSchedule | Self::ConfigInvalid => ErrorCategory::Config,

            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation of the code (e.g.
    /// `"JOB_NOT_FOUND"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "TRANSPORT",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            Self::JobNotFound => "JOB_NOT_FOUND",
            Self::ViewNotFound => "VIEW_NOT_FOUND",
            Self::BuildNotFound => "BUILD_NOT_FOUND",
            Self::BuildParametersRequired => "BUILD_PARAMETERS_REQUIRED",
            Self::ServerError => "SERVER_ERROR",
            Self::UnexpectedStatus => "UNEXPECTED_STATUS",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::NotJenkins => "NOT_JENKINS",
            Self::DiscoveryTimeout => "DISCOVERY_TIMEOUT",
            Self::DiscoveryFailed => "DISCOVERY_FAILED",
            Self::InvalidSchedule => "INVALID_SCHEDULE",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// NestorError
// ---------------------------------------------------------------------------

/// Unified nestor error.
///
/// Carries a stable [`ErrorCode`], the user-facing message, an optional
/// source error for cause-chaining, and arbitrary structured context.
///
/// # Builder usage
///
/// ```
/// use nestor_error::{ErrorCode, NestorError};
///
/// let err = NestorError::new(ErrorCode::UnexpectedStatus, "unexpected status 502")
///     .with_context("url", "http://localhost:8080/api/json")
///     .with_context("status", 502);
/// assert_eq!(err.message, "unexpected status 502");
/// ```
pub struct NestorError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

/// Convenience alias used throughout the nestor crates.
pub type Result<T, E = NestorError> = std::result::Result<T, E>;

impl NestorError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Wrap a transport failure, keeping its message unchanged.
    pub fn transport(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new(ErrorCode::Transport, source.to_string()).with_source(source)
    }

    /// `401`: credentials embedded in the URL were rejected.
    pub fn authentication_failed() -> Self {
        Self::new(
            ErrorCode::AuthenticationFailed,
            "Authentication failed - incorrect username and/or password in Jenkins URL",
        )
    }

    /// `403`: Jenkins requires credentials.
    pub fn authentication_required() -> Self {
        Self::new(
            ErrorCode::AuthenticationRequired,
            "Jenkins requires authentication - set username and password in Jenkins URL",
        )
    }

    /// The named job does not exist.
    pub fn job_not_found(job: &str) -> Self {
        Self::new(ErrorCode::JobNotFound, format!("Job {job} does not exist"))
            .with_context("job", job)
    }

    /// The named view does not exist.
    pub fn view_not_found(view: &str) -> Self {
        Self::new(ErrorCode::ViewNotFound, format!("View {view} does not exist"))
            .with_context("view", view)
    }

    /// The job has never been built.
    pub fn build_not_found(job: &str) -> Self {
        Self::new(
            ErrorCode::BuildNotFound,
            format!("No build could be found for job {job}"),
        )
        .with_context("job", job)
    }

    /// `405` on a build trigger.
    pub fn build_parameters_required(job: &str) -> Self {
        Self::new(
            ErrorCode::BuildParametersRequired,
            format!("Job {job} requires build parameters"),
        )
        .with_context("job", job)
    }

    /// No UDP reply arrived before the discovery window closed.
    pub fn discovery_timeout(host: &str) -> Self {
        Self::new(
            ErrorCode::DiscoveryTimeout,
            format!("Unable to find any Jenkins instance on {host}"),
        )
        .with_context("host", host)
    }
}

impl fmt::Debug for NestorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("NestorError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for NestorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            // Deterministic output thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for NestorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
