// SPDX-License-Identifier: MIT OR Apache-2.0
//! Jenkins status normalisation.
//!
//! Jenkins reports job health as a "ball colour" (`blue`, `red_anime`, ...)
//! and finished builds as a result string (`SUCCESS`, `FAILURE`, ...). This
//! crate maps both onto a small set of [`BuildStatus`] labels and folds a
//! dashboard of jobs into a single worst-case status.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Suffix Jenkins appends to a colour while a build is running.
pub const ANIMATED_SUFFIX: &str = "_anime";

// ---------------------------------------------------------------------------
// BuildStatus
// ---------------------------------------------------------------------------

/// Normalised status label.
///
/// Serialises as its label (`"OK"`, `"FAIL"`, ...). Colours and results that
/// have no dedicated variant are kept verbatim, uppercased, in
/// [`BuildStatus::Other`].
///
/// Equality, hashing and aggregation go through the label, so
/// `Other("FAIL")` behaves exactly like [`BuildStatus::Fail`]. Prefer
/// [`BuildStatus::from_label`] when building one from text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum BuildStatus {
    /// Last build succeeded.
    Ok,
    /// Last build is unstable.
    Warn,
    /// Last build failed.
    Fail,
    /// Last build was aborted.
    Aborted,
    /// The job is disabled.
    Disabled,
    /// Any other label, already uppercased.
    Other(String),
}

impl BuildStatus {
    /// The label shown to users.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
            Self::Aborted => "ABORTED",
            Self::Disabled => "DISABLED",
            Self::Other(label) => label,
        }
    }

    /// Parse a label back into a status. Unknown labels are kept as-is.
    pub fn from_label(label: &str) -> Self {
        match label {
            "OK" => Self::Ok,
            "WARN" => Self::Warn,
            "FAIL" => Self::Fail,
            "ABORTED" => Self::Aborted,
            "DISABLED" => Self::Disabled,
            other => Self::Other(other.to_string()),
        }
    }

    // Higher wins when aggregating; labels outside the four ranked ones
    // carry no signal.
    fn precedence(&self) -> Option<u8> {
        match self.as_str() {
            "FAIL" => Some(3),
            "WARN" => Some(2),
            "ABORTED" => Some(1),
            "OK" => Some(0),
            _ => None,
        }
    }
}

impl PartialEq for BuildStatus {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for BuildStatus {}

impl Hash for BuildStatus {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for BuildStatus {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<BuildStatus> for String {
    fn from(status: BuildStatus) -> Self {
        status.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// JobSummary
// ---------------------------------------------------------------------------

/// One dashboard entry: a job name and its normalised status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Job name as Jenkins reports it.
    pub name: String,
    /// Status derived from the job's colour.
    pub status: BuildStatus,
}

impl JobSummary {
    /// Build a summary from a raw Jenkins colour.
    pub fn from_color(name: impl Into<String>, color: &str) -> Self {
        Self {
            name: name.into(),
            status: status_for_color(color),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalisation
// ---------------------------------------------------------------------------

/// Map a Jenkins ball colour to a [`BuildStatus`].
///
/// The animated suffix only says a build is running and is ignored.
/// Unrecognised colours map to themselves, uppercased.
pub fn status_for_color(color: &str) -> BuildStatus {
    let base = color.strip_suffix(ANIMATED_SUFFIX).unwrap_or(color);
    match base {
        "blue" | "green" => BuildStatus::Ok,
        "grey" => BuildStatus::Aborted,
        "red" => BuildStatus::Fail,
        "yellow" => BuildStatus::Warn,
        other => BuildStatus::from_label(&other.to_uppercase()),
    }
}

/// Whether a colour carries the "build in progress" suffix.
pub fn is_animated(color: &str) -> bool {
    color.ends_with(ANIMATED_SUFFIX)
}

/// Map a finished build's result string (`SUCCESS`, `FAILURE`, ...) to a
/// [`BuildStatus`].
pub fn status_for_result(result: &str) -> BuildStatus {
    match result.to_uppercase().as_str() {
        "SUCCESS" => BuildStatus::Ok,
        "UNSTABLE" => BuildStatus::Warn,
        "FAILURE" => BuildStatus::Fail,
        "ABORTED" => BuildStatus::Aborted,
        other => BuildStatus::from_label(other),
    }
}

/// Fold job statuses into the worst one: FAIL > WARN > ABORTED > OK.
///
/// Returns `None` when no job has one of those four statuses, which is a
/// different answer from "everything is OK".
pub fn aggregate_status(jobs: &[JobSummary]) -> Option<BuildStatus> {
    jobs.iter()
        .filter_map(|job| job.status.precedence().map(|rank| (rank, &job.status)))
        .max_by_key(|(rank, _)| *rank)
        .map(|(_, status)| status.clone())
}

/// Status a monitor reports for a dashboard.
///
/// With a job name, that job's own status (or `None` when it is not on the
/// dashboard); without one, the [`aggregate_status`] of every job.
pub fn monitor_status(jobs: &[JobSummary], job_name: Option<&str>) -> Option<BuildStatus> {
    match job_name {
        Some(name) => jobs
            .iter()
            .find(|job| job.name == name)
            .map(|job| job.status.clone()),
        None => aggregate_status(jobs),
    }
}
