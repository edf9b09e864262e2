// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed results of Jenkins queries, and the raw JSON shapes they are
//! decoded from.

use crate::time::{describe_distance, iso_millis};
use chrono::{DateTime, Utc};
use nestor_error::{ErrorCode, NestorError, Result};
use nestor_status::{BuildStatus, JobSummary, status_for_color, status_for_result};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

// ---------------------------------------------------------------------------
// Build parameters
// ---------------------------------------------------------------------------

/// Ordered name/value parameters for a build trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildParams(Vec<(String, String)>);

#[derive(Serialize)]
struct ParameterPayload<'a> {
    parameter: Vec<Parameter<'a>>,
}

#[derive(Serialize)]
struct Parameter<'a> {
    name: &'a str,
    value: &'a str,
}

impl BuildParams {
    /// No parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string such as `name1=value1&name2=value2`.
    ///
    /// Percent escapes and `+` are decoded. Empty pieces are skipped and a
    /// piece without `=` gets an empty value.
    pub fn parse(input: &str) -> Self {
        form_urlencoded::parse(input.as_bytes())
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect()
    }

    /// Append a parameter, keeping insertion order.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((name.into(), value.into()));
        self
    }

    /// Whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The parameters in order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    /// The `json` form field Jenkins expects on `/build`:
    /// `{"parameter":[{"name":..,"value":..},..]}`.
    pub fn to_json(&self) -> String {
        let payload = ParameterPayload {
            parameter: self
                .0
                .iter()
                .map(|(name, value)| Parameter { name, value })
                .collect(),
        };
        // Plain string fields; serialisation cannot fail.
        serde_json::to_string(&payload).unwrap_or_else(|_| r#"{"parameter":[]}"#.to_string())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BuildParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ---------------------------------------------------------------------------
// Public results
// ---------------------------------------------------------------------------

/// Status and health reports of a single job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDetail {
    /// Job name, as requested.
    pub name: String,
    /// Status derived from the job's colour.
    pub status: BuildStatus,
    /// Whether a build is currently running (animated colour).
    pub building: bool,
    /// Health report descriptions, e.g. `"Coverage is 100%"`.
    pub reports: Vec<String>,
}

/// The most recent build of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastBuild {
    /// Build number, when reported.
    pub number: Option<u64>,
    /// Normalised result; `None` while the build is still running.
    pub status: Option<BuildStatus>,
    /// Whether the build is still running.
    pub building: bool,
    /// Start time, epoch milliseconds.
    pub timestamp: i64,
    /// Duration in milliseconds (0 while running).
    pub duration: i64,
    /// Start time while building, end time once finished, as ISO-8601 UTC
    /// with milliseconds.
    pub build_date: String,
    /// `"Started <distance>"` while building, `"Ended <distance>"` after.
    pub build_date_distance: String,
}

impl LastBuild {
    pub(crate) fn from_raw(raw: RawBuild, now: DateTime<Utc>) -> Result<Self> {
        let millis = if raw.building {
            raw.timestamp
        } else {
            raw.timestamp.saturating_add(raw.duration)
        };
        let at = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
            NestorError::new(
                ErrorCode::InvalidResponse,
                format!("build timestamp {millis} is out of range"),
            )
        })?;
        let verb = if raw.building { "Started" } else { "Ended" };
        Ok(Self {
            number: raw.number,
            status: raw.result.as_deref().map(status_for_result),
            building: raw.building,
            timestamp: raw.timestamp,
            duration: raw.duration,
            build_date: iso_millis(at),
            build_date_distance: format!("{verb} {}", describe_distance(at, now)),
        })
    }
}

/// One executor slot on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorInfo {
    /// Whether the slot is free.
    pub idle: bool,
    /// Jenkins flags the running build as probably stuck.
    pub stuck: bool,
    /// Progress of the running build, 0 to 100.
    pub progress: u8,
    /// Job running on this slot, parsed from the executable's URL.
    pub name: Option<String>,
}

/// Executors of one node, with a one-line summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeExecutors {
    /// Node display name.
    pub node: String,
    /// Slots in server order.
    pub executors: Vec<ExecutorInfo>,
    /// `"N active, M idle"`, omitting zero counts.
    pub summary: String,
}

impl NodeExecutors {
    fn from_raw(raw: RawComputer) -> Self {
        let executors: Vec<ExecutorInfo> = raw
            .executors
            .into_iter()
            .map(|e| ExecutorInfo {
                idle: e.idle,
                stuck: e.likely_stuck,
                progress: e.progress.clamp(0, 100) as u8,
                name: e
                    .current_executable
                    .and_then(|exe| exe.url)
                    .and_then(|url| job_name_from_url(&url)),
            })
            .collect();
        let summary = executor_summary(&executors);
        Self {
            node: raw.display_name,
            executors,
            summary,
        }
    }
}

/// `"1 active, 2 idle"`; zero counts are left out.
pub fn executor_summary(executors: &[ExecutorInfo]) -> String {
    let idle = executors.iter().filter(|e| e.idle).count();
    let active = executors.len() - idle;
    let mut parts = Vec::with_capacity(2);
    if active > 0 {
        parts.push(format!("{active} active"));
    }
    if idle > 0 {
        parts.push(format!("{idle} idle"));
    }
    parts.join(", ")
}

/// Job name from a build URL: the segment after the last `/job/`.
///
/// `http://host/job/folder/job/app/12/` gives `app`.
pub fn job_name_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.rsplit_once("/job/")?;
    let name = rest.split('/').next().unwrap_or_default();
    (!name.is_empty()).then(|| name.to_string())
}

// ---------------------------------------------------------------------------
// Raw wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RawDashboard {
    #[serde(default)]
    pub jobs: Vec<RawJob>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawJob {
    pub name: String,
    // Folders and other non-buildable items carry no colour.
    pub color: Option<String>,
}

impl RawDashboard {
    pub(crate) fn into_summaries(self) -> Vec<JobSummary> {
        self.jobs
            .into_iter()
            .map(|job| {
                let color = job.color.as_deref().unwrap_or("unknown");
                JobSummary::from_color(job.name, color)
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawJobDetail {
    pub color: Option<String>,
    #[serde(default)]
    pub health_report: Vec<RawHealthReport>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawHealthReport {
    #[serde(default)]
    pub description: String,
}

impl RawJobDetail {
    pub(crate) fn into_detail(self, name: &str) -> JobDetail {
        let color = self.color.as_deref().unwrap_or("unknown");
        JobDetail {
            name: name.to_string(),
            status: status_for_color(color),
            building: nestor_status::is_animated(color),
            reports: self
                .health_report
                .into_iter()
                .map(|r| r.description)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBuild {
    pub number: Option<u64>,
    pub result: Option<String>,
    #[serde(default)]
    pub building: bool,
    pub timestamp: i64,
    #[serde(default)]
    pub duration: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawQueue {
    #[serde(default)]
    pub items: Vec<RawQueueItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawQueueItem {
    pub task: RawTask,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTask {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawComputers {
    #[serde(default)]
    pub computer: Vec<RawComputer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawComputer {
    pub display_name: String,
    #[serde(default)]
    pub executors: Vec<RawExecutor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawExecutor {
    #[serde(default)]
    pub idle: bool,
    #[serde(default)]
    pub likely_stuck: bool,
    #[serde(default)]
    pub progress: i64,
    pub current_executable: Option<RawExecutable>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawExecutable {
    pub url: Option<String>,
}

impl RawComputers {
    pub(crate) fn into_nodes(self) -> Vec<NodeExecutors> {
        self.computer
            .into_iter()
            .map(NodeExecutors::from_raw)
            .collect()
    }
}
