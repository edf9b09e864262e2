// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scheduled status monitoring.
//!
//! A monitor reads the dashboard on a cron schedule and reports either one
//! job's status or the aggregate status of every job.

use crate::cancel::CancellationToken;
use crate::client::JenkinsClient;
use chrono::Utc;
use cron::Schedule;
use nestor_error::{ErrorCode, NestorError, Result};
use nestor_status::{BuildStatus, monitor_status};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

const UPDATE_BUFFER: usize = 16;

/// One monitor tick: the status (or `None` when the job is not on the
/// dashboard, or no job has a ranked status), or the dashboard error.
pub type MonitorUpdate = Result<Option<BuildStatus>>;

/// What to monitor and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Six-field cron expression with seconds, e.g. `*/30 * * * * *`.
    pub schedule: String,
    /// Report this job only; aggregate every job when `None`.
    pub job: Option<String>,
    /// Read this view's dashboard instead of the server's.
    pub view: Option<String>,
}

impl MonitorOptions {
    /// Aggregate the whole dashboard on `schedule`.
    pub fn new(schedule: impl Into<String>) -> Self {
        Self {
            schedule: schedule.into(),
            job: None,
            view: None,
        }
    }

    /// Report a single job.
    #[must_use]
    pub fn job(mut self, job: impl Into<String>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Read a view's dashboard.
    #[must_use]
    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }
}

/// Parse a cron expression.
///
/// # Errors
///
/// `InvalidSchedule` when the expression does not parse.
pub fn parse_schedule(expr: &str) -> Result<Schedule> {
    Schedule::from_str(expr).map_err(|e| {
        NestorError::new(
            ErrorCode::InvalidSchedule,
            format!("invalid monitor schedule '{expr}': {e}"),
        )
        .with_context("schedule", expr)
    })
}

/// A running monitor.
pub struct MonitorHandle {
    /// One update per schedule tick.
    pub updates: ReceiverStream<MonitorUpdate>,
    /// The scheduling task; finishes after cancellation.
    pub task: JoinHandle<()>,
    cancel: CancellationToken,
}

impl MonitorHandle {
    /// Stop the monitor; no further ticks run.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that stops this monitor when triggered.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl JenkinsClient {
    /// Run one monitor tick now.
    pub async fn monitor_once(&self, options: &MonitorOptions) -> MonitorUpdate {
        let jobs = match options.view.as_deref() {
            Some(view) => self.view_dashboard(view).await?,
            None => self.dashboard().await?,
        };
        Ok(monitor_status(&jobs, options.job.as_deref()))
    }

    /// Start monitoring on the configured schedule, aggregating every job.
    pub fn monitor_dashboard(&self) -> Result<MonitorHandle> {
        self.monitor(MonitorOptions::new(self.config().monitor_schedule()))
    }

    /// Start monitoring.
    ///
    /// # Errors
    ///
    /// `InvalidSchedule` when the cron expression does not parse; nothing is
    /// spawned in that case.
    pub fn monitor(&self, options: MonitorOptions) -> Result<MonitorHandle> {
        let schedule = parse_schedule(&options.schedule)?;
        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_monitor(
            self.clone(),
            schedule,
            options,
            tx,
            cancel.clone(),
        ));
        Ok(MonitorHandle {
            updates: ReceiverStream::new(rx),
            task,
            cancel,
        })
    }
}

async fn run_monitor(
    client: JenkinsClient,
    schedule: Schedule,
    options: MonitorOptions,
    tx: mpsc::Sender<MonitorUpdate>,
    cancel: CancellationToken,
) {
    let mut last = Utc::now();
    loop {
        let from = last.max(Utc::now());
        let Some(next) = schedule.after(&from).next() else {
            debug!(target: "nestor.monitor", "schedule has no further ticks");
            return;
        };
        last = next;
        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(target: "nestor.monitor", "monitor cancelled");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        let update = client.monitor_once(&options).await;
        match &update {
            Ok(status) => debug!(
                target: "nestor.monitor",
                status = status.as_ref().map_or("none", BuildStatus::as_str),
                "monitor tick"
            ),
            Err(e) => warn!(target: "nestor.monitor", error = %e, "monitor tick failed"),
        }
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(target: "nestor.monitor", "monitor cancelled");
                return;
            }
            sent = tx.send(update) => if sent.is_err() {
                debug!(target: "nestor.monitor", "monitor consumer dropped");
                return;
            }
        }
    }
}
