// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests verifying the tracing output of the client: targets,
//! started-build messages, credential redaction and monitor warnings.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use nestor::{BuildStatus, ClientConfig, JenkinsClient, MonitorOptions};
use serde_json::json;
use tokio_stream::StreamExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Shared log-capture infrastructure
// ---------------------------------------------------------------------------

/// Thread-safe buffer that captures tracing output.
#[derive(Clone, Default)]
struct LogBuf(Arc<Mutex<Vec<u8>>>);

impl LogBuf {
    fn contents(&self) -> String {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }
}

impl std::io::Write for LogBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuf {
    type Writer = LogBuf;
    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install a tracing subscriber that captures all output into a [`LogBuf`].
/// Returns the buffer and a guard that must be held for the test duration.
fn setup_tracing() -> (LogBuf, tracing::subscriber::DefaultGuard) {
    let buf = LogBuf::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buf.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_target(true)
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buf, guard)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn dashboard_server(jobs: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobs": jobs })))
        .mount(&server)
        .await;
    server
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn started_builds_are_logged_at_info() {
    let (logs, _guard) = setup_tracing();
    let server = dashboard_server(json!([{ "name": "foo", "color": "red" }])).await;
    Mock::given(method("POST"))
        .and(path("/job/foo/build"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let client = JenkinsClient::new(ClientConfig::with_url(server.uri())).unwrap();
    client
        .filtered_build(Some(&BuildStatus::Fail))
        .await
        .unwrap();

    assert!(logs.contains("Job foo was started successfully"), "{}", logs.contents());
    assert!(logs.contains("INFO"));
    assert!(logs.contains("nestor.client"));
}

#[tokio::test]
async fn request_logs_mask_passwords() {
    let (logs, _guard) = setup_tracing();
    let server = dashboard_server(json!([])).await;
    let url = server.uri().replacen("http://", "http://admin:hunter2@", 1);

    let client = JenkinsClient::new(ClientConfig::with_url(url)).unwrap();
    client.dashboard().await.unwrap();

    let out = logs.contents();
    assert!(out.contains("admin:***@"), "{out}");
    assert!(!out.contains("hunter2"), "{out}");
}

#[tokio::test]
async fn console_polls_are_logged_with_offsets() {
    let (logs, _guard) = setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job/job1/lastBuild/logText/progressiveText"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-text-size", "5")
                .insert_header("x-more-data", "false")
                .set_body_string("done\n"),
        )
        .mount(&server)
        .await;

    let client = JenkinsClient::new(ClientConfig::with_url(server.uri())).unwrap();
    let (_, result) = client
        .console_stream_every("job1", Duration::from_millis(10))
        .collect()
        .await;
    result.unwrap();

    let out = logs.contents();
    assert!(out.contains("nestor.stream"), "{out}");
    assert!(out.contains("console poll"));
    assert!(out.contains("offset=5"));
}

#[tokio::test]
async fn failed_monitor_ticks_warn() {
    let (logs, _guard) = setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = JenkinsClient::new(ClientConfig::with_url(server.uri())).unwrap();
    let mut handle = client
        .monitor(MonitorOptions::new("* * * * * *"))
        .unwrap();
    let update = tokio::time::timeout(Duration::from_secs(5), handle.updates.next())
        .await
        .unwrap()
        .unwrap();
    assert!(update.is_err());
    handle.cancel();

    let out = logs.contents();
    assert!(out.contains("WARN"), "{out}");
    assert!(out.contains("nestor.monitor"));
    assert!(out.contains("monitor tick failed"));
}
