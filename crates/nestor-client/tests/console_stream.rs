// SPDX-License-Identifier: MIT OR Apache-2.0
//! Progressive console streaming against a mock Jenkins server.

use std::time::Duration;

use nestor_client::JenkinsClient;
use nestor_config::ClientConfig;
use nestor_error::ErrorCode;
use tokio_stream::StreamExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOG_PATH: &str = "/job/job1/lastBuild/logText/progressiveText";
const FAST: Duration = Duration::from_millis(10);

fn client_for(server: &MockServer) -> JenkinsClient {
    JenkinsClient::new(ClientConfig::with_url(server.uri())).unwrap()
}

fn chunk(body: &str, size: u64, more: bool) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("x-text-size", size.to_string().as_str())
        .insert_header("x-more-data", if more { "true" } else { "false" })
        .set_body_string(body)
}

async fn mount_at(server: &MockServer, start: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(LOG_PATH))
        .and(query_param("start", start))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn single_chunk_then_done() {
    let server = MockServer::start().await;
    mount_at(&server, "0", chunk("Console output", 14, false)).await;

    let stream = client_for(&server).console_stream_every("job1", FAST);
    let (chunks, result) = stream.collect().await;
    result.unwrap();
    assert_eq!(chunks, vec!["Console output".to_string()]);
}

#[tokio::test]
async fn two_chunks_in_order_then_complete() {
    let server = MockServer::start().await;
    mount_at(&server, "0", chunk("Console output 1", 10, true)).await;
    mount_at(&server, "10", chunk("Console output 2", 20, false)).await;

    let stream = client_for(&server).console_stream_every("job1", FAST);
    let (chunks, result) = stream.collect().await;
    result.unwrap();
    assert_eq!(chunks, ["Console output 1", "Console output 2"]);
}

#[tokio::test]
async fn empty_final_body_emits_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LOG_PATH))
        .respond_with(ResponseTemplate::new(200).insert_header("x-more-data", "false"))
        .expect(1)
        .mount(&server)
        .await;

    let stream = client_for(&server).console_stream_every("job1", FAST);
    let (chunks, result) = stream.collect().await;
    result.unwrap();
    assert!(chunks.is_empty());
}

#[tokio::test]
async fn follows_offsets_until_no_more_data() {
    let server = MockServer::start().await;
    mount_at(&server, "0", chunk("Started\n", 8, true)).await;
    mount_at(&server, "8", chunk("Building\n", 17, true)).await;
    mount_at(&server, "17", chunk("Finished: SUCCESS\n", 35, false)).await;

    let stream = client_for(&server).console_stream_every("job1", FAST);
    let (chunks, result) = stream.collect().await;
    result.unwrap();
    assert_eq!(chunks, ["Started\n", "Building\n", "Finished: SUCCESS\n"]);
}

#[tokio::test]
async fn empty_polls_emit_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LOG_PATH))
        .and(query_param("start", "0"))
        .respond_with(chunk("", 0, true))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_at(&server, "0", chunk("late output", 11, false)).await;

    let stream = client_for(&server).console_stream_every("job1", FAST);
    let (chunks, result) = stream.collect().await;
    result.unwrap();
    assert_eq!(chunks, ["late output"]);
}

#[tokio::test]
async fn offset_never_moves_backwards() {
    let server = MockServer::start().await;
    mount_at(&server, "0", chunk("abc", 10, true)).await;
    // A smaller reported size must not rewind the next request.
    Mock::given(method("GET"))
        .and(path(LOG_PATH))
        .and(query_param("start", "10"))
        .respond_with(chunk("def", 4, true))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_at(&server, "10", chunk("ghi", 12, false)).await;

    let stream = client_for(&server).console_stream_every("job1", FAST);
    let (chunks, result) = stream.collect().await;
    result.unwrap();
    assert_eq!(chunks, ["abc", "def", "ghi"]);
}

#[tokio::test]
async fn missing_job_fails_once_without_chunks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LOG_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let stream = client_for(&server).console_stream_every("job1", FAST);
    let (chunks, result) = stream.collect().await;
    assert!(chunks.is_empty());
    let err = result.unwrap_err();
    assert_eq!(err.code, ErrorCode::JobNotFound);
    assert_eq!(err.message, "Job job1 does not exist");
}

#[tokio::test]
async fn error_after_output_keeps_earlier_chunks() {
    let server = MockServer::start().await;
    mount_at(&server, "0", chunk("partial", 7, true)).await;
    mount_at(&server, "7", ResponseTemplate::new(401)).await;

    let stream = client_for(&server).console_stream_every("job1", FAST);
    let (chunks, result) = stream.collect().await;
    assert_eq!(chunks, ["partial"]);
    assert_eq!(result.unwrap_err().code, ErrorCode::AuthenticationFailed);
}

#[tokio::test]
async fn cancel_stops_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LOG_PATH))
        .respond_with(chunk("tick", 4, true))
        .mount(&server)
        .await;

    let mut stream = client_for(&server).console_stream_every("job1", FAST);
    let first = stream.chunks.next().await;
    assert_eq!(first.as_deref(), Some("tick"));

    stream.cancel();
    let (_, result) = tokio::time::timeout(Duration::from_secs(5), stream.collect())
        .await
        .expect("stream should end after cancel");
    result.unwrap();
}

#[tokio::test]
async fn cancel_token_is_shared() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LOG_PATH))
        .respond_with(chunk("tick", 4, true))
        .mount(&server)
        .await;

    let stream = client_for(&server).console_stream_every("job1", Duration::from_secs(60));
    let token = stream.cancel_token();
    token.cancel();
    let (_, result) = tokio::time::timeout(Duration::from_secs(5), stream.collect())
        .await
        .expect("stream should end after cancel");
    result.unwrap();
}

#[tokio::test]
async fn cancel_ends_an_undrained_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LOG_PATH))
        .respond_with(chunk("tick", 4, true))
        .mount(&server)
        .await;

    let stream = client_for(&server).console_stream_every("job1", Duration::from_millis(1));
    // Nobody reads `chunks`, so the pump ends up parked on a full channel.
    tokio::time::sleep(Duration::from_secs(2)).await;
    stream.cancel();

    let result = tokio::time::timeout(Duration::from_secs(3), stream.completion)
        .await
        .expect("pump should stop after cancel even when the consumer is idle")
        .unwrap();
    result.unwrap();
}

#[tokio::test]
async fn single_poll_reports_headers() {
    let server = MockServer::start().await;
    mount_at(&server, "5", chunk("world", 10, true)).await;

    let poll = client_for(&server)
        .progressive_text("job1", 5)
        .await
        .unwrap();
    assert_eq!(poll.text, "world");
    assert_eq!(poll.next_offset, Some(10));
    assert!(poll.has_more);
}
