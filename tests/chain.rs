//! End-to-end behaviour of built chains against a mock transport.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use http_pipeline::http::{Body, EncodingError, StatusCode};
use http_pipeline::transport::TransportError;
use http_pipeline::{
    Environment, ErrorCode, HttpResultExt, Logging, Operator, OperatorBuilder, Request, Stage,
};

mod common;
use common::{forward_to, MockTransport, WAIT};

#[derive(Debug)]
struct BrokenBody;

impl Body for BrokenBody {
    fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        Err(EncodingError::Other("cannot encode".into()))
    }
}

#[test]
fn chain_without_terminal_stage_cannot_connect() {
    let chain = OperatorBuilder::new()
        .append(Stage::Logging)
        .append(Stage::Autocancel)
        .build()
        .unwrap();

    let (tx, rx) = mpsc::channel();
    chain.send(Request::get("/items"), forward_to(&tx));

    let result = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(result.error_code(), Some(ErrorCode::CannotConnect));
    assert_eq!(result.request().path(), "/items");
}

#[test]
fn environment_fills_host_and_prefix() {
    let mock = MockTransport::responding(200, "ok");
    let chain = OperatorBuilder::new()
        .append(Stage::Transport(mock.clone()))
        .append(Stage::Environment(
            Environment::new("api.example.com").with_path_prefix("/v1"),
        ))
        .build()
        .unwrap();

    let (tx, rx) = mpsc::channel();
    chain.send(Request::get("/items"), forward_to(&tx));

    let response = rx.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text(), "ok");
    assert_eq!(response.request().path(), "/v1/items");
    assert_eq!(response.request().host(), Some("api.example.com"));

    let wire = mock.last_request().unwrap();
    assert_eq!(wire.url.as_str(), "https://api.example.com/v1/items");
}

#[test]
fn modify_request_runs_before_transport() {
    let mock = MockTransport::responding(204, "");
    let chain = OperatorBuilder::new()
        .append(Stage::Transport(mock.clone()))
        .modify_request(|request| request.with_header("Authorization", "Bearer token"))
        .build()
        .unwrap();

    let (tx, rx) = mpsc::channel();
    chain.send(
        Request::get("/me").with_host("api.example.com"),
        forward_to(&tx),
    );

    let response = rx.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        mock.last_request().unwrap().headers.get("authorization").unwrap(),
        "Bearer token"
    );
}

#[test]
fn unbuildable_request_never_reaches_transport() {
    let mock = MockTransport::responding(200, "ok");
    let chain = OperatorBuilder::new()
        .append(Stage::Transport(mock.clone()))
        .build()
        .unwrap();

    // No host anywhere in the chain.
    let (tx, rx) = mpsc::channel();
    chain.send(Request::get("/items"), forward_to(&tx));
    assert_eq!(
        rx.recv_timeout(WAIT).unwrap().error_code(),
        Some(ErrorCode::InvalidRequest)
    );

    // Body that fails to encode.
    chain.send(
        Request::post("/items")
            .with_host("api.example.com")
            .with_body(BrokenBody),
        forward_to(&tx),
    );
    let result = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(result.error_code(), Some(ErrorCode::InvalidRequest));
    assert!(result.unwrap_err().underlying.is_some());

    assert_eq!(mock.sent_count(), 0);
}

#[test]
fn transport_errors_are_translated() {
    let mock = MockTransport::failing(TransportError::NotConnected("offline".into()));
    let chain = OperatorBuilder::new()
        .append(Stage::Transport(mock))
        .append(Stage::Logging)
        .build()
        .unwrap();

    let (tx, rx) = mpsc::channel();
    chain.send(
        Request::get("/").with_host("api.example.com"),
        forward_to(&tx),
    );

    let error = rx.recv_timeout(WAIT).unwrap().unwrap_err();
    assert_eq!(error.code, ErrorCode::NoConnection);
    assert!(error.response.is_none());
    assert!(error.underlying.is_some());
}

#[test]
fn cancelling_running_task_cancels_transport() {
    let mock = MockTransport::responding(200, "late");
    mock.set_delay(Duration::from_secs(30));
    let chain = OperatorBuilder::new()
        .append(Stage::Transport(mock.clone()))
        .build()
        .unwrap();

    let (tx, rx) = mpsc::channel();
    let task = chain.send(
        Request::get("/slow").with_host("api.example.com"),
        forward_to(&tx),
    );
    task.cancel();

    let result = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(result.error_code(), Some(ErrorCode::Cancelled));
    assert_eq!(mock.cancelled_count(), 1);
    assert!(task.is_cancelled());
    assert!(task.is_completed());
}

#[test]
fn completion_hooks_added_by_caller_see_result() {
    let mock = MockTransport::responding(200, "ok");
    let chain = OperatorBuilder::new()
        .append(Stage::Transport(mock))
        .build()
        .unwrap();

    let (tx, rx) = mpsc::channel();
    let task = chain.send(Request::get("/").with_host("h.example.com"), |_| {});
    task.add_completion(forward_to(&tx));

    assert!(rx.recv_timeout(WAIT).unwrap().is_ok());
}

#[test]
#[should_panic(expected = "already linked")]
fn operators_cannot_be_linked_twice() {
    let mock = MockTransport::responding(200, "ok");
    let shared = Arc::new(Logging::new());

    let _first = OperatorBuilder::new()
        .append(Stage::Transport(mock.clone()))
        .append_operator(shared.clone())
        .build()
        .unwrap();
    let _second = OperatorBuilder::new()
        .append(Stage::Transport(mock))
        .append_operator(shared)
        .build();
}

#[test]
fn stage_order_follows_appends() {
    let mock = MockTransport::responding(200, "ok");
    let chain = OperatorBuilder::new()
        .append(Stage::Transport(mock))
        .append(Stage::Throttle(2))
        .append(Stage::ResetGuard)
        .build()
        .unwrap();

    assert_eq!(chain.stage_names(), vec!["reset_guard", "throttle", "transport"]);
    assert_eq!(chain.head().name(), "reset_guard");
}

#[tokio::test]
async fn send_async_resolves() {
    let mock = MockTransport::responding(201, "created");
    mock.set_delay(Duration::from_millis(20));
    let chain = OperatorBuilder::new()
        .append(Stage::Transport(mock))
        .append(Stage::Environment(Environment::new("api.example.com")))
        .build()
        .unwrap();

    let response = tokio::time::timeout(WAIT, chain.send_async(Request::post("/items")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.text(), "created");
}
