//! reqwest-backed transport against a local mock backend.

use std::sync::Arc;
use std::time::Duration;

use http_pipeline::config::TransportConfig;
use http_pipeline::http::StatusCode;
use http_pipeline::{
    Chain, ErrorCode, HttpClientTransport, HttpResultExt, Method, OperatorBuilder, Request, Stage,
};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use url::Url;

mod common;
use common::{closed_port, start_backend, WAIT};

fn chain_with(transport: HttpClientTransport) -> Chain {
    OperatorBuilder::new()
        .append(Stage::Transport(Arc::new(transport)))
        .append(Stage::Logging)
        .build()
        .unwrap()
}

fn default_transport() -> HttpClientTransport {
    HttpClientTransport::from_config(&TransportConfig::default(), Handle::current()).unwrap()
}

fn request_to(addr: std::net::SocketAddr, path: &str) -> Request {
    let url = Url::parse(&format!("http://{addr}{path}")).unwrap();
    Request::from_url(Method::GET, &url)
}

#[tokio::test]
async fn successful_exchange() {
    let addr = start_backend(200, "hello", Duration::ZERO).await;
    let chain = chain_with(default_transport());

    let response = tokio::time::timeout(WAIT, chain.send_async(request_to(addr, "/greeting")))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text(), "hello");
    assert_eq!(response.header("content-length"), Some("5"));
    assert_eq!(response.request().path(), "/greeting");
}

#[tokio::test]
async fn error_status_is_still_a_response() {
    let addr = start_backend(404, "missing", Duration::ZERO).await;
    let chain = chain_with(default_transport());

    let response = tokio::time::timeout(WAIT, chain.send_async(request_to(addr, "/nope")))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!response.is_success());
}

#[tokio::test]
async fn oversized_body_is_rejected_with_response() {
    let addr = start_backend(200, "far too long for the limit", Duration::ZERO).await;
    let chain = chain_with(default_transport().with_max_body_bytes(4));

    let result = tokio::time::timeout(WAIT, chain.send_async(request_to(addr, "/big")))
        .await
        .unwrap();

    assert_eq!(result.error_code(), Some(ErrorCode::BodyExceedsMaximum));
    assert_eq!(result.response().unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn refused_connection_is_no_connection() {
    let addr = closed_port().await;
    let chain = chain_with(default_transport());

    let result = tokio::time::timeout(WAIT, chain.send_async(request_to(addr, "/")))
        .await
        .unwrap();

    assert_eq!(result.error_code(), Some(ErrorCode::NoConnection));
}

#[tokio::test]
async fn unknown_host_is_invalid_request() {
    let chain = chain_with(default_transport());
    let url = Url::parse("http://no-such-host.invalid/").unwrap();

    let error = tokio::time::timeout(WAIT, chain.send_async(Request::from_url(Method::GET, &url)))
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::InvalidRequest);
    assert!(error.response.is_none());
    let cause = error.underlying.as_ref().unwrap().to_string();
    assert!(cause.starts_with("cannot find host"), "unexpected cause: {cause}");
}

#[tokio::test]
async fn cancel_aborts_exchange() {
    let addr = start_backend(200, "slow", Duration::from_secs(30)).await;
    let chain = chain_with(default_transport());

    let (tx, rx) = oneshot::channel();
    let task = chain.send(request_to(addr, "/slow"), move |result| {
        let _ = tx.send(result.error_code());
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    task.cancel();

    let code = tokio::time::timeout(WAIT, rx).await.unwrap().unwrap();
    assert_eq!(code, Some(ErrorCode::Cancelled));
}
