//! reqwest-backed transport.
//!
//! # Responsibilities
//! - Run each exchange as a task on a tokio runtime
//! - Enforce the response body limit
//! - Classify client errors into [`TransportError`]
//! - Deliver exactly one outcome per exchange, including on cancel

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::TransportConfig;
use crate::transport::{
    ResponseHead, Transport, TransportCallback, TransportError, TransportOutcome, TransportTask,
    WireRequest,
};

/// Transport that performs requests with a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpClientTransport {
    client: reqwest::Client,
    runtime: Handle,
    max_body_bytes: u64,
}

impl HttpClientTransport {
    pub const DEFAULT_MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

    pub fn new(client: reqwest::Client, runtime: Handle) -> Self {
        Self {
            client,
            runtime,
            max_body_bytes: Self::DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Build a client with the configured timeouts, user agent and body limit.
    pub fn from_config(config: &TransportConfig, runtime: Handle) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self::new(client, runtime).with_max_body_bytes(config.max_body_bytes))
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

impl Transport for HttpClientTransport {
    fn send(&self, request: WireRequest, completion: TransportCallback) -> Arc<dyn TransportTask> {
        Arc::new(HttpClientTask {
            client: self.client.clone(),
            runtime: self.runtime.clone(),
            max_body_bytes: self.max_body_bytes,
            request: Mutex::new(Some(request)),
            completion: Arc::new(Mutex::new(Some(completion))),
            join: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        })
    }
}

struct HttpClientTask {
    client: reqwest::Client,
    runtime: Handle,
    max_body_bytes: u64,
    /// Taken on the first `resume`.
    request: Mutex<Option<WireRequest>>,
    /// Taken by whichever of completion or cancellation happens first.
    completion: Arc<Mutex<Option<TransportCallback>>>,
    join: Mutex<Option<JoinHandle<()>>>,
    cancelled: AtomicBool,
}

impl TransportTask for HttpClientTask {
    fn resume(&self) {
        let Some(request) = self.request.lock().expect("transport task mutex poisoned").take() else {
            return;
        };
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }

        let client = self.client.clone();
        let completion = Arc::clone(&self.completion);
        let max_body_bytes = self.max_body_bytes;

        let join = self.runtime.spawn(async move {
            let outcome = execute(&client, request, max_body_bytes).await;
            deliver(&completion, outcome);
        });

        let mut slot = self.join.lock().expect("transport task mutex poisoned");
        if self.cancelled.load(Ordering::SeqCst) {
            join.abort();
        } else {
            *slot = Some(join);
        }
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.request.lock().expect("transport task mutex poisoned").take();
        if let Some(join) = self.join.lock().expect("transport task mutex poisoned").take() {
            join.abort();
        }
        deliver(&self.completion, TransportOutcome::failure(TransportError::Cancelled));
    }
}

fn deliver(completion: &Mutex<Option<TransportCallback>>, outcome: TransportOutcome) {
    let callback = completion.lock().expect("transport callback mutex poisoned").take();
    if let Some(callback) = callback {
        callback(outcome);
    }
}

async fn execute(client: &reqwest::Client, request: WireRequest, max_body_bytes: u64) -> TransportOutcome {
    let mut builder = client.request(request.method, request.url);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = request.body {
        builder = builder.body(body);
    }

    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(error = %e, "Transport request failed");
            return TransportOutcome::failure(classify(&e));
        }
    };

    let head = ResponseHead {
        status: response.status().as_u16(),
        headers: response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect::<BTreeMap<_, _>>(),
    };

    if response.content_length().is_some_and(|len| len > max_body_bytes) {
        return too_large(head, max_body_bytes);
    }

    match response.bytes().await {
        Ok(bytes) if bytes.len() as u64 > max_body_bytes => too_large(head, max_body_bytes),
        Ok(bytes) => TransportOutcome::success(head, Some(bytes.to_vec())),
        Err(e) => TransportOutcome {
            data: None,
            response: Some(head),
            error: Some(classify(&e)),
        },
    }
}

fn too_large(head: ResponseHead, max_body_bytes: u64) -> TransportOutcome {
    TransportOutcome {
        data: None,
        response: Some(head),
        error: Some(TransportError::BodyExceedsMaximum(max_body_bytes)),
    }
}

fn classify(error: &reqwest::Error) -> TransportError {
    let message = error.to_string();
    let causes = source_chain(error);
    if error.is_timeout() {
        TransportError::TimedOut
    } else if error.is_builder() {
        if causes.to_ascii_lowercase().contains("scheme") {
            TransportError::UnsupportedUrl(message)
        } else {
            TransportError::InvalidRequest(message)
        }
    } else if error.is_connect() {
        classify_connect(message, &causes)
    } else if error.is_decode() || error.is_body() {
        TransportError::CannotDecode(message)
    } else if error.is_redirect() {
        TransportError::BadServerResponse(message)
    } else {
        TransportError::Other(message)
    }
}

/// Split connection failures by what the underlying causes report.
///
/// Only the causes are matched, never the top-level message, which embeds
/// the request URL.
fn classify_connect(message: String, causes: &str) -> TransportError {
    let causes = causes.to_ascii_lowercase();
    let matches = |needles: &[&str]| needles.iter().any(|needle| causes.contains(needle));

    if matches(&[
        "dns error",
        "failed to lookup address",
        "name or service not known",
        "name resolution",
        "no such host",
    ]) {
        TransportError::CannotFindHost(message)
    } else if matches(&["certificate", "unknownissuer", "invalid peer cert"]) {
        TransportError::CertificateRejected(message)
    } else if matches(&["tls", "ssl", "handshake"]) {
        TransportError::SecureConnectionFailed(message)
    } else {
        TransportError::NotConnected(message)
    }
}

/// Every `source()` below `error`, joined with `": "`.
fn source_chain(error: &dyn std::error::Error) -> String {
    let mut causes = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    causes.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ErrorCode;

    fn connect_code(causes: &str) -> ErrorCode {
        classify_connect("error sending request".into(), causes).code()
    }

    #[test]
    fn resolution_failures_are_invalid_requests() {
        let error = classify_connect(
            "error sending request".into(),
            "client error (Connect): dns error: failed to lookup address information: Name or service not known",
        );
        assert!(matches!(error, TransportError::CannotFindHost(_)));
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
        assert_eq!(
            connect_code("dns error: Temporary failure in name resolution"),
            ErrorCode::InvalidRequest
        );
    }

    #[test]
    fn tls_failures_are_insecure() {
        let error = classify_connect(
            "error sending request".into(),
            "client error (Connect): invalid peer certificate: UnknownIssuer",
        );
        assert!(matches!(error, TransportError::CertificateRejected(_)));
        assert_eq!(
            connect_code("error:0A000410:SSL routines:ssl3_read_bytes:sslv3 alert handshake failure"),
            ErrorCode::InsecureConnection
        );
    }

    #[test]
    fn other_connect_failures_are_no_connection() {
        assert_eq!(
            connect_code("client error (Connect): tcp connect error: Connection refused (os error 111)"),
            ErrorCode::NoConnection
        );
        // Host names in the message are not mistaken for causes.
        assert!(matches!(
            classify_connect("error sending request for url (https://ssl.example.com/)".into(), ""),
            TransportError::NotConnected(_)
        ));
    }

    #[derive(Debug)]
    struct Wrapped(&'static str, Option<Box<Wrapped>>);

    impl std::fmt::Display for Wrapped {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Wrapped {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.1.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
        }
    }

    #[test]
    fn source_chain_walks_every_cause() {
        let error = Wrapped(
            "error sending request",
            Some(Box::new(Wrapped("client error (Connect)", Some(Box::new(Wrapped("dns error", None)))))),
        );
        assert_eq!(source_chain(&error), "client error (Connect): dns error");
    }
}
