//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http_pipeline::http::{HttpResult, StatusCode};
use http_pipeline::transport::{
    ResponseHead, Transport, TransportCallback, TransportError, TransportOutcome, TransportTask,
    WireRequest,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// How long tests wait for a callback before failing.
pub const WAIT: Duration = Duration::from_secs(5);

struct Shared {
    status: u16,
    body: Vec<u8>,
    error: Option<TransportError>,
    delay: Mutex<Duration>,
    requests: Mutex<Vec<WireRequest>>,
    cancelled: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Transport that answers every request from a worker thread after a delay.
///
/// The delay is read when a handle is resumed, so tests can change it between
/// submissions. A cancelled handle never calls back.
#[derive(Clone)]
pub struct MockTransport {
    shared: Arc<Shared>,
}

impl MockTransport {
    pub fn responding(status: u16, body: &str) -> Arc<Self> {
        Self::build(status, body.as_bytes().to_vec(), None)
    }

    pub fn failing(error: TransportError) -> Arc<Self> {
        Self::build(0, Vec::new(), Some(error))
    }

    fn build(status: u16, body: Vec<u8>, error: Option<TransportError>) -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(Shared {
                status,
                body,
                error,
                delay: Mutex::new(Duration::ZERO),
                requests: Mutex::new(Vec::new()),
                cancelled: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }),
        })
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.shared.delay.lock().unwrap() = delay;
    }

    /// Number of requests handed to this transport.
    pub fn sent_count(&self) -> usize {
        self.shared.requests.lock().unwrap().len()
    }

    pub fn cancelled_count(&self) -> usize {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Highest number of exchanges running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<WireRequest> {
        self.shared.requests.lock().unwrap().last().cloned()
    }

    pub fn request_paths(&self) -> Vec<String> {
        self.shared
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.url.path().to_string())
            .collect()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: WireRequest, completion: TransportCallback) -> Arc<dyn TransportTask> {
        self.shared.requests.lock().unwrap().push(request);
        Arc::new(MockTask {
            shared: Arc::clone(&self.shared),
            completion: Mutex::new(Some(completion)),
            stop: Mutex::new(None),
            cancelled: Mutex::new(false),
        })
    }
}

struct MockTask {
    shared: Arc<Shared>,
    completion: Mutex<Option<TransportCallback>>,
    stop: Mutex<Option<mpsc::Sender<()>>>,
    cancelled: Mutex<bool>,
}

impl TransportTask for MockTask {
    fn resume(&self) {
        if *self.cancelled.lock().unwrap() {
            return;
        }
        let Some(completion) = self.completion.lock().unwrap().take() else {
            return;
        };

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        *self.stop.lock().unwrap() = Some(stop_tx);

        let delay = *self.shared.delay.lock().unwrap();
        let shared = Arc::clone(&self.shared);
        let running = shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        shared.max_in_flight.fetch_max(running, Ordering::SeqCst);

        std::thread::spawn(move || {
            let outcome = stop_rx.recv_timeout(delay);
            shared.in_flight.fetch_sub(1, Ordering::SeqCst);
            if outcome != Err(RecvTimeoutError::Timeout) {
                return;
            }

            let result = match &shared.error {
                Some(error) => TransportOutcome::failure(error.clone()),
                None => TransportOutcome::success(
                    ResponseHead {
                        status: shared.status,
                        headers: Default::default(),
                    },
                    Some(shared.body.clone()),
                ),
            };
            completion(result);
        });
    }

    fn cancel(&self) {
        {
            let mut cancelled = self.cancelled.lock().unwrap();
            if *cancelled {
                return;
            }
            *cancelled = true;
        }
        self.shared.cancelled.fetch_add(1, Ordering::SeqCst);
        self.completion.lock().unwrap().take();
        if let Some(stop) = self.stop.lock().unwrap().take() {
            let _ = stop.send(());
        }
    }
}

/// Completion hook that forwards the result to a channel.
pub fn forward_to(tx: &mpsc::Sender<HttpResult>) -> impl FnOnce(&HttpResult) + Send + 'static {
    let tx = tx.clone();
    move |result: &HttpResult| {
        let _ = tx.send(result.clone());
    }
}

/// Start a mock backend on an ephemeral port that answers every request with
/// `status` and `body` after `delay`.
pub async fn start_backend(status: u16, body: &'static str, delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        read_request_head(&mut socket).await;
                        tokio::time::sleep(delay).await;

                        let reason = StatusCode::from_u16(status)
                            .ok()
                            .and_then(|status| status.canonical_reason())
                            .unwrap_or("Unknown");
                        let response_str = format!(
                            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            reason,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|window| window == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

/// An address with nothing listening on it.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
