//! Tests for the SDK sidecar HTTP client against a fake sidecar.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;

use readiness_wrapper::config::{SupervisorConfig, DEFAULT_READINESS_MARKER};
use readiness_wrapper::control::{ClientError, ControlPlaneClient, HttpSdkClient};
use readiness_wrapper::supervisor::{FatalError, Supervisor};

/// Request counters of the fake sidecar.
#[derive(Debug)]
struct Sidecar {
    ready: AtomicU64,
    health: AtomicU64,
    status: StatusCode,
    delay: Duration,
}

impl Sidecar {
    fn new(status: StatusCode) -> Self {
        Self {
            ready: AtomicU64::new(0),
            health: AtomicU64::new(0),
            status,
            delay: Duration::ZERO,
        }
    }
}

fn is_empty_object(body: &serde_json::Value) -> bool {
    body.as_object().is_some_and(serde_json::Map::is_empty)
}

async fn ready(State(sidecar): State<Arc<Sidecar>>, Json(body): Json<serde_json::Value>) -> StatusCode {
    tokio::time::sleep(sidecar.delay).await;
    if is_empty_object(&body) {
        sidecar.ready.fetch_add(1, Ordering::SeqCst);
    }
    sidecar.status
}

async fn health(State(sidecar): State<Arc<Sidecar>>, Json(body): Json<serde_json::Value>) -> StatusCode {
    tokio::time::sleep(sidecar.delay).await;
    if is_empty_object(&body) {
        sidecar.health.fetch_add(1, Ordering::SeqCst);
    }
    sidecar.status
}

/// Start a fake sidecar and return its base URL.
async fn spawn_sidecar(sidecar: Arc<Sidecar>) -> String {
    let app = Router::new()
        .route("/ready", post(ready))
        .route("/health", post(health))
        .with_state(sidecar);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn reports_reach_the_sidecar() {
    let sidecar = Arc::new(Sidecar::new(StatusCode::OK));
    let base_url = spawn_sidecar(sidecar.clone()).await;
    let client = HttpSdkClient::new(&base_url, Duration::from_secs(2)).unwrap();

    client.report_healthy().await.unwrap();
    client.report_healthy().await.unwrap();
    client.report_ready().await.unwrap();

    assert_eq!(sidecar.health.load(Ordering::SeqCst), 2);
    assert_eq!(sidecar.ready.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn error_status_is_rejected() {
    let sidecar = Arc::new(Sidecar::new(StatusCode::SERVICE_UNAVAILABLE));
    let base_url = spawn_sidecar(sidecar).await;
    let client = HttpSdkClient::new(&base_url, Duration::from_secs(2)).unwrap();

    let err = client.report_ready().await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { status: 503, .. }));
}

#[tokio::test]
async fn slow_sidecar_times_out() {
    let sidecar = Arc::new(Sidecar {
        delay: Duration::from_secs(2),
        ..Sidecar::new(StatusCode::OK)
    });
    let base_url = spawn_sidecar(sidecar).await;
    let client = HttpSdkClient::new(&base_url, Duration::from_millis(200)).unwrap();

    let err = client.report_healthy().await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout));
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpSdkClient::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
    let err = client.report_healthy().await.unwrap_err();
    assert!(matches!(err, ClientError::Unreachable(_)));
}

#[tokio::test]
async fn supervisor_reports_through_sidecar() {
    let sidecar = Arc::new(Sidecar::new(StatusCode::OK));
    let base_url = spawn_sidecar(sidecar.clone()).await;
    let client = Arc::new(HttpSdkClient::new(&base_url, Duration::from_secs(2)).unwrap());
    let config = SupervisorConfig::new("sh")
        .with_args(vec![
            "-c".to_string(),
            format!("echo 'starting up'; echo '{DEFAULT_READINESS_MARKER}'; sleep 1"),
        ])
        .with_heartbeat_interval(Duration::from_millis(100));

    let cause = Supervisor::new(config, client).run().await;

    assert!(matches!(cause, FatalError::ChildExited(status) if status.success()));
    assert_eq!(sidecar.ready.load(Ordering::SeqCst), 1);
    assert!(sidecar.health.load(Ordering::SeqCst) >= 3);
}
