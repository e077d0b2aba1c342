//! Integration tests for the status poller against a scripted stub server.
//!
//! Each test stands up an axum server that serves a scripted sequence of
//! status responses and counts detail fetches, then drives a real polling
//! run over HTTP with a short interval.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{extract::State, Json, Router};
use assert_matches::assert_matches;
use serde_json::{json, Value};

use jewelai_app::{PollerConfig, PollerEvent, PollerPhase, ProcessCache, StatusPoller};
use jewelai_client::{DesignApi, MemoryTokenStore, Session};
use jewelai_core::process::{DesignProcess, DesignProcessStatus};

/// Scripted backend: a queue of status payloads (the last one repeats) and
/// a counter of detail fetches.
#[derive(Clone)]
struct Scripted {
    statuses: Arc<Mutex<VecDeque<Value>>>,
    detail_fetches: Arc<AtomicUsize>,
}

impl Scripted {
    fn new(statuses: Vec<Value>) -> Self {
        Self {
            statuses: Arc::new(Mutex::new(statuses.into())),
            detail_fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn next_status(&self) -> Value {
        let mut queue = self.statuses.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap_or(Value::Null)
        }
    }
}

fn status_json(status: &str) -> Value {
    json!({
        "id": 1,
        "status": status,
        "updatedAt": "2026-03-01T10:05:00Z",
        "title": "Emerald halo ring"
    })
}

fn unauthorized() -> Value {
    json!({"__status": 401})
}

async fn status_handler(State(backend): State<Scripted>) -> Response {
    let payload = backend.next_status();
    if payload.get("__status").and_then(Value::as_i64) == Some(401) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"}))).into_response();
    }
    Json(payload).into_response()
}

async fn details_handler(State(backend): State<Scripted>) -> Json<Value> {
    backend.detail_fetches.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "id": 1,
        "title": "Emerald halo ring",
        "status": "GENERATED",
        "createdAt": "2026-03-01T10:00:00Z",
        "updatedAt": "2026-03-01T10:06:00Z",
        "imageUrl": "/generated/1.png"
    }))
}

async fn spawn_backend(backend: Scripted) -> String {
    let app = Router::new()
        .route("/api/processes/{id}/status", get(status_handler))
        .route("/api/processes/{id}/details", get(details_handler))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn fast_config() -> PollerConfig {
    PollerConfig {
        interval: Duration::from_millis(20),
        budget: Duration::from_secs(5),
    }
}

fn seed_process() -> DesignProcess {
    serde_json::from_value(json!({
        "id": 1,
        "title": "Emerald halo ring",
        "status": "GENERATION_REQUESTED",
        "createdAt": "2026-03-01T10:00:00Z",
        "updatedAt": "2026-03-01T10:00:00Z"
    }))
    .unwrap()
}

fn poller_for(base_url: &str, cache: &ProcessCache, config: PollerConfig) -> StatusPoller {
    let session = Session::new(Arc::new(MemoryTokenStore::new()));
    session.save_token("t1", None);
    let api = DesignApi::new(base_url, session);
    StatusPoller::with_config(api, cache.clone(), config)
}

#[tokio::test]
async fn stops_within_one_tick_of_terminal_status_and_fetches_detail_once() {
    let backend = Scripted::new(vec![status_json("GENERATING"), status_json("GENERATED")]);
    let base_url = spawn_backend(backend.clone()).await;

    let cache = ProcessCache::new();
    cache.replace_list(vec![seed_process()]);

    let mut handle = poller_for(&base_url, &cache, fast_config()).spawn(1);
    assert_eq!(handle.phase(), PollerPhase::Polling);

    assert_matches!(
        handle.next_event().await,
        Some(PollerEvent::StatusUpdated {
            id: 1,
            status: DesignProcessStatus::Generating,
        })
    );
    assert_matches!(handle.next_event().await, Some(PollerEvent::Settled { id: 1 }));
    // The loop has stopped: the event channel drains to None.
    assert_eq!(handle.next_event().await, None);

    assert_eq!(backend.detail_fetches.load(Ordering::SeqCst), 1);
    let detail = cache.detail(1).unwrap();
    assert_eq!(detail.process.status, DesignProcessStatus::Generated);
    assert_eq!(detail.process.image_url.as_deref(), Some("/generated/1.png"));
    assert_eq!(handle.phase(), PollerPhase::Settled);
}

#[tokio::test]
async fn non_terminal_status_is_merged_as_partial_update() {
    let backend = Scripted::new(vec![status_json("GENERATING"), status_json("GENERATED")]);
    let base_url = spawn_backend(backend).await;

    let cache = ProcessCache::new();
    cache.replace_list(vec![seed_process()]);

    let mut handle = poller_for(&base_url, &cache, fast_config()).spawn(1);
    handle.next_event().await;

    // After the first tick the list entry carries the polled status but the
    // full detail has not been fetched.
    assert_eq!(cache.list()[0].status, DesignProcessStatus::Generating);
    assert!(cache.detail(1).is_none());

    handle.shutdown().await;
}

#[tokio::test]
async fn budget_expiry_stops_polling_without_synthesizing_failure() {
    let backend = Scripted::new(vec![status_json("GENERATING")]);
    let base_url = spawn_backend(backend.clone()).await;

    let cache = ProcessCache::new();
    cache.replace_list(vec![seed_process()]);

    let config = PollerConfig {
        interval: Duration::from_millis(15),
        budget: Duration::from_millis(120),
    };
    let mut handle = poller_for(&base_url, &cache, config).spawn(1);

    let mut saw_expired = false;
    while let Some(event) = handle.next_event().await {
        if event == PollerEvent::Expired {
            saw_expired = true;
        }
    }
    assert!(saw_expired);

    // Last-known status stays displayed; no detail fetch ever ran.
    assert_eq!(cache.list()[0].status, DesignProcessStatus::Generating);
    assert_eq!(backend.detail_fetches.load(Ordering::SeqCst), 0);
    assert_eq!(handle.phase(), PollerPhase::Settled);
}

#[tokio::test]
async fn budget_cuts_off_a_hung_status_fetch() {
    // A backend that accepts the connection and never answers: the budget
    // must fire mid-fetch, not wait for a response that never comes.
    async fn stall() -> Json<Value> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Json(Value::Null)
    }
    let app = Router::new().route("/api/processes/{id}/status", get(stall));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let cache = ProcessCache::new();
    cache.replace_list(vec![seed_process()]);

    let config = PollerConfig {
        interval: Duration::from_millis(15),
        budget: Duration::from_millis(200),
    };
    let mut handle = poller_for(&format!("http://{addr}"), &cache, config).spawn(1);

    let event = tokio::time::timeout(Duration::from_secs(2), handle.next_event())
        .await
        .expect("budget must fire while the fetch hangs");
    assert_matches!(event, Some(PollerEvent::Expired));
    assert_eq!(handle.next_event().await, None);
    assert_eq!(handle.phase(), PollerPhase::Settled);
}

#[tokio::test]
async fn auth_failure_stops_polling_and_clears_the_session() {
    let backend = Scripted::new(vec![unauthorized()]);
    let base_url = spawn_backend(backend).await;

    let cache = ProcessCache::new();
    let session = Session::new(Arc::new(MemoryTokenStore::new()));
    session.save_token("t1", None);
    let api = DesignApi::new(&base_url, session.clone());
    let mut handle = StatusPoller::with_config(api, cache, fast_config()).spawn(1);

    assert_eq!(handle.next_event().await, Some(PollerEvent::SessionExpired));
    assert_eq!(handle.next_event().await, None);
    assert!(session.token().is_none());
}

#[tokio::test]
async fn teardown_cancels_the_loop_promptly() {
    let backend = Scripted::new(vec![status_json("GENERATING")]);
    let base_url = spawn_backend(backend).await;

    let cache = ProcessCache::new();
    // An interval far longer than the test: only cancellation can end the
    // loop in time.
    let config = PollerConfig {
        interval: Duration::from_secs(3600),
        budget: Duration::from_secs(7200),
    };
    let handle = poller_for(&base_url, &cache, config).spawn(1);

    handle.stop();
    tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
        .await
        .expect("cancelled poller must finish promptly");
}

#[test]
fn start_condition_covers_inflight_statuses_and_optimistic_flag() {
    assert!(StatusPoller::should_start(
        DesignProcessStatus::GenerationRequested,
        false
    ));
    assert!(StatusPoller::should_start(DesignProcessStatus::Generating, false));
    assert!(!StatusPoller::should_start(
        DesignProcessStatus::ReadyForGeneration,
        false
    ));
    // The optimistic flag covers the window right after a generate request,
    // before the server-reported status catches up.
    assert!(StatusPoller::should_start(
        DesignProcessStatus::ReadyForGeneration,
        true
    ));
}
