//! scalegate-api — host wiring for the governor.
//!
//! Two pieces a host embeds into its axum stack:
//!
//! - an **admission middleware** that evaluates the governor on every
//!   request and turns a `Throttle` decision into HTTP 503 (503, not
//!   429: the condition is transient back-pressure, not a quota);
//! - a **status route** (`GET /<prefix>/status`) exposing governor
//!   statistics and the last action taken.
//!
//! The library never initializes logging or owns a runtime; it only
//! hands the host a `Router` and a layer function.

pub mod config;
pub mod handlers;

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::routing::get;

use scalegate_core::SystemIntegrityMetrics;
use scalegate_governor::{Action, Governor};

pub use config::HostConfig;

/// Body sent with throttled responses.
pub const THROTTLE_BODY: &str = "Service temporarily overloaded";

/// Supplies the metrics record for each admission evaluation.
///
/// Hosts derive this from recent telemetry, typically a
/// `scalegate_tail::TailTracker` plus process-level counters. The
/// source is polled once per request, so implementations should be
/// cheap snapshots, not fresh aggregations.
pub trait MetricsSource: Send + Sync + 'static {
    fn sample(&self) -> SystemIntegrityMetrics;
}

impl<F> MetricsSource for F
where
    F: Fn() -> SystemIntegrityMetrics + Send + Sync + 'static,
{
    fn sample(&self) -> SystemIntegrityMetrics {
        self()
    }
}

/// Shared state behind the middleware and the status route.
///
/// The governor sits behind a coarse mutex: one evaluation at a time
/// per instance, which is exactly the serialization the governor's
/// state machine requires.
#[derive(Clone)]
pub struct AdmissionState {
    governor: Arc<Mutex<Governor>>,
    source: Arc<dyn MetricsSource>,
    last_action: Arc<Mutex<Option<Action>>>,
}

impl AdmissionState {
    pub fn new(governor: Governor, source: impl MetricsSource) -> Self {
        Self {
            governor: Arc::new(Mutex::new(governor)),
            source: Arc::new(source),
            last_action: Arc::new(Mutex::new(None)),
        }
    }

    /// Evaluate the governor against a fresh metrics sample and record
    /// the action for the status route.
    pub fn evaluate(&self) -> Action {
        let metrics = self.source.sample();
        let action = {
            let mut governor = self.governor.lock().expect("governor lock poisoned");
            governor.evaluate(&metrics)
        };
        *self.last_action.lock().expect("last action lock poisoned") = Some(action.clone());
        action
    }

    pub fn statistics(&self) -> scalegate_governor::GovernorStatistics {
        self.governor
            .lock()
            .expect("governor lock poisoned")
            .statistics()
    }

    pub fn last_action(&self) -> Option<Action> {
        self.last_action
            .lock()
            .expect("last action lock poisoned")
            .clone()
    }
}

/// Build the monitoring router, mounted at `/<prefix>`.
pub fn status_router(state: AdmissionState, prefix: &str) -> Router {
    let routes = Router::new()
        .route("/status", get(handlers::status))
        .with_state(state);
    Router::new().nest(&format!("/{}", prefix.trim_matches('/')), routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware;
    use axum::response::IntoResponse;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn stable_source() -> SystemIntegrityMetrics {
        SystemIntegrityMetrics {
            immutable_ops_verified: 100,
            supervised_processes: 50,
            scaling_ratio: 0.20,
            ..Default::default()
        }
    }

    fn saturated_source() -> SystemIntegrityMetrics {
        SystemIntegrityMetrics {
            immutable_ops_verified: 100,
            mutable_shared_state: 150,
            supervised_processes: 50,
            unsupervised_processes: 40,
            scaling_ratio: 0.0,
            ..Default::default()
        }
    }

    async fn ok() -> impl IntoResponse {
        "hello"
    }

    fn app(source: fn() -> SystemIntegrityMetrics) -> (Router, AdmissionState) {
        let state = AdmissionState::new(Governor::new(1.5), source);
        let router = Router::new()
            .route("/", axum::routing::get(ok))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                handlers::admission,
            ))
            .merge(status_router(state.clone(), "scalegate"));
        (router, state)
    }

    #[tokio::test]
    async fn stable_requests_pass_through() {
        let (router, _) = app(stable_source);
        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn saturated_requests_get_503() {
        // r = 1 + 1.5 + 0.8 = 3.3 → throttle.
        let (router, _) = app(saturated_source);
        let response = router
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], THROTTLE_BODY.as_bytes());
    }

    #[tokio::test]
    async fn status_route_reports_statistics_and_last_action() {
        let (router, _) = app(saturated_source);

        // Drive one throttled request so there is a last action.
        let _ = router
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/scalegate/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["statistics"]["throttles"], 1);
        assert_eq!(json["last_action"]["kind"], "THROTTLE");
        assert!(json["last_action"]["reason"].as_str().unwrap().len() > 0);
    }

    #[tokio::test]
    async fn status_route_without_traffic_has_null_action() {
        let (router, _) = app(stable_source);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/scalegate/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["last_action"].is_null());
        assert_eq!(json["statistics"]["current_r"], 1.5);
    }
}
