//! Minimal host wiring: a tail tracker feeding the admission governor.
//!
//! Run with `cargo run -p scalegate-api --example host`, then:
//!
//! ```text
//! curl http://127.0.0.1:3000/
//! curl http://127.0.0.1:3000/scalegate/status
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::middleware;
use axum::routing::get;
use tracing::info;

use scalegate_api::{AdmissionState, HostConfig, handlers, status_router};
use scalegate_core::SystemIntegrityMetrics;
use scalegate_governor::Governor;
use scalegate_tail::TailTracker;

async fn hello(State(tracker): State<Arc<TailTracker>>) -> &'static str {
    let start = Instant::now();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    tracker.record(start.elapsed());
    "hello from behind the gate\n"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scalegate_governor=debug".into()),
        )
        .init();

    let config = HostConfig::default();
    let tracker = Arc::new(TailTracker::new(config.tail_capacity));

    // Bridge the tail estimate into the r-model: encoding the estimated
    // coupling as a scaling ratio makes the governor see exactly the
    // tracker's r.
    let source_tracker = tracker.clone();
    let source = move || {
        let estimated = source_tracker.estimate_r();
        SystemIntegrityMetrics {
            immutable_ops_verified: 100,
            supervised_processes: 50,
            scaling_ratio: (estimated - 1.0) * scalegate_core::CRITICALITY_SCALING_RATIO,
            ..Default::default()
        }
    };

    let state = AdmissionState::new(Governor::new(config.initial_r), source);

    let app = Router::new()
        .route("/", get(hello))
        .with_state(tracker)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::admission,
        ))
        .merge(status_router(state, &config.status_prefix));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    info!(addr = %listener.local_addr()?, "host listening");
    axum::serve(listener, app).await?;
    Ok(())
}
