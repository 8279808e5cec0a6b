//! Admission middleware and the status handler.
//!
//! Mount the status router *outside* the admission layer: a throttled
//! governor must never 503 its own monitoring surface.

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::debug;

use scalegate_governor::{Action, ActionKind, GovernorStatistics};

use crate::{AdmissionState, THROTTLE_BODY};

/// Per-request admission check.
///
/// Evaluates the governor against a fresh metrics sample; a `Throttle`
/// decision short-circuits the request with 503. Every other action,
/// including `Warning` and `Pacing`, lets the request through: partial
/// shedding is the host's traffic-management decision, the library only
/// reports it via the status surface.
pub async fn admission(State(state): State<AdmissionState>, request: Request, next: Next) -> Response {
    let action = state.evaluate();

    if action.kind == ActionKind::Throttle {
        debug!(reason = %action.reason, "request shed");
        return (StatusCode::SERVICE_UNAVAILABLE, THROTTLE_BODY).into_response();
    }

    next.run(request).await
}

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    statistics: GovernorStatistics,
    last_action: Option<Action>,
}

/// GET /<prefix>/status: governor statistics plus the last action.
pub async fn status(State(state): State<AdmissionState>) -> impl IntoResponse {
    Json(StatusResponse {
        statistics: state.statistics(),
        last_action: state.last_action(),
    })
}
