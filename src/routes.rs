use crate::dialer::{CallResultReconciler, CallbackEnvelope, DialerRepository, ReconcileOutcome};
use crate::error::AppError;
use crate::infra::AppState;
use crate::workflows::status::{
    ActionDispatcher, Actor, ApplicationRepository, ApplicationStatus, WorkflowEngine,
    WorkflowError,
};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// Numeric target status code, e.g. 120.
    pub to: u16,
    pub change_reason: String,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub application_id: i64,
    pub status: u16,
    pub fired_actions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub outcome: &'static str,
}

pub fn app_router<R, D, S>(
    engine: Arc<WorkflowEngine<R, D>>,
    reconciler: Arc<CallResultReconciler<S>>,
) -> Router
where
    R: ApplicationRepository + 'static,
    D: ActionDispatcher + 'static,
    S: DialerRepository + 'static,
{
    let transitions = Router::new()
        .route(
            "/api/v1/applications/:id/transitions",
            post(transition_endpoint::<R, D>),
        )
        .with_state(engine);
    let callbacks = Router::new()
        .route("/api/v1/dialer/callbacks", post(callback_endpoint::<S>))
        .with_state(reconciler);

    transitions
        .merge(callbacks)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub async fn transition_endpoint<R, D>(
    State(engine): State<Arc<WorkflowEngine<R, D>>>,
    Path(application_id): Path<i64>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<TransitionResponse>, AppError>
where
    R: ApplicationRepository + 'static,
    D: ActionDispatcher + 'static,
{
    let to = ApplicationStatus::from_code(payload.to)
        .ok_or(WorkflowError::UnknownStatus(payload.to))?;
    let actor = payload
        .actor
        .map(|name| Actor::agent(1, name))
        .unwrap_or_else(Actor::system);

    let outcome = engine.run_transition(&actor, application_id, to, &payload.change_reason)?;

    Ok(Json(TransitionResponse {
        application_id,
        status: outcome.committed_status.code(),
        fired_actions: outcome.fired_actions,
    }))
}

pub async fn callback_endpoint<S>(
    State(reconciler): State<Arc<CallResultReconciler<S>>>,
    Json(callback): Json<CallbackEnvelope>,
) -> Result<Json<CallbackResponse>, AppError>
where
    S: DialerRepository + 'static,
{
    let outcome = reconciler.apply(&callback)?;
    Ok(Json(CallbackResponse {
        outcome: match outcome {
            ReconcileOutcome::Applied => "applied",
            ReconcileOutcome::Ignored => "ignored",
        },
    }))
}
