mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::{application, collection_account, permanent_medium_pass, score};
use loanflow::dialer::{CallResultReconciler, PhoneSlot};
use loanflow::infra::{
    InMemoryApplicationRepository, InMemoryDeferredQueue, InMemoryDialerRepository,
    RecordingActionDispatcher,
};
use loanflow::routes::app_router;
use loanflow::workflows::status::{
    ApplicationRepository, ApplicationStatus, CreditScoreClass, WorkflowEngine, WorkflowSettings,
};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tower::ServiceExt;

struct Backend {
    applications: Arc<InMemoryApplicationRepository>,
    dialer: Arc<InMemoryDialerRepository>,
    router: axum::Router,
}

fn build_backend() -> Backend {
    let applications = Arc::new(InMemoryApplicationRepository::default());
    let dispatcher = Arc::new(RecordingActionDispatcher::default());
    let settings = WorkflowSettings {
        high_score_bypass: None,
        medium_score_pass: Some(permanent_medium_pass()),
    };
    let engine = Arc::new(WorkflowEngine::new(
        applications.clone(),
        dispatcher,
        settings,
    ));

    let dialer = Arc::new(InMemoryDialerRepository::default());
    let deferred = Arc::new(InMemoryDeferredQueue::default());
    let reconciler = Arc::new(CallResultReconciler::new(
        dialer.clone(),
        deferred,
        BTreeSet::new(),
        3,
        30,
    ));

    Backend {
        applications,
        dialer: dialer.clone(),
        router: app_router(engine, reconciler),
    }
}

async fn post_json(router: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize")))
        .expect("request");

    let response = router.oneshot(request).await.expect("router dispatch");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let payload = serde_json::from_slice(&bytes).expect("json body");
    (status, payload)
}

#[tokio::test]
async fn transition_endpoint_commits_and_reports_actions() {
    let backend = build_backend();
    backend
        .applications
        .insert(application(
            3_000_000_001,
            ApplicationStatus::FormPartial,
            None,
        ))
        .expect("seed");
    backend
        .applications
        .set_score_snapshot(3_000_000_001, score(CreditScoreClass::B, 0.82));

    let (status, payload) = post_json(
        backend.router,
        "/api/v1/applications/3000000001/transitions",
        json!({ "to": 120, "change_reason": "system_triggered" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload.get("status"), Some(&json!(120)));
    let history = backend
        .applications
        .history(3_000_000_001)
        .expect("history reads");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].change_reason, "Julo one pass medium score");
}

#[tokio::test]
async fn illegal_transition_maps_to_bad_request() {
    let backend = build_backend();
    backend
        .applications
        .insert(application(
            3_000_000_002,
            ApplicationStatus::FormPartial,
            None,
        ))
        .expect("seed");

    let (status, payload) = post_json(
        backend.router,
        "/api/v1/applications/3000000002/transitions",
        json!({ "to": 190, "change_reason": "system_triggered" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(payload.get("error").is_some());
}

#[tokio::test]
async fn unknown_status_code_maps_to_bad_request() {
    let backend = build_backend();
    let (status, _) = post_json(
        backend.router,
        "/api/v1/applications/1/transitions",
        json!({ "to": 777, "change_reason": "system_triggered" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_application_maps_to_not_found() {
    let backend = build_backend();
    let (status, _) = post_json(
        backend.router,
        "/api/v1/applications/404/transitions",
        json!({ "to": 105, "change_reason": "system_triggered" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn callback_endpoint_applies_contact_status() {
    let backend = build_backend();
    let account = collection_account(200, 5, 500_000);
    let phone = account.phones[&PhoneSlot::Mobile1].phone_number.clone();
    backend.dialer.seed_account("B1", account);

    let (status, payload) = post_json(
        backend.router,
        "/api/v1/dialer/callbacks",
        json!({
            "type": "ContactStatus",
            "body": {
                "phoneNumber": phone,
                "callid": "http-1",
                "customerInfo": { "account_id": 200, "account_payment_id": 9200 },
                "hangupReason": 12,
                "endtime": "2026-08-30T10:00:00Z"
            }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload.get("outcome"), Some(&json!("applied")));
    assert_eq!(backend.dialer.histories().len(), 1);
}

#[tokio::test]
async fn malformed_callback_maps_to_bad_request() {
    let backend = build_backend();
    let (status, _) = post_json(
        backend.router,
        "/api/v1/dialer/callbacks",
        json!({
            "type": "ContactStatus",
            "body": { "callid": "http-2" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn healthcheck_reports_ok() {
    let backend = build_backend();
    let response = backend
        .router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), 1024).await.expect("body");
    let payload: Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(payload.get("status"), Some(&json!("ok")));
}
