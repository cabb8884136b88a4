use crate::cli::ServeArgs;
use crate::config::AppConfig;
use crate::dialer::CallResultReconciler;
use crate::error::AppError;
use crate::infra::{
    AppState, InMemoryApplicationRepository, InMemoryDeferredQueue, InMemoryDialerRepository,
    RecordingActionDispatcher,
};
use crate::routes::app_router;
use crate::telemetry;
use crate::workflows::status::{WorkflowEngine, WorkflowSettings};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

const DEFAULT_INEFFECTIVE_THRESHOLD_DAYS: u32 = 3;
const DEFAULT_INEFFECTIVE_REFRESH_DAYS: i64 = 30;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let applications = Arc::new(InMemoryApplicationRepository::default());
    let dispatcher = Arc::new(RecordingActionDispatcher::default());
    let engine = Arc::new(WorkflowEngine::new(
        applications,
        dispatcher,
        WorkflowSettings::default(),
    ));

    let dialer_store = Arc::new(InMemoryDialerRepository::default());
    let deferred = Arc::new(InMemoryDeferredQueue::default());
    let reconciler = Arc::new(CallResultReconciler::new(
        dialer_store,
        deferred,
        BTreeSet::new(),
        DEFAULT_INEFFECTIVE_THRESHOLD_DAYS,
        DEFAULT_INEFFECTIVE_REFRESH_DAYS,
    ));

    let app = app_router(engine, reconciler)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "loan workflow backend ready");

    axum::serve(listener, app).await?;
    Ok(())
}
