use crate::cli::ServeArgs;
use crate::infra::{build_board, seed_from_csv, seed_password, AppState, SEED_PASSWORD_VAR};
use crate::routes::with_board_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use job_board::config::AppConfig;
use job_board::error::AppError;
use job_board::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let board = build_board(&config.store);
    if let Some(path) = args.seed_csv.take() {
        let configured = std::env::var(SEED_PASSWORD_VAR).ok();
        if configured.is_none() {
            info!("{SEED_PASSWORD_VAR} unset; seed employer gets a random password");
        }
        let summary = seed_from_csv(&board, &path, &seed_password(configured))?;
        info!(
            path = %path.display(),
            jobs = summary.jobs.len(),
            companies = summary.companies_created,
            "store seeded"
        );
    }

    let app = with_board_routes(Arc::new(board))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, store = %config.store.url, %addr, "job board ready");

    axum::serve(listener, app).await?;
    Ok(())
}
