use job_board::board::{ImportSummary, JobCsvImporter, Registration, SessionContext, UserType};
use job_board::config::{StoreBackend, StoreConfig};
use job_board::error::AppError;
use job_board::JobBoard;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use uuid::Uuid;

/// Account that owns jobs loaded from a CSV at startup.
pub(crate) const SEED_EMPLOYER_EMAIL: &str = "seed@jobboard.local";
/// Password for the seed account; a random one is generated when unset.
pub(crate) const SEED_PASSWORD_VAR: &str = "BOARD_SEED_PASSWORD";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn build_board(store: &StoreConfig) -> JobBoard {
    match store.backend {
        StoreBackend::Memory => JobBoard::in_memory(&store.key),
    }
}

/// The configured seed password, or a fresh random one nobody else can derive.
pub(crate) fn seed_password(configured: Option<String>) -> String {
    configured
        .filter(|password| !password.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}

/// Registers an employer account that owns seeded data.
pub(crate) fn seed_employer(
    board: &JobBoard,
    email: &str,
    password: &str,
) -> Result<SessionContext, AppError> {
    let ctx = board.identity.register(Registration {
        email: email.to_string(),
        password: password.to_string(),
        password_confirm: password.to_string(),
        user_type: UserType::Employer,
        first_name: "Seed".to_string(),
        last_name: "Employer".to_string(),
    })?;
    Ok(ctx)
}

pub(crate) fn seed_from_csv(
    board: &JobBoard,
    path: &Path,
    password: &str,
) -> Result<ImportSummary, AppError> {
    let ctx = seed_employer(board, SEED_EMPLOYER_EMAIL, password)?;
    Ok(JobCsvImporter::from_path(path, board, &ctx)?)
}
