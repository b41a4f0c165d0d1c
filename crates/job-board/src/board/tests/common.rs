use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::board::domain::{Application, CompanyId, Company, JobStatus, UserType};
use crate::board::identity::{AuthError, AuthEvent, AuthProvider, AuthUser, Session};
use crate::board::{
    CompanyDraft, JobBoard, JobDraft, MemoryAuthProvider, Registration, SessionContext,
};
use crate::store::{Query, Store, StoreError, Table};

pub(super) const PROJECT_KEY: &str = "test-project-key";

/// Clock that moves one minute forward on every reading.
pub(super) struct SteppingClock {
    base: DateTime<Utc>,
    ticks: AtomicI64,
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self {
            base: Utc.with_ymd_and_hms(2025, 10, 1, 9, 0, 0).unwrap(),
            ticks: AtomicI64::new(0),
        }
    }
}

impl crate::store::Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.base + Duration::minutes(tick)
    }
}

pub(super) fn store() -> Store {
    Store::in_memory().with_clock(Arc::new(SteppingClock::default()))
}

pub(super) fn board() -> JobBoard {
    JobBoard::new(store(), Arc::new(MemoryAuthProvider::new(PROJECT_KEY)))
}

pub(super) fn registration(email: &str, user_type: UserType) -> Registration {
    Registration {
        email: email.to_string(),
        password: "correct-horse".to_string(),
        password_confirm: "correct-horse".to_string(),
        user_type,
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
    }
}

pub(super) fn employer(board: &JobBoard, email: &str) -> SessionContext {
    board
        .identity
        .register(registration(email, UserType::Employer))
        .expect("employer registers")
}

pub(super) fn candidate(board: &JobBoard, email: &str) -> SessionContext {
    board
        .identity
        .register(registration(email, UserType::Candidate))
        .expect("candidate registers")
}

pub(super) fn company(board: &JobBoard, ctx: &SessionContext, name: &str) -> Company {
    board
        .companies
        .create(
            ctx,
            CompanyDraft {
                name: name.to_string(),
                ..CompanyDraft::default()
            },
        )
        .expect("company created")
}

pub(super) fn job_draft(company_id: &CompanyId, title: &str, status: JobStatus) -> JobDraft {
    JobDraft {
        title: title.to_string(),
        company_id: company_id.clone(),
        description: format!("{title} for a growing team"),
        requirements: "Three years of production experience".to_string(),
        location: "Berlin, Germany".to_string(),
        remote_allowed: false,
        employment_type: crate::board::EmploymentType::FullTime,
        experience_level: crate::board::ExperienceLevel::Mid,
        salary_min: None,
        salary_max: None,
        status,
        deadline: None,
    }
}

/// Application table that fails every read with the configured error.
pub(super) struct FailingApplications {
    pub(super) error: StoreError,
}

impl Table<Application> for FailingApplications {
    fn select(&self, _query: &Query) -> Result<Vec<Application>, StoreError> {
        Err(self.error.clone())
    }

    fn insert(&self, _record: Application) -> Result<Application, StoreError> {
        Err(self.error.clone())
    }

    fn update(
        &self,
        _id: &str,
        _patch: &mut dyn FnMut(&mut Application),
    ) -> Result<Application, StoreError> {
        Err(self.error.clone())
    }

    fn delete(&self, _id: &str) -> Result<(), StoreError> {
        Err(self.error.clone())
    }
}

pub(super) fn board_with_failing_applications(error: StoreError) -> JobBoard {
    let mut store = store();
    store.applications = Arc::new(FailingApplications { error });
    JobBoard::new(store, Arc::new(MemoryAuthProvider::new(PROJECT_KEY)))
}

/// Auth provider that records how often it was reached.
pub(super) struct CountingAuth {
    inner: MemoryAuthProvider,
    pub(super) calls: AtomicUsize,
}

impl CountingAuth {
    pub(super) fn new() -> Self {
        Self {
            inner: MemoryAuthProvider::new(PROJECT_KEY),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl AuthProvider for CountingAuth {
    fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        self.hit();
        self.inner.sign_up(email, password)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.hit();
        self.inner.sign_in(email, password)
    }

    fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.hit();
        self.inner.sign_out(access_token)
    }

    fn session(&self, access_token: &str) -> Result<Option<Session>, AuthError> {
        self.hit();
        self.inner.session(access_token)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.subscribe()
    }
}

pub(super) fn bearer(ctx: &SessionContext) -> String {
    let token = &ctx.session().expect("signed in").access_token;
    format!("Bearer {token}")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
