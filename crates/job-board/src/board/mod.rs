//! Job board services: companies, jobs, applications, interviews and identity.
//!
//! Every service is a thin wrapper over [`Store`] tables that composes one filtered read or
//! one single-row write per call. Identity is never ambient: callers thread an explicit
//! [`SessionContext`] through every operation that needs one.

pub mod applications;
pub mod companies;
pub mod dashboard;
pub mod domain;
pub mod form;
pub mod identity;
pub mod import;
pub mod interviews;
pub mod jobs;
pub mod router;
pub mod validation;
pub mod workflow;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::store::{Store, StoreError};

pub use applications::{ApplicationService, NewApplication, StatusUpdate};
pub use companies::{CompanyDraft, CompanyPatch, CompanyService};
pub use dashboard::{
    CandidateDashboard, CandidateStats, DashboardError, EmployerDashboard, EmployerStats,
};
pub use domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationWithJob, Company, CompanyId,
    EmploymentType, ExperienceLevel, Interview, InterviewId, InterviewStatus, InterviewType, Job,
    JobDetail, JobId, JobListing, JobStatus, JobWithCompany, ReceivedApplication, UserId,
    UserProfile, UserType,
};
pub use form::{FormError, JobForm, JobFormAction};
pub use identity::{
    AuthError, AuthEvent, AuthProvider, AuthUser, IdentityService, MemoryAuthProvider,
    ProfileAttributes, ProfilePatch, Registration, Session, SessionContext,
};
pub use import::{ImportError, ImportSummary, JobCsvImporter};
pub use interviews::{InterviewDraft, InterviewService, InterviewStatusUpdate};
pub use jobs::{JobDraft, JobFilters, JobPatch, JobService};
pub use router::board_router;
pub use validation::{FieldError, Validate, ValidationError};
pub use workflow::{InvalidTransition, StatusMachine};

/// Error raised by the board services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("already applied to job {0}")]
    AlreadyApplied(JobId),
    #[error("job {0} is not accepting applications")]
    JobNotOpen(JobId),
    #[error("application {0} already has an interview")]
    InterviewExists(ApplicationId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Maps a single-row miss to `NotFound` for the given entity, leaving other store
    /// failures untouched.
    pub(crate) fn missing(entity: &'static str, id: &str) -> impl FnOnce(StoreError) -> Self {
        let id = id.to_string();
        move |err| match err {
            StoreError::NoRows | StoreError::NotFound(_) => ServiceError::NotFound { entity, id },
            other => ServiceError::Store(other),
        }
    }
}

/// All services over one store and one auth provider.
#[derive(Clone)]
pub struct JobBoard {
    pub store: Store,
    pub identity: IdentityService,
    pub companies: CompanyService,
    pub jobs: JobService,
    pub applications: ApplicationService,
    pub interviews: InterviewService,
}

impl JobBoard {
    pub fn new(store: Store, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            identity: IdentityService::new(store.clone(), auth),
            companies: CompanyService::new(store.clone()),
            jobs: JobService::new(store.clone()),
            applications: ApplicationService::new(store.clone()),
            interviews: InterviewService::new(store.clone()),
            store,
        }
    }

    /// In-memory store plus in-memory auth keyed by `project_key`.
    pub fn in_memory(project_key: &str) -> Self {
        Self::new(
            Store::in_memory(),
            Arc::new(MemoryAuthProvider::new(project_key)),
        )
    }
}
