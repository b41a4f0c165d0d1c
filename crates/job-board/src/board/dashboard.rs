//! Candidate and employer dashboards.
//!
//! A dashboard is a request-scoped snapshot: every action runs one mutation and then
//! reloads the whole view from the store.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::applications::StatusUpdate;
use super::domain::{
    ApplicationId, ApplicationStatus, ApplicationWithJob, Company, Job, JobId, JobListing,
    JobStatus, ReceivedApplication,
};
use super::form::JobForm;
use super::identity::SessionContext;
use super::{JobBoard, ServiceError};

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("create a company before posting jobs")]
    NoCompanies,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

fn count_by_status(
    statuses: impl Iterator<Item = ApplicationStatus>,
) -> BTreeMap<ApplicationStatus, usize> {
    let mut counts = BTreeMap::new();
    for status in statuses {
        *counts.entry(status).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandidateStats {
    pub total: usize,
    pub reviewing: usize,
    pub interviews: usize,
    pub hired: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateDashboard {
    pub applications: Vec<ApplicationWithJob>,
    pub stats: CandidateStats,
    pub by_status: BTreeMap<ApplicationStatus, usize>,
}

impl CandidateDashboard {
    pub fn load(board: &JobBoard, ctx: &SessionContext) -> Result<Self, DashboardError> {
        let applications = board.applications.list_mine(ctx)?;
        let by_status = count_by_status(applications.iter().map(|row| row.application.status));
        let count = |status: ApplicationStatus| by_status.get(&status).copied().unwrap_or(0);
        let stats = CandidateStats {
            total: applications.len(),
            reviewing: count(ApplicationStatus::Reviewing),
            interviews: count(ApplicationStatus::Interview),
            hired: count(ApplicationStatus::Hired),
        };
        debug!(total = stats.total, "candidate dashboard loaded");

        Ok(Self {
            applications,
            stats,
            by_status,
        })
    }

    pub fn with_status(&self, status: ApplicationStatus) -> Vec<&ApplicationWithJob> {
        self.applications
            .iter()
            .filter(|row| row.application.status == status)
            .collect()
    }

    pub fn withdraw(
        board: &JobBoard,
        ctx: &SessionContext,
        id: &ApplicationId,
    ) -> Result<Self, DashboardError> {
        board.applications.withdraw(ctx, id)?;
        Self::load(board, ctx)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmployerStats {
    pub active_jobs: usize,
    pub total_applications: usize,
    pub pending_review: usize,
    pub hired: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployerDashboard {
    pub companies: Vec<Company>,
    pub jobs: Vec<JobListing>,
    pub applications: Vec<ReceivedApplication>,
    pub stats: EmployerStats,
    pub by_status: BTreeMap<ApplicationStatus, usize>,
}

impl EmployerDashboard {
    pub fn load(board: &JobBoard, ctx: &SessionContext) -> Result<Self, DashboardError> {
        let companies = board.companies.list_mine(ctx)?;
        let jobs = board.jobs.list_mine(ctx)?;
        let applications = board.applications.list_for_my_jobs(ctx)?;

        let by_status = count_by_status(applications.iter().map(|row| row.application.status));
        let count = |status: ApplicationStatus| by_status.get(&status).copied().unwrap_or(0);
        let stats = EmployerStats {
            active_jobs: jobs
                .iter()
                .filter(|listing| listing.job.status == JobStatus::Active)
                .count(),
            total_applications: applications.len(),
            pending_review: count(ApplicationStatus::Pending),
            hired: count(ApplicationStatus::Hired),
        };
        debug!(
            jobs = jobs.len(),
            applications = stats.total_applications,
            "employer dashboard loaded"
        );

        Ok(Self {
            companies,
            jobs,
            applications,
            stats,
            by_status,
        })
    }

    /// Form for a new job, or for editing `job`. Employers without a company cannot post.
    pub fn open_job_form(&self, job: Option<&Job>) -> Result<JobForm, DashboardError> {
        let Some(first) = self.companies.first() else {
            return Err(DashboardError::NoCompanies);
        };
        Ok(match job {
            Some(job) => JobForm::edit(job),
            None => JobForm {
                company_id: first.id.to_string(),
                ..JobForm::new()
            },
        })
    }

    pub fn delete_job(
        board: &JobBoard,
        ctx: &SessionContext,
        id: &JobId,
    ) -> Result<Self, DashboardError> {
        board.jobs.delete(ctx, id)?;
        Self::load(board, ctx)
    }

    pub fn update_application_status(
        board: &JobBoard,
        ctx: &SessionContext,
        id: &ApplicationId,
        update: StatusUpdate,
    ) -> Result<Self, DashboardError> {
        board.applications.update_status(ctx, id, update)?;
        Self::load(board, ctx)
    }

    pub fn submit_job_form(
        board: &JobBoard,
        ctx: &SessionContext,
        form: &JobForm,
    ) -> Result<Self, DashboardError> {
        board.jobs.save_form(ctx, form)?;
        Self::load(board, ctx)
    }
}
