use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationWithJob, Company, CompanyId, Job,
    JobId, JobStatus, JobWithCompany, ReceivedApplication, UserId,
};
use super::identity::SessionContext;
use super::workflow::check_transition;
use super::ServiceError;
use crate::store::{Order, Query, Store, StoreError};

/// Application body as posted by a candidate.
///
/// `applicant_id` is accepted for wire compatibility but never used: the applicant is
/// always the session's user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub job_id: JobId,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub applicant_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: ApplicationStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct ApplicationService {
    store: Store,
}

impl ApplicationService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn get(&self, id: &ApplicationId) -> Result<Application, ServiceError> {
        self.store
            .applications
            .single(&Query::new().eq("id", id))
            .map_err(ServiceError::missing("application", id.as_str()))
    }

    /// The caller's applications, newest first, each with its job and company.
    pub fn list_mine(
        &self,
        ctx: &SessionContext,
    ) -> Result<Vec<ApplicationWithJob>, ServiceError> {
        let user_id = ctx.require_user()?;
        let applications = self.store.applications.select(
            &Query::new()
                .eq("applicant_id", user_id)
                .order_by(Order::desc("applied_at")),
        )?;

        let job_ids: Vec<&JobId> = applications.iter().map(|app| &app.job_id).collect();
        let jobs = self.jobs_with_companies(&job_ids)?;

        Ok(applications
            .into_iter()
            .map(|application| {
                let job = jobs.get(&application.job_id).cloned();
                ApplicationWithJob { application, job }
            })
            .collect())
    }

    /// Applications on jobs the caller posted. Applications whose job cannot be joined
    /// are dropped, matching an inner join.
    pub fn list_for_my_jobs(
        &self,
        ctx: &SessionContext,
    ) -> Result<Vec<ReceivedApplication>, ServiceError> {
        let user_id = ctx.require_user()?;
        let jobs = self
            .store
            .jobs
            .select(&Query::new().eq("posted_by", user_id))?;
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let applications = self.store.applications.select(
            &Query::new()
                .is_in("job_id", jobs.iter().map(|job| &job.id))
                .order_by(Order::desc("applied_at")),
        )?;

        let companies = self.companies(jobs.iter().map(|job| &job.company_id))?;
        let jobs: HashMap<JobId, JobWithCompany> = jobs
            .into_iter()
            .map(|job| {
                let company = companies.get(&job.company_id).cloned();
                (job.id.clone(), JobWithCompany { job, company })
            })
            .collect();

        let applicant_ids: Vec<&UserId> =
            applications.iter().map(|app| &app.applicant_id).collect();
        let applicants: HashMap<UserId, _> = if applicant_ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .profiles
                .select(&Query::new().is_in("user_id", applicant_ids))?
                .into_iter()
                .map(|profile| (profile.user_id.clone(), profile))
                .collect()
        };

        Ok(applications
            .into_iter()
            .filter_map(|application| {
                let job = jobs.get(&application.job_id)?.clone();
                let applicant = applicants.get(&application.applicant_id).cloned();
                Some(ReceivedApplication {
                    application,
                    job,
                    applicant,
                })
            })
            .collect())
    }

    /// Creates a pending application for the session's user on an active job.
    pub fn create(
        &self,
        ctx: &SessionContext,
        request: NewApplication,
    ) -> Result<Application, ServiceError> {
        let applicant_id = ctx.require_user()?.clone();
        if let Some(claimed) = &request.applicant_id {
            if *claimed != applicant_id {
                debug!(%claimed, %applicant_id, "ignoring caller-supplied applicant id");
            }
        }

        let job = self
            .store
            .jobs
            .single(&Query::new().eq("id", &request.job_id))
            .map_err(ServiceError::missing("job", request.job_id.as_str()))?;
        if job.status != JobStatus::Active {
            warn!(job_id = %job.id, status = %job.status, "application refused: job not open");
            return Err(ServiceError::JobNotOpen(job.id));
        }
        if self.has_applied(&job.id, &applicant_id)? {
            warn!(job_id = %job.id, %applicant_id, "application refused: already applied");
            return Err(ServiceError::AlreadyApplied(job.id));
        }

        let now = self.store.now();
        let application = Application {
            id: ApplicationId::generate(),
            job_id: job.id,
            applicant_id,
            cover_letter: request.cover_letter,
            resume_url: request.resume_url,
            status: ApplicationStatus::Pending,
            notes: None,
            applied_at: now,
            updated_at: now,
        };

        let stored = self.store.applications.insert(application)?;
        info!(application_id = %stored.id, job_id = %stored.job_id, "application submitted");
        Ok(stored)
    }

    /// Moves an application along the status table on behalf of the job's poster.
    /// Re-asserting the current status is accepted and still refreshes `updated_at`.
    pub fn update_status(
        &self,
        ctx: &SessionContext,
        id: &ApplicationId,
        update: StatusUpdate,
    ) -> Result<Application, ServiceError> {
        let current = self.reviewed_by(ctx, id)?;
        self.write_status(current, update)
    }

    /// The application, provided the caller posted the job it targets.
    pub(crate) fn reviewed_by(
        &self,
        ctx: &SessionContext,
        id: &ApplicationId,
    ) -> Result<Application, ServiceError> {
        let user_id = ctx.require_user()?;
        let application = self.get(id)?;
        let job = self
            .store
            .jobs
            .single(&Query::new().eq("id", &application.job_id))
            .map_err(ServiceError::missing("job", application.job_id.as_str()))?;
        if job.posted_by != *user_id {
            warn!(application_id = %id, %user_id, "application change refused: not the poster");
            return Err(ServiceError::Forbidden(
                "only the job's poster can manage its applications".to_string(),
            ));
        }
        Ok(application)
    }

    fn write_status(
        &self,
        current: Application,
        update: StatusUpdate,
    ) -> Result<Application, ServiceError> {
        let id = &current.id;
        check_transition(current.status, update.status)?;

        let now = self.store.now();
        let updated = self
            .store
            .applications
            .update(id.as_str(), &mut |row: &mut Application| {
                row.status = update.status;
                if update.notes.is_some() {
                    row.notes = update.notes.clone();
                }
                row.updated_at = now;
            })
            .map_err(ServiceError::missing("application", id.as_str()))?;
        info!(application_id = %id, status = %updated.status, "application status updated");
        Ok(updated)
    }

    /// Point lookup for an existing application. "No rows" means no and duplicate rows
    /// left by a racing insert still mean yes; every other store failure is returned.
    pub fn has_applied(&self, job_id: &JobId, user_id: &UserId) -> Result<bool, ServiceError> {
        let query = Query::new()
            .eq("job_id", job_id)
            .eq("applicant_id", user_id);
        match self.store.applications.single(&query) {
            Ok(_) => Ok(true),
            Err(StoreError::NoRows) => Ok(false),
            Err(StoreError::MultipleRows(rows)) => {
                warn!(%job_id, %user_id, rows, "duplicate applications found");
                Ok(true)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Withdraws the caller's own application.
    pub fn withdraw(
        &self,
        ctx: &SessionContext,
        id: &ApplicationId,
    ) -> Result<Application, ServiceError> {
        let user_id = ctx.require_user()?;
        let application = self.get(id)?;
        if application.applicant_id != *user_id {
            warn!(application_id = %id, %user_id, "withdraw refused: not the applicant");
            return Err(ServiceError::Forbidden(
                "only the applicant can withdraw an application".to_string(),
            ));
        }

        self.write_status(
            application,
            StatusUpdate {
                status: ApplicationStatus::Withdrawn,
                notes: None,
            },
        )
    }

    fn jobs_with_companies(
        &self,
        job_ids: &[&JobId],
    ) -> Result<HashMap<JobId, JobWithCompany>, ServiceError> {
        if job_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let jobs: Vec<Job> = self
            .store
            .jobs
            .select(&Query::new().is_in("id", job_ids.iter().copied()))?;
        let companies = self.companies(jobs.iter().map(|job| &job.company_id))?;

        Ok(jobs
            .into_iter()
            .map(|job| {
                let company = companies.get(&job.company_id).cloned();
                (job.id.clone(), JobWithCompany { job, company })
            })
            .collect())
    }

    fn companies<'a>(
        &self,
        ids: impl Iterator<Item = &'a CompanyId>,
    ) -> Result<HashMap<CompanyId, Company>, ServiceError> {
        let ids: Vec<&CompanyId> = ids.collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .store
            .companies
            .select(&Query::new().is_in("id", ids))?
            .into_iter()
            .map(|company| (company.id.clone(), company))
            .collect())
    }
}
