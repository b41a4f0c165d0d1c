use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use super::domain::{
    Company, CompanyId, EmploymentType, ExperienceLevel, Job, JobDetail, JobId, JobListing,
    JobStatus,
};
use super::form::{JobForm, JobFormAction};
use super::identity::SessionContext;
use super::validation::Validate;
use super::workflow::check_transition;
use super::ServiceError;
use crate::store::{contains_pattern, Filter, Order, Query, Store};

/// Fields supplied when a job is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDraft {
    pub title: String,
    pub company_id: CompanyId,
    pub description: String,
    pub requirements: String,
    pub location: String,
    #[serde(default)]
    pub remote_allowed: bool,
    #[serde(default = "default_employment_type")]
    pub employment_type: EmploymentType,
    #[serde(default = "default_experience_level")]
    pub experience_level: ExperienceLevel,
    #[serde(default)]
    pub salary_min: Option<f64>,
    #[serde(default)]
    pub salary_max: Option<f64>,
    #[serde(default = "default_status")]
    pub status: JobStatus,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

fn default_employment_type() -> EmploymentType {
    EmploymentType::FullTime
}

fn default_experience_level() -> ExperienceLevel {
    ExperienceLevel::Mid
}

fn default_status() -> JobStatus {
    JobStatus::Draft
}

/// Partial job update. Nullable columns use a nested option so an explicit `null` clears
/// them while an absent key leaves them alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobPatch {
    pub title: Option<String>,
    pub company_id: Option<CompanyId>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub remote_allowed: Option<bool>,
    pub employment_type: Option<EmploymentType>,
    pub experience_level: Option<ExperienceLevel>,
    #[serde(deserialize_with = "double_option")]
    pub salary_min: Option<Option<f64>>,
    #[serde(deserialize_with = "double_option")]
    pub salary_max: Option<Option<f64>>,
    pub status: Option<JobStatus>,
    #[serde(deserialize_with = "double_option")]
    pub deadline: Option<Option<DateTime<Utc>>>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    fn apply(&self, job: &mut Job) {
        if let Some(title) = &self.title {
            job.title = title.trim().to_string();
        }
        if let Some(company_id) = &self.company_id {
            job.company_id = company_id.clone();
        }
        if let Some(description) = &self.description {
            job.description = description.clone();
        }
        if let Some(requirements) = &self.requirements {
            job.requirements = requirements.clone();
        }
        if let Some(location) = &self.location {
            job.location = location.trim().to_string();
        }
        if let Some(remote_allowed) = self.remote_allowed {
            job.remote_allowed = remote_allowed;
        }
        if let Some(employment_type) = self.employment_type {
            job.employment_type = employment_type;
        }
        if let Some(experience_level) = self.experience_level {
            job.experience_level = experience_level;
        }
        if let Some(salary_min) = self.salary_min {
            job.salary_min = salary_min;
        }
        if let Some(salary_max) = self.salary_max {
            job.salary_max = salary_max;
        }
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(deadline) = self.deadline {
            job.deadline = deadline;
        }
    }
}

/// Optional narrowing applied on top of the public `status = active` listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobFilters {
    pub search: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub experience_level: Option<ExperienceLevel>,
    pub remote_allowed: Option<bool>,
    pub company_id: Option<CompanyId>,
}

impl JobFilters {
    fn query(&self) -> Query {
        let mut query = Query::new().eq("status", JobStatus::Active);

        if let Some(search) = non_blank(&self.search) {
            let pattern = contains_pattern(search);
            query = query.or(vec![
                Filter::ILike("title".to_string(), pattern.clone()),
                Filter::ILike("description".to_string(), pattern),
            ]);
        }
        if let Some(location) = non_blank(&self.location) {
            query = query.ilike("location", contains_pattern(location));
        }
        if let Some(employment_type) = self.employment_type {
            query = query.eq("employment_type", employment_type);
        }
        if let Some(experience_level) = self.experience_level {
            query = query.eq("experience_level", experience_level);
        }
        if let Some(remote_allowed) = self.remote_allowed {
            query = query.eq("remote_allowed", remote_allowed);
        }
        if let Some(company_id) = &self.company_id {
            query = query.eq("company_id", company_id);
        }

        query.order_by(Order::desc("created_at"))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Job reads and writes. Reads join companies and counts with separate queries.
#[derive(Clone)]
pub struct JobService {
    store: Store,
}

impl JobService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Active jobs, newest first, with company and application count.
    pub fn list(&self, filters: &JobFilters) -> Result<Vec<JobListing>, ServiceError> {
        debug!(?filters, "listing active jobs");
        let jobs = self.store.jobs.select(&filters.query())?;
        self.listings(jobs)
    }

    /// Every job posted by the caller, regardless of status.
    pub fn list_mine(&self, ctx: &SessionContext) -> Result<Vec<JobListing>, ServiceError> {
        let user_id = ctx.require_user()?;
        let jobs = self.store.jobs.select(
            &Query::new()
                .eq("posted_by", user_id)
                .order_by(Order::desc("created_at")),
        )?;
        self.listings(jobs)
    }

    pub fn get(&self, id: &JobId) -> Result<Job, ServiceError> {
        self.store
            .jobs
            .single(&Query::new().eq("id", id))
            .map_err(ServiceError::missing("job", id.as_str()))
    }

    pub fn get_by_id(&self, id: &JobId) -> Result<JobDetail, ServiceError> {
        let job = self.get(id)?;
        let company = self.company(&job.company_id)?;
        let posted_by_profile = self
            .store
            .profiles
            .select(&Query::new().eq("user_id", &job.posted_by))?
            .into_iter()
            .next();

        Ok(JobDetail {
            job,
            company,
            posted_by_profile,
        })
    }

    pub fn create(&self, ctx: &SessionContext, draft: JobDraft) -> Result<Job, ServiceError> {
        let posted_by = ctx.require_user()?.clone();
        let now = self.store.now();
        let job = Job {
            id: JobId::generate(),
            title: draft.title.trim().to_string(),
            company_id: draft.company_id,
            description: draft.description,
            requirements: draft.requirements,
            location: draft.location.trim().to_string(),
            remote_allowed: draft.remote_allowed,
            employment_type: draft.employment_type,
            experience_level: draft.experience_level,
            salary_min: draft.salary_min,
            salary_max: draft.salary_max,
            status: draft.status,
            posted_by,
            deadline: draft.deadline,
            created_at: now,
            updated_at: now,
        };
        if let Err(err) = job.validate() {
            warn!(title = %job.title, "job rejected: {err}");
            return Err(err.into());
        }

        let stored = self.store.jobs.insert(job)?;
        info!(job_id = %stored.id, status = %stored.status, "job created");
        Ok(stored)
    }

    /// Merges `patch` into the stored row. The merged row is validated and its status
    /// change checked before anything is written; `updated_at` is always refreshed.
    pub fn update(
        &self,
        ctx: &SessionContext,
        id: &JobId,
        patch: JobPatch,
    ) -> Result<Job, ServiceError> {
        let current = self.owned(ctx, id)?;
        let mut candidate = current.clone();
        patch.apply(&mut candidate);
        candidate.validate()?;
        check_transition(current.status, candidate.status)?;

        let now = self.store.now();
        let updated = self
            .store
            .jobs
            .update(id.as_str(), &mut |row: &mut Job| {
                patch.apply(row);
                row.updated_at = now;
            })
            .map_err(ServiceError::missing("job", id.as_str()))?;
        info!(job_id = %id, status = %updated.status, "job updated");
        Ok(updated)
    }

    pub fn delete(&self, ctx: &SessionContext, id: &JobId) -> Result<(), ServiceError> {
        self.owned(ctx, id)?;
        self.store
            .jobs
            .delete(id.as_str())
            .map_err(ServiceError::missing("job", id.as_str()))?;
        info!(job_id = %id, "job deleted");
        Ok(())
    }

    /// Applies a submitted job form as a create or an update.
    pub fn save_form(&self, ctx: &SessionContext, form: &JobForm) -> Result<Job, ServiceError> {
        ctx.require_user()?;
        match form.submit()? {
            JobFormAction::Create(draft) => self.create(ctx, draft),
            JobFormAction::Update(id, patch) => self.update(ctx, &id, patch),
        }
    }

    /// The job, provided the caller posted it.
    pub(crate) fn owned(&self, ctx: &SessionContext, id: &JobId) -> Result<Job, ServiceError> {
        let user_id = ctx.require_user()?;
        let job = self.get(id)?;
        if job.posted_by != *user_id {
            warn!(job_id = %id, %user_id, "job change refused: not the poster");
            return Err(ServiceError::Forbidden(
                "only the poster can change a job".to_string(),
            ));
        }
        Ok(job)
    }

    fn company(&self, id: &CompanyId) -> Result<Option<Company>, ServiceError> {
        Ok(self
            .store
            .companies
            .select(&Query::new().eq("id", id))?
            .into_iter()
            .next())
    }

    fn listings(&self, jobs: Vec<Job>) -> Result<Vec<JobListing>, ServiceError> {
        let mut companies: HashMap<CompanyId, Option<Company>> = HashMap::new();
        let mut listings = Vec::with_capacity(jobs.len());

        for job in jobs {
            let company = match companies.get(&job.company_id) {
                Some(company) => company.clone(),
                None => {
                    let company = self.company(&job.company_id)?;
                    companies.insert(job.company_id.clone(), company.clone());
                    company
                }
            };
            let applications_count = self
                .store
                .applications
                .count(&Query::new().eq("job_id", &job.id))?;

            listings.push(JobListing {
                job,
                company,
                applications_count,
            });
        }

        Ok(listings)
    }
}
