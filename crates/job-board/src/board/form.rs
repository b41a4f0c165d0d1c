//! Uncommitted job form state and its submit-time coercion.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CompanyId, EmploymentType, ExperienceLevel, Job, JobId, JobStatus};
use super::jobs::{JobDraft, JobPatch};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{field} must be a number, got `{value}`")]
    InvalidAmount { field: &'static str, value: String },
    #[error("deadline must be YYYY-MM-DD or an RFC 3339 timestamp, got `{0}`")]
    InvalidDeadline(String),
}

/// What a submitted form turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum JobFormAction {
    Create(JobDraft),
    Update(JobId, JobPatch),
}

/// Job form fields as typed by the user. Salary and deadline stay raw text until submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobForm {
    pub editing: Option<JobId>,
    pub title: String,
    pub company_id: String,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub remote_allowed: bool,
    pub employment_type: EmploymentType,
    pub experience_level: ExperienceLevel,
    pub salary_min: String,
    pub salary_max: String,
    pub status: JobStatus,
    pub deadline: String,
}

impl Default for JobForm {
    fn default() -> Self {
        Self::new()
    }
}

impl JobForm {
    pub fn new() -> Self {
        Self {
            editing: None,
            title: String::new(),
            company_id: String::new(),
            description: String::new(),
            requirements: String::new(),
            location: String::new(),
            remote_allowed: false,
            employment_type: EmploymentType::FullTime,
            experience_level: ExperienceLevel::Mid,
            salary_min: String::new(),
            salary_max: String::new(),
            status: JobStatus::Draft,
            deadline: String::new(),
        }
    }

    /// Pre-fills the form from an existing job.
    pub fn edit(job: &Job) -> Self {
        Self {
            editing: Some(job.id.clone()),
            title: job.title.clone(),
            company_id: job.company_id.to_string(),
            description: job.description.clone(),
            requirements: job.requirements.clone(),
            location: job.location.clone(),
            remote_allowed: job.remote_allowed,
            employment_type: job.employment_type,
            experience_level: job.experience_level,
            salary_min: job.salary_min.map(|v| v.to_string()).unwrap_or_default(),
            salary_max: job.salary_max.map(|v| v.to_string()).unwrap_or_default(),
            status: job.status,
            deadline: job
                .deadline
                .map(|deadline| deadline.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// Coerces the optional fields and decides between create and update.
    pub fn submit(&self) -> Result<JobFormAction, FormError> {
        let salary_min = parse_amount("salary_min", &self.salary_min)?;
        let salary_max = parse_amount("salary_max", &self.salary_max)?;
        let deadline = parse_deadline(&self.deadline)?;
        let company_id = CompanyId::from(self.company_id.trim());

        let action = match &self.editing {
            None => JobFormAction::Create(JobDraft {
                title: self.title.clone(),
                company_id,
                description: self.description.clone(),
                requirements: self.requirements.clone(),
                location: self.location.clone(),
                remote_allowed: self.remote_allowed,
                employment_type: self.employment_type,
                experience_level: self.experience_level,
                salary_min,
                salary_max,
                status: self.status,
                deadline,
            }),
            Some(id) => JobFormAction::Update(
                id.clone(),
                JobPatch {
                    title: Some(self.title.clone()),
                    company_id: Some(company_id),
                    description: Some(self.description.clone()),
                    requirements: Some(self.requirements.clone()),
                    location: Some(self.location.clone()),
                    remote_allowed: Some(self.remote_allowed),
                    employment_type: Some(self.employment_type),
                    experience_level: Some(self.experience_level),
                    salary_min: Some(salary_min),
                    salary_max: Some(salary_max),
                    status: Some(self.status),
                    deadline: Some(deadline),
                },
            ),
        };
        Ok(action)
    }
}

fn parse_amount(field: &'static str, raw: &str) -> Result<Option<f64>, FormError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .map(Some)
        .ok_or_else(|| FormError::InvalidAmount {
            field,
            value: raw.to_string(),
        })
}

fn parse_deadline(raw: &str) -> Result<Option<DateTime<Utc>>, FormError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(Utc.from_utc_datetime(&midnight)));
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|deadline| Some(deadline.with_timezone(&Utc)))
        .map_err(|_| FormError::InvalidDeadline(raw.to_string()))
}
