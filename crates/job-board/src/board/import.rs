//! Seeds jobs from a CSV export.
//!
//! Columns: `company,title,description,requirements,location,remote_allowed,
//! employment_type,experience_level,salary_min,salary_max,status,deadline`. Companies are
//! matched by name among the importing employer's own companies and created when missing.
//! Each row then goes through the regular job form path, so the usual coercion and
//! validation apply.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::companies::CompanyDraft;
use super::domain::{CompanyId, EmploymentType, ExperienceLevel, Job, JobStatus, UnknownLabel};
use super::form::JobForm;
use super::identity::SessionContext;
use super::{JobBoard, ServiceError};

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Label { line: usize, source: UnknownLabel },
    Service { line: usize, source: ServiceError },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read job export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid job CSV data: {}", err),
            ImportError::Label { line, source } => write!(f, "line {}: {}", line, source),
            ImportError::Service { line, source } => {
                write!(f, "line {}: could not import job: {}", line, source)
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::Label { source, .. } => Some(source),
            ImportError::Service { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct JobRow {
    company: String,
    title: String,
    description: String,
    requirements: String,
    location: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    remote_allowed: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    employment_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    experience_level: Option<String>,
    #[serde(default)]
    salary_min: String,
    #[serde(default)]
    salary_max: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    #[serde(default)]
    deadline: String,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_flag(value: Option<&str>) -> Result<bool, UnknownLabel> {
    match value.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
        None | Some("false" | "no" | "n" | "0") => Ok(false),
        Some("true" | "yes" | "y" | "1") => Ok(true),
        Some(other) => Err(UnknownLabel {
            kind: "remote flag",
            value: other.to_string(),
        }),
    }
}

impl JobRow {
    fn into_form(self, company_id: &CompanyId) -> Result<JobForm, UnknownLabel> {
        let defaults = JobForm::new();
        Ok(JobForm {
            editing: None,
            title: self.title,
            company_id: company_id.to_string(),
            description: self.description,
            requirements: self.requirements,
            location: self.location,
            remote_allowed: parse_flag(self.remote_allowed.as_deref())?,
            employment_type: match self.employment_type {
                Some(value) => value.parse::<EmploymentType>()?,
                None => defaults.employment_type,
            },
            experience_level: match self.experience_level {
                Some(value) => value.parse::<ExperienceLevel>()?,
                None => defaults.experience_level,
            },
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            status: match self.status {
                Some(value) => value.parse::<JobStatus>()?,
                None => defaults.status,
            },
            deadline: self.deadline,
        })
    }
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub companies_created: usize,
    pub jobs: Vec<Job>,
}

/// Imports job rows on behalf of the signed-in employer in `ctx`.
pub struct JobCsvImporter;

impl JobCsvImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        board: &JobBoard,
        ctx: &SessionContext,
    ) -> Result<ImportSummary, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, board, ctx)
    }

    /// Stops at the first failing row; rows before it stay imported.
    pub fn from_reader<R: Read>(
        reader: R,
        board: &JobBoard,
        ctx: &SessionContext,
    ) -> Result<ImportSummary, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut summary = ImportSummary::default();
        let mut companies: HashMap<String, CompanyId> = HashMap::new();

        for (index, row) in csv_reader.deserialize::<JobRow>().enumerate() {
            let line = index + 2;
            let row = row?;
            let service_error = |source: ServiceError| ImportError::Service { line, source };

            let company_name = row.company.trim().to_string();
            let company_id = match companies.get(&company_name) {
                Some(id) => id.clone(),
                None => {
                    let id = match board
                        .companies
                        .find_mine_by_name(ctx, &company_name)
                        .map_err(service_error)?
                    {
                        Some(company) => company.id,
                        None => {
                            let draft = CompanyDraft {
                                name: company_name.clone(),
                                ..CompanyDraft::default()
                            };
                            summary.companies_created += 1;
                            board.companies.create(ctx, draft).map_err(service_error)?.id
                        }
                    };
                    companies.insert(company_name, id.clone());
                    id
                }
            };

            let form = row
                .into_form(&company_id)
                .map_err(|source| ImportError::Label { line, source })?;
            let job = board.jobs.save_form(ctx, &form).map_err(service_error)?;
            summary.jobs.push(job);
        }

        info!(
            jobs = summary.jobs.len(),
            companies_created = summary.companies_created,
            "job csv imported"
        );
        Ok(summary)
    }
}
