use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Record, Value};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<&$name> for Value {
            fn from(value: &$name) -> Self {
                Value::Text(value.0.clone())
            }
        }
    };
}

string_id!(
    /// Identity issued by the auth provider; profiles, companies and jobs point at it.
    UserId
);
string_id!(ProfileId);
string_id!(CompanyId);
string_id!(JobId);
string_id!(ApplicationId);
string_id!(InterviewId);

/// Error for labels that do not name a variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{value}` is not a valid {kind}")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])* $name:ident, $kind:literal
        { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = UnknownLabel;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim() {
                    $($label => Ok($name::$variant),)+
                    other => Err(UnknownLabel {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl From<$name> for Value {
            fn from(value: $name) -> Self {
                Value::Text(value.label().to_string())
            }
        }
    };
}

labelled_enum!(
    /// Role carried by a profile.
    UserType, "user type" {
        Candidate => "candidate",
        Employer => "employer",
        Admin => "admin",
    }
);

labelled_enum!(EmploymentType, "employment type" {
    FullTime => "full_time",
    PartTime => "part_time",
    Contract => "contract",
    Internship => "internship",
    Freelance => "freelance",
});

labelled_enum!(ExperienceLevel, "experience level" {
    Entry => "entry",
    Mid => "mid",
    Senior => "senior",
    Lead => "lead",
    Executive => "executive",
});

labelled_enum!(
    /// Publication state of a job. Only `active` jobs are listed publicly.
    JobStatus, "job status" {
        Draft => "draft",
        Active => "active",
        Paused => "paused",
        Closed => "closed",
    }
);

labelled_enum!(
    /// Review state of an application.
    ApplicationStatus, "application status" {
        Pending => "pending",
        Reviewing => "reviewing",
        Interview => "interview",
        Rejected => "rejected",
        Hired => "hired",
        Withdrawn => "withdrawn",
    }
);

labelled_enum!(InterviewType, "interview type" {
    Phone => "phone",
    Video => "video",
    InPerson => "in_person",
    Technical => "technical",
});

labelled_enum!(InterviewStatus, "interview status" {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
    Rescheduled => "rescheduled",
});

/// Role-bearing identity record, one per auth account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub profile_picture_url: Option<String>,
    pub resume_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub skills: Option<String>,
    pub experience_years: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Record for UserProfile {
    const TABLE: &'static str = "user_profiles";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn column(&self, name: &str) -> Option<Value> {
        let value: Value = match name {
            "id" => (&self.id).into(),
            "user_id" => (&self.user_id).into(),
            "user_type" => self.user_type.into(),
            "first_name" => self.first_name.clone().into(),
            "last_name" => self.last_name.clone().into(),
            "location" => self.location.clone().into(),
            "skills" => self.skills.clone().into(),
            "experience_years" => self.experience_years.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Company {
    const TABLE: &'static str = "companies";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn column(&self, name: &str) -> Option<Value> {
        let value: Value = match name {
            "id" => (&self.id).into(),
            "name" => self.name.clone().into(),
            "created_by" => (&self.created_by).into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub company_id: CompanyId,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub remote_allowed: bool,
    pub employment_type: EmploymentType,
    pub experience_level: ExperienceLevel,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub status: JobStatus,
    pub posted_by: UserId,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Job {
    const TABLE: &'static str = "jobs";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn column(&self, name: &str) -> Option<Value> {
        let value: Value = match name {
            "id" => (&self.id).into(),
            "title" => self.title.clone().into(),
            "company_id" => (&self.company_id).into(),
            "description" => self.description.clone().into(),
            "requirements" => self.requirements.clone().into(),
            "location" => self.location.clone().into(),
            "remote_allowed" => self.remote_allowed.into(),
            "employment_type" => self.employment_type.into(),
            "experience_level" => self.experience_level.into(),
            "salary_min" => self.salary_min.into(),
            "salary_max" => self.salary_max.into(),
            "status" => self.status.into(),
            "posted_by" => (&self.posted_by).into(),
            "deadline" => self.deadline.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub applicant_id: UserId,
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
    pub status: ApplicationStatus,
    pub notes: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Application {
    const TABLE: &'static str = "applications";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn column(&self, name: &str) -> Option<Value> {
        let value: Value = match name {
            "id" => (&self.id).into(),
            "job_id" => (&self.job_id).into(),
            "applicant_id" => (&self.applicant_id).into(),
            "status" => self.status.into(),
            "applied_at" => self.applied_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub id: InterviewId,
    pub application_id: ApplicationId,
    pub interview_type: InterviewType,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub interviewer_id: UserId,
    pub status: InterviewStatus,
    pub notes: Option<String>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for Interview {
    const TABLE: &'static str = "interviews";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn column(&self, name: &str) -> Option<Value> {
        let value: Value = match name {
            "id" => (&self.id).into(),
            "application_id" => (&self.application_id).into(),
            "interviewer_id" => (&self.interviewer_id).into(),
            "status" => self.status.into(),
            "scheduled_at" => self.scheduled_at.into(),
            "created_at" => self.created_at.into(),
            _ => return None,
        };
        Some(value)
    }
}

/// Job joined with its company and the read-time application count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobListing {
    #[serde(flatten)]
    pub job: Job,
    pub company: Option<Company>,
    pub applications_count: u64,
}

/// Single job joined with company and poster profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: Job,
    pub company: Option<Company>,
    pub posted_by_profile: Option<UserProfile>,
}

/// Job plus its company, nested under an application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobWithCompany {
    #[serde(flatten)]
    pub job: Job,
    pub company: Option<Company>,
}

/// A candidate's own application with the job it targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationWithJob {
    #[serde(flatten)]
    pub application: Application,
    pub job: Option<JobWithCompany>,
}

/// An application received on one of the caller's jobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceivedApplication {
    #[serde(flatten)]
    pub application: Application,
    pub job: JobWithCompany,
    pub applicant: Option<UserProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_from_str() {
        for status in ApplicationStatus::ALL {
            assert_eq!(status.label().parse::<ApplicationStatus>(), Ok(*status));
        }
        assert_eq!("in_person".parse::<InterviewType>(), Ok(InterviewType::InPerson));
    }

    #[test]
    fn unknown_labels_name_the_kind() {
        let err = "weekly".parse::<EmploymentType>().expect_err("invalid label");
        assert_eq!(err.to_string(), "`weekly` is not a valid employment type");
    }

    #[test]
    fn enums_serialize_as_snake_case() {
        let json = serde_json::to_string(&EmploymentType::FullTime).expect("serializes");
        assert_eq!(json, "\"full_time\"");
    }
}
