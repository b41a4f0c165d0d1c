//! Field checks applied before any write reaches the store.

use std::fmt;

use serde::Serialize;

use super::domain::{Company, Job, UserProfile, UserType};
use super::identity::Registration;
use super::interviews::InterviewDraft;

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_EXPERIENCE_YEARS: u32 = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// One or more rejected fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError {
                field,
                message: message.into(),
            }],
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self
            .errors
            .iter()
            .map(|error| error.message.as_str())
            .collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationError {}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

#[derive(Default)]
struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    fn check(&mut self, field: &'static str, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(FieldError {
                field,
                message: message.into(),
            });
        }
        self
    }

    fn required(&mut self, field: &'static str, value: &str) -> &mut Self {
        self.check(
            field,
            !value.trim().is_empty(),
            format!("{field} is required"),
        )
    }

    fn amount(&mut self, field: &'static str, value: Option<f64>) -> &mut Self {
        match value {
            Some(amount) => self.check(
                field,
                amount.is_finite() && amount >= 0.0,
                format!("{field} must be a non-negative number"),
            ),
            None => self,
        }
    }

    fn finish(&mut self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                errors: std::mem::take(&mut self.errors),
            })
        }
    }
}

impl Validate for Job {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut checks = Checks::default();
        checks
            .required("title", &self.title)
            .required("company_id", self.company_id.as_str())
            .required("description", &self.description)
            .required("requirements", &self.requirements)
            .required("location", &self.location)
            .amount("salary_min", self.salary_min)
            .amount("salary_max", self.salary_max);

        if let (Some(min), Some(max)) = (self.salary_min, self.salary_max) {
            checks.check(
                "salary_max",
                min <= max,
                "salary_min must not exceed salary_max",
            );
        }

        checks.finish()
    }
}

impl Validate for Company {
    fn validate(&self) -> Result<(), ValidationError> {
        Checks::default().required("name", &self.name).finish()
    }
}

impl Validate for UserProfile {
    fn validate(&self) -> Result<(), ValidationError> {
        Checks::default()
            .required("first_name", &self.first_name)
            .required("last_name", &self.last_name)
            .check(
                "experience_years",
                self.experience_years <= MAX_EXPERIENCE_YEARS,
                format!("experience_years must be at most {MAX_EXPERIENCE_YEARS}"),
            )
            .finish()
    }
}

impl Validate for Registration {
    fn validate(&self) -> Result<(), ValidationError> {
        Checks::default()
            .check(
                "email",
                self.email.contains('@'),
                "Email address is invalid",
            )
            .required("first_name", &self.first_name)
            .required("last_name", &self.last_name)
            .check(
                "user_type",
                self.user_type != UserType::Admin,
                "Only candidate or employer accounts can register",
            )
            .check(
                "password_confirm",
                self.password == self.password_confirm,
                "Passwords do not match",
            )
            .check(
                "password",
                self.password.chars().count() >= MIN_PASSWORD_LENGTH,
                format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
            )
            .finish()
    }
}

impl Validate for InterviewDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        Checks::default()
            .check(
                "duration_minutes",
                self.duration_minutes > 0,
                "duration_minutes must be positive",
            )
            .finish()
    }
}
