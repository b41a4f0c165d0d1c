use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    Application, ApplicationId, Interview, InterviewId, InterviewStatus, InterviewType, Job,
};
use super::identity::SessionContext;
use super::validation::Validate;
use super::workflow::check_transition;
use super::ServiceError;
use crate::store::{Order, Query, Store};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewDraft {
    pub application_id: ApplicationId,
    pub interview_type: InterviewType,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

pub const DEFAULT_DURATION_MINUTES: u32 = 60;

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewStatusUpdate {
    pub status: InterviewStatus,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Interviews attached to applications. Only the poster of the application's job manages
/// them, and the caller scheduling one becomes the interviewer. An application carries at
/// most one interview that has not been cancelled; later dates go through `Rescheduled`.
#[derive(Clone)]
pub struct InterviewService {
    store: Store,
}

impl InterviewService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn schedule(
        &self,
        ctx: &SessionContext,
        draft: InterviewDraft,
    ) -> Result<Interview, ServiceError> {
        let interviewer_id = ctx.require_user()?.clone();
        draft.validate()?;
        self.managed_application(ctx, &draft.application_id)?;

        let existing = self.list_for_application(&draft.application_id)?;
        if existing
            .iter()
            .any(|interview| interview.status != InterviewStatus::Cancelled)
        {
            warn!(application_id = %draft.application_id, "interview refused: one already booked");
            return Err(ServiceError::InterviewExists(draft.application_id));
        }

        let interview = Interview {
            id: InterviewId::generate(),
            application_id: draft.application_id,
            interview_type: draft.interview_type,
            scheduled_at: draft.scheduled_at,
            duration_minutes: draft.duration_minutes,
            interviewer_id,
            status: InterviewStatus::Scheduled,
            notes: draft.notes,
            feedback: None,
            created_at: self.store.now(),
        };

        let stored = self.store.interviews.insert(interview)?;
        info!(
            interview_id = %stored.id,
            application_id = %stored.application_id,
            scheduled_at = %stored.scheduled_at,
            "interview scheduled"
        );
        Ok(stored)
    }

    pub fn list_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Interview>, ServiceError> {
        Ok(self.store.interviews.select(
            &Query::new()
                .eq("application_id", application_id)
                .order_by(Order::asc("scheduled_at")),
        )?)
    }

    pub fn update_status(
        &self,
        ctx: &SessionContext,
        id: &InterviewId,
        update: InterviewStatusUpdate,
    ) -> Result<Interview, ServiceError> {
        let current = self
            .store
            .interviews
            .single(&Query::new().eq("id", id))
            .map_err(ServiceError::missing("interview", id.as_str()))?;
        self.managed_application(ctx, &current.application_id)?;
        check_transition(current.status, update.status)?;

        let updated = self
            .store
            .interviews
            .update(id.as_str(), &mut |row: &mut Interview| {
                row.status = update.status;
                if update.feedback.is_some() {
                    row.feedback = update.feedback.clone();
                }
            })
            .map_err(ServiceError::missing("interview", id.as_str()))?;
        info!(interview_id = %id, status = %updated.status, "interview status updated");
        Ok(updated)
    }

    /// The application, provided the caller posted the job it targets.
    fn managed_application(
        &self,
        ctx: &SessionContext,
        id: &ApplicationId,
    ) -> Result<Application, ServiceError> {
        let user_id = ctx.require_user()?;
        let application = self
            .store
            .applications
            .single(&Query::new().eq("id", id))
            .map_err(ServiceError::missing("application", id.as_str()))?;
        let job: Job = self
            .store
            .jobs
            .single(&Query::new().eq("id", &application.job_id))
            .map_err(ServiceError::missing("job", application.job_id.as_str()))?;
        if job.posted_by != *user_id {
            warn!(application_id = %id, %user_id, "interview change refused: not the poster");
            return Err(ServiceError::Forbidden(
                "only the job's poster can manage interviews".to_string(),
            ));
        }
        Ok(application)
    }
}
