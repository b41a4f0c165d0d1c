//! Declared status transition tables.
//!
//! Re-asserting the current status is always allowed so callers can refresh timestamps or
//! notes without moving the record.

use super::domain::{ApplicationStatus, InterviewStatus, JobStatus};

/// A status type with a declared transition table.
pub trait StatusMachine: Copy + Eq + 'static {
    const ENTITY: &'static str;

    fn name(self) -> &'static str;

    fn successors(self) -> &'static [Self];

    fn can_transition_to(self, next: Self) -> bool {
        self == next || self.successors().contains(&next)
    }

    fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }
}

impl StatusMachine for ApplicationStatus {
    const ENTITY: &'static str = "application";

    fn name(self) -> &'static str {
        self.label()
    }

    fn successors(self) -> &'static [Self] {
        use ApplicationStatus::*;
        match self {
            Pending => &[Reviewing, Interview, Rejected, Hired, Withdrawn],
            Reviewing => &[Pending, Interview, Rejected, Hired, Withdrawn],
            Interview => &[Reviewing, Rejected, Hired, Withdrawn],
            Rejected => &[Reviewing],
            Hired | Withdrawn => &[],
        }
    }
}

impl StatusMachine for JobStatus {
    const ENTITY: &'static str = "job";

    fn name(self) -> &'static str {
        self.label()
    }

    fn successors(self) -> &'static [Self] {
        use JobStatus::*;
        match self {
            Draft => &[Active, Paused, Closed],
            Active => &[Paused, Closed, Draft],
            Paused => &[Active, Closed],
            Closed => &[Active],
        }
    }
}

impl StatusMachine for InterviewStatus {
    const ENTITY: &'static str = "interview";

    fn name(self) -> &'static str {
        self.label()
    }

    fn successors(self) -> &'static [Self] {
        use InterviewStatus::*;
        match self {
            Scheduled => &[Completed, Cancelled, Rescheduled],
            Rescheduled => &[Scheduled, Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }
}

/// Rejected status change, reported by the services as `ServiceError::InvalidTransition`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub entity: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}

pub fn check_transition<S: StatusMachine>(from: S, to: S) -> Result<(), InvalidTransition> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(InvalidTransition {
            entity: S::ENTITY,
            from: from.name(),
            to: to.name(),
        })
    }
}
