//! Task status state machine.
//!
//! Every assignee of a task moves through the same machine independently. The
//! task-level status is never written directly; it is derived from the
//! assignee statuses with [`aggregate_status`] after every change.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Accepted,
    InProgress,
    Submitted,
    Completed,
    Rejected,
    Overdue,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 7] = [
        TaskStatus::Pending,
        TaskStatus::Accepted,
        TaskStatus::InProgress,
        TaskStatus::Submitted,
        TaskStatus::Completed,
        TaskStatus::Rejected,
        TaskStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Accepted => "ACCEPTED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Submitted => "SUBMITTED",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Rejected => "REJECTED",
            TaskStatus::Overdue => "OVERDUE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Statuses the overdue sweep is allowed to flag.
    pub fn can_become_overdue(&self) -> bool {
        matches!(
            self,
            TaskStatus::Pending | TaskStatus::Accepted | TaskStatus::InProgress | TaskStatus::Rejected
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown task status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Who is allowed to trigger a given action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Performer {
    Assignee,
    Reviewer,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    Accept,
    Start,
    Submit,
    Approve,
    Reject,
    MarkOverdue,
}

impl StatusAction {
    pub fn performer(&self) -> Performer {
        match self {
            StatusAction::Accept | StatusAction::Start | StatusAction::Submit => Performer::Assignee,
            StatusAction::Approve | StatusAction::Reject => Performer::Reviewer,
            StatusAction::MarkOverdue => Performer::System,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            StatusAction::Accept => "accept",
            StatusAction::Start => "start",
            StatusAction::Submit => "submit",
            StatusAction::Approve => "approve",
            StatusAction::Reject => "reject",
            StatusAction::MarkOverdue => "mark overdue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot {} a task that is {from}", .action.verb())]
    Invalid { from: TaskStatus, action: StatusAction },

    #[error("no assignee has a submission awaiting review")]
    NothingToReview,
}

/// Single edge lookup. Returns the target status or `TransitionError::Invalid`.
pub fn transition(from: TaskStatus, action: StatusAction) -> Result<TaskStatus, TransitionError> {
    use StatusAction::*;
    use TaskStatus::*;

    let to = match (action, from) {
        (Accept, Pending) => Accepted,
        (Start, Accepted) | (Start, Rejected) | (Start, Overdue) => InProgress,
        (Submit, InProgress) | (Submit, Overdue) => Submitted,
        (Approve, Submitted) => Completed,
        (Reject, Submitted) => Rejected,
        (MarkOverdue, status) if status.can_become_overdue() => Overdue,
        _ => return Err(TransitionError::Invalid { from, action }),
    };
    Ok(to)
}

/// One assignee's position in the machine.
///
/// `resume_status` remembers where the assignee was when the sweep flagged
/// them overdue, so extending the due date can put them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssigneeState {
    pub status: TaskStatus,
    pub resume_status: Option<TaskStatus>,
}

impl Default for AssigneeState {
    fn default() -> Self {
        Self {
            status: TaskStatus::Pending,
            resume_status: None,
        }
    }
}

impl AssigneeState {
    pub fn apply(&self, action: StatusAction) -> Result<AssigneeState, TransitionError> {
        let status = transition(self.status, action)?;
        let resume_status = match action {
            StatusAction::MarkOverdue => Some(self.status),
            _ => None,
        };
        Ok(AssigneeState { status, resume_status })
    }

    /// Undo an overdue mark. Assignees that are not overdue are returned as-is.
    pub fn lift_overdue(&self) -> AssigneeState {
        if self.status != TaskStatus::Overdue {
            return *self;
        }
        AssigneeState {
            status: self.resume_status.unwrap_or(TaskStatus::Pending),
            resume_status: None,
        }
    }
}

/// Derive the task-level status from its assignees. `None` for an empty set.
pub fn aggregate_status<I>(statuses: I) -> Option<TaskStatus>
where
    I: IntoIterator<Item = TaskStatus>,
{
    use TaskStatus::*;

    let statuses: Vec<TaskStatus> = statuses.into_iter().collect();
    if statuses.is_empty() {
        return None;
    }

    let any = |wanted: &[TaskStatus]| statuses.iter().any(|s| wanted.contains(s));
    let all = |wanted: &[TaskStatus]| statuses.iter().all(|s| wanted.contains(s));

    let derived = if any(&[Overdue]) {
        Overdue
    } else if all(&[Completed]) {
        Completed
    } else if any(&[Rejected]) {
        Rejected
    } else if all(&[Submitted, Completed]) {
        Submitted
    } else if any(&[InProgress, Submitted, Completed]) {
        InProgress
    } else if all(&[Accepted]) {
        Accepted
    } else {
        Pending
    };
    Some(derived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskStatus::*;

    #[test]
    fn happy_path_walks_to_completion() {
        let mut state = AssigneeState::default();
        for action in [
            StatusAction::Accept,
            StatusAction::Start,
            StatusAction::Submit,
            StatusAction::Approve,
        ] {
            state = state.apply(action).unwrap();
        }
        assert_eq!(state.status, Completed);
        assert!(state.status.is_terminal());
    }

    #[test]
    fn rejected_work_can_restart() {
        assert_eq!(transition(Submitted, StatusAction::Reject).unwrap(), Rejected);
        assert_eq!(transition(Rejected, StatusAction::Start).unwrap(), InProgress);
        assert!(transition(Rejected, StatusAction::Submit).is_err());
    }

    #[test]
    fn completed_is_terminal() {
        for action in [
            StatusAction::Accept,
            StatusAction::Start,
            StatusAction::Submit,
            StatusAction::Approve,
            StatusAction::Reject,
            StatusAction::MarkOverdue,
        ] {
            assert!(transition(Completed, action).is_err(), "{:?} escaped COMPLETED", action);
        }
    }

    #[test]
    fn submitted_work_is_never_overdue() {
        let err = transition(Submitted, StatusAction::MarkOverdue).unwrap_err();
        assert_eq!(
            err,
            TransitionError::Invalid {
                from: Submitted,
                action: StatusAction::MarkOverdue
            }
        );
        assert_eq!(err.to_string(), "cannot mark overdue a task that is SUBMITTED");
    }

    #[test]
    fn cannot_skip_acceptance() {
        assert!(transition(Pending, StatusAction::Start).is_err());
        assert!(transition(Pending, StatusAction::Submit).is_err());
        assert!(transition(Accepted, StatusAction::Approve).is_err());
    }

    #[test]
    fn overdue_remembers_and_restores_previous_status() {
        let started = AssigneeState {
            status: InProgress,
            resume_status: None,
        };
        let overdue = started.apply(StatusAction::MarkOverdue).unwrap();
        assert_eq!(overdue.status, Overdue);
        assert_eq!(overdue.resume_status, Some(InProgress));
        assert_eq!(overdue.lift_overdue(), started);

        // Late submission clears the memory.
        let submitted = overdue.apply(StatusAction::Submit).unwrap();
        assert_eq!(submitted.resume_status, None);
        assert_eq!(submitted.lift_overdue(), submitted);
    }

    #[test]
    fn performers_are_partitioned() {
        assert_eq!(StatusAction::Submit.performer(), Performer::Assignee);
        assert_eq!(StatusAction::Reject.performer(), Performer::Reviewer);
        assert_eq!(StatusAction::MarkOverdue.performer(), Performer::System);
    }

    #[test]
    fn aggregate_single_assignee_mirrors_it() {
        for status in TaskStatus::ALL {
            assert_eq!(aggregate_status([status]), Some(status));
        }
        assert_eq!(aggregate_status(Vec::new()), None);
    }

    #[test]
    fn aggregate_multi_assignee_rules() {
        assert_eq!(aggregate_status([Completed, Overdue]), Some(Overdue));
        assert_eq!(aggregate_status([Completed, Completed]), Some(Completed));
        assert_eq!(aggregate_status([Rejected, Submitted]), Some(Rejected));
        assert_eq!(aggregate_status([Submitted, Completed]), Some(Submitted));
        assert_eq!(aggregate_status([Pending, InProgress]), Some(InProgress));
        assert_eq!(aggregate_status([Pending, Completed]), Some(InProgress));
        assert_eq!(aggregate_status([Accepted, Accepted]), Some(Accepted));
        assert_eq!(aggregate_status([Pending, Accepted]), Some(Pending));
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("IN_PROGRESS".parse::<TaskStatus>().unwrap(), InProgress);
        assert!("in_progress".parse::<TaskStatus>().is_err());
    }
}
