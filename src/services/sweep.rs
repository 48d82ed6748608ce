//! Periodic overdue sweep.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::notifications::Notifier;
use super::tasks::recompute;
use super::ServiceError;
use crate::database::models::{NotificationKind, TaskAssignee};
use crate::database::repository::notifications::NewNotification;
use crate::database::repository::{revoked_tokens, tasks, users};
use crate::domain::{Actor, Permission, StatusAction};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub tasks_marked: usize,
    pub assignees_marked: usize,
    pub revoked_tokens_purged: u64,
}

struct Flagged {
    organization_id: Uuid,
    task_id: Uuid,
    title: String,
    assignees: Vec<Uuid>,
}

/// Mark every eligible assignee of every past-due task OVERDUE.
pub async fn run_sweep(pool: &PgPool, notifier: &Notifier) -> Result<SweepReport, ServiceError> {
    let now = Utc::now();
    let mut flagged = Vec::new();
    let mut report = SweepReport::default();

    let mut tx = pool.begin().await?;
    for task in tasks::lock_past_due(&mut *tx, now).await? {
        let Some(due_at) = task.due_at else { continue };
        let assignees = tasks::assignees(&mut *tx, &[task.id], None).await?;
        let mut marked = Vec::new();
        for assignee in assignees.into_iter().filter(|a| needs_overdue_mark(a, due_at)) {
            let next = assignee.state().apply(StatusAction::MarkOverdue)?;
            let updated = TaskAssignee {
                status: next.status,
                resume_status: next.resume_status,
                overdue_marked_for: Some(due_at),
                ..assignee
            };
            tasks::save_assignee(&mut *tx, &updated).await?;
            marked.push(updated.user_id);
        }
        if marked.is_empty() {
            continue;
        }

        let task = recompute(&mut tx, task).await?;
        report.tasks_marked += 1;
        report.assignees_marked += marked.len();
        flagged.push(Flagged {
            organization_id: task.organization_id,
            task_id: task.id,
            title: task.title,
            assignees: marked,
        });
    }
    tx.commit().await?;

    // Committed from here on: failures are logged and the report still returned.
    let mut admins_by_org: BTreeMap<Uuid, Vec<Uuid>> = BTreeMap::new();
    for item in &flagged {
        if !admins_by_org.contains_key(&item.organization_id) {
            let admins = match users::active_admin_ids(pool, item.organization_id).await {
                Ok(admins) => admins,
                Err(e) => {
                    tracing::warn!(organization_id = %item.organization_id, "failed to load admins for overdue notice: {}", e);
                    Vec::new()
                }
            };
            admins_by_org.insert(item.organization_id, admins);
        }
        let mut recipients = item.assignees.clone();
        recipients.extend(admins_by_org.get(&item.organization_id).into_iter().flatten());
        notifier
            .notify(
                &recipients,
                NewNotification {
                    organization_id: Some(item.organization_id),
                    kind: NotificationKind::TaskOverdue,
                    title: "Task is overdue",
                    body: &item.title,
                    task_id: Some(item.task_id),
                },
            )
            .await;
    }

    report.revoked_tokens_purged = match revoked_tokens::purge_expired(pool, now).await {
        Ok(purged) => purged,
        Err(e) => {
            tracing::warn!("failed to purge expired revoked tokens: {}", e);
            0
        }
    };
    if report.tasks_marked > 0 || report.revoked_tokens_purged > 0 {
        tracing::info!(
            tasks = report.tasks_marked,
            assignees = report.assignees_marked,
            purged = report.revoked_tokens_purged,
            "overdue sweep"
        );
    }
    Ok(report)
}

/// Eligible, and not already flagged for this deadline. Late work started
/// after a flag stays in progress until the due date moves.
fn needs_overdue_mark(assignee: &TaskAssignee, due_at: DateTime<Utc>) -> bool {
    assignee.status.can_become_overdue() && assignee.overdue_marked_for != Some(due_at)
}

/// On-demand trigger for super-admins.
pub async fn run_for(actor: &Actor, pool: &PgPool, notifier: &Notifier) -> Result<SweepReport, ServiceError> {
    actor.authorize(Permission::RunSweep)?;
    run_sweep(pool, notifier).await
}

/// Background loop. The first tick fires after one full interval.
pub fn spawn_sweeper(pool: PgPool, notifier: Notifier, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = run_sweep(&pool, &notifier).await {
                tracing::error!("overdue sweep failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use chrono::Duration as ChronoDuration;

    fn assignee(status: TaskStatus, overdue_marked_for: Option<DateTime<Utc>>) -> TaskAssignee {
        let now = Utc::now();
        TaskAssignee {
            task_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_name: "Ria".to_string(),
            status,
            resume_status: None,
            note: None,
            attachment_url: None,
            rejection_reason: None,
            assigned_at: now,
            updated_at: now,
            submitted_at: None,
            completed_at: None,
            overdue_marked_for,
        }
    }

    #[test]
    fn late_work_is_not_flagged_twice_for_one_deadline() {
        let due_at = Utc::now() - ChronoDuration::hours(1);
        assert!(needs_overdue_mark(&assignee(TaskStatus::InProgress, None), due_at));
        assert!(!needs_overdue_mark(&assignee(TaskStatus::InProgress, Some(due_at)), due_at));
    }

    #[test]
    fn a_new_deadline_can_be_flagged_again() {
        let old_due = Utc::now() - ChronoDuration::days(2);
        let new_due = Utc::now() - ChronoDuration::hours(1);
        assert!(needs_overdue_mark(&assignee(TaskStatus::Accepted, Some(old_due)), new_due));
    }

    #[test]
    fn finished_work_is_never_flagged() {
        let due_at = Utc::now() - ChronoDuration::hours(1);
        for status in [TaskStatus::Submitted, TaskStatus::Completed, TaskStatus::Overdue] {
            assert!(!needs_overdue_mark(&assignee(status, None), due_at), "{status:?} flagged");
        }
    }
}
