//! Task lifecycle.
//!
//! Every status change locks the task row, moves the affected assignee rows
//! through the state machine, and then rewrites the task's aggregate status
//! from the full assignee set. Notifications go out after commit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use sqlx::{PgConnection, PgPool};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use super::notifications::Notifier;
use super::{audit, optional_text, required_text, Paged, ServiceError};
use crate::database::models::{AuditAction, NotificationKind, Task, TaskAssignee};
use crate::database::repository::notifications::NewNotification;
use crate::database::repository::tasks::{self, NewTask, TaskFilter};
use crate::database::repository::{buckets, users};
use crate::database::Page;
use crate::domain::{
    aggregate_status, Actor, Permission, Priority, StatusAction, TaskStatus, TenantScope, TransitionError,
};

const MAX_TITLE: usize = 200;
const MAX_NOTE: usize = 2000;

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct CreateTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub bucket_id: Option<Uuid>,
    pub assignee_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub bucket_id: Option<Option<Uuid>>,
    pub assignee_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitWork {
    pub note: Option<String>,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Review {
    /// Review a single employee; otherwise every pending submission.
    pub employee_id: Option<Uuid>,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub assignees: Vec<TaskAssignee>,
}

/// Notification queued inside a transaction, sent after commit.
struct Outgoing {
    organization_id: Uuid,
    recipients: Vec<Uuid>,
    kind: NotificationKind,
    title: String,
    body: String,
    task_id: Uuid,
}

pub struct TaskService {
    pool: PgPool,
    notifier: Notifier,
}

impl TaskService {
    pub fn new(pool: PgPool, notifier: Notifier) -> Self {
        Self { pool, notifier }
    }

    pub async fn list(&self, actor: &Actor, mut filter: TaskFilter, page: Page) -> Result<Paged<TaskDetail>, ServiceError> {
        let scope = actor.tenant_for(Permission::ViewTasks)?;
        if !scope.sees_everything() {
            filter.assignee_id = None;
        }
        let found = tasks::list_scoped(&self.pool, &scope, &filter, Some(page)).await?;
        let total = tasks::count_scoped(&self.pool, &scope, &filter).await?;
        let items = self.with_assignees(&scope, found).await?;
        Ok(Paged::new(items, total, page))
    }

    /// Tasks outside the caller's scope are reported as missing.
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<TaskDetail, ServiceError> {
        let scope = actor.tenant_for(Permission::ViewTasks)?;
        let task = tasks::find_scoped(&self.pool, &scope, id, false)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task"))?;
        let mut details = self.with_assignees(&scope, vec![task]).await?;
        details.pop().ok_or_else(|| ServiceError::not_found("Task"))
    }

    async fn with_assignees(&self, scope: &TenantScope, found: Vec<Task>) -> Result<Vec<TaskDetail>, ServiceError> {
        let ids: Vec<Uuid> = found.iter().map(|t| t.id).collect();
        let mut by_task: BTreeMap<Uuid, Vec<TaskAssignee>> = BTreeMap::new();
        for assignee in tasks::assignees(&self.pool, &ids, scope.assignee_filter()).await? {
            by_task.entry(assignee.task_id).or_default().push(assignee);
        }
        Ok(found
            .into_iter()
            .map(|task| TaskDetail {
                assignees: by_task.remove(&task.id).unwrap_or_default(),
                task,
            })
            .collect())
    }

    pub async fn create(&self, actor: &Actor, input: CreateTask) -> Result<TaskDetail, ServiceError> {
        let scope = actor.tenant_for(Permission::ManageTasks)?;
        let title = required_text("title", &input.title, MAX_TITLE)?;
        let description = optional_text(input.description.as_deref());
        if let Some(due_at) = input.due_at {
            ensure_future(due_at)?;
        }

        let mut tx = self.pool.begin().await?;
        if let Some(bucket_id) = input.bucket_id {
            ensure_bucket(&mut tx, scope.organization_id, bucket_id).await?;
        }
        let assignee_ids = resolve_assignees(&mut tx, scope.organization_id, &input.assignee_ids).await?;

        let task = tasks::insert(
            &mut *tx,
            &NewTask {
                organization_id: scope.organization_id,
                bucket_id: input.bucket_id,
                title: &title,
                description: description.as_deref(),
                priority: input.priority,
                due_at: input.due_at,
                created_by: actor.user_id(),
            },
        )
        .await?;
        tasks::add_assignees(&mut *tx, task.id, &assignee_ids).await?;
        audit::record(
            &mut *tx,
            actor,
            Some(scope.organization_id),
            AuditAction::TaskCreated,
            Some(task.id),
            json!({ "title": task.title, "assignee_ids": assignee_ids, "due_at": task.due_at }),
        )
        .await?;
        let assignees = tasks::assignees(&mut *tx, &[task.id], None).await?;
        tx.commit().await?;

        tracing::info!(task_id = %task.id, assignees = assignee_ids.len(), "task created");
        self.send(vec![assigned(&task, assignee_ids)]).await;
        Ok(TaskDetail { task, assignees })
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdateTask) -> Result<TaskDetail, ServiceError> {
        let scope = actor.tenant_for(Permission::ManageTasks)?;
        let mut changed = Map::new();

        let mut tx = self.pool.begin().await?;
        let mut task = tasks::find_scoped(&mut *tx, &scope, id, true)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task"))?;

        if let Some(title) = &input.title {
            task.title = required_text("title", title, MAX_TITLE)?;
            changed.insert("title".into(), json!(task.title));
        }
        if let Some(description) = &input.description {
            task.description = optional_text(description.as_deref());
            changed.insert("description".into(), json!(task.description));
        }
        if let Some(priority) = input.priority {
            task.priority = priority;
            changed.insert("priority".into(), json!(priority));
        }
        if let Some(bucket_id) = input.bucket_id {
            if let Some(bucket_id) = bucket_id {
                ensure_bucket(&mut tx, scope.organization_id, bucket_id).await?;
            }
            task.bucket_id = bucket_id;
            changed.insert("bucket_id".into(), json!(bucket_id));
        }

        let mut newly_assigned = Vec::new();
        if let Some(requested) = &input.assignee_ids {
            let keep = resolve_assignees(&mut tx, scope.organization_id, requested).await?;
            let current: HashSet<Uuid> = tasks::assignees(&mut *tx, &[task.id], None)
                .await?
                .into_iter()
                .map(|a| a.user_id)
                .collect();
            newly_assigned = keep.iter().copied().filter(|id| !current.contains(id)).collect();
            let removed = tasks::remove_assignees_except(&mut *tx, task.id, &keep).await?;
            tasks::add_assignees(&mut *tx, task.id, &newly_assigned).await?;
            changed.insert(
                "assignees".into(),
                json!({ "added": newly_assigned, "removed": removed }),
            );
        }

        if let Some(due_at) = input.due_at {
            if let Some(due) = due_at {
                ensure_future(due)?;
            }
            task.due_at = due_at;
            changed.insert("due_at".into(), json!(due_at));
            // A future (or cleared) deadline puts overdue assignees back where they were.
            for assignee in tasks::assignees(&mut *tx, &[task.id], None).await? {
                if assignee.status == TaskStatus::Overdue {
                    let restored = assignee.state().lift_overdue();
                    let assignee = TaskAssignee {
                        status: restored.status,
                        resume_status: restored.resume_status,
                        overdue_marked_for: None,
                        ..assignee
                    };
                    tasks::save_assignee(&mut *tx, &assignee).await?;
                }
            }
            tasks::clear_overdue_marks(&mut *tx, task.id).await?;
        }

        let task = recompute(&mut tx, task).await?;
        audit::record(
            &mut *tx,
            actor,
            Some(scope.organization_id),
            AuditAction::TaskUpdated,
            Some(task.id),
            Value::Object(changed),
        )
        .await?;
        let assignees = tasks::assignees(&mut *tx, &[task.id], None).await?;
        tx.commit().await?;

        if !newly_assigned.is_empty() {
            self.send(vec![assigned(&task, newly_assigned)]).await;
        }
        Ok(TaskDetail { task, assignees })
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
        let scope = actor.tenant_for(Permission::ManageTasks)?;

        let mut tx = self.pool.begin().await?;
        let task = tasks::find_scoped(&mut *tx, &scope, id, true)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task"))?;
        tasks::delete(&mut *tx, scope.organization_id, task.id).await?;
        audit::record(
            &mut *tx,
            actor,
            Some(scope.organization_id),
            AuditAction::TaskDeleted,
            Some(task.id),
            json!({ "title": task.title }),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Accept, start or submit the caller's own assignment.
    pub async fn act(
        &self,
        actor: &Actor,
        id: Uuid,
        action: StatusAction,
        work: SubmitWork,
    ) -> Result<TaskDetail, ServiceError> {
        let scope = actor.tenant_for(Permission::WorkOnTask)?;
        let user_id = actor.user_id();
        let note = work.note.as_deref().map(|n| bounded("note", n, MAX_NOTE)).transpose()?;
        let attachment_url = work.attachment_url.as_deref().map(validate_attachment_url).transpose()?;

        let mut tx = self.pool.begin().await?;
        let task = tasks::find_scoped(&mut *tx, &scope, id, true)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task"))?;
        let mine = tasks::assignees(&mut *tx, &[task.id], Some(user_id))
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found("Task"))?;

        let next = mine.state().apply(action)?;
        let now = Utc::now();
        let mut updated = TaskAssignee {
            status: next.status,
            resume_status: next.resume_status,
            ..mine
        };
        if action == StatusAction::Submit {
            updated.note = note.or(updated.note);
            updated.attachment_url = attachment_url.or(updated.attachment_url);
            updated.submitted_at = Some(now);
        }
        tasks::save_assignee(&mut *tx, &updated).await?;

        let task = recompute(&mut tx, task).await?;
        let assignees = tasks::assignees(&mut *tx, &[task.id], Some(user_id)).await?;
        let admins = users::active_admin_ids(&mut *tx, task.organization_id).await?;
        tx.commit().await?;

        tracing::info!(task_id = %task.id, %user_id, action = action.verb(), status = %updated.status, "assignee action");
        let kind = match action {
            StatusAction::Submit => NotificationKind::TaskSubmitted,
            _ => NotificationKind::TaskStatusChanged,
        };
        self.send(vec![Outgoing {
            organization_id: task.organization_id,
            recipients: admins,
            kind,
            title: format!("{} {}", updated.user_name, past_tense(action)),
            body: task.title.clone(),
            task_id: task.id,
        }])
        .await;
        Ok(TaskDetail { task, assignees })
    }

    /// Approve or reject submitted work.
    pub async fn review(&self, actor: &Actor, id: Uuid, action: StatusAction, review: Review) -> Result<TaskDetail, ServiceError> {
        let scope = actor.tenant_for(Permission::ReviewTasks)?;
        let reason = match action {
            StatusAction::Reject => Some(
                review
                    .reason
                    .as_deref()
                    .map(|r| bounded("reason", r, MAX_NOTE))
                    .transpose()?
                    .ok_or_else(|| ServiceError::invalid("reason", "is required when rejecting"))?,
            ),
            StatusAction::Approve => None,
            other => return Err(ServiceError::invalid("action", format!("{} is not a review action", other.verb()))),
        };

        let mut tx = self.pool.begin().await?;
        let task = tasks::find_scoped(&mut *tx, &scope, id, true)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task"))?;
        let all = tasks::assignees(&mut *tx, &[task.id], None).await?;
        let targets = review_targets(all, review.employee_id)?;

        let now = Utc::now();
        let mut affected = Vec::with_capacity(targets.len());
        for assignee in targets {
            let next = assignee.state().apply(action)?;
            let mut updated = TaskAssignee {
                status: next.status,
                resume_status: next.resume_status,
                ..assignee
            };
            match action {
                StatusAction::Approve => {
                    updated.completed_at = Some(now);
                    updated.rejection_reason = None;
                }
                _ => updated.rejection_reason = reason.clone(),
            }
            tasks::save_assignee(&mut *tx, &updated).await?;
            affected.push(updated.user_id);
        }

        let task = recompute(&mut tx, task).await?;
        let audit_action = match action {
            StatusAction::Approve => AuditAction::TaskApproved,
            _ => AuditAction::TaskRejected,
        };
        audit::record(
            &mut *tx,
            actor,
            Some(scope.organization_id),
            audit_action,
            Some(task.id),
            json!({ "employee_ids": affected, "reason": reason, "status": task.status }),
        )
        .await?;
        let assignees = tasks::assignees(&mut *tx, &[task.id], None).await?;
        tx.commit().await?;

        let (kind, title, body) = match action {
            StatusAction::Approve => (NotificationKind::TaskApproved, "Your work was approved".to_string(), task.title.clone()),
            _ => (
                NotificationKind::TaskRejected,
                "Your work needs changes".to_string(),
                format!("{}: {}", task.title, reason.unwrap_or_default()),
            ),
        };
        self.send(vec![Outgoing {
            organization_id: task.organization_id,
            recipients: affected,
            kind,
            title,
            body,
            task_id: task.id,
        }])
        .await;
        Ok(TaskDetail { task, assignees })
    }

    async fn send(&self, outgoing: Vec<Outgoing>) {
        for message in outgoing {
            self.notifier
                .notify(
                    &message.recipients,
                    NewNotification {
                        organization_id: Some(message.organization_id),
                        kind: message.kind,
                        title: &message.title,
                        body: &message.body,
                        task_id: Some(message.task_id),
                    },
                )
                .await;
        }
    }
}

/// Rewrite the aggregate status from the stored assignee rows.
pub(crate) async fn recompute(conn: &mut PgConnection, mut task: Task) -> Result<Task, ServiceError> {
    let statuses = tasks::assignees(&mut *conn, &[task.id], None)
        .await?
        .into_iter()
        .map(|a| a.status);
    let status = aggregate_status(statuses)
        .ok_or_else(|| ServiceError::Internal(format!("task {} has no assignees", task.id)))?;

    task.completed_at = match status {
        TaskStatus::Completed => task.completed_at.or_else(|| Some(Utc::now())),
        _ => None,
    };
    task.status = status;
    Ok(tasks::save(&mut *conn, &task).await?)
}

fn review_targets(all: Vec<TaskAssignee>, employee_id: Option<Uuid>) -> Result<Vec<TaskAssignee>, ServiceError> {
    match employee_id {
        Some(employee_id) => {
            let one = all
                .into_iter()
                .find(|a| a.user_id == employee_id)
                .ok_or_else(|| ServiceError::not_found("Assignee"))?;
            Ok(vec![one])
        }
        None => {
            let submitted: Vec<TaskAssignee> =
                all.into_iter().filter(|a| a.status == TaskStatus::Submitted).collect();
            if submitted.is_empty() {
                return Err(TransitionError::NothingToReview.into());
            }
            Ok(submitted)
        }
    }
}

async fn ensure_bucket(conn: &mut PgConnection, organization_id: Uuid, bucket_id: Uuid) -> Result<(), ServiceError> {
    match buckets::find(conn, organization_id, bucket_id).await? {
        Some(_) => Ok(()),
        None => Err(ServiceError::invalid("bucket_id", "does not exist in this organization")),
    }
}

/// Dedupe and check every requested assignee is an active employee of the tenant.
async fn resolve_assignees(conn: &mut PgConnection, organization_id: Uuid, requested: &[Uuid]) -> Result<Vec<Uuid>, ServiceError> {
    let mut ids = requested.to_vec();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Err(ServiceError::invalid("assignee_ids", "at least one assignee is required"));
    }
    let valid: HashSet<Uuid> = users::active_employee_ids(conn, organization_id, &ids)
        .await?
        .into_iter()
        .collect();
    if let Some(bad) = ids.iter().find(|id| !valid.contains(id)) {
        return Err(ServiceError::invalid(
            "assignee_ids",
            format!("{} is not an active employee of this organization", bad),
        ));
    }
    Ok(ids)
}

fn ensure_future(due_at: DateTime<Utc>) -> Result<(), ServiceError> {
    if due_at <= Utc::now() {
        return Err(ServiceError::invalid("due_at", "must be in the future"));
    }
    Ok(())
}

fn bounded(field: &str, value: &str, max_chars: usize) -> Result<String, ServiceError> {
    required_text(field, value, max_chars)
}

fn validate_attachment_url(raw: &str) -> Result<String, ServiceError> {
    match url::Url::parse(raw.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url.to_string()),
        _ => Err(ServiceError::invalid("attachment_url", "must be an http(s) URL")),
    }
}

fn past_tense(action: StatusAction) -> &'static str {
    match action {
        StatusAction::Accept => "accepted a task",
        StatusAction::Start => "started a task",
        StatusAction::Submit => "submitted work",
        StatusAction::Approve => "approved a task",
        StatusAction::Reject => "rejected a task",
        StatusAction::MarkOverdue => "is overdue on a task",
    }
}

fn assigned(task: &Task, recipients: Vec<Uuid>) -> Outgoing {
    Outgoing {
        organization_id: task.organization_id,
        recipients,
        kind: NotificationKind::TaskAssigned,
        title: "New task assigned".to_string(),
        body: task.title.clone(),
        task_id: task.id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignee(status: TaskStatus) -> TaskAssignee {
        let now = Utc::now();
        TaskAssignee {
            task_id: Uuid::nil(),
            user_id: Uuid::new_v4(),
            user_name: "Sam".to_string(),
            status,
            resume_status: None,
            note: None,
            attachment_url: None,
            rejection_reason: None,
            assigned_at: now,
            updated_at: now,
            submitted_at: None,
            completed_at: None,
            overdue_marked_for: None,
        }
    }

    #[test]
    fn untargeted_review_picks_every_submission() {
        let all = vec![
            assignee(TaskStatus::Submitted),
            assignee(TaskStatus::InProgress),
            assignee(TaskStatus::Submitted),
        ];
        let targets = review_targets(all, None).unwrap();
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().all(|a| a.status == TaskStatus::Submitted));
    }

    #[test]
    fn untargeted_review_with_nothing_submitted_fails() {
        let err = review_targets(vec![assignee(TaskStatus::Accepted)], None).unwrap_err();
        assert!(matches!(err, ServiceError::Transition(TransitionError::NothingToReview)));
    }

    #[test]
    fn targeted_review_needs_an_assignee() {
        let one = assignee(TaskStatus::InProgress);
        let id = one.user_id;
        assert_eq!(review_targets(vec![one.clone()], Some(id)).unwrap()[0].user_id, id);
        assert!(matches!(
            review_targets(vec![one], Some(Uuid::new_v4())),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let update: UpdateTask = serde_json::from_value(json!({ "due_at": null, "title": "x" })).unwrap();
        assert_eq!(update.due_at, Some(None));
        assert!(update.bucket_id.is_none());
        assert_eq!(update.title.as_deref(), Some("x"));

        let update: UpdateTask =
            serde_json::from_value(json!({ "bucket_id": "00000000-0000-0000-0000-000000000001" })).unwrap();
        assert!(matches!(update.bucket_id, Some(Some(_))));
    }

    #[test]
    fn create_defaults_priority() {
        let create: CreateTask = serde_json::from_value(json!({
            "title": "Inventory",
            "assignee_ids": []
        }))
        .unwrap();
        assert_eq!(create.priority, Priority::Medium);
    }

    #[test]
    fn attachment_urls_must_be_web_urls() {
        assert!(validate_attachment_url("https://i.example.com/a.png").is_ok());
        assert!(validate_attachment_url("javascript:alert(1)").is_err());
        assert!(validate_attachment_url("not a url").is_err());
    }

    #[test]
    fn past_due_dates_are_rejected() {
        assert!(ensure_future(Utc::now() - chrono::Duration::minutes(1)).is_err());
        assert!(ensure_future(Utc::now() + chrono::Duration::hours(1)).is_ok());
    }
}
