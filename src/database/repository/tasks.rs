use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::models::{Task, TaskAssignee};
use crate::database::{DatabaseError, Page};
use crate::domain::{Priority, TaskStatus, TenantScope};

const ASSIGNEE_COLUMNS: &str = "a.task_id, a.user_id, u.name AS user_name, a.status, a.resume_status, \
     a.note, a.attachment_url, a.rejection_reason, a.assigned_at, a.updated_at, \
     a.submitted_at, a.completed_at, a.overdue_marked_for";

#[derive(Debug, Default, Clone, Copy)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub bucket_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub due_before: Option<DateTime<Utc>>,
    pub due_after: Option<DateTime<Utc>>,
    /// Only tasks that have a due date and are not completed.
    pub open_with_due_date: bool,
}

pub struct NewTask<'a> {
    pub organization_id: Uuid,
    pub bucket_id: Option<Uuid>,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub priority: Priority,
    pub due_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
}

/// Scope and filter predicates shared by list and count.
fn push_conditions(query: &mut QueryBuilder<'_, Postgres>, scope: &TenantScope, filter: &TaskFilter) {
    query.push(" WHERE t.organization_id = ").push_bind(scope.organization_id);

    if let Some(user_id) = scope.assignee_filter() {
        query
            .push(" AND EXISTS (SELECT 1 FROM task_assignees sa WHERE sa.task_id = t.id AND sa.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let Some(user_id) = filter.assignee_id {
        query
            .push(" AND EXISTS (SELECT 1 FROM task_assignees fa WHERE fa.task_id = t.id AND fa.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let Some(status) = filter.status {
        query.push(" AND t.status = ").push_bind(status.as_str());
    }
    if let Some(bucket_id) = filter.bucket_id {
        query.push(" AND t.bucket_id = ").push_bind(bucket_id);
    }
    if let Some(before) = filter.due_before {
        query.push(" AND t.due_at < ").push_bind(before);
    }
    if let Some(after) = filter.due_after {
        query.push(" AND t.due_at > ").push_bind(after);
    }
    if filter.open_with_due_date {
        query.push(" AND t.due_at IS NOT NULL AND t.status <> 'COMPLETED'");
    }
}

pub async fn list_scoped(
    executor: impl PgExecutor<'_>,
    scope: &TenantScope,
    filter: &TaskFilter,
    page: Option<Page>,
) -> Result<Vec<Task>, DatabaseError> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT t.* FROM tasks t");
    push_conditions(&mut query, scope, filter);
    query.push(" ORDER BY t.due_at ASC NULLS LAST, t.created_at DESC");
    if let Some(page) = page {
        query.push(" LIMIT ").push_bind(page.limit());
        query.push(" OFFSET ").push_bind(page.offset());
    }

    let tasks = query.build_query_as::<Task>().fetch_all(executor).await?;
    Ok(tasks)
}

pub async fn count_scoped(
    executor: impl PgExecutor<'_>,
    scope: &TenantScope,
    filter: &TaskFilter,
) -> Result<i64, DatabaseError> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM tasks t");
    push_conditions(&mut query, scope, filter);

    let count = query.build_query_scalar::<i64>().fetch_one(executor).await?;
    Ok(count)
}

/// Fetch a task visible to `scope`. With `lock`, the row is held `FOR UPDATE`
/// until the surrounding transaction ends.
pub async fn find_scoped(
    executor: impl PgExecutor<'_>,
    scope: &TenantScope,
    id: Uuid,
    lock: bool,
) -> Result<Option<Task>, DatabaseError> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT t.* FROM tasks t");
    push_conditions(&mut query, scope, &TaskFilter::default());
    query.push(" AND t.id = ").push_bind(id);
    if lock {
        query.push(" FOR UPDATE");
    }

    let task = query.build_query_as::<Task>().fetch_optional(executor).await?;
    Ok(task)
}

pub async fn insert(executor: impl PgExecutor<'_>, task: &NewTask<'_>) -> Result<Task, DatabaseError> {
    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (id, organization_id, bucket_id, title, description, priority, due_at, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(task.organization_id)
    .bind(task.bucket_id)
    .bind(task.title)
    .bind(task.description)
    .bind(task.priority.as_str())
    .bind(task.due_at)
    .bind(task.created_by)
    .fetch_one(executor)
    .await?;
    Ok(task)
}

/// Persist every mutable column of `task`.
pub async fn save(executor: impl PgExecutor<'_>, task: &Task) -> Result<Task, DatabaseError> {
    let task = sqlx::query_as::<_, Task>(
        "UPDATE tasks
         SET bucket_id = $3, title = $4, description = $5, priority = $6, status = $7,
             due_at = $8, completed_at = $9, updated_at = now()
         WHERE organization_id = $1 AND id = $2
         RETURNING *",
    )
    .bind(task.organization_id)
    .bind(task.id)
    .bind(task.bucket_id)
    .bind(&task.title)
    .bind(task.description.as_deref())
    .bind(task.priority.as_str())
    .bind(task.status.as_str())
    .bind(task.due_at)
    .bind(task.completed_at)
    .fetch_one(executor)
    .await?;
    Ok(task)
}

pub async fn delete(executor: impl PgExecutor<'_>, organization_id: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM tasks WHERE organization_id = $1 AND id = $2")
        .bind(organization_id)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Assignment records for a set of tasks, optionally only one user's.
pub async fn assignees(
    executor: impl PgExecutor<'_>,
    task_ids: &[Uuid],
    only_user: Option<Uuid>,
) -> Result<Vec<TaskAssignee>, DatabaseError> {
    let sql = format!(
        "SELECT {ASSIGNEE_COLUMNS}
         FROM task_assignees a JOIN users u ON u.id = a.user_id
         WHERE a.task_id = ANY($1) AND ($2::uuid IS NULL OR a.user_id = $2)
         ORDER BY a.task_id, u.name"
    );
    let rows = sqlx::query_as::<_, TaskAssignee>(&sql)
        .bind(task_ids)
        .bind(only_user)
        .fetch_all(executor)
        .await?;
    Ok(rows)
}

/// New rows start PENDING; existing assignments are untouched.
pub async fn add_assignees(
    executor: impl PgExecutor<'_>,
    task_id: Uuid,
    user_ids: &[Uuid],
) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        "INSERT INTO task_assignees (task_id, user_id)
         SELECT $1, user_id FROM UNNEST($2::uuid[]) AS new(user_id)
         ON CONFLICT (task_id, user_id) DO NOTHING",
    )
    .bind(task_id)
    .bind(user_ids)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn remove_assignees_except(
    executor: impl PgExecutor<'_>,
    task_id: Uuid,
    keep: &[Uuid],
) -> Result<u64, DatabaseError> {
    let result = sqlx::query("DELETE FROM task_assignees WHERE task_id = $1 AND NOT (user_id = ANY($2))")
        .bind(task_id)
        .bind(keep)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn save_assignee(executor: impl PgExecutor<'_>, assignee: &TaskAssignee) -> Result<(), DatabaseError> {
    sqlx::query(
        "UPDATE task_assignees
         SET status = $3, resume_status = $4, note = $5, attachment_url = $6,
             rejection_reason = $7, submitted_at = $8, completed_at = $9, overdue_marked_for = $10,
             updated_at = now()
         WHERE task_id = $1 AND user_id = $2",
    )
    .bind(assignee.task_id)
    .bind(assignee.user_id)
    .bind(assignee.status.as_str())
    .bind(assignee.resume_status.map(|s| s.as_str()))
    .bind(assignee.note.as_deref())
    .bind(assignee.attachment_url.as_deref())
    .bind(assignee.rejection_reason.as_deref())
    .bind(assignee.submitted_at)
    .bind(assignee.completed_at)
    .bind(assignee.overdue_marked_for)
    .execute(executor)
    .await?;
    Ok(())
}

/// Forget which deadline assignees were flagged for, after the due date moves.
pub async fn clear_overdue_marks(executor: impl PgExecutor<'_>, task_id: Uuid) -> Result<u64, DatabaseError> {
    let result = sqlx::query("UPDATE task_assignees SET overdue_marked_for = NULL WHERE task_id = $1")
        .bind(task_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Lock every task across all tenants that is past due and not completed.
pub async fn lock_past_due(executor: impl PgExecutor<'_>, now: DateTime<Utc>) -> Result<Vec<Task>, DatabaseError> {
    let tasks = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks
         WHERE due_at < $1 AND status <> 'COMPLETED'
         ORDER BY due_at, id
         FOR UPDATE",
    )
    .bind(now)
    .fetch_all(executor)
    .await?;
    Ok(tasks)
}
