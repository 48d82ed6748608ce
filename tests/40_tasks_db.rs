mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;

use taskhub_api::domain::{Actor, StatusAction, TaskStatus, TransitionError};
use taskhub_api::services::sweep::run_sweep;
use taskhub_api::services::tasks::{Review, SubmitWork, TaskDetail, UpdateTask};
use taskhub_api::services::ServiceError;
use taskhub_api::AppState;

use common::db::{make_past_due, tenant, test_db};

async fn work(state: &AppState, employee: &Actor, task_id: Uuid, actions: &[StatusAction]) -> TaskDetail {
    let mut detail = None;
    for action in actions {
        detail = Some(
            state
                .tasks()
                .act(employee, task_id, *action, SubmitWork::default())
                .await
                .unwrap_or_else(|e| panic!("{:?} failed: {}", action, e)),
        );
    }
    detail.expect("at least one action")
}

fn status_of(detail: &TaskDetail, employee: &Actor) -> TaskStatus {
    detail
        .assignees
        .iter()
        .find(|a| a.user_id == employee.user_id())
        .map(|a| a.status)
        .expect("assignee present")
}

fn extend_due_date() -> UpdateTask {
    UpdateTask {
        due_at: Some(Some(Utc::now() + Duration::days(3))),
        ..UpdateTask::default()
    }
}

#[tokio::test]
async fn late_work_is_not_flagged_again_for_the_same_deadline() {
    let Some(db) = test_db().await else { return };
    let state = &db.state;
    let acme = tenant(state).await;
    let sam = acme.employee(state, "Sam").await;
    let task_id = acme.task(state, "Stocktake", &[sam]).await;
    make_past_due(db.pool(), task_id).await;

    let first = run_sweep(db.pool(), &state.notifier).await.unwrap();
    assert_eq!(first.tasks_marked, 1);
    assert_eq!(first.assignees_marked, 1);
    let flagged = state.tasks().get(&acme.admin, task_id).await.unwrap();
    assert_eq!(flagged.task.status, TaskStatus::Overdue);

    let started = work(state, &sam, task_id, &[StatusAction::Start]).await;
    assert_eq!(status_of(&started, &sam), TaskStatus::InProgress);

    let second = run_sweep(db.pool(), &state.notifier).await.unwrap();
    assert_eq!(second.tasks_marked, 0);
    let detail = state.tasks().get(&acme.admin, task_id).await.unwrap();
    assert_eq!(status_of(&detail, &sam), TaskStatus::InProgress);
    assert_eq!(detail.task.status, TaskStatus::InProgress);

    // A new deadline that also lapses is flagged once more.
    state.tasks().update(&acme.admin, task_id, extend_due_date()).await.unwrap();
    make_past_due(db.pool(), task_id).await;
    let third = run_sweep(db.pool(), &state.notifier).await.unwrap();
    assert_eq!(third.assignees_marked, 1);

    db.cleanup().await;
}

#[tokio::test]
async fn extending_the_deadline_restores_overdue_assignees() {
    let Some(db) = test_db().await else { return };
    let state = &db.state;
    let acme = tenant(state).await;
    let sam = acme.employee(state, "Sam").await;
    let bea = acme.employee(state, "Bea").await;
    let task_id = acme.task(state, "Quarterly report", &[sam, bea]).await;
    work(state, &sam, task_id, &[StatusAction::Accept]).await;
    make_past_due(db.pool(), task_id).await;

    let report = run_sweep(db.pool(), &state.notifier).await.unwrap();
    assert_eq!(report.assignees_marked, 2);

    let detail = state.tasks().update(&acme.admin, task_id, extend_due_date()).await.unwrap();
    assert_eq!(status_of(&detail, &sam), TaskStatus::Accepted);
    assert_eq!(status_of(&detail, &bea), TaskStatus::Pending);
    assert!(detail.assignees.iter().all(|a| a.resume_status.is_none()));
    assert_eq!(detail.task.status, TaskStatus::Pending);

    db.cleanup().await;
}

#[tokio::test]
async fn untargeted_approval_completes_every_submission() {
    let Some(db) = test_db().await else { return };
    let state = &db.state;
    let acme = tenant(state).await;
    let sam = acme.employee(state, "Sam").await;
    let bea = acme.employee(state, "Bea").await;
    let task_id = acme.task(state, "Inventory count", &[sam, bea]).await;

    let flow = [StatusAction::Accept, StatusAction::Start, StatusAction::Submit];
    let halfway = work(state, &sam, task_id, &flow).await;
    assert_eq!(halfway.task.status, TaskStatus::InProgress);
    work(state, &bea, task_id, &flow).await;
    let submitted = state.tasks().get(&acme.admin, task_id).await.unwrap();
    assert_eq!(submitted.task.status, TaskStatus::Submitted);
    assert!(submitted.task.completed_at.is_none());

    let approved = state
        .tasks()
        .review(&acme.admin, task_id, StatusAction::Approve, Review::default())
        .await
        .unwrap();
    assert_eq!(approved.task.status, TaskStatus::Completed);
    assert!(approved.task.completed_at.is_some());
    assert!(approved
        .assignees
        .iter()
        .all(|a| a.status == TaskStatus::Completed && a.completed_at.is_some()));

    let audited: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM audit_logs WHERE action = 'TASK_APPROVED' AND target_id = $1",
    )
    .bind(task_id)
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(audited, 1);

    db.cleanup().await;
}

#[tokio::test]
async fn untargeted_rejection_leaves_unsubmitted_work_alone() {
    let Some(db) = test_db().await else { return };
    let state = &db.state;
    let acme = tenant(state).await;
    let sam = acme.employee(state, "Sam").await;
    let bea = acme.employee(state, "Bea").await;
    let task_id = acme.task(state, "Site photos", &[sam, bea]).await;
    work(state, &sam, task_id, &[StatusAction::Accept, StatusAction::Start, StatusAction::Submit]).await;
    work(state, &bea, task_id, &[StatusAction::Accept, StatusAction::Start]).await;

    let missing_reason = state
        .tasks()
        .review(&acme.admin, task_id, StatusAction::Reject, Review::default())
        .await;
    assert!(matches!(missing_reason, Err(ServiceError::Validation { .. })));

    let rejected = state
        .tasks()
        .review(
            &acme.admin,
            task_id,
            StatusAction::Reject,
            Review {
                employee_id: None,
                reason: Some("Missing the loading dock".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(status_of(&rejected, &sam), TaskStatus::Rejected);
    assert_eq!(status_of(&rejected, &bea), TaskStatus::InProgress);
    assert_eq!(rejected.task.status, TaskStatus::Rejected);
    let sams = rejected.assignees.iter().find(|a| a.user_id == sam.user_id()).unwrap();
    assert_eq!(sams.rejection_reason.as_deref(), Some("Missing the loading dock"));

    let again = state
        .tasks()
        .review(&acme.admin, task_id, StatusAction::Approve, Review::default())
        .await;
    assert!(matches!(
        again,
        Err(ServiceError::Transition(TransitionError::NothingToReview))
    ));

    db.cleanup().await;
}
