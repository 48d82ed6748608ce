// Database-backed fixtures.
//
// Set TASKHUB_TEST_DATABASE_URL to a Postgres the tests may create schemas
// in. Each test gets its own schema with the migrations applied, so the
// global overdue sweep only sees that test's rows. Without the variable the
// tests return early.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use uuid::Uuid;

use taskhub_api::database::Database;
use taskhub_api::domain::{Actor, Role};
use taskhub_api::services::organizations::{CreateOrganization, InitialAdmin};
use taskhub_api::services::push::NoopPushSender;
use taskhub_api::services::tasks::CreateTask;
use taskhub_api::services::users::CreateUser;
use taskhub_api::AppState;

use super::test_config;

pub const DATABASE_URL_VAR: &str = "TASKHUB_TEST_DATABASE_URL";
pub const PASSWORD: &str = "correct horse battery";

pub struct TestDb {
    pub state: AppState,
    admin_pool: PgPool,
    schema: String,
}

impl TestDb {
    pub fn pool(&self) -> &PgPool {
        self.state.db.pool()
    }

    /// Drop the schema. Skipped when a test panics; leftovers are prefixed
    /// `taskhub_test_` for manual cleanup.
    pub async fn cleanup(self) {
        self.state.db.close().await;
        let drop = format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema);
        if let Err(e) = sqlx::query(&drop).execute(&self.admin_pool).await {
            eprintln!("failed to drop {}: {}", self.schema, e);
        }
        self.admin_pool.close().await;
    }
}

pub async fn test_db() -> Option<TestDb> {
    let Ok(url) = std::env::var(DATABASE_URL_VAR) else {
        eprintln!("{} not set; skipping database test", DATABASE_URL_VAR);
        return None;
    };

    let schema = format!("taskhub_test_{}", Uuid::new_v4().simple());
    let admin_pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::query(&format!("CREATE SCHEMA {}", schema))
        .execute(&admin_pool)
        .await
        .expect("create test schema");

    let options = PgConnectOptions::from_str(&url)
        .expect("parse test database url")
        .options([("search_path", schema.as_str())]);
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("connect to test schema");

    let db = Database::from_pool(pool);
    db.migrate().await.expect("migrate test schema");

    let state = AppState::with_parts(db, test_config(), Arc::new(NoopPushSender), None);
    Some(TestDb {
        state,
        admin_pool,
        schema,
    })
}

/// One organization with its admin, created by a fresh super-admin.
pub struct Tenant {
    pub super_admin: Actor,
    pub admin: Actor,
    pub admin_email: String,
    pub organization_id: Uuid,
}

pub async fn tenant(state: &AppState) -> Tenant {
    let root = state
        .users()
        .create_super_admin("Platform Ops", "ops@taskhub.test", PASSWORD)
        .await
        .expect("create super-admin");
    let super_admin = Actor::SuperAdmin { user_id: root.id };

    let admin_email = "lead@acme.test".to_string();
    let created = state
        .organizations()
        .create(
            &super_admin,
            CreateOrganization {
                name: "Acme".to_string(),
                slug: None,
                admin: InitialAdmin {
                    name: "Lead".to_string(),
                    email: admin_email.clone(),
                    password: PASSWORD.to_string(),
                },
            },
        )
        .await
        .expect("create organization");

    Tenant {
        super_admin,
        admin: Actor::OrgAdmin {
            user_id: created.admin.id,
            organization_id: created.organization.id,
        },
        admin_email,
        organization_id: created.organization.id,
    }
}

impl Tenant {
    pub async fn employee(&self, state: &AppState, name: &str) -> Actor {
        let user = state
            .users()
            .create(
                &self.admin,
                CreateUser {
                    name: name.to_string(),
                    email: format!("{}@acme.test", name.to_lowercase()),
                    password: PASSWORD.to_string(),
                    role: Role::Employee,
                },
            )
            .await
            .expect("create employee");
        Actor::Employee {
            user_id: user.id,
            organization_id: self.organization_id,
        }
    }

    /// A task due tomorrow, assigned to `assignees`.
    pub async fn task(&self, state: &AppState, title: &str, assignees: &[Actor]) -> Uuid {
        let detail = state
            .tasks()
            .create(
                &self.admin,
                CreateTask {
                    title: title.to_string(),
                    description: None,
                    priority: Default::default(),
                    due_at: Some(Utc::now() + Duration::days(1)),
                    bucket_id: None,
                    assignee_ids: assignees.iter().map(|a| a.user_id()).collect(),
                },
            )
            .await
            .expect("create task");
        detail.task.id
    }
}

/// Due dates in the past cannot be set through the API.
pub async fn make_past_due(pool: &PgPool, task_id: Uuid) {
    sqlx::query("UPDATE tasks SET due_at = now() - interval '1 hour' WHERE id = $1")
        .bind(task_id)
        .execute(pool)
        .await
        .expect("move due date into the past");
}

pub async fn audit_rows(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs")
        .fetch_one(pool)
        .await
        .expect("count audit rows")
}
