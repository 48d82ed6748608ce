use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{audit, required_text, ServiceError};
use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
use crate::database::models::{AuditAction, User};
use crate::database::repository::users::{self, NewUser, UserChanges, UserFilter};
use crate::domain::{Actor, Permission, Role};

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Employee
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

pub(crate) fn validate_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.contains('@')
        }
        None => false,
    };
    if !valid || email.len() > 254 || email.contains(char::is_whitespace) {
        return Err(ServiceError::invalid("email", "must be a valid email address"));
    }
    Ok(email.to_string())
}

pub(crate) fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::invalid(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }
    Ok(())
}

/// Only tenant roles can be granted from inside a tenant.
fn tenant_role(role: Role) -> Result<Role, ServiceError> {
    if role.requires_organization() {
        Ok(role)
    } else {
        Err(ServiceError::invalid("role", "must be EMPLOYEE or ADMIN"))
    }
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, actor: &Actor, filter: UserFilter) -> Result<Vec<User>, ServiceError> {
        let scope = actor.tenant_for(Permission::ManageUsers)?;
        Ok(users::list_in_org(&self.pool, scope.organization_id, filter).await?)
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<User, ServiceError> {
        let scope = actor.tenant_for(Permission::ManageUsers)?;
        users::find_in_org(&self.pool, scope.organization_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    pub async fn create(&self, actor: &Actor, input: CreateUser) -> Result<User, ServiceError> {
        let scope = actor.tenant_for(Permission::ManageUsers)?;
        let name = required_text("name", &input.name, 100)?;
        let email = validate_email(&input.email)?;
        validate_password(&input.password)?;
        let role = tenant_role(input.role)?;
        let password_hash = hash_password(&input.password)?;

        let mut tx = self.pool.begin().await?;
        let user = users::insert(
            &mut *tx,
            &NewUser {
                organization_id: Some(scope.organization_id),
                name: &name,
                email: &email,
                password_hash: &password_hash,
                role,
            },
        )
        .await?;
        audit::record(
            &mut *tx,
            actor,
            Some(scope.organization_id),
            AuditAction::UserCreated,
            Some(user.id),
            json!({ "email": user.email, "role": user.role }),
        )
        .await?;
        tx.commit().await?;
        Ok(user)
    }

    /// Operator bootstrap from the CLI. There is no caller to authorize, so
    /// the audit entry is attributed to the new account itself.
    pub async fn create_super_admin(&self, name: &str, email: &str, password: &str) -> Result<User, ServiceError> {
        let name = required_text("name", name, 100)?;
        let email = validate_email(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let mut tx = self.pool.begin().await?;
        let user = users::insert(
            &mut *tx,
            &NewUser {
                organization_id: None,
                name: &name,
                email: &email,
                password_hash: &password_hash,
                role: Role::SuperAdmin,
            },
        )
        .await?;
        audit::record(
            &mut *tx,
            &Actor::SuperAdmin { user_id: user.id },
            None,
            AuditAction::UserCreated,
            Some(user.id),
            json!({ "email": user.email, "role": user.role, "source": "cli" }),
        )
        .await?;
        tx.commit().await?;

        tracing::warn!(user_id = %user.id, "super-admin created");
        Ok(user)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdateUser) -> Result<User, ServiceError> {
        let scope = actor.tenant_for(Permission::ManageUsers)?;
        let role = input.role.map(tenant_role).transpose()?;
        if id == actor.user_id() {
            if matches!(role, Some(r) if r != Role::Admin) {
                return Err(ServiceError::invalid("role", "you cannot demote yourself"));
            }
            if input.is_active == Some(false) {
                return Err(ServiceError::invalid("is_active", "you cannot deactivate yourself"));
            }
        }
        let changes = UserChanges {
            name: input
                .name
                .as_deref()
                .map(|n| required_text("name", n, 100))
                .transpose()?,
            role,
            is_active: input.is_active,
        };

        let mut tx = self.pool.begin().await?;
        let before = users::find_in_org(&mut *tx, scope.organization_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;
        let user = users::update(&mut *tx, scope.organization_id, id, &changes)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;

        let action = if before.is_active && !user.is_active {
            AuditAction::UserDeactivated
        } else {
            AuditAction::UserUpdated
        };
        audit::record(
            &mut *tx,
            actor,
            Some(scope.organization_id),
            action,
            Some(user.id),
            json!({ "name": changes.name, "role": changes.role, "is_active": changes.is_active }),
        )
        .await?;
        tx.commit().await?;
        Ok(user)
    }

    /// Users are never hard-deleted; their history stays attributable.
    pub async fn deactivate(&self, actor: &Actor, id: Uuid) -> Result<User, ServiceError> {
        self.update(
            actor,
            id,
            UpdateUser {
                is_active: Some(false),
                ..UpdateUser::default()
            },
        )
        .await
    }

    pub async fn change_password(&self, actor: &Actor, input: ChangePassword) -> Result<(), ServiceError> {
        actor.own_account()?;
        let user = users::find(&self.pool, actor.user_id())
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;
        if !verify_password(&input.current_password, &user.password_hash)? {
            return Err(ServiceError::invalid("current_password", "is incorrect"));
        }
        validate_password(&input.new_password)
            .map_err(|_| ServiceError::invalid("new_password", format!("must be at least {} characters", MIN_PASSWORD_LENGTH)))?;

        let password_hash = hash_password(&input.new_password)?;
        users::set_password(&self.pool, user.id, &password_hash).await?;
        tracing::info!(user_id = %user.id, "password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert_eq!(validate_email("  Ada@Example.com ").unwrap(), "Ada@Example.com");
        for bad in ["", "ada", "@example.com", "ada@", "ada@example", "a da@example.com", "a@b@c.com"] {
            assert!(validate_email(bad).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn password_length() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn super_admin_cannot_be_granted_in_tenant() {
        assert!(tenant_role(Role::SuperAdmin).is_err());
        assert_eq!(tenant_role(Role::Admin).unwrap(), Role::Admin);
    }
}
