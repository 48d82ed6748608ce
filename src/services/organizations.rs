use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::users::{validate_email, validate_password};
use super::{audit, required_text, ServiceError};
use crate::auth::password::hash_password;
use crate::database::models::organization::slugify;
use crate::database::models::{AuditAction, Organization, User};
use crate::database::repository::users::NewUser;
use crate::database::repository::{organizations, users};
use crate::domain::{Actor, Permission, Role};

#[derive(Debug, Deserialize)]
pub struct InitialAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub admin: InitialAdmin,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct OrganizationCreated {
    pub organization: Organization,
    pub admin: User,
}

/// An explicit slug must already be in canonical form.
fn resolve_slug(name: &str, slug: Option<&str>) -> Result<String, ServiceError> {
    match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(given) => {
            if slugify(given) != given || given.len() > 63 {
                return Err(ServiceError::invalid(
                    "slug",
                    "use lowercase letters, digits and single dashes (max 63)",
                ));
            }
            Ok(given.to_string())
        }
        None => {
            let derived = slugify(name);
            if derived.is_empty() {
                return Err(ServiceError::invalid("slug", "cannot be derived from the name; provide one"));
            }
            Ok(derived.chars().take(63).collect::<String>().trim_end_matches('-').to_string())
        }
    }
}

pub struct OrganizationService {
    pool: PgPool,
}

impl OrganizationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Organization and its first admin commit together or not at all.
    pub async fn create(&self, actor: &Actor, input: CreateOrganization) -> Result<OrganizationCreated, ServiceError> {
        actor.authorize(Permission::ManageOrganizations)?;

        let name = required_text("name", &input.name, 100)?;
        let slug = resolve_slug(&name, input.slug.as_deref())?;
        let admin_name = required_text("admin.name", &input.admin.name, 100)?;
        let admin_email = validate_email(&input.admin.email)?;
        validate_password(&input.admin.password)?;
        let password_hash = hash_password(&input.admin.password)?;

        let mut tx = self.pool.begin().await?;
        let organization = organizations::insert(&mut *tx, &name, &slug).await?;
        let admin = users::insert(
            &mut *tx,
            &NewUser {
                organization_id: Some(organization.id),
                name: &admin_name,
                email: &admin_email,
                password_hash: &password_hash,
                role: Role::Admin,
            },
        )
        .await?;
        audit::record(
            &mut *tx,
            actor,
            Some(organization.id),
            AuditAction::OrganizationCreated,
            Some(organization.id),
            json!({ "name": organization.name, "slug": organization.slug, "admin_email": admin.email }),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(organization_id = %organization.id, slug = %organization.slug, "organization created");
        Ok(OrganizationCreated { organization, admin })
    }

    pub async fn list(&self, actor: &Actor, active: Option<bool>) -> Result<Vec<Organization>, ServiceError> {
        actor.authorize(Permission::ManageOrganizations)?;
        Ok(organizations::list(&self.pool, active).await?)
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Organization, ServiceError> {
        actor.authorize(Permission::ManageOrganizations)?;
        organizations::find(&self.pool, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Organization"))
    }

    /// Deactivation takes effect on each member's next request.
    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdateOrganization) -> Result<Organization, ServiceError> {
        actor.authorize(Permission::ManageOrganizations)?;
        let name = input
            .name
            .as_deref()
            .map(|n| required_text("name", n, 100))
            .transpose()?;

        let mut tx = self.pool.begin().await?;
        let organization = organizations::update(&mut *tx, id, name.as_deref(), input.is_active)
            .await?
            .ok_or_else(|| ServiceError::not_found("Organization"))?;
        audit::record(
            &mut *tx,
            actor,
            Some(organization.id),
            AuditAction::OrganizationUpdated,
            Some(organization.id),
            json!({ "name": name, "is_active": input.is_active }),
        )
        .await?;
        tx.commit().await?;
        Ok(organization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_derived_from_name() {
        assert_eq!(resolve_slug("Acme Corp", None).unwrap(), "acme-corp");
        assert_eq!(resolve_slug("Acme Corp", Some("  ")).unwrap(), "acme-corp");
    }

    #[test]
    fn explicit_slug_must_be_canonical() {
        assert_eq!(resolve_slug("x", Some("acme-2")).unwrap(), "acme-2");
        assert!(resolve_slug("x", Some("Acme")).is_err());
        assert!(resolve_slug("x", Some("acme--2")).is_err());
        assert!(resolve_slug("!!!", None).is_err());
    }

    #[test]
    fn derived_slug_is_bounded() {
        let slug = resolve_slug(&"word ".repeat(40), None).unwrap();
        assert!(slug.len() <= 63);
        assert!(!slug.ends_with('-'));
    }
}
