/// Global roles and permissions
///
/// These are independent of teams and only drive the admin console and the
/// `superadmin` bypass. Users get permissions through their role and through
/// direct grants.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE roles (id UUID PRIMARY KEY, name VARCHAR(255) NOT NULL UNIQUE, created_at TIMESTAMPTZ);
/// CREATE TABLE permissions (id UUID PRIMARY KEY, name VARCHAR(255) NOT NULL UNIQUE, created_at TIMESTAMPTZ);
/// CREATE TABLE role_permissions (role_id UUID, permission_id UUID, PRIMARY KEY (role_id, permission_id));
/// CREATE TABLE user_roles (user_id UUID, role_id UUID, PRIMARY KEY (user_id, role_id));
/// CREATE TABLE user_permissions (user_id UUID, permission_id UUID, PRIMARY KEY (user_id, permission_id));
/// ```
///
/// Seeded roles: `superadmin`, `admin`, `user`. Seeded permissions:
/// `manage users`, `manage roles`, `view users`, `edit users`, `delete users`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    #[error("Role '{0}' does not exist")]
    UnknownRole(String),

    #[error("Permission '{0}' does not exist")]
    UnknownPermission(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Role {
    /// Creates a role
    ///
    /// # Errors
    ///
    /// A duplicate name surfaces as a `roles_name_key` constraint violation.
    pub async fn create<'e>(db: impl PgExecutor<'e>, name: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            "INSERT INTO roles (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_name<'e>(db: impl PgExecutor<'e>, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Role>("SELECT id, name, created_at FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(db)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Role>("SELECT id, name, created_at FROM roles ORDER BY name ASC")
            .fetch_all(pool)
            .await
    }

    /// Names of the global roles held by a user
    pub async fn names_for_user<'e>(db: impl PgExecutor<'e>, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT r.name
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    /// Whether the user holds any of `names`
    pub async fn user_has_any<'e>(
        db: impl PgExecutor<'e>,
        user_id: Uuid,
        names: &[&str],
    ) -> Result<bool, sqlx::Error> {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();

        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_roles ur
                JOIN roles r ON r.id = ur.role_id
                WHERE ur.user_id = $1 AND r.name = ANY($2)
            )
            "#,
        )
        .bind(user_id)
        .bind(names)
        .fetch_one(db)
        .await
    }

    /// Replaces every global role of the user with `role_name`
    pub async fn sync_user_role(pool: &PgPool, user_id: Uuid, role_name: &str) -> Result<Role, RoleError> {
        let mut tx = pool.begin().await?;

        let role = Role::find_by_name(&mut *tx, role_name)
            .await?
            .ok_or_else(|| RoleError::UnknownRole(role_name.to_string()))?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(role)
    }
}

impl Permission {
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Permission>(
            "SELECT id, name, created_at FROM permissions ORDER BY name ASC",
        )
        .fetch_all(pool)
        .await
    }

    /// Effective global permissions of a user: via roles plus direct grants
    pub async fn names_for_user<'e>(db: impl PgExecutor<'e>, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT p.name FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN user_roles ur ON ur.role_id = rp.role_id
            WHERE ur.user_id = $1
            UNION
            SELECT p.name FROM permissions p
            JOIN user_permissions up ON up.permission_id = p.id
            WHERE up.user_id = $1
            ORDER BY 1
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    /// Direct grants only
    pub async fn direct_names_for_user<'e>(
        db: impl PgExecutor<'e>,
        user_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT p.name FROM permissions p
            JOIN user_permissions up ON up.permission_id = p.id
            WHERE up.user_id = $1
            ORDER BY p.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    /// Replaces the user's direct grants with `names`
    ///
    /// # Errors
    ///
    /// `RoleError::UnknownPermission` names the first permission that does not
    /// exist; no grant is changed in that case.
    pub async fn sync_direct(pool: &PgPool, user_id: Uuid, names: &[String]) -> Result<(), RoleError> {
        let mut tx = pool.begin().await?;

        let known: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, name FROM permissions WHERE name = ANY($1)")
                .bind(names)
                .fetch_all(&mut *tx)
                .await?;

        if let Some(missing) = names.iter().find(|n| !known.iter().any(|(_, k)| k == *n)) {
            return Err(RoleError::UnknownPermission(missing.clone()));
        }

        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let ids: Vec<Uuid> = known.into_iter().map(|(id, _)| id).collect();
        sqlx::query(
            r#"
            INSERT INTO user_permissions (user_id, permission_id)
            SELECT $1, UNNEST($2::uuid[])
            "#,
        )
        .bind(user_id)
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
