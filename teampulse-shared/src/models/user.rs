/// User model and database operations
///
/// A user belongs to any number of teams through `team_user`. The
/// `current_team_id` column remembers which team the user last switched to;
/// it scopes every request that does not name a team in its path.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL,  -- unique on LOWER(email)
///     email_verified_at TIMESTAMPTZ,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(255) NOT NULL,
///     current_team_id UUID REFERENCES teams(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use teampulse_shared::models::user::{User, CreateUser};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "grace@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: "Grace".to_string(),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "GRACE@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::contains_pattern;

const USER_COLUMNS: &str = "id, email, email_verified_at, password_hash, name, current_team_id, \
                            created_at, updated_at, last_login_at";

/// User account
///
/// Passwords are stored as Argon2id hashes and never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Email address, unique case-insensitively
    pub email: String,

    pub email_verified_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub name: String,

    /// Team that scopes requests without an explicit team in the path
    pub current_team_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,

    pub name: String,
}

/// Public projection used in member lists and search results
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns a database error carrying the `users_email_key` constraint when
    /// the email is already registered.
    pub async fn create<'e>(db: impl PgExecutor<'e>, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, password_hash, name) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.name)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Finds a user by email (case-insensitive)
    pub async fn find_by_email<'e>(
        db: impl PgExecutor<'e>,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(db)
            .await
    }

    /// Points the user's current team at `team_id` (or clears it)
    ///
    /// Callers are responsible for checking membership first.
    pub async fn set_current_team<'e>(
        db: impl PgExecutor<'e>,
        id: Uuid,
        team_id: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET current_team_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(team_id)
        .execute(db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Falls back to the oldest remaining team membership, or `None`
    pub async fn reset_current_team<'e>(
        db: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        let team_id: Option<Option<Uuid>> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET current_team_id = (
                    SELECT team_id FROM team_user
                    WHERE user_id = $1
                    ORDER BY created_at ASC
                    LIMIT 1
                ),
                updated_at = NOW()
            WHERE id = $1
            RETURNING current_team_id
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;

        Ok(team_id.flatten())
    }

    pub async fn update_last_login<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users, newest first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }

    /// Members of `team_id` whose name matches `term`
    pub async fn search_in_team(
        pool: &PgPool,
        team_id: Uuid,
        term: &str,
        limit: i64,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.email
            FROM users u
            JOIN team_user tu ON tu.user_id = u.id
            WHERE tu.team_id = $1 AND u.name ILIKE $2
            ORDER BY u.name ASC
            LIMIT $3
            "#,
        )
        .bind(team_id)
        .bind(contains_pattern(term))
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            email_verified_at: None,
            password_hash: "$argon2id$secret".to_string(),
            name: "Ada".to_string(),
            current_team_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ada@example.com");
    }
}
