/// Team model and database operations
///
/// Teams are the tenant boundary: projects, tasks, customers and invitations
/// all belong to exactly one team. Users join teams through the `team_user`
/// pivot (see [`membership`](super::membership)).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use teampulse_shared::models::team::Team;
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// // Creates the team, makes the user its owner and switches them to it
/// let team = Team::create_with_owner(&pool, "Platform", user_id).await?;
///
/// for summary in Team::list_for_user(&pool, user_id).await? {
///     println!("{} ({} members)", summary.name, summary.member_count);
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::contains_pattern;
use super::membership::{Membership, TeamRole};
use super::user::User;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: Uuid,

    pub name: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// A team as seen by one of its members
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserTeam {
    pub id: Uuid,

    pub name: String,

    /// The viewing user's role in this team
    pub role: TeamRole,

    pub member_count: i64,

    pub created_at: DateTime<Utc>,
}

impl Team {
    /// Creates a team owned by `owner_id`
    ///
    /// Runs in one transaction: insert the team, attach the owner with
    /// [`TeamRole::Owner`], and make it the owner's current team.
    ///
    /// # Errors
    ///
    /// Returns an error if `owner_id` does not exist or the database fails;
    /// nothing is persisted in that case.
    pub async fn create_with_owner(
        pool: &PgPool,
        name: &str,
        owner_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let team = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (name)
            VALUES ($1)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        Membership::attach(&mut *tx, team.id, owner_id, TeamRole::Owner).await?;
        User::set_current_team(&mut *tx, owner_id, Some(team.id)).await?;

        tx.commit().await?;

        tracing::info!(team_id = %team.id, owner_id = %owner_id, "Team created");
        Ok(team)
    }

    pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn exists<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE id = $1)")
            .bind(id)
            .fetch_one(db)
            .await
    }

    /// Renames a team and switches `acting_user` to it
    pub async fn rename(
        pool: &PgPool,
        id: Uuid,
        name: &str,
        acting_user: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let team = sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams
            SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?;

        if team.is_some() {
            User::set_current_team(&mut *tx, acting_user, Some(id)).await?;
        }

        tx.commit().await?;
        Ok(team)
    }

    /// Deletes a team and everything it owns
    ///
    /// Members whose current team was this one fall back to another of their
    /// teams (or none). Projects, tasks, invitations and memberships cascade.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let affected: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM users WHERE current_team_id = $1",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for user_id in affected {
            User::reset_current_team(&mut *tx, user_id).await?;
        }

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Teams the user belongs to, with their role and the member count
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<UserTeam>, sqlx::Error> {
        sqlx::query_as::<_, UserTeam>(
            r#"
            SELECT t.id, t.name, tu.role,
                   (SELECT COUNT(*) FROM team_user c WHERE c.team_id = t.id) AS member_count,
                   t.created_at
            FROM teams t
            JOIN team_user tu ON tu.team_id = t.id
            WHERE tu.user_id = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// The user's teams whose name matches `term`
    pub async fn search_for_user(
        pool: &PgPool,
        user_id: Uuid,
        term: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            SELECT t.id, t.name, t.created_at, t.updated_at
            FROM teams t
            JOIN team_user tu ON tu.team_id = t.id
            WHERE tu.user_id = $1 AND t.name ILIKE $2
            ORDER BY t.name ASC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(contains_pattern(term))
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
