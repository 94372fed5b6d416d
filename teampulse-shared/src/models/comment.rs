/// Task comments
///
/// Any team member who can see a task may comment on it. Only the author may
/// edit a comment; the author or anyone allowed to delete tasks may remove it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::auth::authorization::TeamScope;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,

    pub task_id: Uuid,

    /// Author
    pub user_id: Uuid,

    pub content: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// A comment with its author's name, as listed under a task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub async fn create<'e>(
        db: impl PgExecutor<'e>,
        task_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (task_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, user_id, content, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(db)
        .await
    }

    /// Finds a comment whose task is live and visible in `scope`
    pub async fn find_scoped<'e>(
        db: impl PgExecutor<'e>,
        id: Uuid,
        scope: TeamScope,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.task_id, c.user_id, c.content, c.created_at, c.updated_at
            FROM comments c
            JOIN tasks t ON t.id = c.task_id
            WHERE c.id = $1 AND t.deleted_at IS NULL
              AND ($2::uuid IS NULL OR t.team_id = $2)
            "#,
        )
        .bind(id)
        .bind(scope.team_filter())
        .fetch_optional(db)
        .await
    }

    pub async fn update_content<'e>(
        db: impl PgExecutor<'e>,
        id: Uuid,
        content: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
            SET content = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, task_id, user_id, content, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(db)
        .await
    }

    pub async fn delete<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Comments of a task, oldest first
    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
        sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.task_id, c.user_id, u.name AS author_name, c.content,
                   c.created_at, c.updated_at
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.task_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }
}
