/// Task watchers (`task_watchers` pivot)

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::user::UserSummary;

pub struct Watcher;

impl Watcher {
    /// Adds a watcher; returns `false` if they were already watching
    pub async fn watch<'e>(db: impl PgExecutor<'e>, task_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO task_watchers (task_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (task_id, user_id) DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .execute(db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unwatch<'e>(db: impl PgExecutor<'e>, task_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_watchers WHERE task_id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<UserSummary>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.email
            FROM task_watchers w
            JOIN users u ON u.id = w.user_id
            WHERE w.task_id = $1
            ORDER BY u.name ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }
}
