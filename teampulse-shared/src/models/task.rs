/// Task model and database operations
///
/// Tasks live inside a project and carry the project's team id; the
/// composite foreign key `(project_id, team_id) -> projects(id, team_id)`
/// guarantees both agree. A task may have a parent task in the same project.
///
/// # Status
///
/// ```text
/// todo ──> in-progress ──> done
///   │           │
///   └───────────┴──> blocked
/// ```
///
/// Any status may be set directly; `completed_at` is stamped when a task
/// becomes `done` and cleared when it leaves `done`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in-progress', 'done', 'blocked');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     project_id UUID NOT NULL,
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     parent_id UUID REFERENCES tasks(id) ON DELETE SET NULL,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     start_date DATE,
///     due_date DATE,
///     completed_at TIMESTAMPTZ,
///     progress SMALLINT NOT NULL DEFAULT 0,
///     deleted_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     FOREIGN KEY (project_id, team_id) REFERENCES projects(id, team_id) ON DELETE CASCADE
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::contains_pattern;
use crate::auth::authorization::TeamScope;

const TASK_COLUMNS: &str = "t.id, t.team_id, t.project_id, t.assignee_id, t.parent_id, t.created_by, \
                            t.title, t.description, t.status, t.priority, t.start_date, t.due_date, \
                            t.completed_at, t.progress, t.created_at, t.updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, TaskStatus::Done)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    pub team_id: Uuid,

    pub project_id: Uuid,

    pub assignee_id: Option<Uuid>,

    /// Parent task in the same project
    pub parent_id: Option<Uuid>,

    pub created_by: Option<Uuid>,

    pub title: String,

    pub description: Option<String>,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub start_date: Option<NaiveDate>,

    pub due_date: Option<NaiveDate>,

    /// Set while the task is `done`
    pub completed_at: Option<DateTime<Utc>>,

    /// 0..=100
    pub progress: i16,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Writable task fields, used for both create and full update
#[derive(Debug, Clone)]
pub struct TaskInput {
    pub assignee_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub progress: i16,
}

impl TaskInput {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            assignee_id: None,
            parent_id: None,
            title: title.into(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            start_date: None,
            due_date: None,
            progress: 0,
        }
    }
}

/// Completed vs. open tasks assigned to one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskStats {
    pub completed: i64,
    pub open: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PriorityCount {
    pub priority: TaskPriority,
    pub count: i64,
}

impl Task {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.due_date.is_some_and(|due| due < today)
    }

    /// Creates a task in `project_id`
    ///
    /// `team_id` must be the project's team; the composite foreign key
    /// rejects anything else.
    pub async fn create<'e>(
        db: impl PgExecutor<'e>,
        team_id: Uuid,
        project_id: Uuid,
        created_by: Uuid,
        input: TaskInput,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO tasks AS t
                (team_id, project_id, created_by, assignee_id, parent_id, title, description,
                 status, priority, start_date, due_date, progress, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    CASE WHEN $8 = 'done'::task_status THEN NOW() END)
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(team_id)
            .bind(project_id)
            .bind(created_by)
            .bind(input.assignee_id)
            .bind(input.parent_id)
            .bind(input.title)
            .bind(input.description)
            .bind(input.status)
            .bind(input.priority)
            .bind(input.start_date)
            .bind(input.due_date)
            .bind(input.progress)
            .fetch_one(db)
            .await?;

        tracing::info!(task_id = %task.id, project_id = %project_id, team_id = %team_id, "Task created");
        Ok(task)
    }

    /// Finds a live task visible in `scope`
    pub async fn find_scoped<'e>(
        db: impl PgExecutor<'e>,
        id: Uuid,
        scope: TeamScope,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM tasks t
            WHERE t.id = $1 AND t.deleted_at IS NULL
              AND ($2::uuid IS NULL OR t.team_id = $2)
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(scope.team_filter())
            .fetch_optional(db)
            .await
    }

    /// Whether `task_id` is a live task of `project_id`
    pub async fn exists_in_project<'e>(
        db: impl PgExecutor<'e>,
        task_id: Uuid,
        project_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM tasks
                WHERE id = $1 AND project_id = $2 AND deleted_at IS NULL
            )
            "#,
        )
        .bind(task_id)
        .bind(project_id)
        .fetch_one(db)
        .await
    }

    /// Whether `ancestor_id` is `task_id` itself or sits above it in the
    /// parent chain
    ///
    /// `UNION` stops the walk on rows already visited.
    pub async fn descends_from<'e>(
        db: impl PgExecutor<'e>,
        task_id: Uuid,
        ancestor_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            WITH RECURSIVE chain(id, parent_id) AS (
                SELECT id, parent_id FROM tasks WHERE id = $1
                UNION
                SELECT t.id, t.parent_id
                FROM tasks t
                JOIN chain c ON t.id = c.parent_id
            )
            SELECT EXISTS(SELECT 1 FROM chain WHERE id = $2)
            "#,
        )
        .bind(task_id)
        .bind(ancestor_id)
        .fetch_one(db)
        .await
    }

    /// Replaces every writable field
    pub async fn update<'e>(
        db: impl PgExecutor<'e>,
        id: Uuid,
        input: TaskInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks AS t
            SET assignee_id = $2, parent_id = $3, title = $4, description = $5,
                status = $6, priority = $7, start_date = $8, due_date = $9, progress = $10,
                completed_at = CASE
                    WHEN $6 = 'done'::task_status THEN COALESCE(t.completed_at, NOW())
                    ELSE NULL
                END,
                updated_at = NOW()
            WHERE t.id = $1 AND t.deleted_at IS NULL
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(input.assignee_id)
            .bind(input.parent_id)
            .bind(input.title)
            .bind(input.description)
            .bind(input.status)
            .bind(input.priority)
            .bind(input.start_date)
            .bind(input.due_date)
            .bind(input.progress)
            .fetch_optional(db)
            .await
    }

    pub async fn soft_delete<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Live tasks of a project, oldest first
    pub async fn list_for_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM tasks t
            WHERE t.project_id = $1 AND t.deleted_at IS NULL
            ORDER BY t.created_at ASC
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Tasks of a project assigned to `user_id`, most recently updated first
    pub async fn list_assigned_in_project(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM tasks t
            WHERE t.project_id = $1 AND t.assignee_id = $2 AND t.deleted_at IS NULL
            ORDER BY t.updated_at DESC
            LIMIT $3
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn search_in_team(
        pool: &PgPool,
        team_id: Uuid,
        term: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM tasks t
            WHERE t.team_id = $1 AND t.deleted_at IS NULL AND t.title ILIKE $2
            ORDER BY t.title ASC
            LIMIT $3
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(team_id)
            .bind(contains_pattern(term))
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Completed vs. open tasks assigned to the user in a team
    pub async fn stats_for_assignee(
        pool: &PgPool,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<TaskStats, sqlx::Error> {
        sqlx::query_as::<_, TaskStats>(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'done') AS completed,
                   COUNT(*) FILTER (WHERE status <> 'done') AS open
            FROM tasks
            WHERE team_id = $1 AND assignee_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Open tasks assigned to the user, counted per priority
    pub async fn open_by_priority(
        pool: &PgPool,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<PriorityCount>, sqlx::Error> {
        sqlx::query_as::<_, PriorityCount>(
            r#"
            SELECT priority, COUNT(*) AS count
            FROM tasks
            WHERE team_id = $1 AND assignee_id = $2 AND status <> 'done' AND deleted_at IS NULL
            GROUP BY priority
            ORDER BY priority DESC
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus, due_date: Option<NaiveDate>) -> Task {
        let input = TaskInput::titled("Write release notes");
        Task {
            id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            assignee_id: None,
            parent_id: None,
            created_by: None,
            title: input.title,
            description: None,
            status,
            priority: input.priority,
            start_date: None,
            due_date,
            completed_at: None,
            progress: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_task_status_strings() {
        assert_eq!(TaskStatus::InProgress.as_str(), "in-progress");
        assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), "\"in-progress\"");
        let status: TaskStatus = serde_json::from_str("\"blocked\"").unwrap();
        assert_eq!(status, TaskStatus::Blocked);
    }

    #[test]
    fn test_open_statuses() {
        assert!(TaskStatus::Todo.is_open());
        assert!(TaskStatus::InProgress.is_open());
        assert!(TaskStatus::Blocked.is_open());
        assert!(!TaskStatus::Done.is_open());
    }

    #[test]
    fn test_is_overdue() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let yesterday = today.pred_opt();

        assert!(task(TaskStatus::Todo, yesterday).is_overdue(today));
        assert!(!task(TaskStatus::Done, yesterday).is_overdue(today));
        assert!(!task(TaskStatus::Todo, Some(today)).is_overdue(today));
        assert!(!task(TaskStatus::Todo, None).is_overdue(today));
    }

    #[test]
    fn test_unknown_priority_is_rejected() {
        assert!(serde_json::from_str::<TaskPriority>("\"urgent\"").is_err());
    }
}
