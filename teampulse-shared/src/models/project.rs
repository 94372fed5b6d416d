/// Project model and database operations
///
/// Projects belong to one team, may reference a customer of that team, and
/// have an explicit member list (`project_members`). Deleting a project is a
/// soft delete that also hides its tasks.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_status AS ENUM ('planning', 'active', 'on-hold', 'completed', 'archived');
/// CREATE TYPE project_priority AS ENUM ('low', 'medium', 'high', 'urgent');
///
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     customer_id UUID REFERENCES customers(id) ON DELETE SET NULL,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     status project_status NOT NULL DEFAULT 'active',
///     priority project_priority NOT NULL DEFAULT 'medium',
///     start_date DATE,
///     end_date DATE,
///     progress SMALLINT NOT NULL DEFAULT 0,
///     color VARCHAR(32),
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     deleted_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (id, team_id)
/// );
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role VARCHAR(64),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use teampulse_shared::models::project::{Project, ProjectFilters, ProjectInput};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, team_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let project = Project::create(&pool, team_id, ProjectInput::named("Website relaunch"), &[user_id]).await?;
///
/// let page = Project::list_for_team(&pool, team_id, None, &ProjectFilters::default()).await?;
/// println!("{} projects", page.total);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use super::{contains_pattern, Paginated};
use crate::auth::authorization::TeamScope;

/// Projects per page in listings
pub const PROJECTS_PER_PAGE: i64 = 12;

const PROJECT_COLUMNS: &str = "p.id, p.team_id, p.customer_id, p.name, p.description, p.status, \
                               p.priority, p.start_date, p.end_date, p.progress, p.color, p.tags, \
                               p.created_at, p.updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    Planning,
    Active,
    OnHold,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on-hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,

    pub team_id: Uuid,

    pub customer_id: Option<Uuid>,

    pub name: String,

    pub description: Option<String>,

    pub status: ProjectStatus,

    pub priority: ProjectPriority,

    pub start_date: Option<NaiveDate>,

    pub end_date: Option<NaiveDate>,

    /// 0..=100
    pub progress: i16,

    pub color: Option<String>,

    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Writable project fields, used for both create and full update
#[derive(Debug, Clone)]
pub struct ProjectInput {
    pub customer_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub priority: ProjectPriority,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub progress: i16,
    pub color: Option<String>,
    pub tags: Vec<String>,
}

impl ProjectInput {
    /// An active, medium-priority project with only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            customer_id: None,
            name: name.into(),
            description: None,
            status: ProjectStatus::Active,
            priority: ProjectPriority::Medium,
            start_date: None,
            end_date: None,
            progress: 0,
            color: None,
            tags: Vec::new(),
        }
    }
}

/// Whitelisted sort columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectSort {
    #[default]
    CreatedAt,
    Name,
    Status,
    Priority,
    StartDate,
    EndDate,
    Progress,
}

impl ProjectSort {
    fn column(&self) -> &'static str {
        match self {
            ProjectSort::CreatedAt => "p.created_at",
            ProjectSort::Name => "p.name",
            ProjectSort::Status => "p.status",
            ProjectSort::Priority => "p.priority",
            ProjectSort::StartDate => "p.start_date",
            ProjectSort::EndDate => "p.end_date",
            ProjectSort::Progress => "p.progress",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Listing filters; `None` means "no filter"
#[derive(Debug, Clone)]
pub struct ProjectFilters {
    pub search: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<ProjectPriority>,
    pub sort: ProjectSort,
    pub direction: SortDirection,
    /// 1-based
    pub page: i64,
}

impl Default for ProjectFilters {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            priority: None,
            sort: ProjectSort::default(),
            direction: SortDirection::default(),
            page: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectStats {
    pub total: i64,
    pub active: i64,
    pub completed: i64,
    /// Active projects whose end date has passed
    pub overdue: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMember {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
}

const LIST_FILTER: &str = r#"
    p.team_id = $1
    AND p.deleted_at IS NULL
    AND ($2::uuid IS NULL OR EXISTS (
        SELECT 1 FROM project_members pm WHERE pm.project_id = p.id AND pm.user_id = $2
    ))
    AND ($3::text IS NULL OR p.name ILIKE $3 OR p.description ILIKE $3)
    AND ($4::project_status IS NULL OR p.status = $4)
    AND ($5::project_priority IS NULL OR p.priority = $5)
"#;

impl Project {
    /// Days until the end date (negative once it has passed)
    pub fn days_remaining(&self, today: NaiveDate) -> Option<i64> {
        self.end_date.map(|end| (end - today).num_days())
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == ProjectStatus::Active && self.end_date.is_some_and(|end| end < today)
    }

    /// Creates a project and its member list in one transaction
    pub async fn create(
        pool: &PgPool,
        team_id: Uuid,
        input: ProjectInput,
        members: &[Uuid],
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO projects AS p
                (team_id, customer_id, name, description, status, priority,
                 start_date, end_date, progress, color, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        );

        let project = sqlx::query_as::<_, Project>(&query)
            .bind(team_id)
            .bind(input.customer_id)
            .bind(input.name)
            .bind(input.description)
            .bind(input.status)
            .bind(input.priority)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.progress)
            .bind(input.color)
            .bind(input.tags)
            .fetch_one(&mut *tx)
            .await?;

        Project::sync_members(&mut tx, project.id, members).await?;

        tx.commit().await?;

        tracing::info!(project_id = %project.id, team_id = %team_id, "Project created");
        Ok(project)
    }

    /// Finds a live project visible in `scope`
    pub async fn find_scoped<'e>(
        db: impl PgExecutor<'e>,
        id: Uuid,
        scope: TeamScope,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM projects p
            WHERE p.id = $1 AND p.deleted_at IS NULL
              AND ($2::uuid IS NULL OR p.team_id = $2)
            "#,
            PROJECT_COLUMNS
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(scope.team_filter())
            .fetch_optional(db)
            .await
    }

    /// Replaces every writable field; `members` (when given) replaces the
    /// member list in the same transaction
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        input: ProjectInput,
        members: Option<&[Uuid]>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            r#"
            UPDATE projects AS p
            SET customer_id = $2, name = $3, description = $4, status = $5, priority = $6,
                start_date = $7, end_date = $8, progress = $9, color = $10, tags = $11,
                updated_at = NOW()
            WHERE p.id = $1 AND p.deleted_at IS NULL
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        );

        let project = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(input.customer_id)
            .bind(input.name)
            .bind(input.description)
            .bind(input.status)
            .bind(input.priority)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.progress)
            .bind(input.color)
            .bind(input.tags)
            .fetch_optional(&mut *tx)
            .await?;

        if let (Some(project), Some(members)) = (&project, members) {
            Project::sync_members(&mut tx, project.id, members).await?;
        }

        tx.commit().await?;
        Ok(project)
    }

    /// Soft-deletes the project and its tasks
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            "UPDATE projects SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE tasks SET deleted_at = NOW() WHERE project_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Makes `user_ids` the exact member list of the project
    pub async fn sync_members(
        conn: &mut PgConnection,
        project_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND NOT (user_id = ANY($2))")
            .bind(project_id)
            .bind(user_ids)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO project_members (project_id, user_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT (project_id, user_id) DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(user_ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn members(pool: &PgPool, project_id: Uuid) -> Result<Vec<ProjectMember>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT u.id AS user_id, u.name, u.email, pm.role
            FROM project_members pm
            JOIN users u ON u.id = pm.user_id
            WHERE pm.project_id = $1
            ORDER BY u.name ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    pub async fn is_member<'e>(
        db: impl PgExecutor<'e>,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM project_members WHERE project_id = $1 AND user_id = $2)",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(db)
        .await
    }

    /// Filtered, sorted, paginated listing of a team's projects
    ///
    /// `visible_to` restricts the listing to projects that user is a member
    /// of; pass `None` for callers allowed to view all projects.
    pub async fn list_for_team(
        pool: &PgPool,
        team_id: Uuid,
        visible_to: Option<Uuid>,
        filters: &ProjectFilters,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        let page = filters.page.max(1);
        let search = filters
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(contains_pattern);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM projects p WHERE {}",
            LIST_FILTER
        ))
        .bind(team_id)
        .bind(visible_to)
        .bind(search.as_deref())
        .bind(filters.status)
        .bind(filters.priority)
        .fetch_one(pool)
        .await?;

        let query = format!(
            "SELECT {} FROM projects p WHERE {} ORDER BY {} {}, p.id ASC LIMIT $6 OFFSET $7",
            PROJECT_COLUMNS,
            LIST_FILTER,
            filters.sort.column(),
            filters.direction.sql()
        );

        let projects = sqlx::query_as::<_, Project>(&query)
            .bind(team_id)
            .bind(visible_to)
            .bind(search.as_deref())
            .bind(filters.status)
            .bind(filters.priority)
            .bind(PROJECTS_PER_PAGE)
            .bind((page - 1) * PROJECTS_PER_PAGE)
            .fetch_all(pool)
            .await?;

        Ok(Paginated::new(projects, total, page, PROJECTS_PER_PAGE))
    }

    pub async fn stats_for_team(pool: &PgPool, team_id: Uuid) -> Result<ProjectStats, sqlx::Error> {
        sqlx::query_as::<_, ProjectStats>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'active') AS active,
                   COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                   COUNT(*) FILTER (WHERE status = 'active' AND end_date < CURRENT_DATE) AS overdue
            FROM projects
            WHERE team_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(team_id)
        .fetch_one(pool)
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
            FROM projects p
            WHERE p.team_id = $1 AND p.deleted_at IS NULL AND p.name ILIKE $2
            ORDER BY p.name ASC
            LIMIT $3
            "#,
            PROJECT_COLUMNS
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(team_id)
            .bind(contains_pattern(term))
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Team projects that contain at least one live task assigned to the user
    pub async fn list_with_tasks_assigned_to(
        pool: &PgPool,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM projects p
            WHERE p.team_id = $1 AND p.deleted_at IS NULL
              AND EXISTS (
                  SELECT 1 FROM tasks t
                  WHERE t.project_id = p.id AND t.assignee_id = $2 AND t.deleted_at IS NULL
              )
            ORDER BY p.updated_at DESC
            "#,
            PROJECT_COLUMNS
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(team_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(status: ProjectStatus, end_date: Option<NaiveDate>) -> Project {
        let input = ProjectInput::named("Apollo");
        Project {
            id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
            customer_id: None,
            name: input.name,
            description: None,
            status,
            priority: input.priority,
            start_date: None,
            end_date,
            progress: 0,
            color: None,
            tags: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_remaining() {
        let today = date(2025, 3, 1);
        assert_eq!(project(ProjectStatus::Active, Some(date(2025, 3, 11))).days_remaining(today), Some(10));
        assert_eq!(project(ProjectStatus::Active, Some(date(2025, 2, 27))).days_remaining(today), Some(-2));
        assert_eq!(project(ProjectStatus::Active, None).days_remaining(today), None);
    }

    #[test]
    fn test_is_overdue_only_for_active_projects() {
        let today = date(2025, 3, 1);
        let past = Some(date(2025, 2, 1));

        assert!(project(ProjectStatus::Active, past).is_overdue(today));
        assert!(!project(ProjectStatus::Completed, past).is_overdue(today));
        assert!(!project(ProjectStatus::Active, Some(today)).is_overdue(today));
        assert!(!project(ProjectStatus::Active, None).is_overdue(today));
    }

    #[test]
    fn test_status_serde_uses_kebab_case() {
        assert_eq!(serde_json::to_string(&ProjectStatus::OnHold).unwrap(), "\"on-hold\"");
        assert_eq!(ProjectStatus::OnHold.as_str(), "on-hold");
        let priority: ProjectPriority = serde_json::from_str("\"urgent\"").unwrap();
        assert_eq!(priority, ProjectPriority::Urgent);
    }

    #[test]
    fn test_sort_defaults_to_newest_first() {
        let filters = ProjectFilters::default();
        assert_eq!(filters.sort.column(), "p.created_at");
        assert_eq!(filters.direction.sql(), "DESC");
        assert_eq!(filters.page, 1);
    }
}
