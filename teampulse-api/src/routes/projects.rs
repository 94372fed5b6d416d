/// Project endpoints (current team)
///
/// # Endpoints
///
/// - `GET /v1/projects` - Filtered, sorted, paginated listing with stats
/// - `POST /v1/projects` - Create (`create projects`)
/// - `GET /v1/projects/:project_id` - Show with members and tasks
/// - `PUT /v1/projects/:project_id` - Replace (`edit projects`)
/// - `DELETE /v1/projects/:project_id` - Soft delete with tasks (`delete projects`)
///
/// # Listing Filters
///
/// `search`, `status`, `priority` (`all` disables a filter), `sort` (one of
/// `created_at`, `name`, `status`, `priority`, `start_date`, `end_date`,
/// `progress`; anything else falls back to `created_at`), `direction`
/// (`asc`/`desc`) and `page`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use teampulse_shared::{
    auth::{
        authorization::TeamContext,
        permission::TeamPermission,
        policy::{authorize, can_view_project},
    },
    models::{
        customer::Customer,
        membership::Membership,
        project::{
            Project, ProjectFilters, ProjectInput, ProjectMember, ProjectPriority, ProjectSort,
            ProjectStats, ProjectStatus, SortDirection,
        },
        task::Task,
        Paginated,
    },
};
use uuid::Uuid;
use validator::Validate;

/// A project with its derived schedule fields
#[derive(Debug, Serialize)]
pub struct ProjectListItem {
    #[serde(flatten)]
    pub project: Project,
    pub days_remaining: Option<i64>,
    pub is_overdue: bool,
}

impl ProjectListItem {
    pub fn new(project: Project, today: NaiveDate) -> Self {
        Self {
            days_remaining: project.days_remaining(today),
            is_overdue: project.is_overdue(today),
            project,
        }
    }

    pub fn page(page: Paginated<Project>, today: NaiveDate) -> Paginated<Self> {
        Paginated {
            data: page.data.into_iter().map(|p| Self::new(p, today)).collect(),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            last_page: page.last_page,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub page: Option<i64>,
}

/// Parses a kebab/snake-case enum from a query value
fn parse_enum<T: DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).ok()
}

/// `None`, empty and `all` mean "no filter"; anything else must be valid
fn parse_filter<T: DeserializeOwned>(field: &str, raw: Option<&str>) -> ApiResult<Option<T>> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => parse_enum(value)
            .map(Some)
            .ok_or_else(|| ApiError::field(field, format!("The selected {} is invalid.", field))),
    }
}

impl ProjectQuery {
    pub fn into_filters(self) -> ApiResult<ProjectFilters> {
        Ok(ProjectFilters {
            status: parse_filter::<ProjectStatus>("status", self.status.as_deref())?,
            priority: parse_filter::<ProjectPriority>("priority", self.priority.as_deref())?,
            sort: self.sort.as_deref().and_then(parse_enum::<ProjectSort>).unwrap_or_default(),
            direction: self
                .direction
                .as_deref()
                .map(str::to_ascii_lowercase)
                .as_deref()
                .and_then(parse_enum::<SortDirection>)
                .unwrap_or_default(),
            search: self.search,
            page: self.page.unwrap_or(1).max(1),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Paginated<ProjectListItem>,
    pub stats: ProjectStats,
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<Json<ProjectListResponse>> {
    let filters = query.into_filters()?;
    let visible_to = (!ctx.can(TeamPermission::ViewAllProjects)).then_some(ctx.user_id);

    let page = Project::list_for_team(&state.db, ctx.team_id, visible_to, &filters).await?;
    let stats = Project::stats_for_team(&state.db, ctx.team_id).await?;

    Ok(Json(ProjectListResponse {
        projects: ProjectListItem::page(page, Utc::now().date_naive()),
        stats,
    }))
}

/// Body for create and full update
#[derive(Debug, Deserialize, Validate)]
pub struct ProjectRequest {
    pub customer_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255, message = "The name field is required."))]
    pub name: String,

    #[validate(length(max = 10000))]
    pub description: Option<String>,

    pub status: Option<ProjectStatus>,

    pub priority: Option<ProjectPriority>,

    pub start_date: Option<NaiveDate>,

    pub end_date: Option<NaiveDate>,

    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100."))]
    pub progress: Option<i16>,

    #[validate(length(max = 32))]
    pub color: Option<String>,

    pub tags: Option<Vec<String>>,

    /// Replaces the member list when present
    pub members: Option<Vec<Uuid>>,
}

impl ProjectRequest {
    /// Validates the body against the team and splits off the member list
    async fn into_input(self, state: &AppState, team_id: Uuid) -> ApiResult<(ProjectInput, Option<Vec<Uuid>>)> {
        self.validate()?;

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ApiError::field("end_date", "The end date must be on or after the start date."));
            }
        }

        if let Some(customer_id) = self.customer_id {
            if !Customer::belongs_to_team(&state.db, customer_id, team_id).await? {
                return Err(ApiError::field("customer_id", "The selected customer is invalid."));
            }
        }

        let members = match self.members {
            Some(mut members) => {
                members.sort();
                members.dedup();
                let found = Membership::count_members_among(&state.db, team_id, &members).await?;
                if found != members.len() as i64 {
                    return Err(ApiError::field("members", "Every project member must belong to the team."));
                }
                Some(members)
            }
            None => None,
        };

        let tags = self
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let input = ProjectInput {
            customer_id: self.customer_id,
            name: self.name.trim().to_string(),
            description: self.description,
            status: self.status.unwrap_or(ProjectStatus::Active),
            priority: self.priority.unwrap_or(ProjectPriority::Medium),
            start_date: self.start_date,
            end_date: self.end_date,
            progress: self.progress.unwrap_or(0),
            color: self.color,
            tags,
        };

        Ok((input, members))
    }
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Json(req): Json<ProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectListItem>)> {
    ctx.require(TeamPermission::CreateProjects)?;

    let (input, members) = req.into_input(&state, ctx.team_id).await?;
    let project = Project::create(&state.db, ctx.team_id, input, members.as_deref().unwrap_or_default()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ProjectListItem::new(project, Utc::now().date_naive())),
    ))
}

#[derive(Debug, Serialize)]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub project: ProjectListItem,
    pub members: Vec<ProjectMember>,
    pub tasks: Vec<Task>,
}

/// Loads a project in the caller's scope or fails with 404
pub(crate) async fn find_project(state: &AppState, ctx: &TeamContext, id: Uuid) -> ApiResult<Project> {
    Project::find_scoped(&state.db, id, ctx.scope())
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))
}

/// Loads a project and applies the view policy
pub(crate) async fn find_viewable_project(state: &AppState, ctx: &TeamContext, id: Uuid) -> ApiResult<Project> {
    let project = find_project(state, ctx, id).await?;
    let is_member = Project::is_member(&state.db, project.id, ctx.user_id).await?;
    authorize(can_view_project(ctx, is_member))?;
    Ok(project)
}

pub async fn show_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ProjectDetails>> {
    let project = find_viewable_project(&state, &ctx, project_id).await?;

    let members = Project::members(&state.db, project.id).await?;
    let tasks = Task::list_for_project(&state.db, project.id).await?;

    Ok(Json(ProjectDetails {
        project: ProjectListItem::new(project, Utc::now().date_naive()),
        members,
        tasks,
    }))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<ProjectRequest>,
) -> ApiResult<Json<ProjectListItem>> {
    ctx.require(TeamPermission::EditProjects)?;
    let project = find_project(&state, &ctx, project_id).await?;

    let (input, members) = req.into_input(&state, project.team_id).await?;
    let project = Project::update(&state.db, project.id, input, members.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Json(ProjectListItem::new(project, Utc::now().date_naive())))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    ctx.require(TeamPermission::DeleteProjects)?;
    let project = find_project(&state, &ctx, project_id).await?;

    Project::soft_delete(&state.db, project.id).await?;
    tracing::info!(project_id = %project.id, user_id = %ctx.user_id, "Project deleted");

    Ok(StatusCode::NO_CONTENT)
}
