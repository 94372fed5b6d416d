/// The signed-in user's view of the application
///
/// # Endpoints
///
/// - `GET /v1/me` - Account, teams, global roles and permissions
/// - `GET /v1/dashboard?tab=dashboard|projects|teams` - Dashboard payload

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::team_context::optional_team_context,
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use teampulse_shared::{
    auth::{
        authorization::TeamContext,
        middleware::AuthContext,
        permission::{TeamPermission, MANAGEMENT_PERMISSIONS, SUPERADMIN_ROLE},
    },
    models::{
        project::{Project, ProjectFilters, ProjectStats},
        role::{Permission, Role},
        task::{PriorityCount, Task, TaskStats},
        team::{Team, UserTeam},
        user::User,
        Paginated,
    },
};
use uuid::Uuid;

use super::projects::ProjectListItem;

/// Tasks shown per project preview
const PREVIEW_TASKS: i64 = 3;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub teams: Vec<UserTeam>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    /// `manage users` or `manage roles`
    pub has_management_permissions: bool,
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MeResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    let teams = Team::list_for_user(&state.db, user.id).await?;
    let roles = Role::names_for_user(&state.db, user.id).await?;
    let permissions = Permission::names_for_user(&state.db, user.id).await?;
    let has_management_permissions = permissions
        .iter()
        .any(|p| MANAGEMENT_PERMISSIONS.contains(&p.as_str()));

    Ok(Json(MeResponse {
        user,
        teams,
        roles,
        permissions,
        has_management_permissions,
    }))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardTab {
    #[default]
    Dashboard,
    Projects,
    Teams,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub tab: DashboardTab,
}

/// A team card with what the caller may do there
#[derive(Debug, Serialize)]
pub struct TeamCard {
    #[serde(flatten)]
    pub team: UserTeam,
    pub can_delete: bool,
    pub can_manage_team: bool,
    pub can_edit_roles: bool,
}

impl TeamCard {
    fn new(team: UserTeam, is_superadmin: bool) -> Self {
        let can = |p: TeamPermission| is_superadmin || team.role.has_permission(p);
        Self {
            can_delete: can(TeamPermission::DeleteTeam),
            can_manage_team: can(TeamPermission::ManageTeamSettings),
            can_edit_roles: can(TeamPermission::ChangeMemberRoles),
            team,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectPreview {
    pub project: Project,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct DashboardSection {
    pub task_stats: TaskStats,
    pub open_by_priority: Vec<PriorityCount>,
    pub projects: Vec<ProjectPreview>,
    pub is_manager: bool,
}

#[derive(Debug, Serialize)]
pub struct ProjectsSection {
    pub projects: Paginated<ProjectListItem>,
    pub stats: ProjectStats,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub active_tab: DashboardTab,
    pub current_team_id: Option<Uuid>,
    pub teams: Vec<TeamCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<DashboardSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<ProjectsSection>,
}

async fn dashboard_section(state: &AppState, ctx: &TeamContext) -> ApiResult<DashboardSection> {
    let task_stats = Task::stats_for_assignee(&state.db, ctx.team_id, ctx.user_id).await?;
    let open_by_priority = Task::open_by_priority(&state.db, ctx.team_id, ctx.user_id).await?;

    let mut projects = Vec::new();
    for project in Project::list_with_tasks_assigned_to(&state.db, ctx.team_id, ctx.user_id).await? {
        let tasks =
            Task::list_assigned_in_project(&state.db, project.id, ctx.user_id, PREVIEW_TASKS).await?;
        projects.push(ProjectPreview { project, tasks });
    }

    Ok(DashboardSection {
        task_stats,
        open_by_priority,
        projects,
        is_manager: ctx.is_manager(),
    })
}

async fn projects_section(state: &AppState, ctx: &TeamContext) -> ApiResult<ProjectsSection> {
    let visible_to = (!ctx.can(TeamPermission::ViewAllProjects)).then_some(ctx.user_id);
    let page = Project::list_for_team(&state.db, ctx.team_id, visible_to, &ProjectFilters::default()).await?;
    let stats = Project::stats_for_team(&state.db, ctx.team_id).await?;

    Ok(ProjectsSection {
        projects: ProjectListItem::page(page, Utc::now().date_naive()),
        stats,
    })
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<DashboardResponse>> {
    let ctx = optional_team_context(&state, auth.user_id).await?;
    let is_superadmin = Role::user_has_any(&state.db, auth.user_id, &[SUPERADMIN_ROLE]).await?;

    let teams = Team::list_for_user(&state.db, auth.user_id)
        .await?
        .into_iter()
        .map(|team| TeamCard::new(team, is_superadmin))
        .collect();

    let (dashboard, projects) = match (&ctx, query.tab) {
        (Some(ctx), DashboardTab::Dashboard) => (Some(dashboard_section(&state, ctx).await?), None),
        (Some(ctx), DashboardTab::Projects) => (None, Some(projects_section(&state, ctx).await?)),
        _ => (None, None),
    };

    Ok(Json(DashboardResponse {
        active_tab: query.tab,
        current_team_id: ctx.map(|c| c.team_id),
        teams,
        dashboard,
        projects,
    }))
}
