/// Task endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects/:project_id/tasks` - Tasks of a visible project
/// - `POST /v1/projects/:project_id/tasks` - Create (`create tasks`)
/// - `GET /v1/tasks/:task_id` - Show with comments and watchers
/// - `PUT /v1/tasks/:task_id` - Replace (`edit tasks` or assignee)
/// - `DELETE /v1/tasks/:task_id` - Soft delete (`delete tasks` or creator)
/// - `GET|POST|DELETE /v1/tasks/:task_id/watchers` - List, watch, unwatch
///
/// Tasks always belong to their project's team. A client-supplied `team_id`
/// that disagrees with the project is a validation error, never a way to move
/// a task between teams.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use teampulse_shared::{
    auth::{
        authorization::TeamContext,
        permission::TeamPermission,
        policy::{authorize, can_delete_task, can_update_task},
    },
    models::{
        comment::{Comment, CommentWithAuthor},
        membership::Membership,
        project::Project,
        task::{Task, TaskInput, TaskPriority, TaskStatus},
        user::UserSummary,
        watcher::Watcher,
    },
};
use uuid::Uuid;
use validator::Validate;

use super::projects::{find_project, find_viewable_project};

/// A task with its derived overdue flag
#[derive(Debug, Serialize)]
pub struct TaskItem {
    #[serde(flatten)]
    pub task: Task,
    pub is_overdue: bool,
}

impl TaskItem {
    fn new(task: Task, today: NaiveDate) -> Self {
        Self {
            is_overdue: task.is_overdue(today),
            task,
        }
    }
}

/// Body for create and full update
#[derive(Debug, Deserialize, Validate)]
pub struct TaskRequest {
    /// Must match the project's team when given
    pub team_id: Option<Uuid>,

    pub assignee_id: Option<Uuid>,

    pub parent_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255, message = "The title field is required."))]
    pub title: String,

    #[validate(length(max = 10000))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    pub start_date: Option<NaiveDate>,

    pub due_date: Option<NaiveDate>,

    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100."))]
    pub progress: Option<i16>,
}

impl TaskRequest {
    /// Checks the body against `project` and builds the model input
    ///
    /// `task_id` is the task being updated; it cannot move under itself or
    /// any of its subtasks.
    async fn into_input(
        self,
        state: &AppState,
        project: &Project,
        task_id: Option<Uuid>,
    ) -> ApiResult<TaskInput> {
        self.validate()?;

        if self.team_id.is_some_and(|team_id| team_id != project.team_id) {
            return Err(ApiError::field("team_id", "The task must belong to the project's team."));
        }

        if let (Some(start), Some(due)) = (self.start_date, self.due_date) {
            if due < start {
                return Err(ApiError::field("due_date", "The due date must be on or after the start date."));
            }
        }

        if let Some(assignee_id) = self.assignee_id {
            if !Membership::is_member(&state.db, project.team_id, assignee_id).await? {
                return Err(ApiError::field("assignee_id", "The assignee must be a member of the team."));
            }
        }

        if let Some(parent_id) = self.parent_id {
            if !Task::exists_in_project(&state.db, parent_id, project.id).await? {
                return Err(ApiError::field("parent_id", "The parent task must belong to the same project."));
            }

            if let Some(task_id) = task_id {
                if Task::descends_from(&state.db, parent_id, task_id).await? {
                    return Err(ApiError::field("parent_id", "A task cannot be nested under itself or its subtasks."));
                }
            }
        }

        Ok(TaskInput {
            assignee_id: self.assignee_id,
            parent_id: self.parent_id,
            title: self.title.trim().to_string(),
            description: self.description,
            status: self.status.unwrap_or(TaskStatus::Todo),
            priority: self.priority.unwrap_or(TaskPriority::Medium),
            start_date: self.start_date,
            due_date: self.due_date,
            progress: self.progress.unwrap_or(0),
        })
    }
}

async fn find_task(state: &AppState, ctx: &TeamContext, id: Uuid) -> ApiResult<Task> {
    Task::find_scoped(&state.db, id, ctx.scope())
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<TaskItem>>> {
    let project = find_viewable_project(&state, &ctx, project_id).await?;
    let today = Utc::now().date_naive();

    let tasks = Task::list_for_project(&state.db, project.id)
        .await?
        .into_iter()
        .map(|task| TaskItem::new(task, today))
        .collect();

    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskItem>)> {
    ctx.require(TeamPermission::CreateTasks)?;
    let project = find_project(&state, &ctx, project_id).await?;

    let input = req.into_input(&state, &project, None).await?;
    let task = Task::create(&state.db, project.team_id, project.id, ctx.user_id, input).await?;

    tracing::info!(task_id = %task.id, project_id = %project.id, user_id = %ctx.user_id, "Task created");
    Ok((StatusCode::CREATED, Json(TaskItem::new(task, Utc::now().date_naive()))))
}

#[derive(Debug, Serialize)]
pub struct TaskDetails {
    #[serde(flatten)]
    pub task: TaskItem,
    pub comments: Vec<CommentWithAuthor>,
    pub watchers: Vec<UserSummary>,
}

pub async fn show_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskDetails>> {
    let task = find_task(&state, &ctx, task_id).await?;
    find_viewable_project(&state, &ctx, task.project_id).await?;

    let comments = Comment::list_for_task(&state.db, task.id).await?;
    let watchers = Watcher::list_for_task(&state.db, task.id).await?;

    Ok(Json(TaskDetails {
        task: TaskItem::new(task, Utc::now().date_naive()),
        comments,
        watchers,
    }))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<Json<TaskItem>> {
    let task = find_task(&state, &ctx, task_id).await?;
    authorize(can_update_task(&ctx, &task))?;

    let project = find_project(&state, &ctx, task.project_id).await?;
    let input = req.into_input(&state, &project, Some(task.id)).await?;

    let task = Task::update(&state.db, task.id, input)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(TaskItem::new(task, Utc::now().date_naive())))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let task = find_task(&state, &ctx, task_id).await?;
    authorize(can_delete_task(&ctx, &task))?;

    Task::soft_delete(&state.db, task.id).await?;
    tracing::info!(task_id = %task.id, user_id = %ctx.user_id, "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_watchers(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let task = find_task(&state, &ctx, task_id).await?;
    let watchers = Watcher::list_for_task(&state.db, task.id).await?;
    Ok(Json(watchers))
}

#[derive(Debug, Serialize)]
pub struct WatchResponse {
    pub watching: bool,
}

pub async fn watch_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<WatchResponse>> {
    let task = find_task(&state, &ctx, task_id).await?;
    Watcher::watch(&state.db, task.id, ctx.user_id).await?;
    Ok(Json(WatchResponse { watching: true }))
}

pub async fn unwatch_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<WatchResponse>> {
    let task = find_task(&state, &ctx, task_id).await?;
    Watcher::unwatch(&state.db, task.id, ctx.user_id).await?;
    Ok(Json(WatchResponse { watching: false }))
}
