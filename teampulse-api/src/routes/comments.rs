/// Comment endpoints
///
/// - `POST /v1/tasks/:task_id/comments` - Comment on a task (any team member)
/// - `PUT /v1/comments/:comment_id` - Edit (author only)
/// - `DELETE /v1/comments/:comment_id` - Delete (author or `delete tasks`)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use teampulse_shared::{
    auth::{
        authorization::TeamContext,
        policy::{authorize, can_delete_comment, can_update_comment},
    },
    models::{comment::Comment, task::Task},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 5000, message = "The content field is required."))]
    pub content: String,
}

impl CommentRequest {
    fn content(&self) -> ApiResult<&str> {
        self.validate()?;
        let content = self.content.trim();
        if content.is_empty() {
            return Err(ApiError::field("content", "The content field is required."));
        }
        Ok(content)
    }
}

async fn find_comment(state: &AppState, ctx: &TeamContext, id: Uuid) -> ApiResult<Comment> {
    Comment::find_scoped(&state.db, id, ctx.scope())
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let task = Task::find_scoped(&state.db, task_id, ctx.scope())
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let comment = Comment::create(&state.db, task.id, ctx.user_id, req.content()?).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(comment_id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<Comment>> {
    let comment = find_comment(&state, &ctx, comment_id).await?;
    authorize(can_update_comment(&ctx, &comment))?;

    let comment = Comment::update_content(&state.db, comment.id, req.content()?)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path(comment_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let comment = find_comment(&state, &ctx, comment_id).await?;
    authorize(can_delete_comment(&ctx, &comment))?;

    Comment::delete(&state.db, comment.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_content_trimmed() {
        let req = CommentRequest {
            content: "  Looks good  ".to_string(),
        };
        assert_eq!(req.content().unwrap(), "Looks good");
    }

    #[test]
    fn test_whitespace_comment_rejected() {
        let req = CommentRequest {
            content: " \n ".to_string(),
        };
        assert!(matches!(req.content(), Err(ApiError::ValidationError(_))));
    }
}
