/// Team context resolution
///
/// Team-scoped routes run behind [`team_context_middleware`]. It picks the
/// active team from the `team_id` path parameter, falling back to the
/// caller's current team, resolves the caller's role there and inserts the
/// resulting [`TeamContext`] into the request extensions. Handlers extract it
/// with `Extension<TeamContext>`.
///
/// # Failures
///
/// - `400` when `team_id` is not a UUID
/// - `403` when no team is given and none is selected ("No active team")
/// - `403` when the caller is not a member (and not a superadmin)
/// - `404` when the team does not exist

use axum::{
    extract::{RawPathParams, Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use teampulse_shared::auth::authorization::{AuthzError, TeamContext};
use teampulse_shared::auth::middleware::AuthContext;
use teampulse_shared::models::user::User;
use uuid::Uuid;

use crate::{app::AppState, error::ApiError};

const TEAM_PARAM: &str = "team_id";

/// The `team_id` path parameter, if the route has one
fn team_param(params: Option<&RawPathParams>) -> Result<Option<Uuid>, ApiError> {
    let Some(raw) = params
        .and_then(|params| params.iter().find(|(key, _)| *key == TEAM_PARAM).map(|(_, value)| value))
    else {
        return Ok(None);
    };

    Uuid::parse_str(raw)
        .map(Some)
        .map_err(|_| ApiError::BadRequest(format!("Invalid team id: {}", raw)))
}

/// The team a request without an explicit team works in
async fn current_team_id(state: &AppState, user_id: Uuid) -> Result<Option<Uuid>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    Ok(user.current_team_id)
}

pub async fn team_context_middleware(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    params: Option<RawPathParams>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let team_id = match team_param(params.as_ref())? {
        Some(team_id) => team_id,
        None => current_team_id(&state, auth.user_id)
            .await?
            .ok_or(AuthzError::NoActiveTeam)?,
    };

    let ctx = TeamContext::resolve(&state.db, auth.user_id, team_id).await?;

    tracing::debug!(
        user_id = %ctx.user_id,
        team_id = %ctx.team_id,
        role = ?ctx.role,
        superadmin = ctx.is_superadmin,
        "Team context resolved"
    );

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

/// Context for the caller's current team, for routes that work without one
///
/// A stale current team (deleted, or the caller was removed) yields `None`.
pub async fn optional_team_context(
    state: &AppState,
    user_id: Uuid,
) -> Result<Option<TeamContext>, ApiError> {
    let Some(team_id) = current_team_id(state, user_id).await? else {
        return Ok(None);
    };

    match TeamContext::resolve(&state.db, user_id, team_id).await {
        Ok(ctx) => Ok(Some(ctx)),
        Err(AuthzError::NotMember(_) | AuthzError::TeamNotFound(_)) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
