/// Team endpoints
///
/// # Endpoints
///
/// - `GET /v1/teams` - Teams of the caller with their role
/// - `POST /v1/teams` - Create a team owned by the caller
/// - `PUT /v1/teams/:team_id` - Rename (`manage team settings`)
/// - `DELETE /v1/teams/:team_id` - Delete (`delete team`)
/// - `POST /v1/teams/:team_id/switch` - Make it the caller's current team
/// - `GET /v1/teams/:team_id/members` - List members
/// - `PUT /v1/teams/:team_id/members/roles` - Bulk role update (`change member roles`)
/// - `DELETE /v1/teams/:team_id/members/:user_id` - Remove a member (`remove members`)
///
/// Routes under `/teams/:team_id` receive their [`TeamContext`] from the
/// team context middleware.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use teampulse_shared::{
    auth::{authorization::TeamContext, middleware::AuthContext, permission::TeamPermission},
    models::{
        membership::{Membership, RoleUpdate, TeamMember},
        team::{Team, UserTeam},
        user::User,
    },
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct TeamRequest {
    #[validate(length(min = 1, max = 255, message = "The name field is required."))]
    pub name: String,
}

impl TeamRequest {
    fn validated_name(&self) -> ApiResult<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::field("name", "The name field is required."));
        }
        self.validate()?;
        Ok(name.to_string())
    }
}

pub async fn list_teams(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<UserTeam>>> {
    let teams = Team::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(teams))
}

/// Create a team; the caller becomes its owner and switches to it
pub async fn create_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<TeamRequest>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    let name = req.validated_name()?;
    let team = Team::create_with_owner(&state.db, &name, auth.user_id).await?;

    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn update_team(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Json(req): Json<TeamRequest>,
) -> ApiResult<Json<Team>> {
    ctx.require(TeamPermission::ManageTeamSettings)?;
    let name = req.validated_name()?;

    let team = Team::rename(&state.db, ctx.team_id, &name, ctx.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    tracing::info!(team_id = %team.id, user_id = %ctx.user_id, "Team renamed");
    Ok(Json(team))
}

pub async fn delete_team(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
) -> ApiResult<StatusCode> {
    ctx.require(TeamPermission::DeleteTeam)?;

    if !Team::delete(&state.db, ctx.team_id).await? {
        return Err(ApiError::NotFound("Team not found".to_string()));
    }

    tracing::info!(team_id = %ctx.team_id, user_id = %ctx.user_id, "Team deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct SwitchResponse {
    pub current_team_id: Uuid,
}

/// The middleware already rejected non-members
pub async fn switch_team(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
) -> ApiResult<Json<SwitchResponse>> {
    User::set_current_team(&state.db, ctx.user_id, Some(ctx.team_id)).await?;

    tracing::debug!(team_id = %ctx.team_id, user_id = %ctx.user_id, "Switched team");
    Ok(Json(SwitchResponse {
        current_team_id: ctx.team_id,
    }))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
) -> ApiResult<Json<Vec<TeamMember>>> {
    let members = Membership::list_members(&state.db, ctx.team_id).await?;
    Ok(Json(members))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRolesRequest {
    pub roles: Vec<RoleUpdate>,
}

/// Checks every change against the caller's own rank
///
/// Unknown targets are left to the membership layer, which reports them as
/// a validation error.
fn check_role_changes(
    ctx: &TeamContext,
    members: &[TeamMember],
    updates: &[RoleUpdate],
) -> ApiResult<()> {
    for update in updates {
        if !ctx.can_act_on(update.role) {
            return Err(ApiError::Forbidden(format!(
                "You cannot grant the {} role",
                update.role
            )));
        }

        let current = members.iter().find(|m| m.user_id == update.user_id);
        if let Some(member) = current {
            if !ctx.can_act_on(member.role) {
                return Err(ApiError::Forbidden(format!(
                    "You cannot change the role of a {}",
                    member.role
                )));
            }
        }
    }

    Ok(())
}

pub async fn update_roles(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Json(req): Json<UpdateRolesRequest>,
) -> ApiResult<Json<Vec<TeamMember>>> {
    ctx.require(TeamPermission::ChangeMemberRoles)?;

    if req.roles.is_empty() {
        return Err(ApiError::field("roles", "At least one role change is required."));
    }

    let members = Membership::list_members(&state.db, ctx.team_id).await?;
    check_role_changes(&ctx, &members, &req.roles)?;

    Membership::bulk_update_roles(&state.db, ctx.team_id, &req.roles).await?;

    let members = Membership::list_members(&state.db, ctx.team_id).await?;
    Ok(Json(members))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path((_team_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    ctx.require(TeamPermission::RemoveMembers)?;

    let role = Membership::get_role(&state.db, ctx.team_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;

    if !ctx.can_act_on(role) {
        return Err(ApiError::Forbidden(format!("You cannot remove a {}", role)));
    }

    Membership::remove_member(&state.db, ctx.team_id, user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
