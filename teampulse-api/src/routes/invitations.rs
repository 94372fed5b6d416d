/// Team invitation endpoints
///
/// # Endpoints
///
/// - `GET /v1/invitations/:token` - Public preview of a pending invitation
/// - `POST /v1/invitations/:token/accept` - Accept as the signed-in user
/// - `GET /v1/teams/:team_id/invitations` - Pending invitations (`invite members`)
/// - `POST /v1/teams/:team_id/invitations` - Invite by email (`invite members`)
/// - `DELETE /v1/teams/:team_id/invitations/:invitation_id` - Revoke (`invite members`)
///
/// # Flow
///
/// ```text
/// create ──> mail with /invitations/{token}/accept
///              │
///              ├── account exists ──> POST .../accept (same email)
///              └── no account ──────> POST /v1/auth/register { invitation_token }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teampulse_shared::{
    auth::{authorization::TeamContext, middleware::AuthContext, permission::TeamPermission},
    mail::invitation::{accept_url, InvitationMail},
    models::{
        invitation::{Invitation, NewInvitation},
        membership::TeamRole,
        team::Team,
        user::User,
    },
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct InvitationPreview {
    pub team_id: Uuid,
    pub team_name: String,
    pub email: String,
    pub role: TeamRole,
    pub expires_at: DateTime<Utc>,
    /// No account exists yet for the invited email
    pub registration_required: bool,
}

pub async fn show_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<InvitationPreview>> {
    let not_found = || ApiError::NotFound("Invitation not found or expired".to_string());

    let invitation = Invitation::find_valid_by_token(&state.db, &token)
        .await?
        .ok_or_else(not_found)?;
    let team = Team::find_by_id(&state.db, invitation.team_id)
        .await?
        .ok_or_else(not_found)?;
    let registration_required = User::find_by_email(&state.db, &invitation.email)
        .await?
        .is_none();

    Ok(Json(InvitationPreview {
        team_id: team.id,
        team_name: team.name,
        email: invitation.email,
        role: invitation.role,
        expires_at: invitation.expires_at,
        registration_required,
    }))
}

#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub team_id: Uuid,
    pub role: TeamRole,
}

/// Accept an invitation addressed to the caller's email
///
/// # Errors
///
/// - `404 Not Found`: Unknown or expired token
/// - `403 Forbidden`: The invitation was sent to another address
pub async fn accept_invitation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(token): Path<String>,
) -> ApiResult<Json<AcceptResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    let invitation = Invitation::accept(&state.db, &token, &user).await?;

    Ok(Json(AcceptResponse {
        team_id: invitation.team_id,
        role: invitation.role,
    }))
}

pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
) -> ApiResult<Json<Vec<Invitation>>> {
    ctx.require(TeamPermission::InviteMembers)?;

    let invitations = Invitation::list_pending(&state.db, ctx.team_id).await?;
    Ok(Json(invitations))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvitationRequest {
    #[validate(email(message = "Invalid email format"), length(max = 255))]
    pub email: String,

    pub role: TeamRole,
}

/// Invite someone by email
///
/// The invitation only survives if its mail was handed to the mailer;
/// otherwise it is revoked again and the request fails with 503.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid email, already a member, or already invited
/// - `403 Forbidden`: Missing `invite members`, or the role outranks the caller
/// - `503 Service Unavailable`: The invitation mail could not be sent
pub async fn create_invitation(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Json(req): Json<CreateInvitationRequest>,
) -> ApiResult<(StatusCode, Json<Invitation>)> {
    ctx.require(TeamPermission::InviteMembers)?;
    req.validate()?;

    if !ctx.can_act_on(req.role) {
        return Err(ApiError::Forbidden(format!("You cannot invite a {}", req.role)));
    }

    let team = Team::find_by_id(&state.db, ctx.team_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    let (invitation, token) = Invitation::create(
        &state.db,
        NewInvitation {
            team_id: team.id,
            email: req.email.trim().to_string(),
            role: req.role,
            invited_by: Some(ctx.user_id),
            ttl: state.config.invitation_ttl(),
        },
    )
    .await?;

    let url = accept_url(&state.config.app.url, &token);
    let mail = InvitationMail {
        app_name: &state.config.app.name,
        team_name: &team.name,
        role: invitation.role,
        accept_url: &url,
        expires_at: invitation.expires_at,
    }
    .render(&invitation.email);

    if let Err(err) = state.mailer.send(mail).await {
        tracing::error!(
            invitation_id = %invitation.id,
            team_id = %team.id,
            error = %err,
            "Invitation mail failed, revoking invitation"
        );
        Invitation::revoke(&state.db, team.id, invitation.id).await?;
        return Err(err.into());
    }

    Ok((StatusCode::CREATED, Json(invitation)))
}

pub async fn revoke_invitation(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Path((_team_id, invitation_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    ctx.require(TeamPermission::InviteMembers)?;

    if !Invitation::revoke(&state.db, ctx.team_id, invitation_id).await? {
        return Err(ApiError::NotFound("Invitation not found".to_string()));
    }

    tracing::info!(invitation_id = %invitation_id, team_id = %ctx.team_id, "Invitation revoked");
    Ok(StatusCode::NO_CONTENT)
}
