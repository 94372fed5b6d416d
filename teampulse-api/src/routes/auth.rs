/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register, optionally accepting an invitation
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for a new access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use teampulse_shared::{
    auth::{jwt, password},
    models::{
        invitation::Invitation,
        role::Role,
        user::{CreateUser, User},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Global role every new account starts with
const DEFAULT_ROLE: &str = "user";

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255, message = "The name field is required."))]
    pub name: String,

    #[validate(email(message = "Invalid email format"), length(max = 255))]
    pub email: String,

    /// Checked against the password strength rules
    pub password: String,

    /// Token from an invitation link; accepted right after registration
    pub invitation_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,

    /// Team joined through the invitation, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joined_team_id: Option<Uuid>,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "name": "Ada Lovelace",
///   "email": "ada@example.com",
///   "password": "engines1843",
///   "invitation_token": "optional 64-char token"
/// }
/// ```
///
/// An invalid or foreign invitation token does not fail the registration;
/// the account is created without joining a team.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed or weak password
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;
    password::validate_password_strength(&req.password)?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email.trim().to_string(),
            password_hash,
            name: req.name.trim().to_string(),
        },
    )
    .await?;

    Role::sync_user_role(&state.db, user.id, DEFAULT_ROLE).await?;

    let joined_team_id = match req.invitation_token.as_deref() {
        Some(token) => match Invitation::accept(&state.db, token, &user).await {
            Ok(invitation) => Some(invitation.team_id),
            Err(err) => {
                tracing::warn!(user_id = %user.id, error = %err, "Invitation not accepted at registration");
                None
            }
        },
        None => None,
    };

    // Reload to pick up the current team set by the invitation
    let user = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::InternalError("User vanished after registration".to_string()))?;

    let tokens = jwt::TokenPair::issue(user.id, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user,
            joined_team_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }),
    ))
}

/// Login with email and password
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected");
        return Err(invalid());
    }

    User::update_last_login(&state.db, user.id).await?;

    let tokens = jwt::TokenPair::issue(user.id, state.jwt_secret())?;

    Ok(Json(AuthResponse {
        user,
        joined_team_id: None,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// Exchange a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}
