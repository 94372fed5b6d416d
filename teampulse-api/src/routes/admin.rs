/// Admin console endpoints
///
/// Every route here sits behind the admin layer: the caller needs the global
/// `admin` or `superadmin` role.
///
/// # Endpoints
///
/// - `GET /v1/admin/users?page=` - Users with their global roles and permissions
/// - `POST /v1/admin/users` - Create a user with a role
/// - `POST /v1/admin/roles` - Create a role
/// - `POST /v1/admin/users/:user_id/role` - Replace the user's role
/// - `POST /v1/admin/users/:user_id/permissions` - Replace direct permissions

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use teampulse_shared::{
    auth::password,
    models::{
        role::{Permission, Role},
        user::{CreateUser, User},
        Paginated,
    },
};
use uuid::Uuid;
use validator::Validate;

const USERS_PER_PAGE: i64 = 20;

/// A user as shown in the admin console
#[derive(Debug, Serialize)]
pub struct AdminUser {
    #[serde(flatten)]
    pub user: User,
    pub roles: Vec<String>,
    /// Effective permissions (through roles and direct grants)
    pub permissions: Vec<String>,
    pub direct_permissions: Vec<String>,
}

impl AdminUser {
    async fn load(state: &AppState, user: User) -> ApiResult<Self> {
        let roles = Role::names_for_user(&state.db, user.id).await?;
        let permissions = Permission::names_for_user(&state.db, user.id).await?;
        let direct_permissions = Permission::direct_names_for_user(&state.db, user.id).await?;

        Ok(Self {
            user,
            roles,
            permissions,
            direct_permissions,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Paginated<AdminUser>,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<UserListResponse>> {
    let page = query.page.unwrap_or(1).max(1);

    let total = User::count(&state.db).await?;
    let users = User::list(&state.db, USERS_PER_PAGE, (page - 1) * USERS_PER_PAGE).await?;

    let mut data = Vec::with_capacity(users.len());
    for user in users {
        data.push(AdminUser::load(&state, user).await?);
    }

    Ok(Json(UserListResponse {
        users: Paginated::new(data, total, page, USERS_PER_PAGE),
        roles: Role::list(&state.db).await?,
        permissions: Permission::list(&state.db).await?,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255, message = "The name field is required."))]
    pub name: String,

    #[validate(email(message = "Invalid email format"), length(max = 255))]
    pub email: String,

    pub password: String,

    #[validate(length(min = 1, message = "The role field is required."))]
    pub role: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<AdminUser>)> {
    req.validate()?;
    password::validate_password_strength(&req.password)?;

    if Role::find_by_name(&state.db, &req.role).await?.is_none() {
        return Err(ApiError::field("role", "The selected role is invalid."));
    }

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email.trim().to_string(),
            password_hash: password::hash_password(&req.password)?,
            name: req.name.trim().to_string(),
        },
    )
    .await?;

    Role::sync_user_role(&state.db, user.id, &req.role).await?;

    tracing::info!(user_id = %user.id, role = %req.role, "User created by admin");
    Ok((StatusCode::CREATED, Json(AdminUser::load(&state, user).await?)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 255, message = "The name field is required."))]
    pub name: String,
}

pub async fn create_role(
    State(state): State<AppState>,
    Json(req): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<Role>)> {
    req.validate()?;

    let role = Role::create(&state.db, req.name.trim()).await?;

    tracing::info!(role = %role.name, "Role created");
    Ok((StatusCode::CREATED, Json(role)))
}

async fn find_user(state: &AppState, user_id: Uuid) -> ApiResult<User> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

pub async fn update_user_role(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<Json<AdminUser>> {
    let user = find_user(&state, user_id).await?;

    Role::sync_user_role(&state.db, user.id, &req.role).await?;

    tracing::info!(user_id = %user.id, role = %req.role, "User role replaced");
    Ok(Json(AdminUser::load(&state, user).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePermissionsRequest {
    pub permissions: Vec<String>,
}

pub async fn update_user_permissions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdatePermissionsRequest>,
) -> ApiResult<Json<AdminUser>> {
    let user = find_user(&state, user_id).await?;

    let mut names = req.permissions;
    names.sort();
    names.dedup();
    Permission::sync_direct(&state.db, user.id, &names).await?;

    tracing::info!(user_id = %user.id, permissions = names.len(), "Direct permissions replaced");
    Ok(Json(AdminUser::load(&state, user).await?))
}
