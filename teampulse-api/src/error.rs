/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`; domain errors from the shared
/// crate convert with `?`.
///
/// # Example
///
/// ```
/// use teampulse_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(name: String) -> ApiResult<Json<serde_json::Value>> {
///     if name.is_empty() {
///         return Err(ApiError::field("name", "The name field is required."));
///     }
///     Ok(Json(json!({ "name": name })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use teampulse_shared::auth::authorization::AuthzError;
use teampulse_shared::auth::jwt::JwtError;
use teampulse_shared::auth::middleware::AuthError;
use teampulse_shared::auth::password::PasswordError;
use teampulse_shared::mail::MailError;
use teampulse_shared::models::invitation::InvitationError;
use teampulse_shared::models::membership::MembershipError;
use teampulse_shared::models::role::RoleError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate email
    Conflict(String),

    /// Unprocessable entity (422) with field-level details
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// A 422 carrying a single field error
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_code, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::ValidationError(errors) => (
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Logged, never exposed
                tracing::error!("Internal error: {}", msg);
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg, None),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    return match constraint {
                        "users_email_key" => ApiError::Conflict("Email already exists".to_string()),
                        "roles_name_key" => ApiError::field("name", "This role already exists."),
                        "tasks_project_team_fkey" => {
                            ApiError::field("team_id", "The task's team must match its project's team.")
                        }
                        "projects_dates_check" => {
                            ApiError::field("end_date", "The end date must be on or after the start date.")
                        }
                        other => ApiError::Conflict(format!("Constraint violation: {}", other)),
                    };
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("The {} field is invalid ({}).", field, e.code)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationError(details)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::Unauthorized("Missing credentials".to_string()),
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::TeamNotFound(_) => ApiError::NotFound("Team not found".to_string()),
            AuthzError::NotMember(_) => ApiError::Forbidden("Not a member of this team".to_string()),
            AuthzError::NoActiveTeam => ApiError::Forbidden("No active team".to_string()),
            AuthzError::MissingPermission(permission) => {
                ApiError::Forbidden(format!("Missing permission: {}", permission))
            }
            AuthzError::NotAdmin => ApiError::Forbidden("Administrator role required".to_string()),
            AuthzError::NotAuthorized => {
                ApiError::Forbidden("Not authorized to perform this action".to_string())
            }
            AuthzError::DatabaseError(err) => err.into(),
        }
    }
}

impl From<MembershipError> for ApiError {
    fn from(err: MembershipError) -> Self {
        match err {
            MembershipError::NotMember(_) => ApiError::field("user_id", err.to_string()),
            MembershipError::LastOwner => ApiError::field("user_id", err.to_string()),
            MembershipError::NoManagerRemaining | MembershipError::NoOwnerRemaining => {
                ApiError::field("roles", err.to_string())
            }
            MembershipError::Database(err) => err.into(),
        }
    }
}

impl From<InvitationError> for ApiError {
    fn from(err: InvitationError) -> Self {
        match err {
            InvitationError::AlreadyMember | InvitationError::AlreadyInvited => {
                ApiError::field("email", err.to_string())
            }
            InvitationError::NotFound => ApiError::NotFound(err.to_string()),
            InvitationError::EmailMismatch => ApiError::Forbidden(err.to_string()),
            InvitationError::Database(err) => err.into(),
        }
    }
}

impl From<RoleError> for ApiError {
    fn from(err: RoleError) -> Self {
        match err {
            RoleError::UnknownRole(_) => ApiError::field("role", err.to_string()),
            RoleError::UnknownPermission(_) => ApiError::field("permissions", err.to_string()),
            RoleError::Database(err) => err.into(),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooWeak(msg) => ApiError::field("password", msg),
            other => ApiError::InternalError(format!("Password operation failed: {}", other)),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer => ApiError::Unauthorized("Invalid token issuer".to_string()),
            JwtError::CreateError(msg) => ApiError::InternalError(format!("Token creation failed: {}", msg)),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        tracing::warn!(error = %err, "Mail delivery failed");
        ApiError::ServiceUnavailable("Mail delivery failed, please try again later".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teampulse_shared::auth::permission::TeamPermission;
    use uuid::Uuid;
    use validator::Validate;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[test]
    fn test_field_error() {
        let err = ApiError::field("email", "Already invited");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "email");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_authz_errors_map_to_forbidden_or_not_found() {
        let err: ApiError = AuthzError::MissingPermission(TeamPermission::CreateProjects).into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Forbidden: Missing permission: create projects");

        let err: ApiError = AuthzError::NoActiveTeam.into();
        assert_eq!(err.to_string(), "Forbidden: No active team");

        let err: ApiError = AuthzError::TeamNotFound(Uuid::new_v4()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_domain_errors_become_field_errors() {
        let err: ApiError = MembershipError::NoManagerRemaining.into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err: ApiError = MembershipError::NoOwnerRemaining.into();
        assert!(matches!(&err, ApiError::ValidationError(d) if d[0].field == "roles"));

        let err: ApiError = InvitationError::AlreadyInvited.into();
        assert!(matches!(&err, ApiError::ValidationError(d) if d[0].field == "email"));

        let err: ApiError = InvitationError::EmailMismatch.into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err: ApiError = PasswordError::TooWeak("Too short".to_string()).into();
        assert!(matches!(&err, ApiError::ValidationError(d) if d[0].field == "password"));
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "The name field is required."))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_validator_errors_keep_field_names() {
        let sample = Sample {
            name: String::new(),
            email: "not-an-email".to_string(),
        };

        let err: ApiError = sample.validate().unwrap_err().into();
        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 2);
                assert_eq!(details[0].field, "email");
                assert_eq!(details[1].field, "name");
                assert_eq!(details[1].message, "The name field is required.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
