/// Bearer-token authentication
///
/// [`authenticate`] validates the `Authorization: Bearer` header and yields
/// the caller's [`AuthContext`]. The API's JWT layer inserts it into the
/// request extensions, where handlers extract it with
/// `Extension<AuthContext>`.

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// Identity of the authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn from_jwt(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    InvalidFormat(String),
    InvalidToken(String),
}

/// Validates the bearer token carried by `headers`
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_access_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
    })?;

    Ok(AuthContext::from_jwt(claims.sub))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims, TokenType};
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_authenticate_valid_bearer() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id, TokenType::Access), SECRET).unwrap();

        let auth = authenticate(&headers_with(&format!("Bearer {}", token)), SECRET).unwrap();
        assert_eq!(auth.user_id, user_id);
    }

    #[test]
    fn test_authenticate_rejects_missing_and_malformed() {
        assert!(matches!(
            authenticate(&HeaderMap::new(), SECRET),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            authenticate(&headers_with("Basic abc"), SECRET),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            authenticate(&headers_with("Bearer nope"), SECRET),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_refresh_token_is_not_accepted() {
        let token = create_token(&Claims::new(Uuid::new_v4(), TokenType::Refresh), SECRET).unwrap();
        assert!(authenticate(&headers_with(&format!("Bearer {}", token)), SECRET).is_err());
    }
}
