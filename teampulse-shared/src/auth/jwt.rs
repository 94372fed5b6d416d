/// JWT token generation and validation
///
/// Tokens are signed with HS256 and identify the user only. The active team
/// is not baked into the token: it lives on the user row (`current_team_id`)
/// or in the request path, so switching teams never requires a new token.
///
/// # Token Types
///
/// - **Access Token**: 24h, sent as `Authorization: Bearer <token>`
/// - **Refresh Token**: 30d, exchanged for a new access token
///
/// # Example
///
/// ```
/// use teampulse_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let token = create_token(&Claims::new(user_id, TokenType::Access), "a-secret-of-at-least-32-bytes!!")?;
///
/// let claims = validate_access_token(&token, "a-secret-of-at-least-32-bytes!!")?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value of the `iss` claim
pub const ISSUER: &str = "teampulse";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid issuer")]
    InvalidIssuer,

    #[error("Expected {expected} token, got {actual} token")]
    WrongTokenType {
        expected: &'static str,
        actual: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(24),
            TokenType::Refresh => Duration::days(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Registered claims plus the token type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,

    pub iss: String,

    pub iat: i64,

    pub exp: i64,

    pub nbf: i64,

    pub token_type: TokenType,
}

impl Claims {
    /// Claims with the default lifetime for `token_type`
    pub fn new(user_id: Uuid, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, token_type, token_type.default_expiration())
    }

    pub fn with_expiration(user_id: Uuid, token_type: TokenType, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            token_type,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies signature, expiry, not-before and issuer
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(e.to_string()),
    })?;

    Ok(data.claims)
}

fn validate_typed(token: &str, secret: &str, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != expected {
        return Err(JwtError::WrongTokenType {
            expected: expected.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Access)
}

pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Refresh)
}

/// Exchanges a refresh token for a new access token
pub fn refresh_access_token(refresh_token: &str, secret: &str) -> Result<String, JwtError> {
    let refresh = validate_refresh_token(refresh_token, secret)?;
    create_token(&Claims::new(refresh.sub, TokenType::Access), secret)
}

/// Access and refresh token for a freshly authenticated user
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn issue(user_id: Uuid, secret: &str) -> Result<Self, JwtError> {
        Ok(Self {
            access_token: create_token(&Claims::new(user_id, TokenType::Access), secret)?,
            refresh_token: create_token(&Claims::new(user_id, TokenType::Refresh), secret)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_token_type_expiration() {
        assert_eq!(TokenType::Access.default_expiration(), Duration::hours(24));
        assert_eq!(TokenType::Refresh.default_expiration(), Duration::days(30));
    }

    #[test]
    fn test_create_and_validate_token() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id, TokenType::Access), SECRET).unwrap();

        let claims = validate_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), SECRET).unwrap();
        assert!(validate_token(&token, "another-secret-that-is-long-enough").is_err());
    }

    #[test]
    fn test_expired_token() {
        let claims = Claims::with_expiration(Uuid::new_v4(), TokenType::Access, Duration::seconds(-3600));
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let access = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), SECRET).unwrap();
        let refresh = create_token(&Claims::new(Uuid::new_v4(), TokenType::Refresh), SECRET).unwrap();

        assert!(validate_access_token(&access, SECRET).is_ok());
        assert!(matches!(
            validate_access_token(&refresh, SECRET),
            Err(JwtError::WrongTokenType { expected: "access", .. })
        ));
        assert!(validate_refresh_token(&refresh, SECRET).is_ok());
        assert!(refresh_access_token(&access, SECRET).is_err());
    }

    #[test]
    fn test_refresh_issues_access_token_for_same_user() {
        let pair = TokenPair::issue(Uuid::new_v4(), SECRET).unwrap();
        let original = validate_refresh_token(&pair.refresh_token, SECRET).unwrap();

        let fresh = refresh_access_token(&pair.refresh_token, SECRET).unwrap();
        let claims = validate_access_token(&fresh, SECRET).unwrap();
        assert_eq!(claims.sub, original.sub);
    }
}
