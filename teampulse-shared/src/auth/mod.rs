/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: Access and refresh tokens
/// - [`token`]: Invitation token generation and hashing
/// - [`middleware`]: Bearer token extraction for axum
/// - [`permission`]: Team and system permission names
/// - [`authorization`]: Per-request team context and team scoping
/// - [`policy`]: Resource-level rules for projects, tasks and comments
///
/// # Example
///
/// ```no_run
/// use teampulse_shared::auth::password::{hash_password, verify_password};
/// use teampulse_shared::auth::jwt::TokenPair;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("correct horse 1")?;
/// assert!(verify_password("correct horse 1", &hash)?);
///
/// let tokens = TokenPair::issue(Uuid::new_v4(), "a-secret-of-at-least-32-characters!")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod permission;
pub mod policy;
pub mod token;
