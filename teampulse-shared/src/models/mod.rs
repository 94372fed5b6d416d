/// Database models for TeamPulse
///
/// Each model owns its SQL. Functions that may run inside a transaction take
/// any `PgExecutor` (`&PgPool` or `&mut PgConnection`); multi-statement
/// operations take `&PgPool` and open their own transaction.
///
/// # Models
///
/// - `user`: Accounts and the current-team pointer
/// - `team`: Tenants
/// - `membership`: `team_user` pivot with per-team roles
/// - `invitation`: Time-limited team invitations
/// - `role`: Global roles and permissions for the admin console
/// - `customer`: Team-owned customers referenced by projects
/// - `project`: Projects and project members
/// - `task`: Tasks within projects
/// - `comment`: Task comments
/// - `watcher`: Task watchers
///
/// # Example
///
/// ```no_run
/// use teampulse_shared::models::team::Team;
/// use teampulse_shared::models::user::{CreateUser, User};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: "Ada".to_string(),
/// }).await?;
///
/// let team = Team::create_with_owner(&pool, "Analytical Engines", user.id).await?;
/// # Ok(())
/// # }
/// ```

use serde::Serialize;

pub mod comment;
pub mod customer;
pub mod invitation;
pub mod membership;
pub mod project;
pub mod role;
pub mod task;
pub mod team;
pub mod user;
pub mod watcher;

/// One page of a larger result set
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub last_page: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, per_page: i64) -> Self {
        let last_page = if total == 0 { 1 } else { (total + per_page - 1) / per_page };

        Self {
            data,
            total,
            page,
            per_page,
            last_page,
        }
    }
}

/// Builds an `ILIKE` pattern matching `term` anywhere, with `%`, `_` and `\`
/// in the term matched literally
pub fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
