//! # TeamPulse Shared Library
//!
//! Domain types, persistence and authorization shared by the TeamPulse API
//! server and its integration tests.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and migrations
//! - `models`: Database models and their SQL operations
//! - `auth`: Password hashing, JWT, team roles, permissions and policies
//! - `mail`: Transactional mail (team invitations)
//! - `search`: Cross-entity search scoped to the active team

pub mod auth;
pub mod db;
pub mod mail;
pub mod models;
pub mod search;

/// Current version of the TeamPulse shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
