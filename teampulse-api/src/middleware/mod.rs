/// Middleware modules for the API server
///
/// - `security`: Security headers on every response
/// - `team_context`: Resolves the active team for team-scoped routes

pub mod security;
pub mod team_context;
