/// API route handlers, one module per resource
///
/// - `health`: Liveness and database probe
/// - `auth`: Register, login, token refresh
/// - `me`: Account overview and dashboard
/// - `search`: Global search
/// - `teams`: Teams, members and role changes
/// - `invitations`: Team invitations
/// - `customers`, `projects`, `tasks`, `comments`: Team workspace
/// - `admin`: Global users, roles and permissions

pub mod admin;
pub mod auth;
pub mod comments;
pub mod customers;
pub mod health;
pub mod invitations;
pub mod me;
pub mod projects;
pub mod search;
pub mod tasks;
pub mod teams;
