/// Named permissions
///
/// Team permissions are granted through a member's [`TeamRole`] in that team.
/// System permissions are global and come from the admin-managed `roles` /
/// `permissions` tables.
///
/// [`TeamRole`]: crate::models::membership::TeamRole

use serde::{Deserialize, Serialize};

/// Actions that can be granted within a single team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamPermission {
    InviteMembers,
    RemoveMembers,
    ChangeMemberRoles,
    ManageTeamSettings,
    DeleteTeam,
    CreateProjects,
    EditProjects,
    DeleteProjects,
    ViewAllProjects,
    CreateTasks,
    EditTasks,
    DeleteTasks,
}

impl TeamPermission {
    pub const ALL: [TeamPermission; 12] = [
        TeamPermission::InviteMembers,
        TeamPermission::RemoveMembers,
        TeamPermission::ChangeMemberRoles,
        TeamPermission::ManageTeamSettings,
        TeamPermission::DeleteTeam,
        TeamPermission::CreateProjects,
        TeamPermission::EditProjects,
        TeamPermission::DeleteProjects,
        TeamPermission::ViewAllProjects,
        TeamPermission::CreateTasks,
        TeamPermission::EditTasks,
        TeamPermission::DeleteTasks,
    ];

    /// Human-readable name, as shown to clients
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamPermission::InviteMembers => "invite members",
            TeamPermission::RemoveMembers => "remove members",
            TeamPermission::ChangeMemberRoles => "change member roles",
            TeamPermission::ManageTeamSettings => "manage team settings",
            TeamPermission::DeleteTeam => "delete team",
            TeamPermission::CreateProjects => "create projects",
            TeamPermission::EditProjects => "edit projects",
            TeamPermission::DeleteProjects => "delete projects",
            TeamPermission::ViewAllProjects => "view all projects",
            TeamPermission::CreateTasks => "create tasks",
            TeamPermission::EditTasks => "edit tasks",
            TeamPermission::DeleteTasks => "delete tasks",
        }
    }
}

impl std::fmt::Display for TeamPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global role that bypasses every team and policy check
pub const SUPERADMIN_ROLE: &str = "superadmin";

/// Global roles allowed into the admin console
pub const ADMIN_ROLES: [&str; 2] = ["admin", SUPERADMIN_ROLE];

/// Global permissions that mark a user as having management rights
pub const MANAGEMENT_PERMISSIONS: [&str; 2] = ["manage users", "manage roles"];
