/// Team-scoped authorization
///
/// Every request that touches team data carries an explicit [`TeamContext`]:
/// the caller, the active team, the caller's role there, and whether they are
/// a global superadmin. Handlers check permissions against the context and
/// pass its [`TeamScope`] to model queries.
///
/// # Permission Model
///
/// 1. **Team membership**: the caller must belong to the active team
/// 2. **Team role**: the role's permission set decides what they may do
/// 3. **Policies**: resource rules such as "assignees may edit their task"
///    (see [`policy`](super::policy))
/// 4. **Superadmin**: passes every check and sees every team's resources
///
/// # Example
///
/// ```no_run
/// use teampulse_shared::auth::authorization::TeamContext;
/// use teampulse_shared::auth::permission::TeamPermission;
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid, team_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let ctx = TeamContext::resolve(&pool, user_id, team_id).await?;
/// ctx.require(TeamPermission::CreateProjects)?;
/// # Ok(())
/// # }
/// ```

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::permission::{TeamPermission, ADMIN_ROLES, SUPERADMIN_ROLE};
use crate::models::membership::{Membership, TeamRole};
use crate::models::role::Role;
use crate::models::team::Team;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Team {0} not found")]
    TeamNotFound(Uuid),

    #[error("Not a member of team {0}")]
    NotMember(Uuid),

    #[error("No active team selected")]
    NoActiveTeam,

    #[error("Missing team permission: {0}")]
    MissingPermission(TeamPermission),

    #[error("Administrator role required")]
    NotAdmin,

    #[error("Not authorized to perform this action")]
    NotAuthorized,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Which teams a query may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamScope {
    /// Only rows owned by this team
    Team(Uuid),

    /// Every team (superadmins)
    All,
}

impl TeamScope {
    /// Team filter to bind into `($n::uuid IS NULL OR team_id = $n)`
    pub fn team_filter(&self) -> Option<Uuid> {
        match self {
            TeamScope::Team(id) => Some(*id),
            TeamScope::All => None,
        }
    }
}

/// Per-request authorization context for one team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TeamContext {
    pub user_id: Uuid,

    pub team_id: Uuid,

    /// `None` only for superadmins acting in a team they do not belong to
    pub role: Option<TeamRole>,

    pub is_superadmin: bool,
}

impl TeamContext {
    /// Builds the context for `user_id` acting in `team_id`
    ///
    /// # Errors
    ///
    /// - `AuthzError::TeamNotFound` if the team does not exist
    /// - `AuthzError::NotMember` if the user is neither a member nor a superadmin
    pub async fn resolve(pool: &PgPool, user_id: Uuid, team_id: Uuid) -> Result<Self, AuthzError> {
        if !Team::exists(pool, team_id).await? {
            return Err(AuthzError::TeamNotFound(team_id));
        }

        let role = Membership::get_role(pool, team_id, user_id).await?;
        let is_superadmin = Role::user_has_any(pool, user_id, &[SUPERADMIN_ROLE]).await?;

        if role.is_none() && !is_superadmin {
            return Err(AuthzError::NotMember(team_id));
        }

        Ok(Self {
            user_id,
            team_id,
            role,
            is_superadmin,
        })
    }

    pub fn can(&self, permission: TeamPermission) -> bool {
        self.is_superadmin || self.role.is_some_and(|r| r.has_permission(permission))
    }

    pub fn require(&self, permission: TeamPermission) -> Result<(), AuthzError> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(AuthzError::MissingPermission(permission))
        }
    }

    /// Owners and managers (and superadmins)
    pub fn is_manager(&self) -> bool {
        self.is_superadmin || self.role.is_some_and(|r| r.can_manage_team())
    }

    /// Whether the caller may grant `role`, or act on a member who holds it
    pub fn can_act_on(&self, role: TeamRole) -> bool {
        self.is_superadmin || self.role.is_some_and(|r| r.outranks_or_equals(&role))
    }

    /// Scope for lookups by id; superadmins bypass team scoping
    pub fn scope(&self) -> TeamScope {
        if self.is_superadmin {
            TeamScope::All
        } else {
            TeamScope::Team(self.team_id)
        }
    }
}

/// Requires the global `admin` or `superadmin` role
pub async fn require_admin(pool: &PgPool, user_id: Uuid) -> Result<(), AuthzError> {
    if Role::user_has_any(pool, user_id, &ADMIN_ROLES).await? {
        Ok(())
    } else {
        Err(AuthzError::NotAdmin)
    }
}
