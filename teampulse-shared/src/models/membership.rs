/// Team membership (`team_user`) with per-team roles
///
/// A user holds exactly one [`TeamRole`] in each team they belong to. Roles
/// map to a fixed set of [`TeamPermission`]s; the same user can be an owner
/// in one team and a guest in another.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE team_role AS ENUM ('owner', 'manager', 'member', 'guest');
///
/// CREATE TABLE team_user (
///     team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role team_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (team_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **owner**: every team permission, including deleting the team
/// - **manager**: manage members and roles, all project and task permissions
/// - **member**: create tasks; sees projects they are a member of
/// - **guest**: read-only access to projects they are a member of
///
/// # Invariants
///
/// - Removing a member never leaves a team without an owner.
/// - A bulk role update never leaves a team without an owner.
///
/// # Example
///
/// ```no_run
/// use teampulse_shared::models::membership::{Membership, RoleUpdate, TeamRole};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, team_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// Membership::attach(&pool, team_id, user_id, TeamRole::Member).await?;
///
/// Membership::bulk_update_roles(&pool, team_id, &[
///     RoleUpdate { user_id, role: TeamRole::Manager },
/// ]).await?;
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::user::User;
use crate::auth::permission::TeamPermission;

/// Per-team role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "team_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Owner,
    Manager,
    Member,
    Guest,
}

const OWNER_PERMISSIONS: &[TeamPermission] = &TeamPermission::ALL;

const MANAGER_PERMISSIONS: &[TeamPermission] = &[
    TeamPermission::InviteMembers,
    TeamPermission::RemoveMembers,
    TeamPermission::ChangeMemberRoles,
    TeamPermission::ManageTeamSettings,
    TeamPermission::CreateProjects,
    TeamPermission::EditProjects,
    TeamPermission::DeleteProjects,
    TeamPermission::ViewAllProjects,
    TeamPermission::CreateTasks,
    TeamPermission::EditTasks,
    TeamPermission::DeleteTasks,
];

const MEMBER_PERMISSIONS: &[TeamPermission] = &[TeamPermission::CreateTasks];

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Owner => "owner",
            TeamRole::Manager => "manager",
            TeamRole::Member => "member",
            TeamRole::Guest => "guest",
        }
    }

    /// Capitalised name used in mail and UI copy
    pub fn label(&self) -> &'static str {
        match self {
            TeamRole::Owner => "Owner",
            TeamRole::Manager => "Manager",
            TeamRole::Member => "Member",
            TeamRole::Guest => "Guest",
        }
    }

    pub fn permissions(&self) -> &'static [TeamPermission] {
        match self {
            TeamRole::Owner => OWNER_PERMISSIONS,
            TeamRole::Manager => MANAGER_PERMISSIONS,
            TeamRole::Member => MEMBER_PERMISSIONS,
            TeamRole::Guest => &[],
        }
    }

    pub fn has_permission(&self, permission: TeamPermission) -> bool {
        self.permissions().contains(&permission)
    }

    /// Owners and managers hold management rights over the team
    pub fn can_manage_team(&self) -> bool {
        matches!(self, TeamRole::Owner | TeamRole::Manager)
    }

    /// Hierarchy: Owner > Manager > Member > Guest
    pub fn outranks_or_equals(&self, other: &TeamRole) -> bool {
        self.level() >= other.level()
    }

    fn level(&self) -> u8 {
        match self {
            TeamRole::Owner => 4,
            TeamRole::Manager => 3,
            TeamRole::Member => 2,
            TeamRole::Guest => 1,
        }
    }
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by membership changes that guard team invariants
#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("User {0} is not a member of this team")]
    NotMember(Uuid),

    #[error("The team must have at least one owner")]
    LastOwner,

    #[error("At least one member must keep a manager or owner role")]
    NoManagerRemaining,

    #[error("At least one member must keep the owner role")]
    NoOwnerRemaining,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub team_id: Uuid,

    pub user_id: Uuid,

    pub role: TeamRole,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// A team member joined with their user record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    pub user_id: Uuid,

    pub name: String,

    pub email: String,

    pub role: TeamRole,

    pub joined_at: DateTime<Utc>,
}

/// One entry of a bulk role update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleUpdate {
    pub user_id: Uuid,
    pub role: TeamRole,
}

/// The role map after applying `updates` to `current`
///
/// Later updates for the same user win over earlier ones; updates for
/// non-members are ignored.
fn apply_updates(current: &[(Uuid, TeamRole)], updates: &[RoleUpdate]) -> HashMap<Uuid, TeamRole> {
    let mut roles: HashMap<Uuid, TeamRole> = current.iter().copied().collect();

    for update in updates {
        if let Some(role) = roles.get_mut(&update.user_id) {
            *role = update.role;
        }
    }

    roles
}

/// Whether at least one owner or manager remains once `updates` are applied
/// to `current`
pub fn retains_management(current: &[(Uuid, TeamRole)], updates: &[RoleUpdate]) -> bool {
    apply_updates(current, updates)
        .values()
        .any(TeamRole::can_manage_team)
}

/// Whether at least one owner remains once `updates` are applied to `current`
pub fn retains_owner(current: &[(Uuid, TeamRole)], updates: &[RoleUpdate]) -> bool {
    apply_updates(current, updates)
        .values()
        .any(|role| *role == TeamRole::Owner)
}

impl Membership {
    /// Adds a user to a team
    ///
    /// Returns `None` when the user was already a member; their existing role
    /// is left untouched.
    pub async fn attach<'e>(
        db: impl PgExecutor<'e>,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO team_user (team_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (team_id, user_id) DO NOTHING
            RETURNING team_id, user_id, role, created_at, updated_at
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(db)
        .await
    }

    /// The user's role in a team, `None` when not a member
    pub async fn get_role<'e>(
        db: impl PgExecutor<'e>,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TeamRole>, sqlx::Error> {
        sqlx::query_scalar("SELECT role FROM team_user WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .fetch_optional(db)
            .await
    }

    pub async fn is_member<'e>(
        db: impl PgExecutor<'e>,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM team_user WHERE team_id = $1 AND user_id = $2)",
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(db)
        .await
    }

    /// Whether an account with `email` already belongs to the team
    pub async fn email_is_member<'e>(
        db: impl PgExecutor<'e>,
        team_id: Uuid,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM team_user tu
                JOIN users u ON u.id = tu.user_id
                WHERE tu.team_id = $1 AND LOWER(u.email) = LOWER($2)
            )
            "#,
        )
        .bind(team_id)
        .bind(email)
        .fetch_one(db)
        .await
    }

    /// Counts how many of `user_ids` are members of the team
    pub async fn count_members_among<'e>(
        db: impl PgExecutor<'e>,
        team_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM team_user WHERE team_id = $1 AND user_id = ANY($2)",
        )
        .bind(team_id)
        .bind(user_ids)
        .fetch_one(db)
        .await
    }

    pub async fn list_members(pool: &PgPool, team_id: Uuid) -> Result<Vec<TeamMember>, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT u.id AS user_id, u.name, u.email, tu.role, tu.created_at AS joined_at
            FROM team_user tu
            JOIN users u ON u.id = tu.user_id
            WHERE tu.team_id = $1
            ORDER BY tu.created_at ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(pool)
        .await
    }

    /// Applies several role changes atomically
    ///
    /// The team's memberships are locked for the duration of the transaction.
    /// Every target must already be a member, and the resulting role map must
    /// still contain an owner; otherwise nothing changes.
    ///
    /// # Errors
    ///
    /// - `MembershipError::NotMember` for an unknown target
    /// - `MembershipError::NoManagerRemaining` when management would be lost
    /// - `MembershipError::NoOwnerRemaining` when the last owner is demoted
    pub async fn bulk_update_roles(
        pool: &PgPool,
        team_id: Uuid,
        updates: &[RoleUpdate],
    ) -> Result<Vec<Self>, MembershipError> {
        let mut tx = pool.begin().await?;

        let current: Vec<(Uuid, TeamRole)> = sqlx::query_as(
            "SELECT user_id, role FROM team_user WHERE team_id = $1 FOR UPDATE",
        )
        .bind(team_id)
        .fetch_all(&mut *tx)
        .await?;

        if let Some(unknown) = updates
            .iter()
            .find(|u| !current.iter().any(|(id, _)| *id == u.user_id))
        {
            return Err(MembershipError::NotMember(unknown.user_id));
        }

        if !retains_management(&current, updates) {
            return Err(MembershipError::NoManagerRemaining);
        }

        if !retains_owner(&current, updates) {
            return Err(MembershipError::NoOwnerRemaining);
        }

        let mut updated = Vec::with_capacity(updates.len());
        for update in updates {
            let membership = sqlx::query_as::<_, Membership>(
                r#"
                UPDATE team_user
                SET role = $3, updated_at = NOW()
                WHERE team_id = $1 AND user_id = $2
                RETURNING team_id, user_id, role, created_at, updated_at
                "#,
            )
            .bind(team_id)
            .bind(update.user_id)
            .bind(update.role)
            .fetch_one(&mut *tx)
            .await?;
            updated.push(membership);
        }

        tx.commit().await?;

        tracing::info!(team_id = %team_id, updates = updates.len(), "Member roles updated");
        Ok(updated)
    }

    /// Removes a member from a team
    ///
    /// Refuses to remove the last owner. If the removed user was working in
    /// this team, their current team falls back to another of their teams.
    pub async fn remove_member(
        pool: &PgPool,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), MembershipError> {
        let mut tx = pool.begin().await?;

        let owners: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM team_user WHERE team_id = $1 AND role = 'owner' FOR UPDATE",
        )
        .bind(team_id)
        .fetch_all(&mut *tx)
        .await?;

        let role = Membership::get_role(&mut *tx, team_id, user_id)
            .await?
            .ok_or(MembershipError::NotMember(user_id))?;

        if role == TeamRole::Owner && owners.len() <= 1 {
            return Err(MembershipError::LastOwner);
        }

        sqlx::query("DELETE FROM team_user WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let current_team: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT current_team_id FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;

        if current_team.flatten() == Some(team_id) {
            User::reset_current_team(&mut *tx, user_id).await?;
        }

        tx.commit().await?;

        tracing::info!(team_id = %team_id, user_id = %user_id, "Member removed from team");
        Ok(())
    }
}
