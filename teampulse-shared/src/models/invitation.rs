/// Team invitations
///
/// An invitation grants membership in one team at a fixed role to whoever
/// holds its token and owns the invited email address. The plaintext token
/// goes out by mail exactly once; the database keeps only its SHA-256 hash.
///
/// # Lifecycle
///
/// 1. A member with `invite members` creates the invitation. Expired
///    invitations for the same team and email are discarded first; a pending
///    one blocks the new invitation.
/// 2. The invitee accepts with the token before `expires_at`: they are
///    attached to the team (unless already a member), the team becomes their
///    current team and the invitation is deleted, all in one transaction.
///
/// # Example
///
/// ```no_run
/// use chrono::Duration;
/// use teampulse_shared::models::invitation::{Invitation, NewInvitation};
/// use teampulse_shared::models::membership::TeamRole;
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, team_id: Uuid, inviter: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let (invitation, token) = Invitation::create(&pool, NewInvitation {
///     team_id,
///     email: "new.hire@example.com".to_string(),
///     role: TeamRole::Member,
///     invited_by: Some(inviter),
///     ttl: Duration::hours(24),
/// }).await?;
///
/// // `token` goes into the accept link; only its hash is stored
/// assert_ne!(invitation.token_hash, token);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::membership::{Membership, TeamRole};
use super::user::User;
use crate::auth::token::{generate_token, hash_token, is_well_formed};

/// Default lifetime of an invitation
pub const DEFAULT_INVITATION_TTL_HOURS: i64 = 24;

const INVITATION_COLUMNS: &str = "id, team_id, email, role, token_hash, invited_by, expires_at, created_at";

#[derive(Debug, thiserror::Error)]
pub enum InvitationError {
    #[error("This user is already a member of the team")]
    AlreadyMember,

    #[error("An invitation has already been sent to this email")]
    AlreadyInvited,

    #[error("Invitation not found or expired")]
    NotFound,

    #[error("This invitation was sent to a different email address")]
    EmailMismatch,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invitation {
    pub id: Uuid,

    pub team_id: Uuid,

    pub email: String,

    /// Role granted on acceptance
    pub role: TeamRole,

    #[serde(skip_serializing, default)]
    pub token_hash: String,

    pub invited_by: Option<Uuid>,

    pub expires_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub team_id: Uuid,
    pub email: String,
    pub role: TeamRole,
    pub invited_by: Option<Uuid>,
    pub ttl: Duration,
}

impl Invitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Case-insensitive comparison with the invited address
    pub fn is_for_email(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }

    /// Creates an invitation and returns it with the plaintext token
    ///
    /// # Errors
    ///
    /// - `InvitationError::AlreadyMember` if the email belongs to a member
    /// - `InvitationError::AlreadyInvited` if an unexpired invitation exists
    pub async fn create(pool: &PgPool, data: NewInvitation) -> Result<(Self, String), InvitationError> {
        let mut tx = pool.begin().await?;

        // Serializes concurrent invitations into the same team
        sqlx::query("SELECT id FROM teams WHERE id = $1 FOR UPDATE")
            .bind(data.team_id)
            .execute(&mut *tx)
            .await?;

        if Membership::email_is_member(&mut *tx, data.team_id, &data.email).await? {
            return Err(InvitationError::AlreadyMember);
        }

        sqlx::query(
            r#"
            DELETE FROM invitations
            WHERE team_id = $1 AND LOWER(email) = LOWER($2) AND expires_at <= NOW()
            "#,
        )
        .bind(data.team_id)
        .bind(&data.email)
        .execute(&mut *tx)
        .await?;

        let pending: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM invitations
                WHERE team_id = $1 AND LOWER(email) = LOWER($2) AND expires_at > NOW()
            )
            "#,
        )
        .bind(data.team_id)
        .bind(&data.email)
        .fetch_one(&mut *tx)
        .await?;

        if pending {
            return Err(InvitationError::AlreadyInvited);
        }

        let (token, token_hash) = generate_token();
        let expires_at = Utc::now() + data.ttl;

        let query = format!(
            r#"
            INSERT INTO invitations (team_id, email, role, token_hash, invited_by, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        );

        let invitation = sqlx::query_as::<_, Invitation>(&query)
            .bind(data.team_id)
            .bind(&data.email)
            .bind(data.role)
            .bind(token_hash)
            .bind(data.invited_by)
            .bind(expires_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            invitation_id = %invitation.id,
            team_id = %invitation.team_id,
            role = %invitation.role,
            "Invitation created"
        );

        Ok((invitation, token))
    }

    /// Looks up an unexpired invitation by its plaintext token
    pub async fn find_valid_by_token<'e>(
        db: impl PgExecutor<'e>,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        if !is_well_formed(token) {
            return Ok(None);
        }

        let query = format!(
            "SELECT {} FROM invitations WHERE token_hash = $1 AND expires_at > NOW()",
            INVITATION_COLUMNS
        );

        sqlx::query_as::<_, Invitation>(&query)
            .bind(hash_token(token))
            .fetch_optional(db)
            .await
    }

    /// Accepts an invitation on behalf of `user`
    ///
    /// Returns the consumed invitation. The invitation row is locked while
    /// it is consumed so a token can only be used once.
    ///
    /// # Errors
    ///
    /// - `InvitationError::NotFound` for unknown, malformed or expired tokens
    /// - `InvitationError::EmailMismatch` if `user` is not the invitee
    pub async fn accept(pool: &PgPool, token: &str, user: &User) -> Result<Self, InvitationError> {
        if !is_well_formed(token) {
            return Err(InvitationError::NotFound);
        }

        let mut tx = pool.begin().await?;

        let query = format!(
            r#"
            SELECT {}
            FROM invitations
            WHERE token_hash = $1 AND expires_at > NOW()
            FOR UPDATE
            "#,
            INVITATION_COLUMNS
        );

        let invitation = sqlx::query_as::<_, Invitation>(&query)
            .bind(hash_token(token))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(InvitationError::NotFound)?;

        if !invitation.is_for_email(&user.email) {
            return Err(InvitationError::EmailMismatch);
        }

        Membership::attach(&mut *tx, invitation.team_id, user.id, invitation.role).await?;
        User::set_current_team(&mut *tx, user.id, Some(invitation.team_id)).await?;

        sqlx::query("DELETE FROM invitations WHERE id = $1")
            .bind(invitation.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            invitation_id = %invitation.id,
            team_id = %invitation.team_id,
            user_id = %user.id,
            "Invitation accepted"
        );

        Ok(invitation)
    }

    /// Unexpired invitations of a team, newest first
    pub async fn list_pending(pool: &PgPool, team_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM invitations
            WHERE team_id = $1 AND expires_at > NOW()
            ORDER BY created_at DESC
            "#,
            INVITATION_COLUMNS
        );

        sqlx::query_as::<_, Invitation>(&query)
            .bind(team_id)
            .fetch_all(pool)
            .await
    }

    pub async fn revoke<'e>(db: impl PgExecutor<'e>, team_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM invitations WHERE id = $1 AND team_id = $2")
            .bind(id)
            .bind(team_id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitation(expires_at: DateTime<Utc>) -> Invitation {
        Invitation {
            id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
            email: "Invitee@Example.com".to_string(),
            role: TeamRole::Member,
            token_hash: hash_token("x"),
            invited_by: None,
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        assert!(invitation(now - Duration::minutes(1)).is_expired(now));
        assert!(invitation(now).is_expired(now));
        assert!(!invitation(now + Duration::hours(DEFAULT_INVITATION_TTL_HOURS)).is_expired(now));
    }

    #[test]
    fn test_email_comparison_ignores_case() {
        let inv = invitation(Utc::now());
        assert!(inv.is_for_email("invitee@example.com"));
        assert!(inv.is_for_email(" INVITEE@EXAMPLE.COM "));
        assert!(!inv.is_for_email("someone@example.com"));
    }

    #[test]
    fn test_token_hash_is_not_serialized() {
        let json = serde_json::to_value(invitation(Utc::now())).unwrap();
        assert!(json.get("token_hash").is_none());
        assert_eq!(json["role"], "member");
    }
}
