/// Team invitation mail

use chrono::{DateTime, Utc};

use super::OutgoingMail;
use crate::models::membership::TeamRole;

/// Everything the invitation mail shows
#[derive(Debug, Clone)]
pub struct InvitationMail<'a> {
    pub app_name: &'a str,
    pub team_name: &'a str,
    pub role: TeamRole,
    pub accept_url: &'a str,
    pub expires_at: DateTime<Utc>,
}

impl InvitationMail<'_> {
    pub fn subject(&self) -> String {
        format!("You have been invited to join {}", self.team_name)
    }

    pub fn body(&self) -> String {
        format!(
            "Hello,\n\n\
             You have been invited to join the team {team} as {role}.\n\n\
             To accept the invitation and start collaborating, open this link:\n\
             {url}\n\n\
             This link expires on {expires}.\n\n\
             If you were not expecting this invitation, you can ignore this email.\n\n\
             Thanks,\n\
             {app}\n",
            team = self.team_name,
            role = self.role.label(),
            url = self.accept_url,
            expires = self.expires_at.format("%d/%m/%Y"),
            app = self.app_name,
        )
    }

    pub fn render(&self, to: &str) -> OutgoingMail {
        OutgoingMail {
            to: to.to_string(),
            subject: self.subject(),
            body: self.body(),
        }
    }
}

/// Link the invitee opens to accept
pub fn accept_url(app_url: &str, token: &str) -> String {
    format!("{}/invitations/{}/accept", app_url.trim_end_matches('/'), token)
}
