//! Response and request types for the Backstage HTTP API
//!
//! These mirror the server's JSON shapes. Some fields are not printed by the
//! CLI but are part of the responses.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Permissions {
    pub manage_team: bool,
    pub manage_bookings: bool,
    pub access_financials: bool,
    pub invite_members: bool,
    pub create_threads: bool,
}

impl Permissions {
    /// Names of granted capabilities
    pub fn granted(&self) -> Vec<&'static str> {
        [
            ("manage_team", self.manage_team),
            ("manage_bookings", self.manage_bookings),
            ("access_financials", self.access_financials),
            ("invite_members", self.invite_members),
            ("create_threads", self.create_threads),
        ]
        .into_iter()
        .filter(|(_, granted)| *granted)
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistSummary {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub current_context: Option<String>,
    pub available_contexts: Vec<String>,
    pub is_multi_role: bool,
    pub current_role: Option<String>,
    pub permissions: Permissions,
    pub artist: Option<ArtistSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserEnvelope {
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contexts {
    pub available_contexts: Vec<String>,
    pub current_context: Option<String>,
    pub is_multi_role: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub role_display: String,
    pub custom_role: Option<String>,
    pub is_primary: bool,
    pub can_invite_others: bool,
    pub can_manage_bookings: bool,
    pub can_access_financials: bool,
    pub joined_at: Option<DateTime<Utc>>,
    pub is_registered_user: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Members {
    pub team_members: Vec<Member>,
    pub total_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberEnvelope {
    pub message: String,
    pub team_member: Member,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub role_display: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvitationEnvelope {
    pub message: String,
    pub invitation: Invitation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Roles {
    pub roles: Vec<RoleOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message: String,
}

/// Error body returned by the server
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub kind: Option<String>,
    #[serde(default)]
    pub available_contexts: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub role: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_role: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granted_permissions() {
        let perms = Permissions {
            manage_bookings: true,
            ..Default::default()
        };
        assert_eq!(perms.granted(), vec!["manage_bookings"]);
    }

    #[test]
    fn test_login_request_skips_missing_context() {
        let json = serde_json::to_value(LoginRequest {
            email: "ann@example.com",
            password: "pw",
            context: None,
        })
        .unwrap();
        assert!(json.get("context").is_none());
    }
}
