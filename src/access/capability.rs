//! Capability model for the active context
//!
//! Five named capabilities, always resolved to a fixed-shape record so every
//! (context, capability) pair has a defined answer.

use serde::{Deserialize, Serialize};

use crate::models::{ContextKind, TeamMembership};

/// Capabilities that gate protected operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Edit and remove team members
    ManageTeam,
    ManageBookings,
    AccessFinancials,
    /// Send team invitations
    InviteMembers,
    CreateThreads,
}

impl Capability {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ManageTeam => "manage_team",
            Capability::ManageBookings => "manage_bookings",
            Capability::AccessFinancials => "access_financials",
            Capability::InviteMembers => "invite_members",
            Capability::CreateThreads => "create_threads",
        }
    }

    pub fn all() -> [Capability; 5] {
        [
            Capability::ManageTeam,
            Capability::ManageBookings,
            Capability::AccessFinancials,
            Capability::InviteMembers,
            Capability::CreateThreads,
        ]
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manage_team" => Ok(Capability::ManageTeam),
            "manage_bookings" => Ok(Capability::ManageBookings),
            "access_financials" => Ok(Capability::AccessFinancials),
            "invite_members" => Ok(Capability::InviteMembers),
            "create_threads" => Ok(Capability::CreateThreads),
            _ => Err(format!("Invalid capability: {}", s)),
        }
    }
}

/// Evaluated capability set for one identity in its current context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub manage_team: bool,
    pub manage_bookings: bool,
    pub access_financials: bool,
    pub invite_members: bool,
    pub create_threads: bool,
}

impl Permissions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            manage_team: true,
            manage_bookings: true,
            access_financials: true,
            invite_members: true,
            create_threads: true,
        }
    }

    /// Derive from a team membership's three stored flags
    pub fn from_membership(membership: &TeamMembership) -> Self {
        let team = membership.can_invite_others;
        Self {
            manage_team: team,
            manage_bookings: membership.can_manage_bookings,
            access_financials: membership.can_access_financials,
            invite_members: team,
            create_threads: team,
        }
    }

    /// Permissions for a context.
    ///
    /// `membership` is the ledger entry backing a `team_member` context and is
    /// ignored for every other context.
    pub fn for_context(context: Option<ContextKind>, membership: Option<&TeamMembership>) -> Self {
        match context {
            Some(ContextKind::Artist) | Some(ContextKind::Agent) => Self::all(),
            Some(ContextKind::TeamMember) => membership.map(Self::from_membership).unwrap_or_default(),
            _ => Self::none(),
        }
    }

    pub fn get(&self, capability: Capability) -> bool {
        match capability {
            Capability::ManageTeam => self.manage_team,
            Capability::ManageBookings => self.manage_bookings,
            Capability::AccessFinancials => self.access_financials,
            Capability::InviteMembers => self.invite_members,
            Capability::CreateThreads => self.create_threads,
        }
    }

    /// Look up a capability by name; unknown names are denied
    pub fn by_name(&self, name: &str) -> bool {
        name.parse::<Capability>()
            .map(|c| self.get(c))
            .unwrap_or(false)
    }
}
