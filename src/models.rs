//! Data models for identities, artists, team memberships and invitations

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// A context an identity can act in.
///
/// Declaration order is the default-selection priority: the first available
/// context in this order becomes `current_context` when none is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    Artist,
    Agent,
    TeamMember,
    Venue,
    Promoter,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Artist => "artist",
            ContextKind::Agent => "agent",
            ContextKind::TeamMember => "team_member",
            ContextKind::Venue => "venue",
            ContextKind::Promoter => "promoter",
        }
    }
}

impl std::str::FromStr for ContextKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "artist" => Ok(ContextKind::Artist),
            "agent" => Ok(ContextKind::Agent),
            "team_member" => Ok(ContextKind::TeamMember),
            "venue" => Ok(ContextKind::Venue),
            "promoter" => Ok(ContextKind::Promoter),
            _ => Err(format!("Invalid context: {}", s)),
        }
    }
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a team member. `Custom` carries its free-form label (may be empty).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TeamRole {
    TourManager,
    BookingAgent,
    SoundEngineer,
    VenueManager,
    TechnicalDirector,
    Agent,
    Legal,
    ProductionManager,
    StageManager,
    PrManager,
    MediaCoordinator,
    TravelCoordinator,
    Custom(String),
}

impl TeamRole {
    /// Stored column value
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::TourManager => "tour_manager",
            TeamRole::BookingAgent => "booking_agent",
            TeamRole::SoundEngineer => "sound_engineer",
            TeamRole::VenueManager => "venue_manager",
            TeamRole::TechnicalDirector => "technical_director",
            TeamRole::Agent => "agent",
            TeamRole::Legal => "legal",
            TeamRole::ProductionManager => "production_manager",
            TeamRole::StageManager => "stage_manager",
            TeamRole::PrManager => "pr_manager",
            TeamRole::MediaCoordinator => "media_coordinator",
            TeamRole::TravelCoordinator => "travel_coordinator",
            TeamRole::Custom(_) => "custom",
        }
    }

    /// Build a role from its stored value and the optional custom label.
    ///
    /// The label is only kept for `custom`.
    pub fn from_parts(role: &str, custom_role: Option<String>) -> Result<Self, String> {
        let role = match role {
            "tour_manager" => TeamRole::TourManager,
            "booking_agent" => TeamRole::BookingAgent,
            "sound_engineer" => TeamRole::SoundEngineer,
            "venue_manager" => TeamRole::VenueManager,
            "technical_director" => TeamRole::TechnicalDirector,
            "agent" => TeamRole::Agent,
            "legal" => TeamRole::Legal,
            "production_manager" => TeamRole::ProductionManager,
            "stage_manager" => TeamRole::StageManager,
            "pr_manager" => TeamRole::PrManager,
            "media_coordinator" => TeamRole::MediaCoordinator,
            "travel_coordinator" => TeamRole::TravelCoordinator,
            "custom" => TeamRole::Custom(custom_role.unwrap_or_default()),
            _ => return Err(format!("Invalid team role: {}", role)),
        };
        Ok(role)
    }

    /// Label of a `Custom` role, if it has a non-empty one
    pub fn custom_label(&self) -> Option<&str> {
        match self {
            TeamRole::Custom(label) if !label.trim().is_empty() => Some(label.as_str()),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            TeamRole::TourManager => "Tour Manager",
            TeamRole::BookingAgent => "Booking Agent",
            TeamRole::SoundEngineer => "Sound Engineer",
            TeamRole::VenueManager => "Venue Manager",
            TeamRole::TechnicalDirector => "Technical Director",
            TeamRole::Agent => "Agent",
            TeamRole::Legal => "Legal",
            TeamRole::ProductionManager => "Production Manager",
            TeamRole::StageManager => "Stage Manager",
            TeamRole::PrManager => "PR Manager",
            TeamRole::MediaCoordinator => "Media Coordinator",
            TeamRole::TravelCoordinator => "Travel Coordinator",
            TeamRole::Custom(_) => self.custom_label().unwrap_or("Team Member"),
        }
    }

    /// Every selectable role value with its label, in menu order
    pub fn catalog() -> Vec<(&'static str, &'static str)> {
        vec![
            ("agent", "Agent"),
            ("tour_manager", "Tour Manager"),
            ("booking_agent", "Booking Agent"),
            ("sound_engineer", "Sound Engineer"),
            ("venue_manager", "Venue Manager"),
            ("technical_director", "Technical Director"),
            ("legal", "Legal"),
            ("production_manager", "Production Manager"),
            ("stage_manager", "Stage Manager"),
            ("pr_manager", "PR Manager"),
            ("media_coordinator", "Media Coordinator"),
            ("travel_coordinator", "Travel Coordinator"),
            ("custom", "Custom Role"),
        ]
    }
}

impl Serialize for TeamRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Status of a team invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Expired => "expired",
        }
    }

    /// No transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

impl std::str::FromStr for InvitationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "declined" => Ok(InvitationStatus::Declined),
            "expired" => Ok(InvitationStatus::Expired),
            _ => Err(format!("Invalid invitation status: {}", s)),
        }
    }
}

/// A person capable of authenticating
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub current_context: Option<ContextKind>,
    pub available_contexts: BTreeSet<ContextKind>,
    pub is_multi_role: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The business entity a team works for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistProfile {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub agency_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A person's standing relationship to an artist's team
#[derive(Debug, Clone, Serialize)]
pub struct TeamMembership {
    pub id: Uuid,
    pub artist_id: Uuid,
    /// Unset until the member has an identity of their own
    pub identity_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: TeamRole,
    pub is_primary: bool,
    pub can_invite_others: bool,
    pub can_manage_bookings: bool,
    pub can_access_financials: bool,
    /// Free-form tags; never consulted for authorization
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub joined_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamMembership {
    pub fn is_primary_agent(&self) -> bool {
        self.role == TeamRole::Agent && self.is_primary
    }
}

/// A pending offer to join an artist's team
///
/// The raw token is never part of the model; only its digest is stored.
#[derive(Debug, Clone, Serialize)]
pub struct TeamInvitation {
    pub id: Uuid,
    pub artist_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: TeamRole,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamInvitation {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Evaluated live, independent of the stored status
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_pending_at(&self, now: DateTime<Utc>) -> bool {
        self.status == InvitationStatus::Pending && !self.is_expired_at(now)
    }

    pub fn is_pending(&self) -> bool {
        self.is_pending_at(Utc::now())
    }
}

/// A stored bearer credential (digest only)
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub name: String,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new ledger entry
#[derive(Debug, Clone)]
pub struct NewMembership {
    pub artist_id: Uuid,
    pub identity_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: TeamRole,
    pub is_primary: bool,
    pub can_invite_others: bool,
    pub can_manage_bookings: bool,
    pub can_access_financials: bool,
    pub permissions: Vec<String>,
    pub joined_at: Option<DateTime<Utc>>,
}

impl NewMembership {
    /// A plain member with no capability flags
    pub fn member(artist_id: Uuid, name: impl Into<String>, email: impl Into<String>, role: TeamRole) -> Self {
        Self {
            artist_id,
            identity_id: None,
            name: name.into(),
            email: normalize_email(&email.into()),
            phone: None,
            role,
            is_primary: false,
            can_invite_others: false,
            can_manage_bookings: false,
            can_access_financials: false,
            permissions: Vec::new(),
            joined_at: None,
        }
    }

    pub fn for_identity(mut self, identity_id: Uuid) -> Self {
        self.identity_id = Some(identity_id);
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn with_flags(mut self, invite: bool, bookings: bool, financials: bool) -> Self {
        self.can_invite_others = invite;
        self.can_manage_bookings = bookings;
        self.can_access_financials = financials;
        self
    }

    pub fn joined(mut self, at: DateTime<Utc>) -> Self {
        self.joined_at = Some(at);
        self
    }

    pub fn is_primary_agent(&self) -> bool {
        self.role == TeamRole::Agent && self.is_primary
    }
}

/// Partial edit of a ledger entry; `None` leaves the field unchanged
#[derive(Debug, Clone, Default)]
pub struct MembershipUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<TeamRole>,
    pub is_primary: Option<bool>,
    pub can_invite_others: Option<bool>,
    pub can_manage_bookings: Option<bool>,
    pub can_access_financials: Option<bool>,
}

impl MembershipUpdate {
    /// Apply to a copy of `membership`
    pub fn apply_to(&self, membership: &TeamMembership) -> TeamMembership {
        let mut updated = membership.clone();
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(email) = &self.email {
            updated.email = normalize_email(email);
        }
        if let Some(phone) = &self.phone {
            updated.phone = Some(phone.clone());
        }
        if let Some(role) = &self.role {
            updated.role = role.clone();
        }
        if let Some(v) = self.is_primary {
            updated.is_primary = v;
        }
        if let Some(v) = self.can_invite_others {
            updated.can_invite_others = v;
        }
        if let Some(v) = self.can_manage_bookings {
            updated.can_manage_bookings = v;
        }
        if let Some(v) = self.can_access_financials {
            updated.can_access_financials = v;
        }
        updated
    }
}

/// Fields for a new invitation
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub email: String,
    pub name: String,
    pub role: TeamRole,
    pub message: Option<String>,
}

/// Emails compare case-insensitively and without surrounding whitespace
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Request to log in
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Parsed after credentials are checked; unknown values are reported as unavailable
    pub context: Option<String>,
}

/// Request to register a new identity
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Creates an owned artist profile with this name
    pub artist_name: Option<String>,
}

/// Request to switch the active context
#[derive(Debug, Deserialize)]
pub struct SwitchContextRequest {
    pub context: String,
}

/// Request to invite someone to the current artist's team
#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub name: String,
    pub email: String,
    pub role: String,
    pub custom_role: Option<String>,
    pub message: Option<String>,
}

/// Request to edit a team member
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMemberRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub custom_role: Option<String>,
    pub is_primary: Option<bool>,
    pub can_invite_others: Option<bool>,
    pub can_manage_bookings: Option<bool>,
    pub can_access_financials: Option<bool>,
}

/// Request to edit the owned artist profile
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
}
