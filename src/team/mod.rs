//! Team membership ledger and invitation workflow

pub mod events;
pub mod invitation;
pub mod ledger;

pub use events::{spawn_invitation_delivery, TeamEvent, TeamEvents};
pub use invitation::{InvitationWorkflow, INVITATION_TTL_DAYS};
pub use ledger::TeamLedger;
