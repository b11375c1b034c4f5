//! Team event bus

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::TeamRole;

/// Events emitted by the team ledger and invitation workflow
#[derive(Debug, Clone)]
pub enum TeamEvent {
    /// An invitation was created. Carries the raw token for out-of-band delivery.
    InvitationCreated {
        invitation_id: Uuid,
        artist_id: Uuid,
        email: String,
        token: String,
    },
    InvitationAccepted {
        invitation_id: Uuid,
        membership_id: Uuid,
        identity_id: Uuid,
    },
    InvitationDeclined {
        invitation_id: Uuid,
        artist_id: Uuid,
    },
    MembershipCreated {
        membership_id: Uuid,
        artist_id: Uuid,
        role: TeamRole,
    },
    MembershipUpdated {
        membership_id: Uuid,
        artist_id: Uuid,
    },
    MembershipDeactivated {
        membership_id: Uuid,
        artist_id: Uuid,
        deactivated_by: Uuid,
    },
}

/// Broadcast channel shared by the team services
#[derive(Clone)]
pub struct TeamEvents {
    tx: broadcast::Sender<TeamEvent>,
}

impl TeamEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TeamEvent> {
        self.tx.subscribe()
    }

    /// Publish to current subscribers; having none is not an error
    pub fn emit(&self, event: TeamEvent) {
        let _ = self.tx.send(event);
    }
}

/// Out-of-band invitation delivery hook. Stands in for a mailer: every
/// created invitation's token is handed to the log, where an operator can
/// forward it. The task ends once every sender is dropped.
pub fn spawn_invitation_delivery(events: &TeamEvents) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(TeamEvent::InvitationCreated {
                    invitation_id,
                    artist_id,
                    email,
                    token,
                }) => {
                    tracing::info!(
                        "Deliver invitation {} for artist {} to {}: token {}",
                        invitation_id,
                        artist_id,
                        email,
                        token
                    );
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Invitation delivery skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

impl Default for TeamEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let events = TeamEvents::new();
        let mut rx = events.subscribe();
        let id = Uuid::new_v4();

        events.emit(TeamEvent::InvitationDeclined {
            invitation_id: id,
            artist_id: Uuid::new_v4(),
        });

        match rx.recv().await.unwrap() {
            TeamEvent::InvitationDeclined { invitation_id, .. } => assert_eq!(invitation_id, id),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invitation_delivery_drains_until_closed() {
        let events = TeamEvents::new();
        let delivery = spawn_invitation_delivery(&events);

        events.emit(TeamEvent::InvitationCreated {
            invitation_id: Uuid::new_v4(),
            artist_id: Uuid::new_v4(),
            email: "sam@example.com".to_string(),
            token: "token".to_string(),
        });
        events.emit(TeamEvent::MembershipUpdated {
            membership_id: Uuid::new_v4(),
            artist_id: Uuid::new_v4(),
        });
        drop(events);

        tokio::time::timeout(std::time::Duration::from_secs(5), delivery)
            .await
            .expect("delivery task should stop once senders are gone")
            .unwrap();
    }

    #[test]
    fn test_emit_without_subscribers() {
        TeamEvents::new().emit(TeamEvent::MembershipUpdated {
            membership_id: Uuid::new_v4(),
            artist_id: Uuid::new_v4(),
        });
    }
}
