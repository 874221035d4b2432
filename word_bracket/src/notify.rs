//! Outbound bracket events.
//!
//! The engine fires these when a match becomes playable, a round advances, a
//! tournament finishes or a challenge is decided. Delivery is best effort: a
//! notifier must never block or fail the write that produced the event.

use crate::challenge::ChallengeId;
use crate::tournament::models::{MatchId, TournamentId, UserId};
use serde::Serialize;
use tokio::sync::broadcast;

/// Event emitted by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BracketEvent {
    /// Both players are seated and legs can be submitted
    MatchPlayable {
        tournament_id: TournamentId,
        match_id: MatchId,
        round: u32,
        player1_id: UserId,
        player2_id: UserId,
    },

    /// Every match of `from_round` is resolved
    RoundAdvanced {
        tournament_id: TournamentId,
        from_round: u32,
        to_round: u32,
    },

    /// Final resolved or tournament aborted (`champion_id` is `None` then)
    TournamentCompleted {
        tournament_id: TournamentId,
        champion_id: Option<UserId>,
    },

    /// A duel was joined and decided
    ChallengeCompleted {
        challenge_id: ChallengeId,
        winner_id: UserId,
    },
}

/// Sink for bracket events
pub trait Notifier: Send + Sync {
    /// Publish an event
    fn notify(&self, event: BracketEvent);
}

/// Notifier that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: BracketEvent) {}
}

/// Fan-out notifier backed by a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<BracketEvent>,
}

impl BroadcastNotifier {
    /// Create a notifier buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to future events
    pub fn subscribe(&self) -> broadcast::Receiver<BracketEvent> {
        self.sender.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, event: BracketEvent) {
        // No subscribers is not an error.
        if self.sender.send(event).is_err() {
            log::trace!("Bracket event dropped: no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_notifier_delivers_to_subscribers() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe();

        notifier.notify(BracketEvent::RoundAdvanced {
            tournament_id: 7,
            from_round: 8,
            to_round: 4,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            BracketEvent::RoundAdvanced {
                tournament_id: 7,
                from_round: 8,
                to_round: 4
            }
        );
    }

    #[test]
    fn test_broadcast_without_subscribers_does_not_panic() {
        let notifier = BroadcastNotifier::new(1);
        notifier.notify(BracketEvent::TournamentCompleted {
            tournament_id: 1,
            champion_id: None,
        });
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(BracketEvent::TournamentCompleted {
            tournament_id: 3,
            champion_id: Some(42),
        })
        .unwrap();
        assert_eq!(json["type"], "tournament_completed");
        assert_eq!(json["champion_id"], 42);
    }
}
