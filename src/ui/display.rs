use std::time::Duration;

use tracing::{debug, info};

use crate::game::{Card, PlayerId, Slot};

/// Sink for everything the game wants shown. Calls are fire-and-forget: the
/// game never reads anything back.
pub trait GameDisplay: Send + Sync {
    /// Remaining round time; `urgent` once inside the warning window.
    fn countdown(&self, remaining: Duration, urgent: bool);
    fn place_card(&self, card: Card, slot: Slot);
    fn remove_card(&self, slot: Slot);
    fn place_token(&self, player: PlayerId, slot: Slot);
    fn remove_token(&self, player: PlayerId, slot: Slot);
    fn score(&self, player: PlayerId, score: u32);
    /// Remaining freeze time; zero clears the freeze.
    fn freeze(&self, player: PlayerId, remaining: Duration);
    fn winners(&self, players: &[PlayerId]);
    fn dispose(&self) {}
}

/// Display for headless runs: turns every notification into a tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDisplay;

impl GameDisplay for LogDisplay {
    fn countdown(&self, remaining: Duration, urgent: bool) {
        // Far from expiry this fires once a second, near it every few ms.
        if urgent {
            debug!(remaining_ms = remaining.as_millis() as u64, "countdown");
        }
    }

    fn place_card(&self, card: Card, slot: Slot) {
        debug!(card, slot, "card placed");
    }

    fn remove_card(&self, slot: Slot) {
        debug!(slot, "card removed");
    }

    fn place_token(&self, player: PlayerId, slot: Slot) {
        debug!(player, slot, "token placed");
    }

    fn remove_token(&self, player: PlayerId, slot: Slot) {
        debug!(player, slot, "token removed");
    }

    fn score(&self, player: PlayerId, score: u32) {
        info!(player, score, "score");
    }

    fn freeze(&self, _player: PlayerId, _remaining: Duration) {}

    fn winners(&self, players: &[PlayerId]) {
        info!(?players, "winners");
    }
}
