use parking_lot::Mutex;
use std::time::Duration;

use super::GameDisplay;
use crate::game::{Card, PlayerId, Slot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Countdown(u64, bool),
    PlaceCard(Card, Slot),
    RemoveCard(Slot),
    PlaceToken(PlayerId, Slot),
    RemoveToken(PlayerId, Slot),
    Score(PlayerId, u32),
    Freeze(PlayerId, u64),
    Winners(Vec<PlayerId>),
    Dispose,
}

/// Display double that remembers every notification.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    events: Mutex<Vec<DisplayEvent>>,
}

impl RecordingDisplay {
    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn push(&self, event: DisplayEvent) {
        self.events.lock().push(event);
    }
}

impl GameDisplay for RecordingDisplay {
    fn countdown(&self, remaining: Duration, urgent: bool) {
        self.push(DisplayEvent::Countdown(remaining.as_millis() as u64, urgent));
    }

    fn place_card(&self, card: Card, slot: Slot) {
        self.push(DisplayEvent::PlaceCard(card, slot));
    }

    fn remove_card(&self, slot: Slot) {
        self.push(DisplayEvent::RemoveCard(slot));
    }

    fn place_token(&self, player: PlayerId, slot: Slot) {
        self.push(DisplayEvent::PlaceToken(player, slot));
    }

    fn remove_token(&self, player: PlayerId, slot: Slot) {
        self.push(DisplayEvent::RemoveToken(player, slot));
    }

    fn score(&self, player: PlayerId, score: u32) {
        self.push(DisplayEvent::Score(player, score));
    }

    fn freeze(&self, player: PlayerId, remaining: Duration) {
        self.push(DisplayEvent::Freeze(player, remaining.as_millis() as u64));
    }

    fn winners(&self, players: &[PlayerId]) {
        self.push(DisplayEvent::Winners(players.to_vec()));
    }

    fn dispose(&self) {
        self.push(DisplayEvent::Dispose);
    }
}
