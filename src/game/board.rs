use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{Card, PlayerId, Slot};
use crate::sync::AdmissionLock;
use crate::ui::GameDisplay;

/// Most tokens a single player may have on the board at once.
pub const MAX_TOKENS: usize = 3;

/// Three marked cards submitted by one player, as they were on the board at
/// submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateSet {
    pub player: PlayerId,
    pub cards: [Card; 3],
    pub slots: [Slot; 3],
}

/// Everything behind the admission lock.
///
/// `slot_to_card` and `card_to_slot` are exact inverses and only change under
/// dealer access. Token rows are atomics so a player can flip its own row
/// while holding shared access; the dealer clears them under exclusive access.
#[derive(Debug)]
struct TableState {
    slot_to_card: Vec<Option<Card>>,
    card_to_slot: Vec<Option<Slot>>,
    tokens: Vec<AtomicBool>,
    marking_enabled: bool,
}

impl TableState {
    fn token(&self, player: PlayerId, slot: Slot) -> &AtomicBool {
        &self.tokens[player * self.slot_to_card.len() + slot]
    }

    fn row(&self, player: PlayerId) -> &[AtomicBool] {
        let width = self.slot_to_card.len();
        &self.tokens[player * width..(player + 1) * width]
    }

    fn token_count(&self, player: PlayerId) -> usize {
        self.row(player)
            .iter()
            .filter(|token| token.load(Ordering::Relaxed))
            .count()
    }
}

/// The shared table: which card sits in which slot and which player marked
/// which slot. Every access goes through the admission lock; card placement
/// and removal take dealer access, token and lookup operations take player
/// access.
pub struct Board {
    state: AdmissionLock<TableState>,
    display: Arc<dyn GameDisplay>,
    players: usize,
    table_size: usize,
    deck_size: usize,
    table_delay: Duration,
}

impl Board {
    pub fn new(
        players: usize,
        table_size: usize,
        deck_size: usize,
        display: Arc<dyn GameDisplay>,
    ) -> Self {
        let tokens = (0..players * table_size)
            .map(|_| AtomicBool::new(false))
            .collect();
        Board {
            state: AdmissionLock::new(TableState {
                slot_to_card: vec![None; table_size],
                card_to_slot: vec![None; deck_size],
                tokens,
                marking_enabled: false,
            }),
            display,
            players,
            table_size,
            deck_size,
            table_delay: Duration::ZERO,
        }
    }

    /// Simulated latency paid before every card placement or removal.
    pub fn with_table_delay(mut self, delay: Duration) -> Self {
        self.table_delay = delay;
        self
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    pub fn players(&self) -> usize {
        self.players
    }

    fn simulate_delay(&self) {
        if !self.table_delay.is_zero() {
            thread::sleep(self.table_delay);
        }
    }

    /// Put `card` into the empty `slot`. Returns `false` and changes nothing
    /// if the slot is taken, the card is already on the table, or either is
    /// out of range.
    pub fn place_card(&self, card: Card, slot: Slot) -> bool {
        if slot >= self.table_size || card >= self.deck_size {
            return false;
        }
        self.simulate_delay();

        let mut state = self.state.acquire_dealer();
        if state.slot_to_card[slot].is_some() || state.card_to_slot[card].is_some() {
            return false;
        }
        state.slot_to_card[slot] = Some(card);
        state.card_to_slot[card] = Some(slot);
        drop(state);

        self.display.place_card(card, slot);
        true
    }

    /// Take the card out of `slot`, clearing every player's token there.
    pub fn remove_card(&self, slot: Slot) -> Option<Card> {
        if slot >= self.table_size {
            return None;
        }
        self.simulate_delay();

        let mut state = self.state.acquire_dealer();
        let card = state.slot_to_card[slot].take()?;
        state.card_to_slot[card] = None;
        for player in 0..self.players {
            if state.token(player, slot).swap(false, Ordering::Relaxed) {
                self.display.remove_token(player, slot);
            }
        }
        self.display.remove_card(slot);
        Some(card)
    }

    /// Mark `slot` for `player` unconditionally. Returns whether the token is new.
    pub fn place_token(&self, player: PlayerId, slot: Slot) -> bool {
        if player >= self.players || slot >= self.table_size {
            return false;
        }
        let state = self.state.acquire_player();
        let placed = !state.token(player, slot).swap(true, Ordering::Relaxed);
        if placed {
            self.display.place_token(player, slot);
        }
        placed
    }

    /// Unmark `slot` for `player`. Returns whether a token was actually there.
    pub fn remove_token(&self, player: PlayerId, slot: Slot) -> bool {
        if player >= self.players || slot >= self.table_size {
            return false;
        }
        let state = self.state.acquire_player();
        let removed = state.token(player, slot).swap(false, Ordering::Relaxed);
        if removed {
            self.display.remove_token(player, slot);
        }
        removed
    }

    /// Mark `slot` for `player` only if marking is enabled, the slot holds a
    /// card, it is not already marked, and the player has fewer than
    /// [`MAX_TOKENS`] tokens. All checks and the mark happen under one
    /// acquisition.
    pub fn try_mark_slot(&self, player: PlayerId, slot: Slot) -> bool {
        if player >= self.players || slot >= self.table_size {
            return false;
        }
        let state = self.state.acquire_player();
        if !state.marking_enabled
            || state.slot_to_card[slot].is_none()
            || state.token_count(player) >= MAX_TOKENS
        {
            return false;
        }
        let placed = !state.token(player, slot).swap(true, Ordering::Relaxed);
        if placed {
            self.display.place_token(player, slot);
        }
        placed
    }

    /// The player's three marked cards, if it has exactly three tokens and
    /// every marked slot still holds a card.
    pub fn extract_candidate(&self, player: PlayerId) -> Option<CandidateSet> {
        if player >= self.players {
            return None;
        }
        let state = self.state.acquire_player();
        let mut cards = [0; 3];
        let mut slots = [0; 3];
        let mut marked = 0;
        for (slot, token) in state.row(player).iter().enumerate() {
            if !token.load(Ordering::Relaxed) {
                continue;
            }
            if marked == MAX_TOKENS {
                return None;
            }
            cards[marked] = state.slot_to_card[slot]?;
            slots[marked] = slot;
            marked += 1;
        }
        (marked == MAX_TOKENS).then_some(CandidateSet {
            player,
            cards,
            slots,
        })
    }

    /// Whether the candidate's slots still hold exactly its cards, in order.
    pub fn is_still_valid(&self, candidate: &CandidateSet) -> bool {
        let state = self.state.acquire_dealer();
        candidate
            .slots
            .iter()
            .zip(candidate.cards.iter())
            .all(|(&slot, &card)| state.slot_to_card.get(slot).copied().flatten() == Some(card))
    }

    /// Move every card on the table back into `deck`, clearing all tokens.
    /// Returns how many cards were reclaimed.
    pub fn reclaim_all_cards_to_deck(&self, deck: &mut Vec<Card>) -> usize {
        let occupied = self.count_cards();
        for _ in 0..occupied {
            self.simulate_delay();
        }

        let mut state = self.state.acquire_dealer();
        let mut reclaimed = 0;
        for slot in 0..self.table_size {
            for player in 0..self.players {
                if state.token(player, slot).swap(false, Ordering::Relaxed) {
                    self.display.remove_token(player, slot);
                }
            }
            if let Some(card) = state.slot_to_card[slot].take() {
                state.card_to_slot[card] = None;
                deck.push(card);
                reclaimed += 1;
                self.display.remove_card(slot);
            }
        }
        reclaimed
    }

    pub fn set_marking_enabled(&self, enabled: bool) {
        self.state.acquire_dealer().marking_enabled = enabled;
    }

    pub fn marking_enabled(&self) -> bool {
        self.state.acquire_player().marking_enabled
    }

    pub fn card_at(&self, slot: Slot) -> Option<Card> {
        self.state
            .acquire_player()
            .slot_to_card
            .get(slot)
            .copied()
            .flatten()
    }

    pub fn slot_of(&self, card: Card) -> Option<Slot> {
        self.state
            .acquire_player()
            .card_to_slot
            .get(card)
            .copied()
            .flatten()
    }

    pub fn has_token(&self, player: PlayerId, slot: Slot) -> bool {
        if player >= self.players || slot >= self.table_size {
            return false;
        }
        self.state
            .acquire_player()
            .token(player, slot)
            .load(Ordering::Relaxed)
    }

    pub fn token_count(&self, player: PlayerId) -> usize {
        if player >= self.players {
            return 0;
        }
        self.state.acquire_player().token_count(player)
    }

    pub fn count_cards(&self) -> usize {
        self.state
            .acquire_player()
            .slot_to_card
            .iter()
            .filter(|card| card.is_some())
            .count()
    }

    /// Occupied slots with their cards, in slot order.
    pub fn cards_on_table(&self) -> Vec<(Slot, Card)> {
        self.state
            .acquire_player()
            .slot_to_card
            .iter()
            .enumerate()
            .filter_map(|(slot, card)| card.map(|card| (slot, card)))
            .collect()
    }

    pub fn empty_slots(&self) -> Vec<Slot> {
        self.state
            .acquire_player()
            .slot_to_card
            .iter()
            .enumerate()
            .filter_map(|(slot, card)| card.is_none().then_some(slot))
            .collect()
    }

    /// Check that the two mappings are exact inverses.
    pub fn mappings_consistent(&self) -> bool {
        let state = self.state.acquire_player();
        let forward = state
            .slot_to_card
            .iter()
            .enumerate()
            .all(|(slot, card)| card.map_or(true, |card| state.card_to_slot[card] == Some(slot)));
        let backward = state
            .card_to_slot
            .iter()
            .enumerate()
            .all(|(card, slot)| slot.map_or(true, |slot| state.slot_to_card[slot] == Some(card)));
        forward && backward
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::test_support::{DisplayEvent, RecordingDisplay};

    fn board(players: usize, table_size: usize, deck_size: usize) -> (Board, Arc<RecordingDisplay>) {
        let display = Arc::new(RecordingDisplay::default());
        let board = Board::new(players, table_size, deck_size, display.clone());
        board.set_marking_enabled(true);
        (board, display)
    }

    #[test]
    fn test_place_and_remove_card_keep_mappings_inverse() {
        let (board, display) = board(1, 4, 10);
        assert!(board.place_card(7, 2));
        assert_eq!(board.card_at(2), Some(7));
        assert_eq!(board.slot_of(7), Some(2));
        assert!(board.mappings_consistent());

        assert_eq!(board.remove_card(2), Some(7));
        assert_eq!(board.card_at(2), None);
        assert_eq!(board.slot_of(7), None);
        assert!(board.mappings_consistent());
        assert_eq!(
            display.events(),
            vec![DisplayEvent::PlaceCard(7, 2), DisplayEvent::RemoveCard(2)]
        );
    }

    #[test]
    fn test_place_card_rejects_occupied_slot_and_duplicate_card() {
        let (board, _) = board(1, 4, 10);
        assert!(board.place_card(1, 0));
        assert!(!board.place_card(2, 0));
        assert!(!board.place_card(1, 3));
        assert!(!board.place_card(1, 9));
        assert!(!board.place_card(11, 1));
        assert_eq!(board.count_cards(), 1);
        assert!(board.mappings_consistent());
    }

    #[test]
    fn test_remove_card_on_empty_slot_is_noop() {
        let (board, display) = board(1, 4, 10);
        assert_eq!(board.remove_card(1), None);
        assert!(display.events().is_empty());
    }

    #[test]
    fn test_remove_token_is_idempotent() {
        let (board, _) = board(2, 4, 10);
        board.place_card(0, 0);
        assert!(!board.remove_token(0, 0));
        assert!(board.try_mark_slot(0, 0));
        assert!(board.remove_token(0, 0));
        assert!(!board.remove_token(0, 0));
        assert!(!board.has_token(0, 0));
    }

    #[test]
    fn test_try_mark_slot_requires_card_and_enabled_marking() {
        let (board, _) = board(1, 4, 10);
        assert!(!board.try_mark_slot(0, 1));
        board.place_card(3, 1);
        board.set_marking_enabled(false);
        assert!(!board.try_mark_slot(0, 1));
        board.set_marking_enabled(true);
        assert!(board.try_mark_slot(0, 1));
        assert!(!board.try_mark_slot(0, 1), "already marked");
    }

    #[test]
    fn test_try_mark_slot_caps_tokens_at_three() {
        let (board, _) = board(1, 5, 10);
        for slot in 0..5 {
            board.place_card(slot, slot);
        }
        for slot in 0..3 {
            assert!(board.try_mark_slot(0, slot));
        }
        assert!(!board.try_mark_slot(0, 3));
        assert_eq!(board.token_count(0), 3);
        assert!(!board.has_token(0, 3));
    }

    #[test]
    fn test_extract_candidate() {
        let (board, _) = board(2, 4, 10);
        for (card, slot) in [(5, 0), (6, 1), (7, 2), (8, 3)] {
            board.place_card(card, slot);
        }
        board.try_mark_slot(1, 3);
        board.try_mark_slot(1, 0);
        assert_eq!(board.extract_candidate(1), None, "only two tokens");

        board.try_mark_slot(1, 2);
        assert_eq!(
            board.extract_candidate(1),
            Some(CandidateSet {
                player: 1,
                cards: [5, 7, 8],
                slots: [0, 2, 3],
            })
        );
        assert_eq!(board.extract_candidate(0), None);
    }

    #[test]
    fn test_extract_candidate_absent_when_marked_slot_emptied() {
        let (board, _) = board(1, 4, 10);
        for slot in 0..3 {
            board.place_card(slot, slot);
        }
        board.place_token(0, 0);
        board.place_token(0, 1);
        board.place_token(0, 3);
        assert_eq!(board.extract_candidate(0), None);
    }

    #[test]
    fn test_remove_card_clears_every_players_token() {
        let (board, display) = board(3, 4, 10);
        board.place_card(4, 1);
        for player in 0..3 {
            assert!(board.try_mark_slot(player, 1));
        }
        board.remove_card(1);
        for player in 0..3 {
            assert!(!board.has_token(player, 1));
        }
        let removed = display
            .events()
            .into_iter()
            .filter(|event| matches!(event, DisplayEvent::RemoveToken(_, 1)))
            .count();
        assert_eq!(removed, 3);
    }

    #[test]
    fn test_is_still_valid_detects_changes() {
        let (board, _) = board(1, 4, 10);
        for (card, slot) in [(1, 0), (2, 1), (3, 2)] {
            board.place_card(card, slot);
        }
        let candidate = CandidateSet {
            player: 0,
            cards: [1, 2, 3],
            slots: [0, 1, 2],
        };
        assert!(board.is_still_valid(&candidate));

        let reordered = CandidateSet {
            cards: [2, 1, 3],
            ..candidate
        };
        assert!(!board.is_still_valid(&reordered));

        board.remove_card(1);
        assert!(!board.is_still_valid(&candidate));
        board.place_card(9, 1);
        assert!(!board.is_still_valid(&candidate));
    }

    #[test]
    fn test_reclaim_preserves_card_multiset() {
        let (board, _) = board(2, 4, 10);
        let mut deck: Vec<Card> = (0..10).collect();
        for slot in 0..4 {
            let card = deck.remove(0);
            board.place_card(card, slot);
        }
        board.try_mark_slot(0, 2);
        board.try_mark_slot(1, 3);

        assert_eq!(board.reclaim_all_cards_to_deck(&mut deck), 4);
        assert_eq!(board.count_cards(), 0);
        assert_eq!(board.token_count(0), 0);
        assert_eq!(board.token_count(1), 0);
        assert!(board.mappings_consistent());

        deck.sort_unstable();
        assert_eq!(deck, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_cards_on_table_and_empty_slots() {
        let (board, _) = board(1, 4, 10);
        board.place_card(8, 3);
        board.place_card(2, 1);
        assert_eq!(board.cards_on_table(), vec![(1, 2), (3, 8)]);
        assert_eq!(board.empty_slots(), vec![0, 2]);
    }

    #[test]
    fn test_table_delay_applies_to_card_moves_only() {
        let display = Arc::new(RecordingDisplay::default());
        let board = Board::new(1, 4, 10, display).with_table_delay(Duration::from_millis(150));
        board.set_marking_enabled(true);

        let started = std::time::Instant::now();
        assert!(board.place_card(3, 0));
        assert!(started.elapsed() >= Duration::from_millis(150));

        let started = std::time::Instant::now();
        assert!(board.try_mark_slot(0, 0));
        assert!(board.remove_token(0, 0));
        assert!(board.place_token(0, 0));
        assert!(started.elapsed() < Duration::from_millis(100));

        let started = std::time::Instant::now();
        assert_eq!(board.remove_card(0), Some(3));
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn test_concurrent_marking_respects_cap() {
        let (board, _) = board(4, 12, 12);
        for slot in 0..12 {
            board.place_card(slot, slot);
        }
        let board = Arc::new(board);
        let handles: Vec<_> = (0..4)
            .map(|player| {
                let board = Arc::clone(&board);
                thread::spawn(move || {
                    for round in 0..200 {
                        let slot = (round * 7 + player) % 12;
                        if !board.remove_token(player, slot) {
                            board.try_mark_slot(player, slot);
                        }
                        assert!(board.token_count(player) <= MAX_TOKENS);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(board.mappings_consistent());
    }
}
