use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;

use super::GameDisplay;
use crate::config::AppConfig;
use crate::game::{Card, FeatureRules, PlayerId, Slot};

/// What the terminal shows about one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    pub name: String,
    /// Key string for human players, one key per slot.
    pub keys: Option<String>,
    pub score: u32,
    pub frozen: Duration,
}

/// Snapshot of the table as announced by the game, read by the renderer.
#[derive(Debug, Clone)]
pub struct TableView {
    rows: usize,
    columns: usize,
    features: FeatureRules,
    cards: Vec<Option<Card>>,
    tokens: Vec<Vec<PlayerId>>,
    players: Vec<PlayerView>,
    countdown: Duration,
    urgent: bool,
    winners: Option<Vec<PlayerId>>,
}

impl TableView {
    pub fn from_config(config: &AppConfig) -> Self {
        let table_size = config.table_size();
        let players = (0..config.player_count())
            .map(|id| PlayerView {
                name: config.player_name(id),
                keys: (id < config.players.human)
                    .then(|| config.ui.player_keys.get(id).cloned())
                    .flatten(),
                score: 0,
                frozen: Duration::ZERO,
            })
            .collect();
        TableView {
            rows: config.table.rows,
            columns: config.table.columns,
            features: FeatureRules::new(
                config.table.feature_size,
                config.table.feature_count as usize,
            ),
            cards: vec![None; table_size],
            tokens: vec![Vec::new(); table_size],
            players,
            countdown: config.timing.turn_timeout(),
            urgent: false,
            winners: None,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn card_at(&self, slot: Slot) -> Option<Card> {
        self.cards.get(slot).copied().flatten()
    }

    /// Players holding a token on `slot`, in placement order.
    pub fn tokens_at(&self, slot: Slot) -> &[PlayerId] {
        self.tokens.get(slot).map_or(&[], Vec::as_slice)
    }

    pub fn players(&self) -> &[PlayerView] {
        &self.players
    }

    pub fn countdown(&self) -> (Duration, bool) {
        (self.countdown, self.urgent)
    }

    pub fn winners(&self) -> Option<&[PlayerId]> {
        self.winners.as_deref()
    }

    /// Feature digits of `card`, e.g. `0212`.
    pub fn card_label(&self, card: Card) -> String {
        self.features
            .card_features(card)
            .iter()
            .map(|feature| feature.to_string())
            .collect()
    }

    fn set_card(&mut self, slot: Slot, card: Option<Card>) {
        if let Some(cell) = self.cards.get_mut(slot) {
            *cell = card;
        }
        if card.is_none() {
            if let Some(tokens) = self.tokens.get_mut(slot) {
                tokens.clear();
            }
        }
    }

    fn set_token(&mut self, player: PlayerId, slot: Slot, present: bool) {
        let Some(tokens) = self.tokens.get_mut(slot) else {
            return;
        };
        tokens.retain(|holder| *holder != player);
        if present {
            tokens.push(player);
        }
    }

    fn player_mut(&mut self, player: PlayerId) -> Option<&mut PlayerView> {
        self.players.get_mut(player)
    }
}

/// [`GameDisplay`] that writes into a shared [`TableView`].
#[derive(Debug, Clone)]
pub struct TableDisplay {
    view: Arc<Mutex<TableView>>,
}

impl TableDisplay {
    pub fn new(view: Arc<Mutex<TableView>>) -> Self {
        TableDisplay { view }
    }

    fn view(&self) -> MutexGuard<'_, TableView> {
        self.view.lock()
    }
}

impl GameDisplay for TableDisplay {
    fn countdown(&self, remaining: Duration, urgent: bool) {
        let mut view = self.view();
        view.countdown = remaining;
        view.urgent = urgent;
    }

    fn place_card(&self, card: Card, slot: Slot) {
        self.view().set_card(slot, Some(card));
    }

    fn remove_card(&self, slot: Slot) {
        self.view().set_card(slot, None);
    }

    fn place_token(&self, player: PlayerId, slot: Slot) {
        self.view().set_token(player, slot, true);
    }

    fn remove_token(&self, player: PlayerId, slot: Slot) {
        self.view().set_token(player, slot, false);
    }

    fn score(&self, player: PlayerId, score: u32) {
        if let Some(view) = self.view().player_mut(player) {
            view.score = score;
        }
    }

    fn freeze(&self, player: PlayerId, remaining: Duration) {
        if let Some(view) = self.view().player_mut(player) {
            view.frozen = remaining;
        }
    }

    fn winners(&self, players: &[PlayerId]) {
        self.view().winners = Some(players.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_view() -> (Arc<Mutex<TableView>>, TableDisplay) {
        let view = Arc::new(Mutex::new(TableView::from_config(&AppConfig::default())));
        let display = TableDisplay::new(Arc::clone(&view));
        (view, display)
    }

    #[test]
    fn test_from_config_layout() {
        let (view, _) = shared_view();
        let view = view.lock();
        assert_eq!((view.rows(), view.columns()), (3, 4));
        assert_eq!(view.players().len(), 4);
        assert_eq!(view.players()[0].keys.as_deref(), Some("qwerasdfzxcv"));
        assert_eq!(view.players()[2].keys, None);
        assert_eq!(view.players()[3].name, "Player 4");
        assert_eq!(view.card_at(0), None);
    }

    #[test]
    fn test_cards_and_tokens() {
        let (view, display) = shared_view();
        display.place_card(40, 5);
        display.place_token(1, 5);
        display.place_token(0, 5);
        display.place_token(1, 5);
        {
            let view = view.lock();
            assert_eq!(view.card_at(5), Some(40));
            assert_eq!(view.tokens_at(5), &[0, 1]);
        }

        display.remove_token(0, 5);
        assert_eq!(view.lock().tokens_at(5), &[1]);

        display.remove_card(5);
        let view = view.lock();
        assert_eq!(view.card_at(5), None);
        assert!(view.tokens_at(5).is_empty());
    }

    #[test]
    fn test_out_of_range_updates_are_ignored() {
        let (view, display) = shared_view();
        display.place_card(1, 99);
        display.place_token(0, 99);
        display.score(42, 7);
        let view = view.lock();
        assert!(view.tokens_at(99).is_empty());
        assert!(view.players().iter().all(|player| player.score == 0));
    }

    #[test]
    fn test_scores_freezes_and_winners() {
        let (view, display) = shared_view();
        display.score(2, 3);
        display.freeze(2, Duration::from_millis(800));
        display.countdown(Duration::from_secs(4), true);
        display.winners(&[2]);
        let view = view.lock();
        assert_eq!(view.players()[2].score, 3);
        assert_eq!(view.players()[2].frozen, Duration::from_millis(800));
        assert_eq!(view.countdown(), (Duration::from_secs(4), true));
        assert_eq!(view.winners(), Some(&[2][..]));
    }

    #[test]
    fn test_display_survives_panicking_reader() {
        let (view, display) = shared_view();
        let reader = Arc::clone(&view);
        let result = std::thread::spawn(move || {
            let _view = reader.lock();
            panic!("renderer died holding the view");
        })
        .join();
        assert!(result.is_err());

        display.place_card(7, 0);
        assert_eq!(view.lock().card_at(0), Some(7));
    }

    #[test]
    fn test_card_label_digits() {
        let (view, _) = shared_view();
        let view = view.lock();
        assert_eq!(view.card_label(0), "0000");
        assert_eq!(view.card_label(80), "2222");
        assert_eq!(view.card_label(5), "0012");
    }
}
