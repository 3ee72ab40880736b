use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::info;

use super::board::{Board, CandidateSet};
use super::dealer::{Dealer, DealerSettings, GameSummary, Seat};
use super::player::{ComputerInput, FreezeTiming, Player};
use super::rules::SetRules;
use super::{PlayerId, Slot};
use crate::config::AppConfig;
use crate::error::GameError;
use crate::sync::{ActionQueue, CandidateQueue, StopSignal};
use crate::ui::GameDisplay;

/// A running game: one dealer thread, one thread per player, and one key
/// generator thread per computer player.
///
/// Human players are fed through [`Game::key_pressed`]. Dropping the game
/// stops it and waits for every thread.
pub struct Game {
    stop: StopSignal,
    candidates: Arc<CandidateQueue<CandidateSet>>,
    inputs: Vec<Arc<ActionQueue<Slot>>>,
    dealer: Option<JoinHandle<GameSummary>>,
}

impl Game {
    /// Validate `config`, build the table and start every thread. Human
    /// players get the lowest ids, computer players follow.
    pub fn start(
        config: &AppConfig,
        rules: Arc<dyn SetRules>,
        display: Arc<dyn GameDisplay>,
    ) -> Result<Game, GameError> {
        config.validate()?;

        let players = config.player_count();
        let board = Arc::new(
            Board::new(
                players,
                config.table_size(),
                config.deck_size(),
                Arc::clone(&display),
            )
            .with_table_delay(config.timing.table_delay()),
        );
        let candidates = Arc::new(CandidateQueue::new());
        let stop = StopSignal::new();
        let freeze = FreezeTiming {
            point: config.timing.point_freeze(),
            penalty: config.timing.penalty_freeze(),
        };

        let mut inputs = Vec::with_capacity(players);
        let mut seats = Vec::with_capacity(players);
        for id in 0..players {
            let actions = Arc::new(ActionQueue::new());
            let (verdict_tx, verdict_rx) = mpsc::sync_channel(1);
            let mut player = Player::new(
                id,
                Arc::clone(&board),
                Arc::clone(&display),
                Arc::clone(&actions),
                Arc::clone(&candidates),
                verdict_rx,
                stop.clone(),
                freeze,
            );
            if id >= config.players.human {
                player = player.with_computer_input(ComputerInput {
                    key_delay: Duration::from_millis(config.timing.computer_delay_millis),
                });
            }
            let seat = Seat::new(id, Arc::clone(&actions), verdict_tx, player.score_handle());
            inputs.push(actions);

            let name = format!("player-{id}");
            match thread::Builder::new()
                .name(name.clone())
                .spawn(move || player.run())
            {
                Ok(handle) => seats.push(seat.with_thread(handle)),
                Err(source) => {
                    abort_startup(&stop, &candidates, &inputs);
                    return Err(GameError::Spawn { name, source });
                }
            }
        }

        let dealer = Dealer::new(
            board,
            rules,
            display,
            Arc::clone(&candidates),
            stop.clone(),
            config.deck_size(),
        )
        .with_settings(DealerSettings {
            turn_timeout: config.timing.turn_timeout(),
            turn_timeout_warning: config.timing.turn_timeout_warning(),
            hints: config.ui.hints,
        })
        .with_seats(seats);

        let dealer = match thread::Builder::new()
            .name("dealer".into())
            .spawn(move || dealer.run())
        {
            Ok(handle) => handle,
            Err(source) => {
                abort_startup(&stop, &candidates, &inputs);
                return Err(GameError::Spawn {
                    name: "dealer".into(),
                    source,
                });
            }
        };

        info!(
            human = config.players.human,
            computer = config.players.computer,
            table = config.table_size(),
            deck = config.deck_size(),
            "game started"
        );
        Ok(Game {
            stop,
            candidates,
            inputs,
            dealer: Some(dealer),
        })
    }

    pub fn players(&self) -> usize {
        self.inputs.len()
    }

    /// Queue a key press for `player` without blocking. Returns `false` when
    /// the press was dropped because the player's queue is full or closed.
    pub fn key_pressed(&self, player: PlayerId, slot: Slot) -> Result<bool, GameError> {
        let queue = self.inputs.get(player).ok_or(GameError::UnknownPlayer {
            player,
            players: self.inputs.len(),
        })?;
        Ok(queue.try_put(slot))
    }

    /// Ask the game to end. The dealer wraps up the current round, stops the
    /// players and announces the winners.
    pub fn stop(&self) {
        if self.stop.trigger() {
            info!("stop requested");
        }
        self.candidates.close();
    }

    pub fn is_finished(&self) -> bool {
        self.dealer.as_ref().map_or(true, |handle| handle.is_finished())
    }

    /// Wait for the dealer to finish and return the final scores.
    pub fn join(mut self) -> Result<GameSummary, GameError> {
        match self.dealer.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| GameError::Panicked("dealer".into())),
            None => Err(GameError::Panicked("dealer".into())),
        }
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        if let Some(handle) = self.dealer.take() {
            self.stop();
            let _ = handle.join();
        }
    }
}

/// Unblock whatever was already started so it can exit on its own.
fn abort_startup(
    stop: &StopSignal,
    candidates: &CandidateQueue<CandidateSet>,
    inputs: &[Arc<ActionQueue<Slot>>],
) {
    stop.trigger();
    candidates.close();
    for queue in inputs {
        queue.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rules::{FeatureRules, PredicateRules};
    use crate::game::Card;
    use crate::ui::test_support::{DisplayEvent, RecordingDisplay};
    use std::time::Instant;

    fn fast_config(human: usize, computer: usize) -> AppConfig {
        let mut config = AppConfig::default();
        config.players.human = human;
        config.players.computer = computer;
        config.ui.player_keys = ["qweasdzxc", "uiojklm,."]
            .iter()
            .take(human)
            .map(|keys| keys.to_string())
            .collect();
        config.table.rows = 3;
        config.table.columns = 3;
        config.table.feature_count = 2;
        config.table.feature_size = 3;
        config.timing.turn_timeout_millis = 2_000;
        config.timing.turn_timeout_warning_millis = 500;
        config.timing.point_freeze_millis = 0;
        config.timing.penalty_freeze_millis = 0;
        config.timing.table_delay_millis = 0;
        config.timing.computer_delay_millis = 0;
        config
    }

    #[test]
    fn test_computer_players_play_until_no_set_is_left() {
        let config = fast_config(0, 2);
        let display = Arc::new(RecordingDisplay::default());
        let rules = Arc::new(FeatureRules::new(3, 2));
        let game = Game::start(&config, rules, display.clone()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(60);
        while !game.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(game.is_finished(), "game did not end on its own");

        let summary = game.join().unwrap();
        assert_eq!(summary.scores.len(), 2);
        // Nine cards, so at most three disjoint sets can be claimed.
        assert!(summary.scores.iter().sum::<u32>() <= 3);
        assert!(!summary.winners.is_empty());
        assert!(display
            .events()
            .iter()
            .any(|event| matches!(event, DisplayEvent::Winners(_))));
    }

    #[test]
    fn test_stop_wakes_everyone() {
        let mut config = fast_config(1, 2);
        config.timing.turn_timeout_millis = 60_000;
        config.timing.turn_timeout_warning_millis = 5_000;
        let display = Arc::new(RecordingDisplay::default());
        // Every triple is a set, so the game never ends by itself.
        let rules = Arc::new(PredicateRules(|_: &[Card; 3]| true));
        let game = Game::start(&config, rules, display.clone()).unwrap();

        thread::sleep(Duration::from_millis(100));
        assert!(!game.is_finished());
        game.stop();
        let summary = game.join().unwrap();
        assert_eq!(summary.scores.len(), 3);
        assert_eq!(summary.scores[0], 0, "human never pressed a key");
    }

    #[test]
    fn test_key_pressed_routes_to_player() {
        let mut config = fast_config(1, 0);
        config.timing.turn_timeout_millis = 60_000;
        config.timing.turn_timeout_warning_millis = 5_000;
        let display = Arc::new(RecordingDisplay::default());
        let rules = Arc::new(PredicateRules(|_: &[Card; 3]| false));
        let rules: Arc<dyn SetRules> = rules;
        // No set ever exists, so the dealer ends immediately; key presses
        // still route or report unknown players.
        let game = Game::start(&config, rules, display).unwrap();
        assert!(matches!(
            game.key_pressed(3, 0),
            Err(GameError::UnknownPlayer { player: 3, players: 1 })
        ));
        game.stop();
        game.join().unwrap();
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = fast_config(0, 1);
        config.table.rows = 0;
        let display = Arc::new(RecordingDisplay::default());
        let result = Game::start(&config, Arc::new(FeatureRules::default()), display);
        assert!(matches!(result, Err(GameError::Config(_))));
    }
}
