use crate::config::AppConfig;
use crate::error::GameError;
use crate::game::{Game, GameSummary, PlayerId, Slot};
use crate::ui::table_view::TableView;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{backend::Backend, Terminal};
use std::collections::HashMap;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Map every configured player key to the (player, slot) it presses.
pub fn key_bindings(config: &AppConfig) -> HashMap<char, (PlayerId, Slot)> {
    config
        .ui
        .player_keys
        .iter()
        .take(config.players.human)
        .enumerate()
        .flat_map(|(player, keys)| {
            keys.chars()
                .enumerate()
                .map(move |(slot, key)| (key.to_ascii_lowercase(), (player, slot)))
        })
        .collect()
}

pub struct App {
    game: Game,
    view: Arc<Mutex<TableView>>,
    bindings: HashMap<char, (PlayerId, Slot)>,
    end_game_pause: Duration,
    finished_at: Option<Instant>,
    should_quit: bool,
    message: Option<String>,
}

impl App {
    pub fn new(game: Game, view: Arc<Mutex<TableView>>, config: &AppConfig) -> Self {
        App {
            game,
            view,
            bindings: key_bindings(config),
            end_game_pause: config.timing.end_game_pause(),
            finished_at: None,
            should_quit: false,
            message: None,
        }
    }

    /// Main application loop. Returns once the game is over and the winners
    /// have been on screen for the end-game pause.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()>
    where
        B::Error: Into<io::Error>,
    {
        loop {
            terminal.draw(|f| self.render(f)).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

            self.check_finished(Instant::now());
            if self.should_quit {
                break;
            }

            self.handle_events()?;
        }
        Ok(())
    }

    /// Wait for the game threads and return the final scores.
    pub fn into_summary(self) -> Result<GameSummary, GameError> {
        self.game.join()
    }

    fn check_finished(&mut self, now: Instant) {
        if !self.game.is_finished() {
            return;
        }
        let finished_at = *self.finished_at.get_or_insert(now);
        if now.duration_since(finished_at) >= self.end_game_pause {
            self.should_quit = true;
        } else if self.message.is_none() {
            self.message = Some("Game over! Press any key to exit.".to_string());
        }
    }

    /// Handle keyboard events
    fn handle_events(&mut self) -> io::Result<()> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    self.handle_key(key);
                }
            }
        }
        Ok(())
    }

    /// Handle key press
    fn handle_key(&mut self, key: KeyEvent) {
        if self.finished_at.is_some() {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Esc => self.request_stop(),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.request_stop()
            }
            KeyCode::Char(c) => match self.bindings.get(&c.to_ascii_lowercase()) {
                Some(&(player, slot)) => self.press(player, slot),
                None if c == 'q' => self.request_stop(),
                None => {}
            },
            _ => {}
        }
    }

    fn press(&mut self, player: PlayerId, slot: Slot) {
        match self.game.key_pressed(player, slot) {
            Ok(true) => {}
            Ok(false) => debug!(player, slot, "key press dropped"),
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    fn request_stop(&mut self) {
        self.message = Some("Stopping...".to_string());
        self.game.stop();
    }

    /// Render the UI
    fn render(&self, frame: &mut ratatui::Frame) {
        let view = self.view.lock();
        super::game_view::render(frame, &view, &self.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings_cover_both_humans() {
        let bindings = key_bindings(&AppConfig::default());
        assert_eq!(bindings.len(), 24);
        assert_eq!(bindings[&'q'], (0, 0));
        assert_eq!(bindings[&'v'], (0, 11));
        assert_eq!(bindings[&'u'], (1, 0));
        assert_eq!(bindings[&'/'], (1, 11));
    }

    #[test]
    fn test_bindings_skip_computer_seats() {
        let mut config = AppConfig::default();
        config.players.human = 1;
        let bindings = key_bindings(&config);
        assert_eq!(bindings.len(), 12);
        assert!(!bindings.contains_key(&'u'));
    }

    #[test]
    fn test_uppercase_keys_are_folded() {
        let mut config = AppConfig::default();
        config.players.human = 1;
        config.ui.player_keys = vec!["QWERASDFZXCV".into()];
        let bindings = key_bindings(&config);
        assert_eq!(bindings[&'q'], (0, 0));
    }
}
