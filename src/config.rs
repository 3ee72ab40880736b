use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Largest deck the engine accepts.
pub const MAX_DECK_SIZE: usize = 1 << 20;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub players: PlayersConfig,
    pub table: TableConfig,
    pub timing: TimingConfig,
    pub ui: UiConfig,
}

/// Who sits at the table. Human players take the lowest ids.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlayersConfig {
    pub human: usize,
    pub computer: usize,
    /// Display names by player id; missing entries fall back to "Player N".
    pub names: Vec<String>,
}

impl Default for PlayersConfig {
    fn default() -> Self {
        PlayersConfig {
            human: 2,
            computer: 2,
            names: Vec::new(),
        }
    }
}

/// Table grid and deck shape.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub rows: usize,
    pub columns: usize,
    pub feature_count: u32,
    pub feature_size: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            rows: 3,
            columns: 4,
            feature_count: 4,
            feature_size: 3,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub turn_timeout_millis: u64,
    /// The countdown turns urgent once fewer than this many millis remain.
    pub turn_timeout_warning_millis: u64,
    pub point_freeze_millis: u64,
    pub penalty_freeze_millis: u64,
    /// Simulated latency of each card placement and removal. Token moves
    /// are not delayed.
    pub table_delay_millis: u64,
    /// How long the winners stay on screen before the app exits.
    pub end_game_pause_millis: u64,
    /// Pause between automated key presses of computer players.
    pub computer_delay_millis: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            turn_timeout_millis: 60_000,
            turn_timeout_warning_millis: 5_000,
            point_freeze_millis: 1_000,
            penalty_freeze_millis: 3_000,
            table_delay_millis: 0,
            end_game_pause_millis: 5_000,
            computer_delay_millis: 0,
        }
    }
}

impl TimingConfig {
    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_millis)
    }

    pub fn turn_timeout_warning(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_warning_millis)
    }

    pub fn point_freeze(&self) -> Duration {
        Duration::from_millis(self.point_freeze_millis)
    }

    pub fn penalty_freeze(&self) -> Duration {
        Duration::from_millis(self.penalty_freeze_millis)
    }

    pub fn table_delay(&self) -> Duration {
        Duration::from_millis(self.table_delay_millis)
    }

    pub fn end_game_pause(&self) -> Duration {
        Duration::from_millis(self.end_game_pause_millis)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Log every legal set on the table after each deal.
    pub hints: bool,
    pub log_level: String,
    /// Log destination while the terminal UI owns the screen.
    pub log_file: PathBuf,
    /// One string per human player; character `i` presses slot `i`.
    pub player_keys: Vec<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            hints: false,
            log_level: "info".into(),
            log_file: PathBuf::from("set_game.log"),
            player_keys: vec!["qwerasdfzxcv".into(), "uiopjkl;m,./".into()],
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            eprintln!("Warning: config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn table_size(&self) -> usize {
        self.table.rows.saturating_mul(self.table.columns)
    }

    /// `feature_size ^ feature_count`, saturating on overflow.
    pub fn deck_size(&self) -> usize {
        self.table
            .feature_size
            .checked_pow(self.table.feature_count)
            .unwrap_or(usize::MAX)
    }

    pub fn player_count(&self) -> usize {
        self.players.human + self.players.computer
    }

    pub fn player_name(&self, player: usize) -> String {
        self.players
            .names
            .get(player)
            .cloned()
            .unwrap_or_else(|| format!("Player {}", player + 1))
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.player_count() == 0 {
            return Err(ConfigError::Validation(
                "players.human + players.computer must be > 0".into(),
            ));
        }
        if self.table.rows == 0 {
            return Err(ConfigError::Validation("table.rows must be > 0".into()));
        }
        if self.table.columns == 0 {
            return Err(ConfigError::Validation("table.columns must be > 0".into()));
        }
        if self.table.feature_count == 0 {
            return Err(ConfigError::Validation(
                "table.feature_count must be > 0".into(),
            ));
        }
        if self.table.feature_size < 3 {
            return Err(ConfigError::Validation(
                "table.feature_size must be >= 3".into(),
            ));
        }
        if self.deck_size() > MAX_DECK_SIZE {
            return Err(ConfigError::Validation(format!(
                "table deck size must be <= {MAX_DECK_SIZE}"
            )));
        }
        if self.timing.turn_timeout_millis == 0 {
            return Err(ConfigError::Validation(
                "timing.turn_timeout_millis must be > 0".into(),
            ));
        }
        if self.timing.turn_timeout_warning_millis > self.timing.turn_timeout_millis {
            return Err(ConfigError::Validation(
                "timing.turn_timeout_warning_millis must be <= timing.turn_timeout_millis".into(),
            ));
        }

        // Key bindings for human players
        if self.ui.player_keys.len() < self.players.human {
            return Err(ConfigError::Validation(
                "ui.player_keys must have one entry per human player".into(),
            ));
        }
        let table_size = self.table_size();
        let mut seen = std::collections::HashSet::new();
        for (player, keys) in self.ui.player_keys.iter().take(self.players.human).enumerate() {
            if keys.chars().count() != table_size {
                return Err(ConfigError::Validation(format!(
                    "ui.player_keys[{player}] must have exactly {table_size} keys"
                )));
            }
            if let Some(key) = keys
                .chars()
                .map(|key| key.to_ascii_lowercase())
                .find(|key| !seen.insert(*key))
            {
                return Err(ConfigError::Validation(format!(
                    "ui.player_keys[{player}] reuses key '{key}'"
                )));
            }
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).unwrap_or_default()
    }
}
