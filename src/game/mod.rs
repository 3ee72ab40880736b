//! Core Set game engine: the board, the dealer and player actors, set rules,
//! and the session that wires them onto threads.

mod board;
mod dealer;
mod generator;
mod player;
mod rules;
mod session;

/// Card identifier, `0..deck_size`.
pub type Card = usize;
/// Table slot index, `0..table_size`.
pub type Slot = usize;
/// Player identifier, `0..player_count`.
pub type PlayerId = usize;

pub use board::{Board, CandidateSet, MAX_TOKENS};
pub use dealer::{Dealer, DealerSettings, GameSummary, Seat};
pub use generator::KeyGenerator;
pub use player::{ComputerInput, FreezeTiming, MoveOutcome, Player, Verdict};
pub use rules::{FeatureRules, PredicateRules, SetRules};
pub use session::Game;
