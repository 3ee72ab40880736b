//! # Set Game
//!
//! A concurrent engine for the Set card game: one dealer thread owns the
//! table and rules on candidate sets, one thread per player turns key
//! presses into tokens and candidates. Ships with a terminal UI built with
//! Ratatui and a headless mode for computer-only games.
//!
//! ## Modules
//!
//! - [`sync`]: Admission lock, bounded action queue, candidate queue, stop signal
//! - [`game`]: Board, dealer and player actors, set rules, game session
//! - [`ui`]: Display sink, terminal table view and app
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

pub mod config;
pub mod error;
pub mod game;
pub mod sync;
pub mod ui;
