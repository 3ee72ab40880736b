//! Terminal UI and the display sink the game reports to: a tracing-backed
//! display for headless runs and a ratatui table view for interactive play.

mod app;
mod display;
mod game_view;
mod table_view;
#[cfg(test)]
pub mod test_support;

pub use app::{key_bindings, App};
pub use display::{GameDisplay, LogDisplay};
pub use table_view::{PlayerView, TableDisplay, TableView};
