//! Headless self-play for tilewar: complete games between seated agents,
//! parallel batches and a SQLite store with ELO ratings.

pub mod database;
pub mod error;
pub mod runner;

pub use database::{Database, LeaderboardEntry};
pub use error::RunError;
pub use runner::{run_batch, run_game, tiebreak_winner, Decision, GameResult, PlayerResult, Seat, UnknownSeat};
