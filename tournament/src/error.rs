use thiserror::Error;

use tilewar_agents::AiError;
use tilewar_engine::SetupError;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("game setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("AI turn failed: {0}")]
    Ai(#[from] AiError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{seats} seats given for a {players}-player game")]
    SeatCount { seats: usize, players: usize },
}
