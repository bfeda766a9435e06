pub mod types;
pub mod board;
pub mod error;
pub mod events;
pub mod navigation;
pub mod combat;
pub mod production;
pub mod setup;
pub mod engine;
pub mod spatial;
pub mod view;

mod tests;

pub use types::*;
pub use board::BoardState;
pub use error::{BoardError, Rejection, SetupError};
pub use events::{ActionRecord, EventSink, GameEvent, MemorySink};
pub use navigation::MoveKind;
pub use combat::{CombatReport, EliminationReport};
pub use setup::{GameConfig, PlayerSetup};
pub use engine::{Engine, MoveOutcome, TurnOutcome};
pub use spatial::{Heatmap, SpatialAnalysis, StrengthBucket};
pub use view::BoardSnapshot;
