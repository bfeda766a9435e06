//! Computer opponents for tilewar.
//!
//! An [`AiController`] combines a [`Personality`] (what it wants) with a
//! [`Difficulty`] (how well it plays). [`AiManager`] seats controllers,
//! or any other [`Agent`], and drives their turns against an `Engine`.

pub mod agent;
pub mod controller;
pub mod difficulty;
pub mod goals;
pub mod manager;
pub mod movement;
pub mod objective;
pub mod personality;
pub mod profile;
pub mod random;

pub use agent::{Agent, DiplomacyAction, TurnSummary};
pub use controller::AiController;
pub use difficulty::{Difficulty, DifficultyPreset, UnknownDifficulty};
pub use goals::{Goal, GoalKind};
pub use manager::{AiError, AiManager};
pub use personality::{Personality, PersonalityKind, UnknownPersonality};
pub use random::RandomAgent;
