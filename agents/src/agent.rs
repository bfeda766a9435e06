// ═══════════════════════════════════════════════════════════════════════
// Agent Trait — interface every AI player implements
//
// KEY DESIGN PRINCIPLE:
//   Agents play through the same `Engine` commands a human front end
//   uses. They cannot reach into the GameState mutably, so whatever an
//   agent does is subject to the exact same validation.
//
//   A turn is the agent's commands only. Ending the turn is the caller's
//   job (see `AiManager::execute_turn`).
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use tracing::warn;

use tilewar_engine::{Engine, PlayerId, Rejection};

pub trait Agent: Send + Sync {
    /// Human-readable name (e.g. "hard militaristic").
    fn name(&self) -> &str;

    /// The player this agent controls.
    fn player(&self) -> PlayerId;

    /// Issue this player's commands for the current turn.
    fn take_turn(&mut self, engine: &mut Engine) -> TurnSummary;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiplomacyAction {
    DeclaredWar(PlayerId),
    ProposedPeace(PlayerId),
    AcceptedPeace(PlayerId),
}

/// What an agent did during one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSummary {
    pub player: PlayerId,
    pub moves: u32,
    pub attacks: u32,
    pub captures: u32,
    pub cities_founded: u32,
    pub productions_set: u32,
    pub diplomacy: Vec<DiplomacyAction>,
    /// Moves replaced by a random legal move.
    pub mistakes: u32,
    /// Commands the engine refused.
    pub rejected: u32,
}

impl TurnSummary {
    pub fn new(player: PlayerId) -> Self {
        TurnSummary {
            player,
            moves: 0,
            attacks: 0,
            captures: 0,
            cities_founded: 0,
            productions_set: 0,
            diplomacy: Vec::new(),
            mistakes: 0,
            rejected: 0,
        }
    }

    /// Unwrap a command result, counting and logging a rejection.
    pub fn check<T>(&mut self, result: Result<T, Rejection>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(reason) => {
                warn!(player = %self.player, %reason, "command rejected");
                self.rejected += 1;
                None
            }
        }
    }
}
