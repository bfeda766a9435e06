// ═══════════════════════════════════════════════════════════════════════
// AI Manager — seats agents and drives their turns
// ═══════════════════════════════════════════════════════════════════════

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use tilewar_engine::{Engine, PlayerId, Rejection};

use crate::agent::{Agent, TurnSummary};
use crate::controller::AiController;
use crate::difficulty::DifficultyPreset;
use crate::personality::PersonalityKind;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("player {0} has no AI registered")]
    UnknownPlayer(PlayerId),

    #[error("it is {current}'s turn, not {player}'s")]
    NotTheirTurn { player: PlayerId, current: PlayerId },

    #[error("the game is already over")]
    GameOver,

    #[error(transparent)]
    Rejected(#[from] Rejection),
}

/// Agents keyed by the seat they play.
pub struct AiManager {
    agents: BTreeMap<PlayerId, Box<dyn Agent>>,
    seed: u64,
}

impl AiManager {
    pub fn new(seed: u64) -> Self {
        AiManager { agents: BTreeMap::new(), seed }
    }

    /// Seed for the agent in `player`'s seat, distinct per seat.
    fn agent_seed(&self, player: PlayerId) -> u64 {
        self.seed ^ (u64::from(player.0) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }

    /// Register an AI with the given difficulty. The personality is picked
    /// from the manager seed, so the same seed seats the same opponents.
    pub fn register_ai_player(&mut self, player: PlayerId, difficulty: DifficultyPreset) {
        let pick = (self.agent_seed(player) >> 32) as usize % PersonalityKind::ALL.len();
        self.register_ai_player_with(player, difficulty, PersonalityKind::ALL[pick]);
    }

    pub fn register_ai_player_with(&mut self, player: PlayerId, difficulty: DifficultyPreset, personality: PersonalityKind) {
        let controller = AiController::new(player, personality.build(), Box::new(difficulty), self.agent_seed(player));
        info!(player = %player, ai = controller.name(), "AI registered");
        self.agents.insert(player, Box::new(controller));
    }

    /// Seat any agent, replacing whatever held the seat before.
    pub fn register_agent(&mut self, agent: Box<dyn Agent>) {
        info!(player = %agent.player(), ai = agent.name(), "agent registered");
        self.agents.insert(agent.player(), agent);
    }

    pub fn is_ai(&self, player: PlayerId) -> bool {
        self.agents.contains_key(&player)
    }

    pub fn agent(&self, player: PlayerId) -> Option<&dyn Agent> {
        self.agents.get(&player).map(|a| a.as_ref())
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.agents.keys().copied()
    }

    /// Play `player`'s whole turn and end it. The turn is left open only
    /// when the agent's own moves ended the game.
    pub fn execute_turn(&mut self, engine: &mut Engine, player: PlayerId) -> Result<TurnSummary, AiError> {
        if engine.is_game_over() {
            return Err(AiError::GameOver);
        }
        let current = engine.current_player();
        if current != player {
            return Err(AiError::NotTheirTurn { player, current });
        }
        let agent = self.agents.get_mut(&player).ok_or(AiError::UnknownPlayer(player))?;

        let summary = agent.take_turn(engine);
        debug!(
            player = %player,
            moves = summary.moves,
            attacks = summary.attacks,
            rejected = summary.rejected,
            "AI turn done"
        );
        if !engine.is_game_over() {
            engine.end_turn()?;
        }
        Ok(summary)
    }

    /// Play the turn of whoever is to move.
    pub fn execute_current(&mut self, engine: &mut Engine) -> Result<TurnSummary, AiError> {
        let player = engine.current_player();
        self.execute_turn(engine, player)
    }
}
