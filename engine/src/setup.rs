// ═══════════════════════════════════════════════════════════════════════
// Game setup — configuration and the initial GameState
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::board::BoardState;
use crate::error::SetupError;
use crate::types::*;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 8;
pub const MIN_BOARD: i32 = 6;
pub const MAX_BOARD: i32 = 64;
/// Minimum Chebyshev distance between two starting capitals.
pub const MIN_CAPITAL_SPACING: i32 = 3;

/// One seat at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    pub name: String,
    /// Where the starting city goes. `None` picks the next default slot.
    #[serde(default)]
    pub capital: Option<Pos>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub rows: i32,
    pub cols: i32,
    #[serde(default)]
    pub seed: u64,
    pub players: Vec<PlayerSetup>,
}

impl GameConfig {
    /// 12×12 board with default capital slots.
    pub fn standard(player_count: usize, seed: u64) -> Self {
        GameConfig {
            rows: 12,
            cols: 12,
            seed,
            players: (0..player_count)
                .map(|i| PlayerSetup { name: format!("Player {}", i + 1), capital: None })
                .collect(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, SetupError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Capital positions after filling in defaults, validated.
    pub fn capitals(&self) -> Result<Vec<Pos>, SetupError> {
        let count = self.players.len();
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&count) {
            return Err(SetupError::PlayerCount { min: MIN_PLAYERS, max: MAX_PLAYERS, got: count });
        }
        let sizes_ok = |n: i32| (MIN_BOARD..=MAX_BOARD).contains(&n);
        if !sizes_ok(self.rows) || !sizes_ok(self.cols) {
            return Err(SetupError::BoardSize { min: MIN_BOARD, max: MAX_BOARD, rows: self.rows, cols: self.cols });
        }

        let slots = default_capital_slots(self.rows, self.cols);
        let mut capitals = Vec::with_capacity(count);
        for (i, seat) in self.players.iter().enumerate() {
            let pos = match seat.capital {
                Some(p) => p,
                None => *slots.get(i).ok_or(SetupError::NoCapitalSlot(i))?,
            };
            if pos.row < 0 || pos.col < 0 || pos.row >= self.rows || pos.col >= self.cols {
                return Err(SetupError::CapitalOutOfBounds { name: seat.name.clone(), pos });
            }
            if let Some(&other) = capitals.iter().find(|c: &&Pos| c.chebyshev(pos) < MIN_CAPITAL_SPACING) {
                return Err(SetupError::CapitalsTooClose { a: other, b: pos, min: MIN_CAPITAL_SPACING });
            }
            capitals.push(pos);
        }
        Ok(capitals)
    }
}

/// Inset corners first, then inset edge midpoints.
fn default_capital_slots(rows: i32, cols: i32) -> Vec<Pos> {
    let (top, left, bottom, right) = (2, 2, rows - 3, cols - 3);
    vec![
        Pos::new(top, left),
        Pos::new(bottom, right),
        Pos::new(top, right),
        Pos::new(bottom, left),
        Pos::new(top, cols / 2),
        Pos::new(bottom, cols / 2),
        Pos::new(rows / 2, left),
        Pos::new(rows / 2, right),
    ]
}

/// A state with an empty board and `player_count` players all at peace.
/// Used to build scenarios piece by piece.
pub fn blank_state(rows: i32, cols: i32, player_count: u8) -> GameState {
    let ids: Vec<PlayerId> = (0..player_count).map(PlayerId).collect();
    let players = ids.iter()
        .map(|&id| Player {
            id,
            name: format!("Player {}", id.0 + 1),
            tech_score: 0,
            relations: ids.iter()
                .filter(|&&other| other != id)
                .map(|&other| (other, Relation::Peace))
                .collect::<BTreeMap<_, _>>(),
        })
        .collect();
    GameState {
        board: BoardState::new(rows, cols),
        players,
        current_player: 0,
        turn: 1,
        game_over: false,
        winner: None,
    }
}

/// Create the initial game state: one city per player on its capital,
/// the surrounding 3×3 claimed, and one warrior beside the city on the
/// side facing the board centre.
pub fn create_initial_state(config: &GameConfig) -> Result<GameState, SetupError> {
    let capitals = config.capitals()?;
    let mut state = blank_state(config.rows, config.cols, config.players.len() as u8);
    for (player, seat) in state.players.iter_mut().zip(&config.players) {
        player.name = seat.name.clone();
    }

    let centre = Pos::new(config.rows / 2, config.cols / 2);
    for (i, &capital) in capitals.iter().enumerate() {
        let owner = PlayerId(i as u8);
        state.board.spawn(PieceKind::City, owner, capital)?;
        for tile in std::iter::once(capital).chain(state.board.neighbors(capital)) {
            if state.board.owner_at(tile).is_none() {
                let _ = state.board.set_owner(tile, Some(owner));
            }
        }
        let guard_tile = state.board.free_neighbors(capital)
            .into_iter()
            .min_by_key(|p| p.chebyshev(centre));
        if let Some(tile) = guard_tile {
            let _ = state.board.spawn(PieceKind::Warrior, owner, tile);
        }
    }
    Ok(state)
}
