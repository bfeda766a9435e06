// ═══════════════════════════════════════════════════════════════════════
// Game Runner — plays complete headless games between seated agents
//
// Every seat is driven through `AiManager`, so the engine sees exactly
// the commands a human front end could issue. A game that reaches the
// turn limit without a victory is decided by tiebreak: cities, then
// owned tiles, then tech score, then the lowest player id.
// ═══════════════════════════════════════════════════════════════════════

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use tilewar_agents::{AiManager, DifficultyPreset, PersonalityKind, RandomAgent};
use tilewar_engine::{Engine, GameConfig, GameState, PieceKind, PlayerId};

use crate::error::RunError;

/// Who plays a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Seat {
    Ai { difficulty: DifficultyPreset, personality: PersonalityKind },
    Random,
}

impl Seat {
    pub fn ai(difficulty: DifficultyPreset, personality: PersonalityKind) -> Self {
        Seat::Ai { difficulty, personality }
    }

    /// Name the seat is rated under.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::Ai { difficulty, personality } => write!(f, "{difficulty} {personality}"),
            Seat::Random => f.write_str("random"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bad seat {0:?}; expected `random`, `<difficulty>` or `<difficulty>:<personality>`")]
pub struct UnknownSeat(pub String);

/// `random`, `hard` or `hard:expansionist`. A bare difficulty plays
/// militaristic.
impl FromStr for Seat {
    type Err = UnknownSeat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("random") {
            return Ok(Seat::Random);
        }
        let bad = || UnknownSeat(s.to_string());
        let (difficulty, personality) = s.split_once(':').unwrap_or((s, "militaristic"));
        Ok(Seat::Ai {
            difficulty: difficulty.parse().map_err(|_| bad())?,
            personality: personality.parse().map_err(|_| bad())?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Victory,
    Tiebreak,
}

/// Result of a completed game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub seed: u64,
    pub winner: PlayerId,
    pub decided_by: Decision,
    pub turns_played: u32,
    pub player_results: Vec<PlayerResult>,
}

impl GameResult {
    pub fn winner_result(&self) -> Option<&PlayerResult> {
        self.player_results.iter().find(|p| p.player == self.winner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub player: PlayerId,
    pub agent_name: String,
    pub cities: usize,
    pub tiles: usize,
    pub warriors: usize,
    pub tech_score: u32,
    pub eliminated: bool,
    /// Commands the engine refused from this seat over the game.
    pub rejected: u32,
}

/// Run one game to victory or `max_turns`.
pub fn run_game(config: &GameConfig, seats: &[Seat], max_turns: u32) -> Result<GameResult, RunError> {
    if seats.len() != config.players.len() {
        return Err(RunError::SeatCount { seats: seats.len(), players: config.players.len() });
    }
    let mut engine = Engine::new(config)?;
    let mut manager = AiManager::new(config.seed);
    for (i, seat) in seats.iter().enumerate() {
        let player = PlayerId(i as u8);
        match *seat {
            Seat::Ai { difficulty, personality } => manager.register_ai_player_with(player, difficulty, personality),
            Seat::Random => manager.register_agent(Box::new(RandomAgent::new(player, config.seed.wrapping_add(i as u64)))),
        }
    }

    let mut rejected = vec![0u32; seats.len()];
    while !engine.is_game_over() && engine.turn() <= max_turns {
        let summary = manager.execute_current(&mut engine)?;
        if let Some(count) = rejected.get_mut(summary.player.0 as usize) {
            *count += summary.rejected;
        }
    }

    let (winner, decided_by) = match engine.winner() {
        Some(w) => (w, Decision::Victory),
        None => (tiebreak_winner(engine.state()), Decision::Tiebreak),
    };
    let result = build_result(engine.state(), config.seed, seats, &rejected, winner, decided_by);
    info!(
        seed = config.seed,
        winner = %winner,
        decided_by = ?decided_by,
        turns = result.turns_played,
        "game finished"
    );
    Ok(result)
}

/// Leader on cities, then tiles, then tech, then lowest id.
pub fn tiebreak_winner(state: &GameState) -> PlayerId {
    state.players
        .iter()
        .max_by_key(|p| {
            (
                state.city_count(p.id),
                state.board.tiles_owned(p.id),
                p.tech_score,
                Reverse(p.id),
            )
        })
        .map_or(PlayerId(0), |p| p.id)
}

fn build_result(
    state: &GameState,
    seed: u64,
    seats: &[Seat],
    rejected: &[u32],
    winner: PlayerId,
    decided_by: Decision,
) -> GameResult {
    let player_results = state.players
        .iter()
        .zip(seats)
        .map(|(p, seat)| PlayerResult {
            player: p.id,
            agent_name: seat.label(),
            cities: state.city_count(p.id),
            tiles: state.board.tiles_owned(p.id),
            warriors: state.board.count_of(p.id, PieceKind::Warrior),
            tech_score: p.tech_score,
            eliminated: state.is_eliminated(p.id),
            rejected: rejected.get(p.id.0 as usize).copied().unwrap_or(0),
        })
        .collect();

    GameResult {
        seed,
        winner,
        decided_by,
        turns_played: state.turn,
        player_results,
    }
}

// ── Batches ────────────────────────────────────────────────────────────

/// Play one standard game per seed in parallel. Seats rotate by game
/// index so no agent always starts first. Results come back in seed order.
pub fn run_batch(seeds: &[u64], seats: &[Seat], max_turns: u32) -> Vec<Result<GameResult, RunError>> {
    debug!(games = seeds.len(), seats = seats.len(), "batch started");
    seeds.par_iter()
        .enumerate()
        .map(|(i, &seed)| {
            let mut rotated = seats.to_vec();
            if !rotated.is_empty() {
                rotated.rotate_left(i % seats.len());
            }
            run_game(&GameConfig::standard(seats.len(), seed), &rotated, max_turns)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilewar_engine::setup::blank_state;
    use tilewar_engine::Pos;

    fn seats() -> Vec<Seat> {
        vec![
            Seat::ai(DifficultyPreset::Hard, PersonalityKind::Militaristic),
            Seat::ai(DifficultyPreset::Normal, PersonalityKind::Expansionist),
        ]
    }

    #[test]
    fn game_finishes_within_the_limit() {
        let result = run_game(&GameConfig::standard(2, 42), &seats(), 80).unwrap();
        assert!(result.turns_played <= 81);
        assert_eq!(result.player_results.len(), 2);
        assert!(result.player_results.iter().all(|p| p.rejected == 0));
        let winner = result.winner_result().unwrap();
        if result.decided_by == Decision::Victory {
            assert!(result.player_results.iter().filter(|p| p.player != winner.player).all(|p| p.eliminated));
        }
    }

    #[test]
    fn same_seed_same_result() {
        let a = run_game(&GameConfig::standard(2, 7), &seats(), 60).unwrap();
        let b = run_game(&GameConfig::standard(2, 7), &seats(), 60).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn seat_count_must_match() {
        let err = run_game(&GameConfig::standard(3, 1), &seats(), 10).unwrap_err();
        assert!(matches!(err, RunError::SeatCount { seats: 2, players: 3 }));
    }

    #[test]
    fn parses_seats() {
        assert_eq!("random".parse::<Seat>().unwrap(), Seat::Random);
        assert_eq!("hard".parse::<Seat>().unwrap(), Seat::ai(DifficultyPreset::Hard, PersonalityKind::Militaristic));
        assert_eq!(
            "easy:expansionist".parse::<Seat>().unwrap(),
            Seat::ai(DifficultyPreset::Easy, PersonalityKind::Expansionist)
        );
        assert!("hard:pacifist".parse::<Seat>().is_err());
        assert_eq!(Seat::ai(DifficultyPreset::Normal, PersonalityKind::Expansionist).label(), "normal expansionist");
    }

    #[test]
    fn tiebreak_order() {
        let mut state = blank_state(8, 8, 3);
        state.board.spawn(PieceKind::City, PlayerId(0), Pos::new(0, 0)).unwrap();
        state.board.spawn(PieceKind::City, PlayerId(1), Pos::new(4, 4)).unwrap();
        state.board.spawn(PieceKind::City, PlayerId(2), Pos::new(7, 7)).unwrap();
        assert_eq!(tiebreak_winner(&state), PlayerId(0));

        state.player_mut(PlayerId(2)).unwrap().tech_score = 3;
        assert_eq!(tiebreak_winner(&state), PlayerId(2));

        state.board.set_owner(Pos::new(4, 5), Some(PlayerId(1))).unwrap();
        assert_eq!(tiebreak_winner(&state), PlayerId(1));

        state.board.spawn(PieceKind::City, PlayerId(0), Pos::new(0, 4)).unwrap();
        assert_eq!(tiebreak_winner(&state), PlayerId(0));
    }

    #[test]
    fn batch_rotates_seats() {
        let seats = vec![Seat::Random, Seat::ai(DifficultyPreset::Easy, PersonalityKind::Expansionist)];
        let results = run_batch(&[1, 2], &seats, 20);
        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        let second = results[1].as_ref().unwrap();
        assert_eq!(first.seed, 1);
        assert_eq!(first.player_results[0].agent_name, "random");
        assert_eq!(second.player_results[0].agent_name, "easy expansionist");
    }
}
