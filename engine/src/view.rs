// ═══════════════════════════════════════════════════════════════════════
// Board view — read-only snapshots for front ends and analytics
//
// The game has no hidden information: every player sees the whole board.
// A snapshot flattens the state into plain serializable rows:
//   • pieces with position, owner, hp and production
//   • tile ownership as a row-major grid
//   • per-player summary (cities, tiles, tech, relations)
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub rows: i32,
    pub cols: i32,
    pub turn: u32,
    pub current_player: PlayerId,
    pub game_over: bool,
    pub winner: Option<PlayerId>,
    pub pieces: Vec<PieceView>,
    /// `ownership[row][col]`
    pub ownership: Vec<Vec<Option<PlayerId>>>,
    pub players: Vec<PlayerSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceView {
    pub id: PieceId,
    pub kind: PieceKind,
    pub owner: PlayerId,
    pub row: i32,
    pub col: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub damage: i32,
    pub has_moved: bool,
    pub production: Option<Production>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub cities: usize,
    pub warriors: usize,
    pub settlers: usize,
    pub tiles: usize,
    pub tech_score: u32,
    pub eliminated: bool,
    pub relations: BTreeMap<PlayerId, Relation>,
}

pub fn snapshot(state: &GameState) -> BoardSnapshot {
    let board = &state.board;
    let pieces = board.pieces()
        .map(|p| PieceView {
            id: p.id,
            kind: p.kind,
            owner: p.owner,
            row: p.pos.row,
            col: p.pos.col,
            hp: p.hp,
            max_hp: p.max_hp,
            damage: p.damage,
            has_moved: p.has_moved,
            production: p.production,
        })
        .collect();

    let ownership = (0..board.rows())
        .map(|r| (0..board.cols()).map(|c| board.owner_at(Pos::new(r, c))).collect())
        .collect();

    let players = state.players.iter()
        .map(|p| PlayerSummary {
            id: p.id,
            name: p.name.clone(),
            cities: board.count_of(p.id, PieceKind::City),
            warriors: board.count_of(p.id, PieceKind::Warrior),
            settlers: board.count_of(p.id, PieceKind::Settler),
            tiles: board.tiles_owned(p.id),
            tech_score: p.tech_score,
            eliminated: state.is_eliminated(p.id),
            relations: p.relations.clone(),
        })
        .collect();

    BoardSnapshot {
        rows: board.rows(),
        cols: board.cols(),
        turn: state.turn,
        current_player: state.current_player_id(),
        game_over: state.game_over,
        winner: state.winner,
        pieces,
        ownership,
        players,
    }
}

/// Plain-text board. Pieces print as their kind symbol tagged with the
/// owner digit (`C0`, `W1`, `S2`); empty tiles show the owner digit or `.`.
pub fn render_ascii(state: &GameState) -> String {
    let board = &state.board;
    let mut out = String::new();
    let _ = write!(out, "   ");
    for c in 0..board.cols() {
        let _ = write!(out, "{:>3}", c);
    }
    out.push('\n');
    for r in 0..board.rows() {
        let _ = write!(out, "{:>3}", r);
        for c in 0..board.cols() {
            let pos = Pos::new(r, c);
            let cell = match (board.piece_at(pos), board.owner_at(pos)) {
                (Some(p), _) => format!("{}{}", p.kind.symbol(), p.owner.0),
                (None, Some(o)) => format!(" {}", o.0),
                (None, None) => " .".to_string(),
            };
            let _ = write!(out, "{:>3}", cell);
        }
        out.push('\n');
    }
    for p in &state.players {
        let _ = writeln!(
            out,
            "{} {:<12} cities {:>2}  tiles {:>3}  tech {:>2}",
            p.id,
            p.name,
            state.city_count(p.id),
            board.tiles_owned(p.id),
            p.tech_score,
        );
    }
    out
}
