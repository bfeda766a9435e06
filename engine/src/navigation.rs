// ═══════════════════════════════════════════════════════════════════════
// Navigation — movement legality, blockades, legal move enumeration
//
// Pure functions over GameState. Validation never mutates; the engine
// applies a move only after `validate_move` returns Ok.
// ═══════════════════════════════════════════════════════════════════════

use crate::error::Rejection;
use crate::types::*;

/// What a legal move will do once applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// Move onto an empty tile.
    Step,
    /// Attack the piece occupying the target tile.
    Attack(PieceId),
}

/// Check whether `piece` may move to `to`. Does not consider whose turn it is.
pub fn validate_move(state: &GameState, piece: PieceId, to: Pos) -> Result<MoveKind, Rejection> {
    let board = &state.board;
    let mover = board.piece(piece).ok_or(Rejection::UnknownPiece(piece))?;

    if !board.in_bounds(to) {
        return Err(Rejection::OutOfBounds(to));
    }
    if mover.kind == PieceKind::City {
        return Err(Rejection::CityCannotMove);
    }
    if mover.has_moved {
        return Err(Rejection::AlreadyMoved);
    }
    if mover.pos == to {
        return Err(Rejection::SameTile);
    }

    match mover.kind {
        PieceKind::Warrior => {
            if mover.pos.chebyshev(to) != 1 {
                return Err(Rejection::WarriorTooFar);
            }
        }
        PieceKind::Settler => {
            if mover.pos.is_diagonal_to(to) {
                return Err(Rejection::SettlerDiagonal);
            }
            let distance = mover.pos.chebyshev(to);
            if !(1..=3).contains(&distance) {
                return Err(Rejection::SettlerTooFar);
            }
            if let Some(blocked) = first_obstruction(state, mover.pos, to) {
                return Err(Rejection::PathObstructed(blocked));
            }
        }
        PieceKind::City => unreachable!(),
    }

    // Territory of a peaceful neighbour is closed.
    if let Some(tile_owner) = board.owner_at(to) {
        if tile_owner != mover.owner && state.at_peace(mover.owner, tile_owner) {
            return Err(Rejection::PeacefulTerritory(tile_owner));
        }
    }

    if mover.pos.is_diagonal_to(to) {
        if let Some(blocker) = blockade_owner(state, mover.pos, to) {
            if blocker != mover.owner {
                return Err(Rejection::Blockaded(blocker));
            }
        }
    }

    match board.piece_at(to) {
        None => Ok(MoveKind::Step),
        Some(_) if mover.kind == PieceKind::Settler => Err(Rejection::SettlerCannotCapture),
        Some(occupant) if occupant.owner == mover.owner => Err(Rejection::FriendlyOccupied),
        Some(occupant) if !state.at_war(mover.owner, occupant.owner) => {
            Err(Rejection::NotAtWar(occupant.owner))
        }
        Some(_) if mover.damage <= 0 => Err(Rejection::CannotAttack(mover.kind)),
        Some(occupant) => Ok(MoveKind::Attack(occupant.id)),
    }
}

/// First occupied tile strictly between `from` and `to` on an orthogonal line.
fn first_obstruction(state: &GameState, from: Pos, to: Pos) -> Option<Pos> {
    let d_row = (to.row - from.row).signum();
    let d_col = (to.col - from.col).signum();
    let steps = from.chebyshev(to);
    (1..steps)
        .map(|i| from.offset(d_row * i, d_col * i))
        .find(|&p| state.board.piece_id_at(p).is_some())
}

/// Owner of the two warriors holding the opposite corners of the 2×2 square
/// crossed by a diagonal step from `from` to `to`, if both belong to one player.
pub fn blockade_owner(state: &GameState, from: Pos, to: Pos) -> Option<PlayerId> {
    if !from.is_diagonal_to(to) || from.chebyshev(to) != 1 {
        return None;
    }
    let corner_a = state.board.piece_at(Pos::new(from.row, to.col))?;
    let corner_b = state.board.piece_at(Pos::new(to.row, from.col))?;
    let both_warriors = corner_a.kind == PieceKind::Warrior && corner_b.kind == PieceKind::Warrior;
    (both_warriors && corner_a.owner == corner_b.owner).then_some(corner_a.owner)
}

/// Pieces forming the blockade that stops a diagonal step, if any.
pub fn blockade_pieces(state: &GameState, from: Pos, to: Pos) -> Option<(PieceId, PieceId)> {
    blockade_owner(state, from, to)?;
    let a = state.board.piece_id_at(Pos::new(from.row, to.col))?;
    let b = state.board.piece_id_at(Pos::new(to.row, from.col))?;
    Some((a, b))
}

/// Candidate target tiles for a piece, before legality checks.
fn candidate_targets(state: &GameState, piece: &Piece) -> Vec<Pos> {
    match piece.kind {
        PieceKind::City => Vec::new(),
        PieceKind::Warrior => state.board.neighbors(piece.pos),
        PieceKind::Settler => {
            let mut out = Vec::new();
            for (dr, dc) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                for dist in 1..=3 {
                    let p = piece.pos.offset(dr * dist, dc * dist);
                    if state.board.in_bounds(p) {
                        out.push(p);
                    }
                }
            }
            out
        }
    }
}

/// Every tile the piece could legally move to (or attack) right now.
pub fn legal_moves(state: &GameState, piece: PieceId) -> Vec<(Pos, MoveKind)> {
    let Some(p) = state.board.piece(piece) else {
        return Vec::new();
    };
    candidate_targets(state, p)
        .into_iter()
        .filter_map(|to| validate_move(state, piece, to).ok().map(|kind| (to, kind)))
        .collect()
}
