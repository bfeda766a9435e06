// ═══════════════════════════════════════════════════════════════════════
// Board — grid of piece references, tile ownership and the piece registry
//
// The grid only ever stores ids. The registry is the single owner of
// piece data, and every operation that moves or removes a piece updates
// both sides before returning, so the two can never disagree.
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::BoardError;
use crate::types::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardState {
    rows: i32,
    cols: i32,
    grid: Vec<Option<PieceId>>,
    ownership: Vec<Option<PlayerId>>,
    pieces: BTreeMap<PieceId, Piece>,
    next_piece_id: u32,
}

impl BoardState {
    pub fn new(rows: i32, cols: i32) -> Self {
        let cells = (rows.max(0) * cols.max(0)) as usize;
        BoardState {
            rows,
            cols,
            grid: vec![None; cells],
            ownership: vec![None; cells],
            pieces: BTreeMap::new(),
            next_piece_id: 1,
        }
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.row >= 0 && pos.col >= 0 && pos.row < self.rows && pos.col < self.cols
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        self.in_bounds(pos).then(|| (pos.row * self.cols + pos.col) as usize)
    }

    /// Every in-bounds position, row-major.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.rows).flat_map(move |r| (0..self.cols).map(move |c| Pos::new(r, c)))
    }

    // ── Occupancy ──────────────────────────────────────────────────────

    pub fn piece_id_at(&self, pos: Pos) -> Option<PieceId> {
        self.index(pos).and_then(|i| self.grid[i])
    }

    pub fn piece_at(&self, pos: Pos) -> Option<&Piece> {
        self.piece_id_at(pos).and_then(|id| self.pieces.get(&id))
    }

    pub fn is_empty(&self, pos: Pos) -> bool {
        self.in_bounds(pos) && self.piece_id_at(pos).is_none()
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(&id)
    }

    pub fn piece_mut(&mut self, id: PieceId) -> Option<&mut Piece> {
        self.pieces.get_mut(&id)
    }

    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    pub fn pieces_mut(&mut self) -> impl Iterator<Item = &mut Piece> {
        self.pieces.values_mut()
    }

    pub fn pieces_of(&self, owner: PlayerId) -> impl Iterator<Item = &Piece> {
        self.pieces.values().filter(move |p| p.owner == owner)
    }

    /// Ids of `owner`'s pieces of the given kind, in id order.
    pub fn ids_of(&self, owner: PlayerId, kind: PieceKind) -> Vec<PieceId> {
        self.pieces_of(owner).filter(|p| p.kind == kind).map(|p| p.id).collect()
    }

    pub fn count_of(&self, owner: PlayerId, kind: PieceKind) -> usize {
        self.pieces_of(owner).filter(|p| p.kind == kind).count()
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Distinct owners of City pieces.
    pub fn city_owners(&self) -> BTreeSet<PlayerId> {
        self.pieces.values().filter(|p| p.is_city()).map(|p| p.owner).collect()
    }

    // ── Ownership ──────────────────────────────────────────────────────

    pub fn owner_at(&self, pos: Pos) -> Option<PlayerId> {
        self.index(pos).and_then(|i| self.ownership[i])
    }

    pub fn set_owner(&mut self, pos: Pos, owner: Option<PlayerId>) -> Result<(), BoardError> {
        let i = self.index(pos).ok_or(BoardError::OutOfBounds(pos))?;
        self.ownership[i] = owner;
        Ok(())
    }

    pub fn tiles_owned(&self, owner: PlayerId) -> usize {
        self.ownership.iter().filter(|o| **o == Some(owner)).count()
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Create a piece at `pos` with base stats for its kind.
    pub fn spawn(&mut self, kind: PieceKind, owner: PlayerId, pos: Pos) -> Result<PieceId, BoardError> {
        let i = self.index(pos).ok_or(BoardError::OutOfBounds(pos))?;
        if self.grid[i].is_some() {
            return Err(BoardError::Occupied(pos));
        }
        let id = PieceId(self.next_piece_id);
        self.next_piece_id += 1;
        self.grid[i] = Some(id);
        self.pieces.insert(id, Piece::new(id, kind, owner, pos));
        Ok(id)
    }

    /// Remove a piece from both the grid and the registry.
    pub fn remove(&mut self, id: PieceId) -> Result<Piece, BoardError> {
        let piece = self.pieces.remove(&id).ok_or(BoardError::UnknownPiece(id))?;
        if let Some(i) = self.index(piece.pos) {
            if self.grid[i] == Some(id) {
                self.grid[i] = None;
            }
        }
        Ok(piece)
    }

    /// Move a piece to an empty cell, updating grid and registry together.
    pub fn relocate(&mut self, id: PieceId, to: Pos) -> Result<(), BoardError> {
        let to_i = self.index(to).ok_or(BoardError::OutOfBounds(to))?;
        let from = self.pieces.get(&id).ok_or(BoardError::UnknownPiece(id))?.pos;
        if self.grid[to_i].is_some() {
            return Err(BoardError::Occupied(to));
        }
        if let Some(from_i) = self.index(from) {
            self.grid[from_i] = None;
        }
        self.grid[to_i] = Some(id);
        if let Some(piece) = self.pieces.get_mut(&id) {
            piece.pos = to;
        }
        Ok(())
    }

    // ── Neighborhood ───────────────────────────────────────────────────

    /// In-bounds king-move neighbors of `pos`, in a fixed order.
    pub fn neighbors(&self, pos: Pos) -> Vec<Pos> {
        NEIGHBOR_OFFSETS.iter()
            .map(|&(dr, dc)| pos.offset(dr, dc))
            .filter(|&p| self.in_bounds(p))
            .collect()
    }

    pub fn free_neighbors(&self, pos: Pos) -> Vec<Pos> {
        self.neighbors(pos).into_iter().filter(|&p| self.is_empty(p)).collect()
    }

    /// Whether any City sits within Chebyshev distance `radius` of `pos`.
    pub fn city_within(&self, pos: Pos, radius: i32) -> bool {
        self.pieces.values().any(|p| p.is_city() && p.pos.chebyshev(pos) <= radius)
    }

    /// Check that grid and registry agree. Used by tests and debug asserts.
    pub fn is_consistent(&self) -> bool {
        let grid_ok = self.grid.iter().enumerate().all(|(i, cell)| match cell {
            Some(id) => self.pieces.get(id).is_some_and(|p| self.index(p.pos) == Some(i)),
            None => true,
        });
        let registry_ok = self.pieces.values()
            .all(|p| self.index(p.pos).is_some_and(|i| self.grid[i] == Some(p.id)));
        grid_ok && registry_ok
    }
}
