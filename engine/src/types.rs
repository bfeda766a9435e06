// ═══════════════════════════════════════════════════════════════════════
// Core types — identifiers, pieces, players, production, relations
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::board::BoardState;

// ── Identifiers ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(pub u32);

impl std::fmt::Display for PieceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Position ───────────────────────────────────────────────────────────
// Signed so that off-board requests can be represented and rejected
// instead of wrapping.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    pub row: i32,
    pub col: i32,
}

impl Pos {
    pub const fn new(row: i32, col: i32) -> Self {
        Pos { row, col }
    }

    /// King-move distance: max(|Δrow|, |Δcol|).
    pub fn chebyshev(self, other: Pos) -> i32 {
        (self.row - other.row).abs().max((self.col - other.col).abs())
    }

    pub fn offset(self, d_row: i32, d_col: i32) -> Pos {
        Pos::new(self.row + d_row, self.col + d_col)
    }

    pub fn is_diagonal_to(self, other: Pos) -> bool {
        self.row != other.row && self.col != other.col
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The eight king-move offsets in a fixed scan order.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

// ── Pieces ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    City,
    Warrior,
    Settler,
}

impl PieceKind {
    pub const ALL: [PieceKind; 3] = [PieceKind::City, PieceKind::Warrior, PieceKind::Settler];

    /// Base maximum hit points for a freshly created piece.
    pub fn base_max_hp(self) -> i32 {
        match self {
            PieceKind::City => 4,
            PieceKind::Warrior => 2,
            PieceKind::Settler => 1,
        }
    }

    /// Base damage dealt when this piece attacks.
    pub fn base_damage(self) -> i32 {
        match self {
            PieceKind::City => 0,
            PieceKind::Warrior => 1,
            PieceKind::Settler => 0,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            PieceKind::City => 'C',
            PieceKind::Warrior => 'W',
            PieceKind::Settler => 'S',
        }
    }
}

impl std::fmt::Display for PieceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PieceKind::City => write!(f, "City"),
            PieceKind::Warrior => write!(f, "Warrior"),
            PieceKind::Settler => write!(f, "Settler"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub kind: PieceKind,
    pub owner: PlayerId,
    pub pos: Pos,
    pub hp: i32,
    pub max_hp: i32,
    pub damage: i32,
    pub has_moved: bool,
    /// Only ever `Some` on cities.
    pub production: Option<Production>,
}

impl Piece {
    pub fn new(id: PieceId, kind: PieceKind, owner: PlayerId, pos: Pos) -> Self {
        Piece {
            id,
            kind,
            owner,
            pos,
            hp: kind.base_max_hp(),
            max_hp: kind.base_max_hp(),
            damage: kind.base_damage(),
            has_moved: false,
            production: None,
        }
    }

    pub fn is_city(&self) -> bool {
        self.kind == PieceKind::City
    }

    pub fn hp_fraction(&self) -> f32 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        self.hp as f32 / self.max_hp as f32
    }
}

// ── Production ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductionKind {
    Diplomacy,
    Science,
    Warrior,
    Settler,
    Repair,
}

impl ProductionKind {
    pub const ALL: [ProductionKind; 5] = [
        ProductionKind::Diplomacy,
        ProductionKind::Science,
        ProductionKind::Warrior,
        ProductionKind::Settler,
        ProductionKind::Repair,
    ];

    /// Turns of progress needed before the production completes.
    pub fn turns_required(self) -> u8 {
        match self {
            ProductionKind::Warrior => 2,
            ProductionKind::Settler => 3,
            ProductionKind::Diplomacy => 3,
            ProductionKind::Science => 4,
            ProductionKind::Repair => 1,
        }
    }

    /// The unit spawned on completion, if any.
    pub fn spawns(self) -> Option<PieceKind> {
        match self {
            ProductionKind::Warrior => Some(PieceKind::Warrior),
            ProductionKind::Settler => Some(PieceKind::Settler),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProductionKind::Diplomacy => "Diplomacy",
            ProductionKind::Science => "Science",
            ProductionKind::Warrior => "Warrior",
            ProductionKind::Settler => "Settler",
            ProductionKind::Repair => "Repair",
        };
        write!(f, "{}", name)
    }
}

/// The single production slot of a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    pub kind: ProductionKind,
    pub progress: u8,
    pub paused: bool,
    pub repeat: bool,
}

impl Production {
    pub fn new(kind: ProductionKind) -> Self {
        Production { kind, progress: 0, paused: false, repeat: false }
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= self.kind.turns_required()
    }
}

// ── Diplomacy ──────────────────────────────────────────────────────────

/// One side's entry for a pair of players. `PeaceProposed` is only ever
/// written on the proposer's side; the target's entry stays as it was
/// until the proposal is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    Peace,
    PeaceProposed,
    War,
}

// ── Players ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub tech_score: u32,
    pub relations: BTreeMap<PlayerId, Relation>,
}

impl Player {
    pub fn relation_to(&self, other: PlayerId) -> Relation {
        self.relations.get(&other).copied().unwrap_or(Relation::Peace)
    }
}

// ── Game State ─────────────────────────────────────────────────────────

/// Everything the rules need to know about a game in progress.
/// Serializable so that front ends can snapshot it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub board: BoardState,
    /// Roster in turn order. Players are never removed, even once eliminated.
    pub players: Vec<Player>,
    pub current_player: usize,
    pub turn: u32,
    pub game_over: bool,
    pub winner: Option<PlayerId>,
}

impl GameState {
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn current_player_id(&self) -> PlayerId {
        self.players[self.current_player].id
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    /// `a`'s own entry about `b`.
    pub fn relation(&self, a: PlayerId, b: PlayerId) -> Relation {
        self.player(a).map_or(Relation::Peace, |p| p.relation_to(b))
    }

    /// A pair is at peace only while both entries say so. A pending proposal
    /// does not by itself end a war.
    pub fn at_peace(&self, a: PlayerId, b: PlayerId) -> bool {
        a != b && self.relation(a, b) == Relation::Peace && self.relation(b, a) == Relation::Peace
    }

    pub fn at_war(&self, a: PlayerId, b: PlayerId) -> bool {
        a != b && !self.at_peace(a, b)
    }

    pub fn city_count(&self, player: PlayerId) -> usize {
        self.board.count_of(player, PieceKind::City)
    }

    pub fn is_eliminated(&self, player: PlayerId) -> bool {
        self.city_count(player) == 0
    }
}
