// ═══════════════════════════════════════════════════════════════════════
// Errors — rule rejections and lower-level board / setup failures
//
// A `Rejection` is an ordinary outcome, not a fault: the command that
// produced it left the game untouched and its Display text is the reason
// shown to the player.
// ═══════════════════════════════════════════════════════════════════════

use thiserror::Error;

use crate::types::{PieceId, PieceKind, PlayerId, Pos};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("position {0} is off the board")]
    OutOfBounds(Pos),
    #[error("position {0} is already occupied")]
    Occupied(Pos),
    #[error("unknown piece {0}")]
    UnknownPiece(PieceId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("the game is over")]
    GameOver,
    #[error("unknown piece {0}")]
    UnknownPiece(PieceId),
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("target {0} is off the board")]
    OutOfBounds(Pos),
    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerId),
    #[error(transparent)]
    Board(#[from] BoardError),

    // ── Movement ───────────────────────────────────────────────────────
    #[error("cities cannot move")]
    CityCannotMove,
    #[error("piece has already moved this turn")]
    AlreadyMoved,
    #[error("piece is already on that tile")]
    SameTile,
    #[error("warriors move exactly one tile")]
    WarriorTooFar,
    #[error("settlers cannot move diagonally")]
    SettlerDiagonal,
    #[error("settlers move between one and three tiles")]
    SettlerTooFar,
    #[error("path is obstructed at {0}")]
    PathObstructed(Pos),
    #[error("cannot enter territory of {0} while at peace")]
    PeacefulTerritory(PlayerId),
    #[error("diagonal crossing is blockaded by {0}")]
    Blockaded(PlayerId),
    #[error("settlers cannot capture")]
    SettlerCannotCapture,
    #[error("tile is occupied by a friendly piece")]
    FriendlyOccupied,
    #[error("cannot attack {0} without being at war")]
    NotAtWar(PlayerId),
    #[error("{0} has no attack")]
    CannotAttack(PieceKind),

    // ── Cities and production ──────────────────────────────────────────
    #[error("piece {0} is not a city")]
    NotACity(PieceId),
    #[error("piece {0} is not a settler")]
    NotASettler(PieceId),
    #[error("city {0} has no production")]
    NoProduction(PieceId),
    #[error("city is already at full health")]
    AlreadyFullHealth,
    #[error("a city is too close to {0}")]
    TooCloseToCity(Pos),
    #[error("tile {0} belongs to another player")]
    ForeignTile(Pos),

    // ── Diplomacy ──────────────────────────────────────────────────────
    #[error("a player has no relations with itself")]
    SelfRelation,
    #[error("already at war with {0}")]
    AlreadyAtWar(PlayerId),
    #[error("already at peace with {0}")]
    AlreadyAtPeace(PlayerId),
    #[error("peace already proposed to {0}")]
    AlreadyProposed(PlayerId),
    #[error("{0} has not proposed peace")]
    NoProposal(PlayerId),
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("need between {min} and {max} players, got {got}")]
    PlayerCount { min: usize, max: usize, got: usize },
    #[error("board must be between {min}x{min} and {max}x{max}, got {rows}x{cols}")]
    BoardSize { min: i32, max: i32, rows: i32, cols: i32 },
    #[error("capital of {name} at {pos} is off the board")]
    CapitalOutOfBounds { name: String, pos: Pos },
    #[error("capitals at {a} and {b} are closer than {min} tiles")]
    CapitalsTooClose { a: Pos, b: Pos, min: i32 },
    #[error("no default capital slot for player {0}; give an explicit capital")]
    NoCapitalSlot(usize),
    #[error("cannot place starting pieces: {0}")]
    Board(#[from] BoardError),
    #[error("invalid game config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read game config: {0}")]
    Io(#[from] std::io::Error),
}
