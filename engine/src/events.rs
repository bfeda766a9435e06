// ═══════════════════════════════════════════════════════════════════════
// Action records — structured log of every accepted command
//
// The engine keeps a journal and forwards each record to any subscribed
// sink (history panels, replay writers, analytics). It never stores
// anything itself beyond the in-memory journal.
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};

use crate::types::*;

/// Serializes as `{"actionType": ..., "details": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "actionType", content = "details")]
pub enum GameEvent {
    GameSetup {
        rows: i32,
        cols: i32,
        players: Vec<PlayerId>,
    },
    PieceMoved {
        piece: PieceId,
        from: Pos,
        to: Pos,
    },
    Attack {
        attacker: PieceId,
        defender: PieceId,
        damage: i32,
        defender_hp: i32,
        destroyed: bool,
    },
    CityCaptured {
        city: PieceId,
        from: PlayerId,
        to: PlayerId,
        pos: Pos,
    },
    TileClaimed {
        pos: Pos,
        previous: Option<PlayerId>,
        owner: PlayerId,
    },
    PlayerEliminated {
        player: PlayerId,
        conqueror: PlayerId,
        converted: Vec<PieceId>,
        destroyed: Vec<PieceId>,
    },
    CityFounded {
        settler: PieceId,
        city: PieceId,
        pos: Pos,
    },
    ProductionSet {
        city: PieceId,
        kind: Option<ProductionKind>,
    },
    ProductionFlags {
        city: PieceId,
        repeat: bool,
        paused: bool,
    },
    ProductionCompleted {
        city: PieceId,
        kind: ProductionKind,
        spawned: Option<PieceId>,
    },
    ProductionBlocked {
        city: PieceId,
        kind: ProductionKind,
    },
    TechAdvanced {
        player: PlayerId,
        tech_score: u32,
    },
    WarDeclared {
        by: PlayerId,
        against: PlayerId,
    },
    PeaceProposed {
        by: PlayerId,
        to: PlayerId,
    },
    PeaceAccepted {
        by: PlayerId,
        with: PlayerId,
    },
    TurnEnded {
        player: PlayerId,
        next: PlayerId,
        turn: u32,
    },
    GameOver {
        winner: PlayerId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub turn: u32,
    pub actor: Option<PlayerId>,
    #[serde(flatten)]
    pub event: GameEvent,
}

/// Subscriber for action records.
pub trait EventSink: Send {
    fn record(&mut self, record: &ActionRecord);
}

/// Sink that keeps everything in memory; handy for tests and replays.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub records: Vec<ActionRecord>,
}

impl EventSink for MemorySink {
    fn record(&mut self, record: &ActionRecord) {
        self.records.push(record.clone());
    }
}
