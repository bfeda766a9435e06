// ═══════════════════════════════════════════════════════════════════════
// Game Engine — command surface and turn loop
//
// Architecture:
//   `Engine` owns the GameState, the injected randomness source and the
//   action journal. Every command validates fully before it mutates, so a
//   returned `Rejection` guarantees the state is exactly as it was.
//
// Flow:
//   1. A front end or an agent issues commands for the current player
//      (move_piece, set_production, settler_build_city, diplomacy)
//   2. `end_turn()` advances that player's production, resets their
//      movement flags and hands the turn to the next player holding a city
//   3. Accepted commands append an ActionRecord and notify subscribers
//   4. Repeat until `state().game_over`
// ═══════════════════════════════════════════════════════════════════════

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::combat::{self, CombatReport, EliminationReport};
use crate::error::{Rejection, SetupError};
use crate::events::{ActionRecord, EventSink, GameEvent};
use crate::navigation::{self, MoveKind};
use crate::production;
use crate::setup::{create_initial_state, GameConfig};
use crate::spatial::SpatialAnalysis;
use crate::types::*;
use crate::view::{self, BoardSnapshot};

/// Result of an accepted `move_piece`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    /// The piece now stands on the target tile.
    pub advanced: bool,
    /// The piece attacked and stayed put (defender survived or a city was captured).
    pub blocked: bool,
    pub combat: Option<CombatReport>,
}

/// Result of an accepted `end_turn`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub ended: PlayerId,
    pub next: PlayerId,
    pub turn: u32,
    /// Production events resolved for the player whose turn ended.
    pub production: Vec<GameEvent>,
}

pub struct Engine {
    state: GameState,
    rng: Box<dyn RngCore + Send>,
    journal: Vec<ActionRecord>,
    sinks: Vec<Box<dyn EventSink>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("turn", &self.state.turn)
            .field("current_player", &self.state.current_player_id())
            .field("game_over", &self.state.game_over)
            .field("journal", &self.journal.len())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Engine {
    // ── Construction ───────────────────────────────────────────────────

    /// Set up a new game, seeding randomness from `config.seed`.
    pub fn new(config: &GameConfig) -> Result<Self, SetupError> {
        Self::with_rng(config, Box::new(ChaCha8Rng::seed_from_u64(config.seed)))
    }

    /// Set up a new game with a caller-supplied randomness source.
    pub fn with_rng(config: &GameConfig, rng: Box<dyn RngCore + Send>) -> Result<Self, SetupError> {
        let state = create_initial_state(config)?;
        let mut engine = Self::from_state(state, rng);
        let players = engine.state.player_ids();
        info!(rows = config.rows, cols = config.cols, players = players.len(), seed = config.seed, "game set up");
        engine.record(None, GameEvent::GameSetup { rows: config.rows, cols: config.cols, players });
        Ok(engine)
    }

    /// Wrap an existing state, e.g. a hand-built scenario or a restored game.
    pub fn from_state(state: GameState, rng: Box<dyn RngCore + Send>) -> Self {
        Engine { state, rng, journal: Vec::new(), sinks: Vec::new() }
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn current_player(&self) -> PlayerId {
        self.state.current_player_id()
    }

    pub fn turn(&self) -> u32 {
        self.state.turn
    }

    pub fn is_game_over(&self) -> bool {
        self.state.game_over
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.state.winner
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        view::snapshot(&self.state)
    }

    pub fn analysis(&self, player: PlayerId) -> SpatialAnalysis {
        SpatialAnalysis::compute(&self.state, player)
    }

    /// Everything `move_piece` would check, without moving.
    pub fn validate_move(&self, piece: PieceId, row: i32, col: i32) -> Result<MoveKind, Rejection> {
        self.own_piece(piece)?;
        navigation::validate_move(&self.state, piece, Pos::new(row, col))
    }

    /// Legal targets for a piece of the current player; empty otherwise.
    pub fn legal_moves(&self, piece: PieceId) -> Vec<(Pos, MoveKind)> {
        match self.own_piece(piece) {
            Ok(_) => navigation::legal_moves(&self.state, piece),
            Err(_) => Vec::new(),
        }
    }

    /// Players whose peace proposal to `player` is waiting for an answer.
    pub fn pending_proposals(&self, player: PlayerId) -> Vec<PlayerId> {
        self.state.players.iter()
            .filter(|p| p.id != player && p.relation_to(player) == Relation::PeaceProposed)
            .map(|p| p.id)
            .collect()
    }

    // ── Action records ─────────────────────────────────────────────────

    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn journal(&self) -> &[ActionRecord] {
        &self.journal
    }

    /// Hand over the journal collected so far, leaving it empty.
    pub fn drain_events(&mut self) -> Vec<ActionRecord> {
        std::mem::take(&mut self.journal)
    }

    fn record(&mut self, actor: Option<PlayerId>, event: GameEvent) {
        let record = ActionRecord { turn: self.state.turn, actor, event };
        debug!(turn = record.turn, actor = ?record.actor, event = ?record.event, "action");
        for sink in &mut self.sinks {
            sink.record(&record);
        }
        self.journal.push(record);
    }

    fn record_elimination(&mut self, actor: PlayerId, report: &EliminationReport) {
        self.record(Some(actor), GameEvent::PlayerEliminated {
            player: report.player,
            conqueror: report.conqueror,
            converted: report.converted.iter().map(|(_, new)| *new).collect(),
            destroyed: report.destroyed.clone(),
        });
    }

    /// A piece the current player may give orders to.
    fn own_piece(&self, id: PieceId) -> Result<&Piece, Rejection> {
        if self.state.game_over {
            return Err(Rejection::GameOver);
        }
        let piece = self.state.board.piece(id).ok_or(Rejection::UnknownPiece(id))?;
        if piece.owner != self.state.current_player_id() {
            return Err(Rejection::NotYourTurn(piece.owner));
        }
        Ok(piece)
    }

    fn own_city(&self, id: PieceId) -> Result<&Piece, Rejection> {
        let piece = self.own_piece(id)?;
        if !piece.is_city() {
            return Err(Rejection::NotACity(id));
        }
        Ok(piece)
    }

    // ── Movement and combat ────────────────────────────────────────────

    pub fn move_piece(&mut self, piece: PieceId, row: i32, col: i32) -> Result<MoveOutcome, Rejection> {
        let to = Pos::new(row, col);
        let kind = self.validate_move(piece, row, col)?;
        let (owner, from) = {
            let p = self.state.board.piece(piece).ok_or(Rejection::UnknownPiece(piece))?;
            (p.owner, p.pos)
        };

        let outcome = match kind {
            MoveKind::Step => {
                self.state.board.relocate(piece, to)?;
                self.mark_moved(piece);
                self.record(Some(owner), GameEvent::PieceMoved { piece, from, to });
                self.take_war_tile(piece, owner, to);
                MoveOutcome { advanced: true, blocked: false, combat: None }
            }
            MoveKind::Attack(defender) => {
                let report = combat::resolve_attack(&mut self.state, piece, defender, &mut *self.rng)?;
                self.mark_moved(piece);
                self.record(Some(owner), GameEvent::Attack {
                    attacker: piece,
                    defender,
                    damage: report.damage,
                    defender_hp: report.defender_hp,
                    destroyed: report.destroyed,
                });
                if report.captured {
                    self.record(Some(owner), GameEvent::CityCaptured {
                        city: defender,
                        from: report.defender_owner,
                        to: owner,
                        pos: to,
                    });
                }
                if let Some(elimination) = &report.elimination {
                    self.record_elimination(owner, elimination);
                }

                let advanced = report.destroyed;
                if advanced {
                    self.state.board.relocate(piece, to)?;
                    self.record(Some(owner), GameEvent::PieceMoved { piece, from, to });
                    self.take_war_tile(piece, owner, to);
                }
                MoveOutcome { advanced, blocked: !advanced, combat: Some(report) }
            }
        };

        self.check_victory();
        Ok(outcome)
    }

    fn mark_moved(&mut self, piece: PieceId) {
        if let Some(p) = self.state.board.piece_mut(piece) {
            p.has_moved = true;
        }
    }

    /// A warrior stopping on ground held by a player it is at war with takes it.
    fn take_war_tile(&mut self, piece: PieceId, owner: PlayerId, pos: Pos) {
        let is_warrior = self.state.board.piece(piece).is_some_and(|p| p.kind == PieceKind::Warrior);
        let previous = self.state.board.owner_at(pos);
        let hostile = previous.is_some_and(|o| self.state.at_war(owner, o));
        if is_warrior && hostile && self.state.board.set_owner(pos, Some(owner)).is_ok() {
            self.record(Some(owner), GameEvent::TileClaimed { pos, previous, owner });
        }
    }

    // ── Production ─────────────────────────────────────────────────────

    /// Replace the city's production (or clear it with `None`). Progress restarts.
    pub fn set_production(&mut self, city: PieceId, kind: Option<ProductionKind>) -> Result<(), Rejection> {
        let piece = self.own_city(city)?;
        if kind == Some(ProductionKind::Repair) && piece.hp >= piece.max_hp {
            return Err(Rejection::AlreadyFullHealth);
        }
        let owner = piece.owner;
        if let Some(c) = self.state.board.piece_mut(city) {
            c.production = kind.map(Production::new);
        }
        self.record(Some(owner), GameEvent::ProductionSet { city, kind });
        Ok(())
    }

    pub fn set_production_repeat(&mut self, city: PieceId, repeat: bool) -> Result<(), Rejection> {
        self.update_production_flags(city, |slot| slot.repeat = repeat)
    }

    /// Pause or resume. Resuming is how a spawn-blocked slot gets another try.
    pub fn set_production_paused(&mut self, city: PieceId, paused: bool) -> Result<(), Rejection> {
        self.update_production_flags(city, |slot| slot.paused = paused)
    }

    fn update_production_flags(&mut self, city: PieceId, update: impl FnOnce(&mut Production)) -> Result<(), Rejection> {
        let piece = self.own_city(city)?;
        let owner = piece.owner;
        let mut slot = piece.production.ok_or(Rejection::NoProduction(city))?;
        update(&mut slot);
        if let Some(c) = self.state.board.piece_mut(city) {
            c.production = Some(slot);
        }
        self.record(Some(owner), GameEvent::ProductionFlags { city, repeat: slot.repeat, paused: slot.paused });
        Ok(())
    }

    // ── Settlers ───────────────────────────────────────────────────────

    /// A settler may found a city on an unowned or own tile with no City
    /// within one tile.
    pub fn can_settler_build_city(&self, settler: PieceId) -> Result<(), Rejection> {
        let piece = self.own_piece(settler)?;
        if piece.kind != PieceKind::Settler {
            return Err(Rejection::NotASettler(settler));
        }
        match self.state.board.owner_at(piece.pos) {
            Some(o) if o != piece.owner => return Err(Rejection::ForeignTile(piece.pos)),
            _ => {}
        }
        if self.state.board.city_within(piece.pos, 1) {
            return Err(Rejection::TooCloseToCity(piece.pos));
        }
        Ok(())
    }

    /// Consume the settler and found a city in its place. Returns the new city.
    pub fn settler_build_city(&mut self, settler: PieceId) -> Result<PieceId, Rejection> {
        self.can_settler_build_city(settler)?;
        let old = self.state.board.remove(settler)?;
        let city = self.state.board.spawn(PieceKind::City, old.owner, old.pos)?;
        self.state.board.set_owner(old.pos, Some(old.owner))?;
        info!(player = %old.owner, city = %city, pos = %old.pos, "city founded");
        self.record(Some(old.owner), GameEvent::CityFounded { settler, city, pos: old.pos });
        Ok(city)
    }

    // ── Diplomacy ──────────────────────────────────────────────────────

    fn check_pair(&self, player: PlayerId, target: PlayerId) -> Result<(), Rejection> {
        if self.state.game_over {
            return Err(Rejection::GameOver);
        }
        if player == target {
            return Err(Rejection::SelfRelation);
        }
        for id in [player, target] {
            self.state.player(id).ok_or(Rejection::UnknownPlayer(id))?;
        }
        Ok(())
    }

    fn set_relation(&mut self, from: PlayerId, to: PlayerId, relation: Relation) {
        if let Some(p) = self.state.player_mut(from) {
            p.relations.insert(to, relation);
        }
    }

    /// Immediate and symmetric; no acceptance needed.
    pub fn declare_war(&mut self, player: PlayerId, target: PlayerId) -> Result<(), Rejection> {
        self.check_pair(player, target)?;
        if self.state.at_war(player, target) {
            return Err(Rejection::AlreadyAtWar(target));
        }
        self.set_relation(player, target, Relation::War);
        self.set_relation(target, player, Relation::War);
        info!(by = %player, against = %target, "war declared");
        self.record(Some(player), GameEvent::WarDeclared { by: player, against: target });
        Ok(())
    }

    /// Only the proposer's entry changes; the pair stays at war until the
    /// target accepts.
    pub fn propose_peace(&mut self, player: PlayerId, target: PlayerId) -> Result<(), Rejection> {
        self.check_pair(player, target)?;
        if self.state.at_peace(player, target) {
            return Err(Rejection::AlreadyAtPeace(target));
        }
        if self.state.relation(player, target) == Relation::PeaceProposed {
            return Err(Rejection::AlreadyProposed(target));
        }
        self.set_relation(player, target, Relation::PeaceProposed);
        debug!(by = %player, to = %target, "peace proposed");
        self.record(Some(player), GameEvent::PeaceProposed { by: player, to: target });
        Ok(())
    }

    /// `player` accepts the pending proposal from `proposer`.
    pub fn accept_peace(&mut self, player: PlayerId, proposer: PlayerId) -> Result<(), Rejection> {
        self.check_pair(player, proposer)?;
        if self.state.relation(proposer, player) != Relation::PeaceProposed {
            return Err(Rejection::NoProposal(proposer));
        }
        self.set_relation(player, proposer, Relation::Peace);
        self.set_relation(proposer, player, Relation::Peace);
        info!(by = %player, with = %proposer, "peace made");
        self.record(Some(player), GameEvent::PeaceAccepted { by: player, with: proposer });
        Ok(())
    }

    // ── Turn loop ──────────────────────────────────────────────────────

    pub fn end_turn(&mut self) -> Result<TurnOutcome, Rejection> {
        if self.state.game_over {
            return Err(Rejection::GameOver);
        }
        let ended = self.state.current_player_id();

        let events = production::advance_production(&mut self.state, ended, &mut *self.rng);
        for event in &events {
            self.record(Some(ended), event.clone());
        }

        for piece in self.state.board.pieces_mut().filter(|p| p.owner == ended) {
            piece.has_moved = false;
        }

        if !self.check_victory() {
            self.state.current_player = self.next_player_index();
        }
        self.state.turn += 1;

        let next = self.state.current_player_id();
        self.record(Some(ended), GameEvent::TurnEnded { player: ended, next, turn: self.state.turn });
        debug!(ended = %ended, next = %next, turn = self.state.turn, "turn ended");
        Ok(TurnOutcome { ended, next, turn: self.state.turn, production: events })
    }

    /// Next seat after the current one that still holds a city. Visits each
    /// seat at most once; stays put if nobody qualifies.
    fn next_player_index(&self) -> usize {
        let n = self.state.players.len();
        (1..=n)
            .map(|step| (self.state.current_player + step) % n)
            .find(|&i| self.state.city_count(self.state.players[i].id) > 0)
            .unwrap_or(self.state.current_player)
    }

    /// Ends the game once exactly one player owns cities. Returns whether
    /// the game is over.
    pub fn check_victory(&mut self) -> bool {
        if self.state.game_over {
            return true;
        }
        let owners = self.state.board.city_owners();
        if owners.len() != 1 {
            return false;
        }
        let Some(&winner) = owners.iter().next() else {
            return false;
        };
        self.state.game_over = true;
        self.state.winner = Some(winner);
        info!(winner = %winner, turn = self.state.turn, "game over");
        self.record(Some(winner), GameEvent::GameOver { winner });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::setup::blank_state;
    use std::sync::{Arc, Mutex};

    fn engine(state: GameState) -> Engine {
        Engine::from_state(state, Box::new(ChaCha8Rng::seed_from_u64(11)))
    }

    fn two_cities() -> GameState {
        let mut state = blank_state(8, 8, 2);
        state.board.spawn(PieceKind::City, PlayerId(0), Pos::new(1, 1)).unwrap();
        state.board.spawn(PieceKind::City, PlayerId(1), Pos::new(6, 6)).unwrap();
        state
    }

    #[test]
    fn new_game_records_setup() {
        let engine = Engine::new(&GameConfig::standard(2, 5)).unwrap();
        assert_eq!(engine.journal().len(), 1);
        assert!(matches!(engine.journal()[0].event, GameEvent::GameSetup { rows: 12, cols: 12, .. }));
        assert_eq!(engine.current_player(), PlayerId(0));
    }

    #[test]
    fn only_the_current_player_moves() {
        let mut state = two_cities();
        let theirs = state.board.spawn(PieceKind::Warrior, PlayerId(1), Pos::new(4, 4)).unwrap();
        let mut engine = engine(state);
        assert_eq!(engine.move_piece(theirs, 4, 5), Err(Rejection::NotYourTurn(PlayerId(1))));
        assert!(engine.legal_moves(theirs).is_empty());
    }

    #[test]
    fn step_marks_moved_and_records() {
        let mut state = two_cities();
        let w = state.board.spawn(PieceKind::Warrior, PlayerId(0), Pos::new(3, 3)).unwrap();
        let mut engine = engine(state);
        let outcome = engine.move_piece(w, 3, 4).unwrap();
        assert!(outcome.advanced);
        assert_eq!(engine.state().board.piece(w).unwrap().pos, Pos::new(3, 4));
        assert_eq!(engine.move_piece(w, 3, 5), Err(Rejection::AlreadyMoved));
        assert!(matches!(engine.journal().last().unwrap().event, GameEvent::PieceMoved { .. }));
    }

    #[test]
    fn sinks_see_every_record() {
        #[derive(Clone, Default)]
        struct Shared(Arc<Mutex<MemorySink>>);
        impl EventSink for Shared {
            fn record(&mut self, record: &ActionRecord) {
                self.0.lock().unwrap().record(record);
            }
        }
        let shared = Shared::default();
        let mut engine = engine(two_cities());
        engine.subscribe(Box::new(shared.clone()));
        engine.declare_war(PlayerId(0), PlayerId(1)).unwrap();
        engine.end_turn().unwrap();
        assert_eq!(shared.0.lock().unwrap().records.len(), engine.journal().len());
        assert_eq!(engine.drain_events().len(), 2);
        assert!(engine.journal().is_empty());
    }

    #[test]
    fn production_commands() {
        let mut state = two_cities();
        let city = state.board.piece_id_at(Pos::new(1, 1)).unwrap();
        let w = state.board.spawn(PieceKind::Warrior, PlayerId(0), Pos::new(3, 3)).unwrap();
        let mut engine = engine(state);

        assert_eq!(engine.set_production(w, Some(ProductionKind::Warrior)), Err(Rejection::NotACity(w)));
        assert_eq!(engine.set_production(city, Some(ProductionKind::Repair)), Err(Rejection::AlreadyFullHealth));
        assert_eq!(engine.set_production_repeat(city, true), Err(Rejection::NoProduction(city)));

        engine.set_production(city, Some(ProductionKind::Science)).unwrap();
        engine.set_production_repeat(city, true).unwrap();
        let slot = engine.state().board.piece(city).unwrap().production.unwrap();
        assert_eq!((slot.kind, slot.progress, slot.repeat), (ProductionKind::Science, 0, true));

        engine.set_production(city, None).unwrap();
        assert_eq!(engine.state().board.piece(city).unwrap().production, None);
    }

    #[test]
    fn paused_slot_resumes_and_spawns() {
        let mut state = blank_state(6, 6, 2);
        let city = state.board.spawn(PieceKind::City, PlayerId(0), Pos::new(0, 0)).unwrap();
        state.board.spawn(PieceKind::City, PlayerId(1), Pos::new(5, 5)).unwrap();
        let blockers: Vec<PieceId> = [Pos::new(0, 1), Pos::new(1, 0), Pos::new(1, 1)]
            .into_iter()
            .map(|p| state.board.spawn(PieceKind::Warrior, PlayerId(0), p).unwrap())
            .collect();
        state.board.piece_mut(city).unwrap().production = Some(Production::new(ProductionKind::Warrior));
        let mut engine = engine(state);

        engine.end_turn().unwrap();
        engine.end_turn().unwrap();
        engine.end_turn().unwrap();
        let slot = engine.state().board.piece(city).unwrap().production.unwrap();
        assert!(slot.paused);
        assert_eq!(slot.progress, 1);
        engine.end_turn().unwrap();

        // P0 again: clear a tile, resume, and the warrior arrives next end of turn.
        engine.move_piece(blockers[2], 2, 2).unwrap();
        engine.set_production_paused(city, false).unwrap();
        let outcome = engine.end_turn().unwrap();
        assert!(outcome.production.iter().any(|e| matches!(e, GameEvent::ProductionCompleted { spawned: Some(_), .. })));
        assert_eq!(engine.state().board.count_of(PlayerId(0), PieceKind::Warrior), 4);
    }

    #[test]
    fn diplomacy_rejections() {
        let mut engine = engine(two_cities());
        let (a, b) = (PlayerId(0), PlayerId(1));
        assert_eq!(engine.declare_war(a, a), Err(Rejection::SelfRelation));
        assert_eq!(engine.declare_war(a, PlayerId(7)), Err(Rejection::UnknownPlayer(PlayerId(7))));
        assert_eq!(engine.propose_peace(a, b), Err(Rejection::AlreadyAtPeace(b)));
        assert_eq!(engine.accept_peace(b, a), Err(Rejection::NoProposal(a)));
        engine.declare_war(a, b).unwrap();
        assert_eq!(engine.declare_war(b, a), Err(Rejection::AlreadyAtWar(a)));
        engine.propose_peace(b, a).unwrap();
        assert_eq!(engine.propose_peace(b, a), Err(Rejection::AlreadyProposed(a)));
        assert_eq!(engine.pending_proposals(a), vec![b]);
        assert!(engine.pending_proposals(b).is_empty());
    }

    #[test]
    fn end_turn_rejected_after_game_over() {
        let mut state = blank_state(6, 6, 2);
        state.board.spawn(PieceKind::City, PlayerId(0), Pos::new(0, 0)).unwrap();
        let mut engine = engine(state);
        assert!(engine.check_victory());
        assert_eq!(engine.winner(), Some(PlayerId(0)));
        assert_eq!(engine.end_turn(), Err(Rejection::GameOver));
    }
}
