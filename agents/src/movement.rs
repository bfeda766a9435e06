// ═══════════════════════════════════════════════════════════════════════
// Movement helpers — choosing among the engine's legal moves
//
// Nothing here decides legality; every candidate comes from
// `Engine::legal_moves` or `Engine::validate_move`.
// ═══════════════════════════════════════════════════════════════════════

use rand::seq::SliceRandom;
use rand::RngCore;

use tilewar_engine::navigation::{blockade_pieces, MoveKind};
use tilewar_engine::spatial::Heatmap;
use tilewar_engine::{Engine, PieceId, PieceKind, Pos, Rejection};

/// Best attack available to `unit` right now: a capture beats a kill,
/// a kill beats chip damage, settlers before warriors, weakest first.
pub fn best_attack(engine: &Engine, unit: PieceId) -> Option<(Pos, PieceId)> {
    let board = &engine.state().board;
    let damage = board.piece(unit)?.damage;
    engine.legal_moves(unit)
        .into_iter()
        .filter_map(|(pos, kind)| match kind {
            MoveKind::Attack(target) => board.piece(target).map(|t| (pos, t)),
            MoveKind::Step => None,
        })
        .min_by_key(|(pos, t)| {
            let finishes = t.hp <= damage;
            let rank = match (t.kind, finishes) {
                (PieceKind::City, true) => 0,
                (PieceKind::Settler, _) => 1,
                (PieceKind::Warrior, true) => 2,
                (PieceKind::Warrior, false) => 3,
                (PieceKind::City, false) => 4,
            };
            (rank, t.hp, *pos)
        })
        .map(|(pos, t)| (pos, t.id))
}

/// Unit step from `from` toward `to` (one tile on each axis at most).
fn direct_step(from: Pos, to: Pos) -> Pos {
    from.offset((to.row - from.row).signum(), (to.col - from.col).signum())
}

/// When the direct diagonal step toward `dest` is closed by a blockade,
/// the blockading warrior this unit can attack, weakest first.
pub fn blockade_target(engine: &Engine, unit: PieceId, dest: Pos) -> Option<(Pos, PieceId)> {
    let state = engine.state();
    let from = state.board.piece(unit)?.pos;
    if from == dest {
        return None;
    }
    let step = direct_step(from, dest);
    if !matches!(engine.validate_move(unit, step.row, step.col), Err(Rejection::Blockaded(_))) {
        return None;
    }
    let (a, b) = blockade_pieces(state, from, step)?;
    [a, b].into_iter()
        .filter_map(|id| state.board.piece(id))
        .filter(|p| engine.validate_move(unit, p.pos.row, p.pos.col) == Ok(MoveKind::Attack(p.id)))
        .min_by_key(|p| (p.hp, p.id))
        .map(|p| (p.pos, p.id))
}

/// Legal move that brings `unit` strictly closer to `dest`, preferring
/// tiles with less threat when `awareness` is positive.
pub fn step_toward(engine: &Engine, unit: PieceId, dest: Pos, threat: &Heatmap, awareness: f32) -> Option<Pos> {
    let from = engine.state().board.piece(unit)?.pos;
    let current = from.chebyshev(dest);
    engine.legal_moves(unit)
        .into_iter()
        .map(|(pos, _)| pos)
        .filter(|pos| pos.chebyshev(dest) < current)
        .map(|pos| {
            let score = pos.chebyshev(dest) as f32 + 0.75 * awareness * threat.get(pos);
            (pos, score)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(pos, _)| pos)
}

/// Any legal move, uniformly.
pub fn random_move(engine: &Engine, unit: PieceId, rng: &mut dyn RngCore) -> Option<Pos> {
    engine.legal_moves(unit).choose(rng).map(|(pos, _)| *pos)
}
