// ═══════════════════════════════════════════════════════════════════════
// Combat — damage, city capture and the elimination cascade
// ═══════════════════════════════════════════════════════════════════════

use rand::seq::index::sample;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Rejection;
use crate::types::*;

/// Outcome of a single attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatReport {
    pub attacker: PieceId,
    pub defender: PieceId,
    pub defender_kind: PieceKind,
    pub defender_owner: PlayerId,
    pub damage: i32,
    /// Defender hp after the hit (after the capture reset, for cities).
    pub defender_hp: i32,
    /// A non-city defender was removed from the board.
    pub destroyed: bool,
    /// A city changed hands.
    pub captured: bool,
    pub elimination: Option<EliminationReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EliminationReport {
    pub player: PlayerId,
    pub conqueror: PlayerId,
    /// (original warrior, replacement warrior now owned by the conqueror)
    pub converted: Vec<(PieceId, PieceId)>,
    pub destroyed: Vec<PieceId>,
}

/// Hit points a city keeps after being captured.
pub fn captured_city_hp(max_hp: i32) -> i32 {
    (max_hp + 2) / 3
}

/// Number of warriors handed to the conqueror when a player with
/// `warriors` warriors loses their last city.
pub fn conversion_count(warriors: usize) -> usize {
    if warriors == 0 {
        0
    } else {
        (warriors / 4).max(1)
    }
}

/// Apply one attack. The caller has already validated the move; the
/// attacker's advance onto a destroyed defender's tile is also the caller's.
pub fn resolve_attack(
    state: &mut GameState,
    attacker: PieceId,
    defender: PieceId,
    rng: &mut dyn RngCore,
) -> Result<CombatReport, Rejection> {
    let (damage, attacker_owner) = {
        let a = state.board.piece(attacker).ok_or(Rejection::UnknownPiece(attacker))?;
        (a.damage, a.owner)
    };
    let (defender_kind, defender_owner, defender_pos, hp_after) = {
        let d = state.board.piece_mut(defender).ok_or(Rejection::UnknownPiece(defender))?;
        d.hp -= damage;
        (d.kind, d.owner, d.pos, d.hp)
    };

    let mut report = CombatReport {
        attacker,
        defender,
        defender_kind,
        defender_owner,
        damage,
        defender_hp: hp_after,
        destroyed: false,
        captured: false,
        elimination: None,
    };

    if hp_after > 0 {
        return Ok(report);
    }

    if defender_kind == PieceKind::City {
        if let Some(city) = state.board.piece_mut(defender) {
            city.hp = captured_city_hp(city.max_hp);
            city.owner = attacker_owner;
            city.production = None;
            report.defender_hp = city.hp;
        }
        state.board.set_owner(defender_pos, Some(attacker_owner))?;
        report.captured = true;
        info!(city = %defender, from = %defender_owner, to = %attacker_owner, "city captured");

        if state.city_count(defender_owner) == 0 {
            report.elimination = Some(eliminate_player(state, defender_owner, attacker_owner, rng));
        }
    } else {
        state.board.remove(defender)?;
        report.destroyed = true;
    }

    Ok(report)
}

/// Dissolve the army of a player who just lost their last city.
/// A random quarter (at least one) of their warriors defect in place to
/// the conqueror; the rest of their warriors and all of their settlers
/// are destroyed.
pub fn eliminate_player(
    state: &mut GameState,
    player: PlayerId,
    conqueror: PlayerId,
    rng: &mut dyn RngCore,
) -> EliminationReport {
    let warriors = state.board.ids_of(player, PieceKind::Warrior);
    let settlers = state.board.ids_of(player, PieceKind::Settler);
    let converting = conversion_count(warriors.len());

    let mut chosen = vec![false; warriors.len()];
    for i in sample(rng, warriors.len(), converting).iter() {
        chosen[i] = true;
    }

    let mut report = EliminationReport {
        player,
        conqueror,
        converted: Vec::new(),
        destroyed: Vec::new(),
    };

    for (i, &id) in warriors.iter().enumerate() {
        let Ok(old) = state.board.remove(id) else { continue };
        if chosen[i] {
            if let Ok(new_id) = state.board.spawn(PieceKind::Warrior, conqueror, old.pos) {
                if let Some(p) = state.board.piece_mut(new_id) {
                    p.has_moved = true;
                }
                report.converted.push((id, new_id));
            }
        } else {
            report.destroyed.push(id);
        }
    }
    for id in settlers {
        if state.board.remove(id).is_ok() {
            report.destroyed.push(id);
        }
    }

    info!(
        player = %player,
        conqueror = %conqueror,
        converted = report.converted.len(),
        destroyed = report.destroyed.len(),
        "player eliminated"
    );
    report
}
