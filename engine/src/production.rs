// ═══════════════════════════════════════════════════════════════════════
// Production — per-city build slots advanced at the end of the owner's turn
// ═══════════════════════════════════════════════════════════════════════

use rand::seq::SliceRandom;
use rand::RngCore;
use tracing::{debug, warn};

use crate::combat::eliminate_player;
use crate::events::GameEvent;
use crate::types::*;

/// Advance every unpaused production slot owned by `player` by one step
/// and resolve whatever completes. Returns the resulting events in order.
pub fn advance_production(state: &mut GameState, player: PlayerId, rng: &mut dyn RngCore) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for city_id in state.board.ids_of(player, PieceKind::City) {
        // An earlier completion this pass (diplomacy) may have changed hands.
        let Some(city) = state.board.piece_mut(city_id) else { continue };
        if city.owner != player {
            continue;
        }
        let Some(slot) = city.production.as_mut() else { continue };
        if slot.paused {
            continue;
        }
        slot.progress += 1;
        if slot.is_complete() {
            complete(state, city_id, rng, &mut events);
        }
    }
    events
}

fn complete(state: &mut GameState, city_id: PieceId, rng: &mut dyn RngCore, events: &mut Vec<GameEvent>) {
    let Some(city) = state.board.piece(city_id) else { return };
    let Some(slot) = city.production else { return };
    let (owner, pos) = (city.owner, city.pos);
    let mut spawned = None;

    match slot.kind {
        ProductionKind::Diplomacy => {
            events.extend(expand_territory(state, owner, pos, rng));
        }
        ProductionKind::Science => {
            let score = grant_science(state, owner);
            events.push(GameEvent::TechAdvanced { player: owner, tech_score: score });
        }
        ProductionKind::Warrior | ProductionKind::Settler => {
            let kind = slot.kind.spawns().unwrap_or(PieceKind::Warrior);
            match state.board.free_neighbors(pos).first() {
                Some(&at) => {
                    spawned = state.board.spawn(kind, owner, at).ok();
                    if let Some(p) = spawned.and_then(|id| state.board.piece_mut(id)) {
                        p.has_moved = true;
                    }
                }
                None => {
                    // Recoverable: hold the slot one step short of completion.
                    if let Some(s) = state.board.piece_mut(city_id).and_then(|c| c.production.as_mut()) {
                        s.paused = true;
                        s.progress = s.kind.turns_required() - 1;
                    }
                    warn!(city = %city_id, kind = %slot.kind, "no free tile; production paused");
                    events.push(GameEvent::ProductionBlocked { city: city_id, kind: slot.kind });
                    return;
                }
            }
        }
        ProductionKind::Repair => {
            if let Some(c) = state.board.piece_mut(city_id) {
                c.hp = (c.hp + 1).min(c.max_hp);
            }
        }
    }

    // Diplomacy can flip this very city away if it sat on the claimed tile;
    // in that case the capture already cleared the slot.
    if let Some(c) = state.board.piece_mut(city_id) {
        if c.owner == owner {
            let full = c.hp >= c.max_hp;
            c.production = match (slot.repeat, slot.kind) {
                (true, ProductionKind::Repair) if full => None,
                (true, kind) => Some(Production { kind, progress: 0, paused: false, repeat: true }),
                (false, _) => None,
            };
        }
    }

    debug!(city = %city_id, kind = %slot.kind, "production completed");
    events.push(GameEvent::ProductionCompleted { city: city_id, kind: slot.kind, spawned });
}

/// +1 tech, +1 hp and max hp to every city and warrior, +1 damage to warriors.
pub fn grant_science(state: &mut GameState, owner: PlayerId) -> u32 {
    for piece in state.board.pieces_mut().filter(|p| p.owner == owner) {
        match piece.kind {
            PieceKind::City => {
                piece.max_hp += 1;
                piece.hp += 1;
            }
            PieceKind::Warrior => {
                piece.max_hp += 1;
                piece.hp += 1;
                piece.damage += 1;
            }
            PieceKind::Settler => {}
        }
    }
    match state.player_mut(owner) {
        Some(p) => {
            p.tech_score += 1;
            p.tech_score
        }
        None => 0,
    }
}

/// Claim one tile bordering `owner`'s territory. Unowned tiles are preferred
/// over tiles of players at war; tiles of peaceful neighbours are never taken.
/// Among equals the tile nearest `origin` wins, remaining ties are random.
pub fn expand_territory(state: &mut GameState, owner: PlayerId, origin: Pos, rng: &mut dyn RngCore) -> Vec<GameEvent> {
    let candidates: Vec<(Pos, bool)> = state.board.positions()
        .filter(|&p| {
            let tile_owner = state.board.owner_at(p);
            tile_owner != Some(owner)
                && tile_owner.map_or(true, |o| !state.at_peace(owner, o))
                && (p == origin || state.board.neighbors(p).iter().any(|&n| state.board.owner_at(n) == Some(owner)))
        })
        .map(|p| (p, state.board.owner_at(p).is_none()))
        .collect();

    let rank = |&(p, unowned): &(Pos, bool)| (!unowned, p.chebyshev(origin));
    let Some(best) = candidates.iter().map(rank).min() else {
        return Vec::new();
    };
    let tied: Vec<Pos> = candidates.iter().filter(|c| rank(*c) == best).map(|c| c.0).collect();
    let Some(&target) = tied.choose(rng) else {
        return Vec::new();
    };

    claim_tile(state, owner, target, rng)
}

/// Transfer `pos` to `owner`. A foreign city standing on it changes hands too,
/// which may eliminate its previous owner.
pub fn claim_tile(state: &mut GameState, owner: PlayerId, pos: Pos, rng: &mut dyn RngCore) -> Vec<GameEvent> {
    let previous = state.board.owner_at(pos);
    if state.board.set_owner(pos, Some(owner)).is_err() {
        return Vec::new();
    }
    let mut events = vec![GameEvent::TileClaimed { pos, previous, owner }];

    let city = state.board.piece_at(pos)
        .filter(|p| p.is_city() && p.owner != owner)
        .map(|p| (p.id, p.owner));
    if let Some((city_id, from)) = city {
        if let Some(c) = state.board.piece_mut(city_id) {
            c.owner = owner;
            c.production = None;
        }
        events.push(GameEvent::CityCaptured { city: city_id, from, to: owner, pos });
        if state.city_count(from) == 0 {
            let report = eliminate_player(state, from, owner, rng);
            events.push(GameEvent::PlayerEliminated {
                player: report.player,
                conqueror: report.conqueror,
                converted: report.converted.iter().map(|(_, new)| *new).collect(),
                destroyed: report.destroyed,
            });
        }
    }
    events
}
