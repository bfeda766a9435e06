// ═══════════════════════════════════════════════════════════════════════
// Sticky per-unit objectives
//
// Each warrior or settler keeps its objective across turns. An objective
// that shows no progress (distance not shrinking, target not losing hp)
// for STALE_WINDOW reviews in a row is dropped so the unit gets a fresh
// assignment instead of oscillating.
// ═══════════════════════════════════════════════════════════════════════

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tilewar_engine::{GameState, PieceId, PlayerId, Pos};

use crate::goals::GoalKind;

pub const STALE_WINDOW: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveTarget {
    Tile(Pos),
    Piece(PieceId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub goal: GoalKind,
    pub target: ObjectiveTarget,
    pub assigned_turn: u32,
    pub best_distance: i32,
    pub target_hp: Option<i32>,
    pub stale: u32,
}

impl Objective {
    /// Where the unit should head right now, if the target still exists.
    pub fn destination(&self, state: &GameState) -> Option<Pos> {
        match self.target {
            ObjectiveTarget::Tile(p) => Some(p),
            ObjectiveTarget::Piece(id) => state.board.piece(id).map(|p| p.pos),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    UnitLost,
    TargetGone,
    Reached,
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectiveTracker {
    objectives: BTreeMap<PieceId, Objective>,
}

impl ObjectiveTracker {
    pub fn get(&self, unit: PieceId) -> Option<&Objective> {
        self.objectives.get(&unit)
    }

    pub fn len(&self) -> usize {
        self.objectives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty()
    }

    pub fn assign(&mut self, state: &GameState, unit: PieceId, goal: GoalKind, target: ObjectiveTarget) {
        let Some(piece) = state.board.piece(unit) else { return };
        let objective = Objective {
            goal,
            target,
            assigned_turn: state.turn,
            best_distance: i32::MAX,
            target_hp: None,
            stale: 0,
        };
        let distance = objective.destination(state).map_or(i32::MAX, |d| piece.pos.chebyshev(d));
        let target_hp = match target {
            ObjectiveTarget::Piece(id) => state.board.piece(id).map(|p| p.hp),
            ObjectiveTarget::Tile(_) => None,
        };
        debug!(unit = %unit, goal = %goal, target = ?target, "objective assigned");
        self.objectives.insert(unit, Objective { best_distance: distance, target_hp, ..objective });
    }

    pub fn iter(&self) -> impl Iterator<Item = (PieceId, &Objective)> {
        self.objectives.iter().map(|(&id, o)| (id, o))
    }

    pub fn drop_objective(&mut self, unit: PieceId) -> Option<Objective> {
        self.objectives.remove(&unit)
    }

    /// Check every objective of `me` against the current state. Returns the
    /// dropped units and why.
    pub fn review(&mut self, state: &GameState, me: PlayerId) -> Vec<(PieceId, DropReason)> {
        let mut dropped = Vec::new();
        for (&unit, objective) in self.objectives.iter_mut() {
            let reason = match state.board.piece(unit) {
                Some(piece) if piece.owner == me => review_one(state, piece.pos, objective, me),
                _ => Some(DropReason::UnitLost),
            };
            if let Some(reason) = reason {
                dropped.push((unit, reason));
            }
        }
        for (unit, reason) in &dropped {
            self.objectives.remove(unit);
            debug!(unit = %unit, reason = ?reason, "objective dropped");
        }
        dropped
    }
}

fn review_one(state: &GameState, at: Pos, objective: &mut Objective, me: PlayerId) -> Option<DropReason> {
    let (destination, hp) = match objective.target {
        ObjectiveTarget::Tile(p) => (p, None),
        ObjectiveTarget::Piece(id) => match state.board.piece(id) {
            Some(t) if t.owner != me && state.at_war(me, t.owner) => (t.pos, Some(t.hp)),
            _ => return Some(DropReason::TargetGone),
        },
    };
    let distance = at.chebyshev(destination);
    if matches!(objective.target, ObjectiveTarget::Tile(_)) && distance == 0 {
        return Some(DropReason::Reached);
    }

    let closer = distance < objective.best_distance;
    let damaged = matches!((hp, objective.target_hp), (Some(now), Some(before)) if now < before);
    if closer || damaged {
        objective.stale = 0;
    } else {
        objective.stale += 1;
    }
    objective.best_distance = objective.best_distance.min(distance);
    objective.target_hp = hp;

    (objective.stale >= STALE_WINDOW).then_some(DropReason::Stale)
}
