// ═══════════════════════════════════════════════════════════════════════
// Goals — the AI's prioritized objectives for the current turn
//
// War-time goals (defend, conquer, demilitarize) always outrank
// peacetime goals (borders, expansion, research) while any war is on;
// the personality then orders goals within each tier.
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::fmt;

use tilewar_engine::PlayerId;

use crate::personality::Personality;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GoalKind {
    /// Hold own cities against nearby threats.
    Defend,
    /// Take an enemy city.
    Conquer,
    /// Destroy enemy warriors.
    Demilitarize,
    /// Push ownership out to the edges of own territory.
    EstablishBorders,
    /// Found new cities.
    Expand,
    /// Build science.
    Research,
}

impl GoalKind {
    pub const WARTIME: [GoalKind; 3] = [GoalKind::Defend, GoalKind::Conquer, GoalKind::Demilitarize];
    pub const PEACETIME: [GoalKind; 3] = [GoalKind::EstablishBorders, GoalKind::Expand, GoalKind::Research];

    pub fn is_wartime(self) -> bool {
        Self::WARTIME.contains(&self)
    }
}

impl fmt::Display for GoalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub kind: GoalKind,
    pub priority: f32,
    /// Player the goal is aimed at, for conquest and demilitarization.
    pub target: Option<PlayerId>,
}

/// What the goal planner needs to know about the turn.
#[derive(Debug, Clone, Default)]
pub struct GoalContext {
    pub enemies_at_war: Vec<PlayerId>,
    /// Enemy the profiles rate most dangerous.
    pub main_threat: Option<PlayerId>,
    /// Enemy that is weakest relative to us.
    pub weakest_enemy: Option<PlayerId>,
    /// Peak threat heatmap value over own cities.
    pub home_threat: f32,
    pub own_cities: usize,
    pub own_warriors: usize,
}

const WARTIME_TIER: f32 = 10.0;

/// Prioritized goal list, highest first.
pub fn determine_goals(personality: &dyn Personality, ctx: &GoalContext) -> Vec<Goal> {
    let at_war = !ctx.enemies_at_war.is_empty();
    let mut goals = Vec::new();

    if at_war {
        let defend = WARTIME_TIER + 2.0 * ctx.home_threat;
        goals.push(Goal { kind: GoalKind::Defend, priority: defend, target: ctx.main_threat });
        goals.push(Goal { kind: GoalKind::Conquer, priority: WARTIME_TIER, target: ctx.weakest_enemy });
        goals.push(Goal { kind: GoalKind::Demilitarize, priority: WARTIME_TIER, target: ctx.main_threat });
    }
    for kind in GoalKind::PEACETIME {
        goals.push(Goal { kind, priority: 1.0, target: None });
    }
    if !at_war && ctx.home_threat > 0.0 {
        goals.push(Goal { kind: GoalKind::Defend, priority: 1.0 + ctx.home_threat, target: ctx.main_threat });
    }

    for goal in &mut goals {
        goal.priority *= personality.goal_weight(goal.kind, at_war);
    }
    goals.sort_by(|a, b| b.priority.total_cmp(&a.priority).then(a.kind.cmp(&b.kind)));
    goals
}
