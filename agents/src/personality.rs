// ═══════════════════════════════════════════════════════════════════════
// Personality — pluggable strategy objects for goal scoring and
// production preference
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use tilewar_engine::ProductionKind;

use crate::goals::GoalKind;

/// Inputs to a production choice for one idle city.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProductionContext {
    pub cities: usize,
    pub warriors: usize,
    pub settlers: usize,
    pub tiles: usize,
    pub board_tiles: usize,
    pub at_war: bool,
    /// Threat heatmap value at this city.
    pub threat: f32,
}

impl ProductionContext {
    pub fn territory_share(&self) -> f32 {
        if self.board_tiles == 0 {
            0.0
        } else {
            self.tiles as f32 / self.board_tiles as f32
        }
    }
}

pub trait Personality: Send + Sync {
    fn kind(&self) -> PersonalityKind;

    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Multiplier applied to a goal's base priority.
    fn goal_weight(&self, goal: GoalKind, at_war: bool) -> f32;

    /// Productions in order of preference for an idle city.
    fn production_ranking(&self, ctx: &ProductionContext) -> Vec<ProductionKind>;

    /// Scales relative strength when weighing a war declaration.
    fn war_appetite(&self) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonalityKind {
    Militaristic,
    Expansionist,
}

impl PersonalityKind {
    pub const ALL: [PersonalityKind; 2] = [PersonalityKind::Militaristic, PersonalityKind::Expansionist];

    pub fn name(self) -> &'static str {
        match self {
            PersonalityKind::Militaristic => "militaristic",
            PersonalityKind::Expansionist => "expansionist",
        }
    }

    pub fn build(self) -> Box<dyn Personality> {
        match self {
            PersonalityKind::Militaristic => Box::new(Militaristic),
            PersonalityKind::Expansionist => Box::new(Expansionist),
        }
    }
}

impl fmt::Display for PersonalityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown personality {0:?}; expected militaristic or expansionist")]
pub struct UnknownPersonality(pub String);

impl FromStr for PersonalityKind {
    type Err = UnknownPersonality;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "militaristic" | "military" => Ok(PersonalityKind::Militaristic),
            "expansionist" | "expansion" => Ok(PersonalityKind::Expansionist),
            _ => Err(UnknownPersonality(s.to_string())),
        }
    }
}

// ── Militaristic ───────────────────────────────────────────────────────

/// Builds armies and science, fights early.
#[derive(Debug, Clone, Copy, Default)]
pub struct Militaristic;

impl Personality for Militaristic {
    fn kind(&self) -> PersonalityKind {
        PersonalityKind::Militaristic
    }

    fn goal_weight(&self, goal: GoalKind, _at_war: bool) -> f32 {
        match goal {
            GoalKind::Defend => 1.2,
            GoalKind::Conquer => 1.4,
            GoalKind::Demilitarize => 1.2,
            GoalKind::EstablishBorders => 1.3,
            GoalKind::Expand => 0.6,
            GoalKind::Research => 1.2,
        }
    }

    fn production_ranking(&self, ctx: &ProductionContext) -> Vec<ProductionKind> {
        use ProductionKind::*;
        let army_target = 3 * ctx.cities.max(1);
        if ctx.cities < 2 && ctx.settlers == 0 && !ctx.at_war && ctx.warriors >= 2 {
            return vec![Settler, Warrior, Science];
        }
        if ctx.at_war || ctx.warriors < army_target {
            vec![Warrior, Science, Diplomacy]
        } else {
            vec![Science, Warrior, Diplomacy]
        }
    }

    fn war_appetite(&self) -> f32 {
        1.25
    }
}

// ── Expansionist ───────────────────────────────────────────────────────

/// Most cities the expansionist will aim for.
pub const CITY_CAP: usize = 6;
/// Most settlers alive at once.
pub const SETTLER_CAP: usize = 2;
/// Share of the board beyond which diplomacy stops claiming tiles.
pub const TERRITORY_CAP: f32 = 0.35;

/// Settles and claims land, arms only as much as it must.
#[derive(Debug, Clone, Copy, Default)]
pub struct Expansionist;

impl Personality for Expansionist {
    fn kind(&self) -> PersonalityKind {
        PersonalityKind::Expansionist
    }

    fn goal_weight(&self, goal: GoalKind, at_war: bool) -> f32 {
        match goal {
            GoalKind::Defend => 1.3,
            GoalKind::Conquer => 0.8,
            GoalKind::Demilitarize => 0.9,
            GoalKind::EstablishBorders => 1.2,
            GoalKind::Expand if at_war => 0.8,
            GoalKind::Expand => 1.5,
            GoalKind::Research => 1.0,
        }
    }

    fn production_ranking(&self, ctx: &ProductionContext) -> Vec<ProductionKind> {
        use ProductionKind::*;
        let mut ranking = Vec::new();
        let guard_short = ctx.warriors < ctx.cities.max(1);
        if (ctx.at_war || ctx.threat > 0.5) && guard_short {
            ranking.push(Warrior);
        }
        if ctx.cities + ctx.settlers < CITY_CAP && ctx.settlers < SETTLER_CAP {
            ranking.push(Settler);
        }
        if ctx.territory_share() < TERRITORY_CAP {
            ranking.push(Diplomacy);
        }
        for kind in [Science, Warrior] {
            if !ranking.contains(&kind) {
                ranking.push(kind);
            }
        }
        ranking
    }

    fn war_appetite(&self) -> f32 {
        0.8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ProductionContext {
        ProductionContext { cities: 1, warriors: 1, settlers: 0, tiles: 9, board_tiles: 144, at_war: false, threat: 0.0 }
    }

    #[test]
    fn expansionist_settles_until_capped() {
        assert_eq!(Expansionist.production_ranking(&ctx())[0], ProductionKind::Settler);

        let capped = ProductionContext { cities: 5, settlers: 1, ..ctx() };
        assert_eq!(Expansionist.production_ranking(&capped)[0], ProductionKind::Diplomacy);

        let sprawling = ProductionContext { cities: 6, tiles: 80, ..ctx() };
        assert_eq!(Expansionist.production_ranking(&sprawling)[0], ProductionKind::Science);
    }

    #[test]
    fn expansionist_arms_under_threat() {
        let threatened = ProductionContext { cities: 2, warriors: 1, at_war: true, ..ctx() };
        assert_eq!(Expansionist.production_ranking(&threatened)[0], ProductionKind::Warrior);
    }

    #[test]
    fn militaristic_builds_army_then_science() {
        assert_eq!(Militaristic.production_ranking(&ctx())[0], ProductionKind::Warrior);
        let armed = ProductionContext { cities: 2, warriors: 6, ..ctx() };
        assert_eq!(Militaristic.production_ranking(&armed)[0], ProductionKind::Science);
    }

    #[test]
    fn kinds_round_trip() {
        for kind in PersonalityKind::ALL {
            assert_eq!(kind.to_string().parse::<PersonalityKind>(), Ok(kind));
            assert_eq!(kind.build().kind(), kind);
        }
    }
}
