// ═══════════════════════════════════════════════════════════════════════
// Difficulty — decision-quality knobs injected into each controller
//
// Difficulty never changes what is legal, only how well the AI chooses:
//   mistake_chance ...... probability a chosen move is swapped for a
//                         random legal one
//   aggression_bonus .... added to the opportunistic attack chance and
//                         to the war readiness score
//   defense_awareness ... weight of the threat heatmap when moving and
//                         when deciding to repair
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub trait Difficulty: Send + Sync {
    fn name(&self) -> &str;
    fn mistake_chance(&self) -> f64;
    fn aggression_bonus(&self) -> f64;
    fn defense_awareness(&self) -> f32;
    /// Acceptance score a peace proposal must exceed.
    fn peace_threshold(&self) -> f32;
    /// Readiness score a war declaration must exceed.
    fn war_threshold(&self) -> f32;
    /// Own turns to wait after declaring a war before declaring another.
    fn war_cooldown(&self) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyPreset {
    Easy,
    Normal,
    Hard,
}

impl DifficultyPreset {
    pub const ALL: [DifficultyPreset; 3] = [DifficultyPreset::Easy, DifficultyPreset::Normal, DifficultyPreset::Hard];
}

impl Difficulty for DifficultyPreset {
    fn name(&self) -> &str {
        match self {
            DifficultyPreset::Easy => "easy",
            DifficultyPreset::Normal => "normal",
            DifficultyPreset::Hard => "hard",
        }
    }

    fn mistake_chance(&self) -> f64 {
        match self {
            DifficultyPreset::Easy => 0.25,
            DifficultyPreset::Normal => 0.1,
            DifficultyPreset::Hard => 0.02,
        }
    }

    fn aggression_bonus(&self) -> f64 {
        match self {
            DifficultyPreset::Easy => 0.0,
            DifficultyPreset::Normal => 0.1,
            DifficultyPreset::Hard => 0.25,
        }
    }

    fn defense_awareness(&self) -> f32 {
        match self {
            DifficultyPreset::Easy => 0.5,
            DifficultyPreset::Normal => 1.0,
            DifficultyPreset::Hard => 1.5,
        }
    }

    fn peace_threshold(&self) -> f32 {
        match self {
            DifficultyPreset::Easy => 0.3,
            DifficultyPreset::Normal => 0.5,
            DifficultyPreset::Hard => 0.65,
        }
    }

    fn war_threshold(&self) -> f32 {
        match self {
            DifficultyPreset::Easy => 1.6,
            DifficultyPreset::Normal => 1.3,
            DifficultyPreset::Hard => 1.15,
        }
    }

    fn war_cooldown(&self) -> u32 {
        match self {
            DifficultyPreset::Easy => 8,
            DifficultyPreset::Normal => 5,
            DifficultyPreset::Hard => 3,
        }
    }
}

impl fmt::Display for DifficultyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown difficulty {0:?}; expected easy, normal or hard")]
pub struct UnknownDifficulty(pub String);

impl FromStr for DifficultyPreset {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(DifficultyPreset::Easy),
            "normal" | "medium" => Ok(DifficultyPreset::Normal),
            "hard" => Ok(DifficultyPreset::Hard),
            _ => Err(UnknownDifficulty(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names() {
        assert_eq!("Hard".parse::<DifficultyPreset>(), Ok(DifficultyPreset::Hard));
        assert_eq!("medium".parse::<DifficultyPreset>(), Ok(DifficultyPreset::Normal));
        assert!("brutal".parse::<DifficultyPreset>().is_err());
        for preset in DifficultyPreset::ALL {
            assert_eq!(preset.to_string().parse::<DifficultyPreset>(), Ok(preset));
        }
    }

    #[test]
    fn harder_means_fewer_mistakes_and_more_nerve() {
        let [easy, normal, hard] = DifficultyPreset::ALL;
        assert!(easy.mistake_chance() > normal.mistake_chance());
        assert!(normal.mistake_chance() > hard.mistake_chance());
        assert!(easy.war_threshold() > hard.war_threshold());
        assert!(easy.aggression_bonus() < hard.aggression_bonus());
    }
}
