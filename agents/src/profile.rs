// ═══════════════════════════════════════════════════════════════════════
// Opponent profiling — inferred personality and a running threat score
// ═══════════════════════════════════════════════════════════════════════

use std::collections::BTreeMap;

use tilewar_engine::spatial::{relative_strength, StrengthBucket};
use tilewar_engine::{GameState, PieceKind, PlayerId};

use crate::personality::PersonalityKind;

/// Share of the previous threat score carried into the next turn.
const THREAT_DECAY: f32 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub struct OpponentProfile {
    pub player: PlayerId,
    pub inferred: Option<PersonalityKind>,
    pub threat: f32,
    pub cities: usize,
    pub warriors: usize,
    pub settlers: usize,
}

impl OpponentProfile {
    fn new(player: PlayerId) -> Self {
        OpponentProfile { player, inferred: None, threat: 0.0, cities: 0, warriors: 0, settlers: 0 }
    }
}

/// Read a player's style off their unit mix.
pub fn infer_personality(cities: usize, warriors: usize, settlers: usize) -> Option<PersonalityKind> {
    if settlers > 0 || cities > 1 {
        Some(PersonalityKind::Expansionist)
    } else if warriors >= 3 {
        Some(PersonalityKind::Militaristic)
    } else {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileBook {
    profiles: BTreeMap<PlayerId, OpponentProfile>,
}

impl ProfileBook {
    pub fn get(&self, player: PlayerId) -> Option<&OpponentProfile> {
        self.profiles.get(&player)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpponentProfile> {
        self.profiles.values()
    }

    /// Refresh every opponent's profile from the current state.
    pub fn update(&mut self, state: &GameState, me: PlayerId) {
        for other in state.player_ids() {
            if other == me {
                continue;
            }
            let board = &state.board;
            let cities = board.count_of(other, PieceKind::City);
            let warriors = board.count_of(other, PieceKind::Warrior);
            let settlers = board.count_of(other, PieceKind::Settler);

            let profile = self.profiles.entry(other).or_insert_with(|| OpponentProfile::new(other));
            if cities == 0 {
                profile.threat = 0.0;
                profile.cities = 0;
                profile.warriors = warriors;
                profile.settlers = settlers;
                continue;
            }

            let mut fresh = 0.0;
            if state.at_war(me, other) {
                fresh += 2.0;
            }
            let buildup = warriors.saturating_sub(profile.warriors) as f32;
            fresh += 0.5 * buildup;
            fresh += match relative_strength(state, me, other).bucket {
                StrengthBucket::Weak => 1.5,
                StrengthBucket::Even => 0.5,
                StrengthBucket::Strong => 0.0,
            };

            profile.inferred = infer_personality(cities, warriors, settlers).or(profile.inferred);
            if profile.inferred == Some(PersonalityKind::Militaristic) {
                fresh += 0.5;
            }
            profile.threat = THREAT_DECAY * profile.threat + fresh;
            profile.cities = cities;
            profile.warriors = warriors;
            profile.settlers = settlers;
        }
    }

    /// Living opponent with the highest threat score.
    pub fn main_threat(&self) -> Option<PlayerId> {
        self.profiles.values()
            .filter(|p| p.cities > 0)
            .max_by(|a, b| a.threat.total_cmp(&b.threat).then(b.player.cmp(&a.player)))
            .map(|p| p.player)
    }
}
