// ═══════════════════════════════════════════════════════════════════════
// Spatial analysis — per-player heatmaps and strength metrics
//
// Everything here is a pure function of the GameState and the viewing
// player. Each heatmap is normalized on its own scale:
//   threat, opportunity ........ [0, 1]
//   territory control .......... [-1, 1]
//   expansion viability ........ [0, 1] on valid sites, INVALID_SITE elsewhere
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::types::*;

pub const THREAT_RADIUS: i32 = 5;
pub const TERRITORY_RADIUS: i32 = 4;
pub const OPPORTUNITY_RADIUS: i32 = 6;
/// Marks cells where a new city may not be founded.
pub const INVALID_SITE: f32 = -1.0;

// ── Heatmap ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    pub rows: i32,
    pub cols: i32,
    pub values: Vec<f32>,
}

impl Heatmap {
    pub fn new(rows: i32, cols: i32) -> Self {
        Heatmap { rows, cols, values: vec![0.0; (rows.max(0) * cols.max(0)) as usize] }
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        (pos.row >= 0 && pos.col >= 0 && pos.row < self.rows && pos.col < self.cols)
            .then(|| (pos.row * self.cols + pos.col) as usize)
    }

    /// Value at `pos`; 0 off the board.
    pub fn get(&self, pos: Pos) -> f32 {
        self.index(pos).map_or(0.0, |i| self.values[i])
    }

    pub fn set(&mut self, pos: Pos, value: f32) {
        if let Some(i) = self.index(pos) {
            self.values[i] = value;
        }
    }

    pub fn add(&mut self, pos: Pos, value: f32) {
        if let Some(i) = self.index(pos) {
            self.values[i] += value;
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = (Pos, f32)> + '_ {
        self.values.iter().enumerate().map(move |(i, &v)| {
            let i = i as i32;
            (Pos::new(i / self.cols, i % self.cols), v)
        })
    }

    pub fn max_value(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    /// Highest-valued cell passing `keep`; ties go to the first in row-major order.
    pub fn best_cell(&self, keep: impl Fn(Pos, f32) -> bool) -> Option<(Pos, f32)> {
        self.cells()
            .filter(|&(p, v)| keep(p, v))
            .fold(None, |best: Option<(Pos, f32)>, (p, v)| match best {
                Some((_, bv)) if bv >= v => best,
                _ => Some((p, v)),
            })
    }

    /// Scale non-negative values into [0, 1] by the maximum.
    fn normalize_by_max(&mut self) {
        let max = self.max_value();
        if max > 0.0 {
            for v in &mut self.values {
                *v = (*v / max).clamp(0.0, 1.0);
            }
        }
    }
}

/// Add `weight / (1 + d)` to every cell within `radius` of `origin`.
fn splash(map: &mut Heatmap, origin: Pos, radius: i32, weight: f32) {
    for dr in -radius..=radius {
        for dc in -radius..=radius {
            let p = origin.offset(dr, dc);
            let d = origin.chebyshev(p) as f32;
            map.add(p, weight / (1.0 + d));
        }
    }
}

// ── Heatmaps ───────────────────────────────────────────────────────────

/// Danger from warriors of players at war with `me`, weighted by damage.
pub fn threat_map(state: &GameState, me: PlayerId) -> Heatmap {
    let mut map = Heatmap::new(state.board.rows(), state.board.cols());
    for w in state.board.pieces() {
        if w.kind == PieceKind::Warrior && state.at_war(me, w.owner) {
            splash(&mut map, w.pos, THREAT_RADIUS, w.damage.max(0) as f32);
        }
    }
    map.normalize_by_max();
    map
}

/// Where `me` could profit: near weak enemy cities, settlers and warriors,
/// and on unclaimed or hostile ground. Targets of players at peace count half.
///
/// A city always outweighs a settler, which outweighs a warrior; a city's
/// weight grows as its hp falls.
pub fn opportunity_map(state: &GameState, me: PlayerId) -> Heatmap {
    let mut map = Heatmap::new(state.board.rows(), state.board.cols());
    for target in state.board.pieces().filter(|p| p.owner != me) {
        let base = match target.kind {
            PieceKind::City => 3.0 + 2.0 * (1.0 - target.hp_fraction()),
            PieceKind::Settler => 2.0,
            PieceKind::Warrior => 1.0,
        };
        let stance = if state.at_war(me, target.owner) { 1.0 } else { 0.5 };
        splash(&mut map, target.pos, OPPORTUNITY_RADIUS, base * stance);
    }
    for pos in state.board.positions() {
        match state.board.owner_at(pos) {
            None => map.add(pos, 0.3),
            Some(o) if o != me && state.at_war(me, o) => map.add(pos, 0.5),
            _ => {}
        }
    }
    map.normalize_by_max();
    map
}

/// Signed control: positive where `me` dominates, negative where others do.
pub fn territory_map(state: &GameState, me: PlayerId) -> Heatmap {
    let mut map = Heatmap::new(state.board.rows(), state.board.cols());
    for pos in state.board.positions() {
        match state.board.owner_at(pos) {
            Some(o) if o == me => map.add(pos, 0.5),
            Some(_) => map.add(pos, -0.5),
            None => {}
        }
    }
    for piece in state.board.pieces() {
        let weight = match piece.kind {
            PieceKind::City => 1.0,
            PieceKind::Warrior => 0.5,
            PieceKind::Settler => continue,
        };
        let sign = if piece.owner == me { 1.0 } else { -1.0 };
        splash(&mut map, piece.pos, TERRITORY_RADIUS, sign * weight);
    }
    for v in &mut map.values {
        *v = v.clamp(-1.0, 1.0);
    }
    map
}

/// Where `me` should found the next city. Occupied cells and cells within
/// one tile of any city hold `INVALID_SITE`; the rest are scored on
/// ownership, distance from enemies, closeness to own cities and
/// centrality, then scaled to [0, 1] among themselves.
///
/// A valid cell is a potential site, not one a settler can use right now:
/// tiles owned by other players score zero on ownership but stay valid, and
/// `Engine::can_settler_build_city` still refuses them.
pub fn expansion_map(state: &GameState, me: PlayerId) -> Heatmap {
    let board = &state.board;
    let mut map = Heatmap::new(board.rows(), board.cols());
    let centre = Pos::new(board.rows() / 2, board.cols() / 2);
    let max_span = (board.rows().max(board.cols()) / 2).max(1) as f32;

    let own_cities: Vec<Pos> = board.pieces_of(me).filter(|p| p.is_city()).map(|p| p.pos).collect();
    let enemies: Vec<Pos> = board.pieces().filter(|p| p.owner != me).map(|p| p.pos).collect();

    let mut valid = Vec::new();
    for pos in board.positions() {
        if board.piece_id_at(pos).is_some() || board.city_within(pos, 1) {
            map.set(pos, INVALID_SITE);
            continue;
        }
        let ownership = match board.owner_at(pos) {
            Some(o) if o == me => 1.0,
            None => 0.7,
            Some(_) => 0.0,
        };
        let enemy_distance = enemies.iter().map(|e| e.chebyshev(pos)).min().unwrap_or(6).min(6) as f32 / 6.0;
        let home = own_cities.iter().map(|c| c.chebyshev(pos)).min().map_or(0.5, |d| {
            // Best two or three tiles out: close enough to defend, far enough to grow.
            (1.0 - (d as f32 - 2.5).abs() / max_span).max(0.0)
        });
        let centrality = 1.0 - (pos.chebyshev(centre) as f32 / max_span).min(1.0);
        let score = 1.5 * ownership + enemy_distance + home + 0.5 * centrality;
        map.set(pos, score);
        valid.push(pos);
    }

    let (lo, hi) = valid.iter().map(|&p| map.get(p)).fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    for p in valid {
        let v = if hi > lo { (map.get(p) - lo) / (hi - lo) } else { 1.0 };
        map.set(p, v);
    }
    map
}

// ── Strength ───────────────────────────────────────────────────────────

pub const MILITARY_WEIGHT: f32 = 1.0;
pub const ECONOMIC_WEIGHT: f32 = 1.5;
pub const EXPANSION_WEIGHT: f32 = 2.0;
pub const TECH_WEIGHT: f32 = 2.0;
pub const TERRITORY_WEIGHT: f32 = 0.25;
const CITY_BASE_VALUE: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthBreakdown {
    pub military: f32,
    pub economic: f32,
    pub expansion: f32,
    pub tech: f32,
    pub territory: f32,
    pub total: f32,
}

pub fn player_strength(state: &GameState, player: PlayerId) -> StrengthBreakdown {
    let mut military = 0.0;
    let mut economic = 0.0;
    let mut expansion = 0.0;
    for p in state.board.pieces_of(player) {
        match p.kind {
            PieceKind::Warrior => military += (p.hp + p.damage) as f32,
            PieceKind::City => economic += p.hp as f32 + CITY_BASE_VALUE,
            PieceKind::Settler => expansion += 1.0,
        }
    }
    let tech = state.player(player).map_or(0, |p| p.tech_score) as f32;
    let territory = state.board.tiles_owned(player) as f32;
    let total = MILITARY_WEIGHT * military
        + ECONOMIC_WEIGHT * economic
        + EXPANSION_WEIGHT * expansion
        + TECH_WEIGHT * tech
        + TERRITORY_WEIGHT * territory;
    StrengthBreakdown { military, economic, expansion, tech, territory, total }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrengthBucket {
    Strong,
    Even,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeStrength {
    pub ratio: f32,
    pub bucket: StrengthBucket,
}

impl StrengthBucket {
    pub fn from_ratio(ratio: f32) -> Self {
        if ratio > 1.2 {
            StrengthBucket::Strong
        } else if ratio > 0.8 {
            StrengthBucket::Even
        } else {
            StrengthBucket::Weak
        }
    }
}

/// How `me` compares with `other`, as a ratio of total strength.
pub fn relative_strength(state: &GameState, me: PlayerId, other: PlayerId) -> RelativeStrength {
    let mine = player_strength(state, me).total;
    let theirs = player_strength(state, other).total;
    let ratio = if theirs > 0.0 {
        mine / theirs
    } else if mine > 0.0 {
        f32::MAX
    } else {
        1.0
    };
    RelativeStrength { ratio, bucket: StrengthBucket::from_ratio(ratio) }
}

// ── Bundle ─────────────────────────────────────────────────────────────

/// All four heatmaps for one player, computed together once per turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialAnalysis {
    pub player: PlayerId,
    pub threat: Heatmap,
    pub opportunity: Heatmap,
    pub territory: Heatmap,
    pub expansion: Heatmap,
}

impl SpatialAnalysis {
    pub fn compute(state: &GameState, player: PlayerId) -> Self {
        trace!(player = %player, turn = state.turn, "computing heatmaps");
        SpatialAnalysis {
            player,
            threat: threat_map(state, player),
            opportunity: opportunity_map(state, player),
            territory: territory_map(state, player),
            expansion: expansion_map(state, player),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::blank_state;

    fn at_war(state: &mut GameState, a: PlayerId, b: PlayerId) {
        state.player_mut(a).unwrap().relations.insert(b, Relation::War);
        state.player_mut(b).unwrap().relations.insert(a, Relation::War);
    }

    #[test]
    fn threat_only_counts_enemies_at_war() {
        let mut state = blank_state(10, 10, 2);
        state.board.spawn(PieceKind::Warrior, PlayerId(1), Pos::new(5, 5)).unwrap();
        assert_eq!(threat_map(&state, PlayerId(0)).max_value(), 0.0);

        at_war(&mut state, PlayerId(0), PlayerId(1));
        let map = threat_map(&state, PlayerId(0));
        assert_eq!(map.get(Pos::new(5, 5)), 1.0);
        assert!(map.get(Pos::new(5, 7)) < map.get(Pos::new(5, 6)));
        assert_eq!(map.get(Pos::new(0, 0)), 0.0, "outside the cutoff radius");
    }

    #[test]
    fn heatmaps_stay_in_range() {
        let mut state = blank_state(10, 10, 2);
        at_war(&mut state, PlayerId(0), PlayerId(1));
        for c in 0..5 {
            state.board.spawn(PieceKind::Warrior, PlayerId(1), Pos::new(4, c)).unwrap();
            state.board.spawn(PieceKind::City, PlayerId(0), Pos::new(8, c * 2)).unwrap();
        }
        let analysis = SpatialAnalysis::compute(&state, PlayerId(0));
        assert!(analysis.threat.values.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(analysis.opportunity.values.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(analysis.territory.values.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert!(analysis.expansion.values.iter().all(|v| *v == INVALID_SITE || (0.0..=1.0).contains(v)));
    }

    #[test]
    fn weaker_cities_are_better_opportunities() {
        let mut state = blank_state(12, 12, 2);
        at_war(&mut state, PlayerId(0), PlayerId(1));
        state.board.spawn(PieceKind::City, PlayerId(1), Pos::new(1, 1)).unwrap();
        let weak = state.board.spawn(PieceKind::City, PlayerId(1), Pos::new(10, 10)).unwrap();
        state.board.piece_mut(weak).unwrap().hp = 1;
        let map = opportunity_map(&state, PlayerId(0));
        assert!(map.get(Pos::new(10, 10)) > map.get(Pos::new(1, 1)));
    }

    #[test]
    fn cities_outrank_settlers_outrank_warriors() {
        let mut state = blank_state(20, 20, 2);
        at_war(&mut state, PlayerId(0), PlayerId(1));
        let (city, settler, warrior, damaged) = (Pos::new(2, 2), Pos::new(17, 17), Pos::new(2, 17), Pos::new(17, 2));
        state.board.spawn(PieceKind::City, PlayerId(1), city).unwrap();
        state.board.spawn(PieceKind::Settler, PlayerId(1), settler).unwrap();
        state.board.spawn(PieceKind::Warrior, PlayerId(1), warrior).unwrap();

        let map = opportunity_map(&state, PlayerId(0));
        assert!(map.get(city) > map.get(settler), "healthy city {} vs settler {}", map.get(city), map.get(settler));
        assert!(map.get(settler) > map.get(warrior));

        let weak = state.board.spawn(PieceKind::City, PlayerId(1), damaged).unwrap();
        state.board.piece_mut(weak).unwrap().hp = 1;
        let map = opportunity_map(&state, PlayerId(0));
        assert!(map.get(damaged) > map.get(city));
        assert_eq!(map.get(damaged), 1.0);
    }

    #[test]
    fn expansion_marks_crowded_sites_invalid() {
        let mut state = blank_state(8, 8, 2);
        state.board.spawn(PieceKind::City, PlayerId(0), Pos::new(3, 3)).unwrap();
        state.board.spawn(PieceKind::Warrior, PlayerId(0), Pos::new(6, 6)).unwrap();
        let map = expansion_map(&state, PlayerId(0));
        assert_eq!(map.get(Pos::new(3, 3)), INVALID_SITE);
        assert_eq!(map.get(Pos::new(4, 4)), INVALID_SITE);
        assert_eq!(map.get(Pos::new(6, 6)), INVALID_SITE);
        assert!(map.get(Pos::new(3, 5)) >= 0.0);
        let best = map.best_cell(|_, v| v >= 0.0).unwrap();
        assert_eq!(best.1, 1.0);
    }

    #[test]
    fn territory_is_signed() {
        let mut state = blank_state(10, 10, 2);
        state.board.spawn(PieceKind::City, PlayerId(0), Pos::new(1, 1)).unwrap();
        state.board.spawn(PieceKind::City, PlayerId(1), Pos::new(8, 8)).unwrap();
        let map = territory_map(&state, PlayerId(0));
        assert!(map.get(Pos::new(1, 1)) > 0.0);
        assert!(map.get(Pos::new(8, 8)) < 0.0);
    }

    #[test]
    fn relative_strength_buckets() {
        assert_eq!(StrengthBucket::from_ratio(1.5), StrengthBucket::Strong);
        assert_eq!(StrengthBucket::from_ratio(1.2), StrengthBucket::Even);
        assert_eq!(StrengthBucket::from_ratio(0.9), StrengthBucket::Even);
        assert_eq!(StrengthBucket::from_ratio(0.8), StrengthBucket::Weak);

        let mut state = blank_state(8, 8, 2);
        state.board.spawn(PieceKind::City, PlayerId(0), Pos::new(1, 1)).unwrap();
        state.board.spawn(PieceKind::City, PlayerId(1), Pos::new(6, 6)).unwrap();
        for c in 0..4 {
            state.board.spawn(PieceKind::Warrior, PlayerId(0), Pos::new(3, c)).unwrap();
        }
        assert_eq!(relative_strength(&state, PlayerId(0), PlayerId(1)).bucket, StrengthBucket::Strong);
        assert_eq!(relative_strength(&state, PlayerId(1), PlayerId(0)).bucket, StrengthBucket::Weak);
    }

    #[test]
    fn strength_components() {
        let mut state = blank_state(8, 8, 2);
        state.board.spawn(PieceKind::City, PlayerId(0), Pos::new(1, 1)).unwrap();
        state.board.spawn(PieceKind::Warrior, PlayerId(0), Pos::new(3, 3)).unwrap();
        state.board.spawn(PieceKind::Settler, PlayerId(0), Pos::new(5, 5)).unwrap();
        state.board.set_owner(Pos::new(1, 1), Some(PlayerId(0))).unwrap();
        let s = player_strength(&state, PlayerId(0));
        assert_eq!(s.military, 3.0);
        assert_eq!(s.economic, 9.0);
        assert_eq!(s.expansion, 1.0);
        assert_eq!(s.territory, 1.0);
        assert_eq!(s.total, 3.0 + 13.5 + 2.0 + 0.25);
    }
}
