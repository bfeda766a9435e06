// ═══════════════════════════════════════════════════════════════════════
// AI Controller — one computer player
//
// Turn loop:
//   1. Spatial analysis (threat, opportunity, territory, expansion)
//   2. Opponent profiles
//   3. Goal list, personality weighted
//   4. Diplomacy: answer offers, sue for peace, maybe declare war
//   5. Production for every idle city
//   6. Review sticky objectives
//   7. Move warriors: opportunistic attack, blockade, objective
//   8. Move settlers: found a city or head for the best site
//
// Difficulty is applied on top: any chosen move may be swapped for a
// random legal one with the difficulty's mistake chance.
// ═══════════════════════════════════════════════════════════════════════

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use tilewar_engine::spatial::{expansion_map, relative_strength, Heatmap, SpatialAnalysis, StrengthBucket, INVALID_SITE};
use tilewar_engine::{Engine, GameState, PieceId, PieceKind, PlayerId, Pos, ProductionKind, Relation};

use crate::agent::{Agent, DiplomacyAction, TurnSummary};
use crate::difficulty::Difficulty;
use crate::goals::{determine_goals, Goal, GoalContext, GoalKind};
use crate::movement;
use crate::objective::{ObjectiveTarget, ObjectiveTracker};
use crate::personality::{Personality, ProductionContext};
use crate::profile::ProfileBook;

/// Base chance of taking an attack that is on offer before anything else.
pub const OPPORTUNISTIC_ATTACK_CHANCE: f64 = 0.6;

/// Cities repair below this hp fraction, raised by local threat.
const REPAIR_BELOW: f32 = 0.5;
/// Distance penalty per tile when ranking settler sites.
const SITE_DISTANCE_PENALTY: f32 = 0.04;
/// Distance penalty per tile when ranking border tiles.
const BORDER_DISTANCE_PENALTY: f32 = 0.1;
const BORDER_SEARCH_RADIUS: i32 = 6;

pub struct AiController {
    player: PlayerId,
    name: String,
    personality: Box<dyn Personality>,
    difficulty: Box<dyn Difficulty>,
    rng: ChaCha8Rng,
    profiles: ProfileBook,
    objectives: ObjectiveTracker,
    goals: Vec<Goal>,
    /// Own turns played so far; the war cooldown counts these.
    turns_taken: u32,
    last_war_declared: Option<u32>,
}

impl AiController {
    pub fn new(player: PlayerId, personality: Box<dyn Personality>, difficulty: Box<dyn Difficulty>, seed: u64) -> Self {
        let name = format!("{} {}", difficulty.name(), personality.name());
        AiController {
            player,
            name,
            personality,
            difficulty,
            rng: ChaCha8Rng::seed_from_u64(seed),
            profiles: ProfileBook::default(),
            objectives: ObjectiveTracker::default(),
            goals: Vec::new(),
            turns_taken: 0,
            last_war_declared: None,
        }
    }

    /// Goals from the most recent turn, highest priority first.
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn profiles(&self) -> &ProfileBook {
        &self.profiles
    }

    pub fn objectives(&self) -> &ObjectiveTracker {
        &self.objectives
    }

    pub fn personality(&self) -> &dyn Personality {
        self.personality.as_ref()
    }

    pub fn difficulty(&self) -> &dyn Difficulty {
        self.difficulty.as_ref()
    }

    // ── Goals ──────────────────────────────────────────────────────────

    fn living_enemies_at_war(&self, state: &GameState) -> Vec<PlayerId> {
        state.player_ids()
            .into_iter()
            .filter(|&o| state.at_war(self.player, o) && !state.is_eliminated(o))
            .collect()
    }

    fn goal_context(&self, state: &GameState, analysis: &SpatialAnalysis) -> GoalContext {
        let me = self.player;
        let enemies_at_war = self.living_enemies_at_war(state);
        let weakest_enemy = enemies_at_war.iter()
            .map(|&o| (o, relative_strength(state, me, o).ratio))
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(o, _)| o);
        let home_threat = state.board.pieces_of(me)
            .filter(|p| p.is_city())
            .map(|p| analysis.threat.get(p.pos))
            .fold(0.0, f32::max);
        GoalContext {
            enemies_at_war,
            main_threat: self.profiles.main_threat(),
            weakest_enemy,
            home_threat,
            own_cities: state.city_count(me),
            own_warriors: state.board.count_of(me, PieceKind::Warrior),
        }
    }

    fn refresh_goals(&mut self, state: &GameState, analysis: &SpatialAnalysis) {
        let ctx = self.goal_context(state, analysis);
        self.goals = determine_goals(self.personality.as_ref(), &ctx);
        debug!(
            player = %self.player,
            top = ?self.goals.first().map(|g| g.kind),
            wars = ctx.enemies_at_war.len(),
            "goals refreshed"
        );
    }

    // ── Diplomacy ──────────────────────────────────────────────────────

    fn diplomacy(&mut self, engine: &mut Engine, summary: &mut TurnSummary) {
        let me = self.player;

        for proposer in engine.pending_proposals(me) {
            let score = self.peace_acceptance(engine.state(), proposer);
            let accept = score > self.difficulty.peace_threshold();
            debug!(player = %me, proposer = %proposer, score, accept, "peace offer weighed");
            if accept && summary.check(engine.accept_peace(me, proposer)).is_some() {
                debug!(player = %me, with = %proposer, "peace accepted");
                summary.diplomacy.push(DiplomacyAction::AcceptedPeace(proposer));
            }
        }

        for other in self.losing_wars(engine.state()) {
            if summary.check(engine.propose_peace(me, other)).is_some() {
                debug!(player = %me, to = %other, "suing for peace");
                summary.diplomacy.push(DiplomacyAction::ProposedPeace(other));
            }
        }

        if let Some(target) = self.war_target(engine.state()) {
            if summary.check(engine.declare_war(me, target)).is_some() {
                debug!(player = %me, on = %target, "war declared");
                self.last_war_declared = Some(self.turns_taken);
                summary.diplomacy.push(DiplomacyAction::DeclaredWar(target));
            }
        }
    }

    /// Willingness to accept peace from `proposer`; compared against the
    /// difficulty's peace threshold.
    fn peace_acceptance(&self, state: &GameState, proposer: PlayerId) -> f32 {
        let me = self.player;
        let mut score = 0.5;
        score += match relative_strength(state, me, proposer).bucket {
            StrengthBucket::Weak => 0.3,
            StrengthBucket::Even => 0.0,
            StrengthBucket::Strong => -0.3,
        };
        if state.city_count(me) <= 1 {
            score += 0.2;
        }
        if self.living_enemies_at_war(state).len() > 1 {
            score += 0.15;
        }
        score - 0.5 * (self.personality.war_appetite() - 1.0)
    }

    /// Wars worth suing for peace in: down to the last city and
    /// outnumbered. Skips players we already have an offer out to.
    fn losing_wars(&self, state: &GameState) -> Vec<PlayerId> {
        let me = self.player;
        if state.city_count(me) > 1 {
            return Vec::new();
        }
        let mine = state.board.count_of(me, PieceKind::Warrior);
        self.living_enemies_at_war(state)
            .into_iter()
            .filter(|&o| state.relation(me, o) != Relation::PeaceProposed)
            .filter(|&o| state.board.count_of(o, PieceKind::Warrior) > mine)
            .collect()
    }

    /// At most one declaration per turn, none while already fighting or
    /// inside the cooldown.
    fn war_target(&self, state: &GameState) -> Option<PlayerId> {
        let me = self.player;
        if let Some(last) = self.last_war_declared {
            if self.turns_taken.saturating_sub(last) < self.difficulty.war_cooldown() {
                return None;
            }
        }
        if !self.living_enemies_at_war(state).is_empty() {
            return None;
        }
        let warriors = state.board.count_of(me, PieceKind::Warrior);
        if warriors < 2 {
            return None;
        }
        let cities = state.city_count(me).max(1);
        let force = (warriors as f32 / (2 * cities) as f32).min(1.25);
        let bonus = self.difficulty.aggression_bonus() as f32;
        let threshold = self.difficulty.war_threshold();

        state.player_ids()
            .into_iter()
            .filter(|&o| o != me && state.at_peace(me, o) && !state.is_eliminated(o))
            .map(|o| {
                let ratio = relative_strength(state, me, o).ratio.min(3.0);
                (o, ratio * self.personality.war_appetite() * force + bonus)
            })
            .filter(|&(_, readiness)| readiness > threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(o, _)| o)
    }

    // ── Production ─────────────────────────────────────────────────────

    fn production_context(&self, state: &GameState, threat: f32) -> ProductionContext {
        let me = self.player;
        let board = &state.board;
        let settlers_queued = board.pieces_of(me)
            .filter(|p| matches!(p.production, Some(slot) if slot.kind == ProductionKind::Settler))
            .count();
        ProductionContext {
            cities: board.count_of(me, PieceKind::City),
            warriors: board.count_of(me, PieceKind::Warrior),
            settlers: board.count_of(me, PieceKind::Settler) + settlers_queued,
            tiles: board.tiles_owned(me),
            board_tiles: (board.rows() * board.cols()) as usize,
            at_war: !self.living_enemies_at_war(state).is_empty(),
            threat,
        }
    }

    fn production(&mut self, engine: &mut Engine, analysis: &SpatialAnalysis, summary: &mut TurnSummary) {
        let me = self.player;
        for city in engine.state().board.ids_of(me, PieceKind::City) {
            let state = engine.state();
            let Some(piece) = state.board.piece(city) else { continue };
            if piece.production.is_some() {
                continue;
            }
            let threat = analysis.threat.get(piece.pos);
            let repair_line = (REPAIR_BELOW + 0.2 * self.difficulty.defense_awareness() * threat).min(0.9);
            let needs_repair = piece.hp < piece.max_hp && piece.hp_fraction() < repair_line;

            let mut ranking = self.personality.production_ranking(&self.production_context(state, threat));
            if needs_repair {
                ranking.insert(0, ProductionKind::Repair);
            }
            for kind in ranking {
                if summary.check(engine.set_production(city, Some(kind))).is_some() {
                    debug!(player = %me, city = %city, production = ?kind, "production set");
                    summary.productions_set += 1;
                    break;
                }
            }
        }
    }

    // ── Units ──────────────────────────────────────────────────────────

    fn move_units(&mut self, engine: &mut Engine, analysis: &SpatialAnalysis, summary: &mut TurnSummary) {
        let me = self.player;
        let units: Vec<(PieceId, PieceKind)> = engine.state().board.pieces_of(me)
            .filter(|p| !p.is_city())
            .map(|p| (p.id, p.kind))
            .collect();

        for (unit, kind) in units {
            if engine.is_game_over() {
                break;
            }
            let ready = engine.state().board.piece(unit).is_some_and(|p| p.owner == me && !p.has_moved);
            if !ready {
                continue;
            }
            match kind {
                PieceKind::Settler => self.handle_settler(engine, unit, &analysis.threat, summary),
                _ => self.handle_warrior(engine, unit, analysis, summary),
            }
        }
    }

    fn handle_warrior(&mut self, engine: &mut Engine, unit: PieceId, analysis: &SpatialAnalysis, summary: &mut TurnSummary) {
        if let Some((pos, target)) = movement::best_attack(engine, unit) {
            let chance = (OPPORTUNISTIC_ATTACK_CHANCE + self.difficulty.aggression_bonus()).clamp(0.0, 1.0);
            if self.rng.gen_bool(chance) {
                debug!(unit = %unit, target = %target, "opportunistic attack");
                self.execute(engine, unit, pos, summary);
                return;
            }
        }

        let Some(dest) = self.warrior_destination(engine.state(), unit, analysis) else { return };
        let awareness = self.difficulty.defense_awareness();
        let choice = movement::blockade_target(engine, unit, dest)
            .map(|(pos, _)| pos)
            .or_else(|| movement::step_toward(engine, unit, dest, &analysis.threat, awareness));
        if let Some(pos) = choice {
            self.execute(engine, unit, pos, summary);
        }
    }

    /// Keep the current objective if it still points somewhere, otherwise
    /// walk the goal list for the first goal with a usable target.
    fn warrior_destination(&mut self, state: &GameState, unit: PieceId, analysis: &SpatialAnalysis) -> Option<Pos> {
        if let Some(dest) = self.objectives.get(unit).and_then(|o| o.destination(state)) {
            return Some(dest);
        }
        let from = state.board.piece(unit)?.pos;
        let picked = self.goals.iter().find_map(|goal| {
            self.warrior_target(state, from, goal, analysis).map(|target| (goal.kind, target))
        });
        let (goal, target) = picked?;
        self.objectives.assign(state, unit, goal, target);
        self.objectives.get(unit).and_then(|o| o.destination(state))
    }

    fn warrior_target(&self, state: &GameState, from: Pos, goal: &Goal, analysis: &SpatialAnalysis) -> Option<ObjectiveTarget> {
        let me = self.player;
        let board = &state.board;
        match goal.kind {
            GoalKind::Defend => {
                let city = board.pieces_of(me)
                    .filter(|p| p.is_city())
                    .max_by(|a, b| {
                        analysis.threat.get(a.pos).total_cmp(&analysis.threat.get(b.pos)).then(b.id.cmp(&a.id))
                    })?;
                if analysis.threat.get(city.pos) <= 0.0 {
                    return None;
                }
                if from.chebyshev(city.pos) <= 1 {
                    return Some(ObjectiveTarget::Tile(from));
                }
                board.free_neighbors(city.pos)
                    .into_iter()
                    .min_by_key(|p| (p.chebyshev(from), *p))
                    .map(ObjectiveTarget::Tile)
            }
            GoalKind::Conquer | GoalKind::Demilitarize => {
                let wanted = if goal.kind == GoalKind::Conquer { PieceKind::City } else { PieceKind::Warrior };
                board.pieces()
                    .filter(|p| p.kind == wanted && p.owner != me && state.at_war(me, p.owner))
                    .min_by_key(|p| (goal.target.is_some_and(|t| t != p.owner), from.chebyshev(p.pos), p.id))
                    .map(|p| ObjectiveTarget::Piece(p.id))
            }
            GoalKind::EstablishBorders => {
                let claimable = |p: Pos| match board.owner_at(p) {
                    None => true,
                    Some(o) => o != me && state.at_war(me, o),
                };
                analysis.opportunity
                    .cells()
                    .filter(|&(p, _)| p != from && from.chebyshev(p) <= BORDER_SEARCH_RADIUS)
                    .filter(|&(p, _)| board.is_empty(p) && claimable(p))
                    .map(|(p, v)| (p, v - BORDER_DISTANCE_PENALTY * from.chebyshev(p) as f32))
                    .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
                    .map(|(p, _)| ObjectiveTarget::Tile(p))
            }
            GoalKind::Expand => analysis.expansion
                .best_cell(|p, v| v != INVALID_SITE && p != from && board.owner_at(p).map_or(true, |o| o == me))
                .map(|(p, _)| ObjectiveTarget::Tile(p)),
            GoalKind::Research => None,
        }
    }

    fn handle_settler(&mut self, engine: &mut Engine, unit: PieceId, threat: &Heatmap, summary: &mut TurnSummary) {
        if engine.can_settler_build_city(unit).is_ok() {
            if let Some(city) = summary.check(engine.settler_build_city(unit)) {
                debug!(player = %self.player, city = %city, "city founded");
                summary.cities_founded += 1;
                self.objectives.drop_objective(unit);
            }
            return;
        }

        let dest = match self.objectives.get(unit).and_then(|o| o.destination(engine.state())) {
            Some(dest) => Some(dest),
            None => self.assign_settler_site(engine.state(), unit),
        };
        let Some(dest) = dest else { return };
        let awareness = self.difficulty.defense_awareness();
        if let Some(pos) = movement::step_toward(engine, unit, dest, threat, awareness) {
            self.execute(engine, unit, pos, summary);
        }
    }

    /// Best expansion site for a settler, discounted by distance and kept
    /// apart from sites other settlers are already heading for.
    fn assign_settler_site(&mut self, state: &GameState, unit: PieceId) -> Option<Pos> {
        let me = self.player;
        let from = state.board.piece(unit)?.pos;
        let claimed: Vec<Pos> = self.objectives.iter()
            .filter(|&(id, o)| id != unit && o.goal == GoalKind::Expand)
            .filter_map(|(_, o)| o.destination(state))
            .collect();

        let sites = expansion_map(state, me);
        let (site, _) = sites.cells()
            .filter(|&(_, v)| v != INVALID_SITE)
            .filter(|&(p, _)| state.board.owner_at(p).map_or(true, |o| o == me))
            .filter(|&(p, _)| claimed.iter().all(|c| c.chebyshev(p) > 1))
            .map(|(p, v)| (p, v - SITE_DISTANCE_PENALTY * from.chebyshev(p) as f32))
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))?;
        self.objectives.assign(state, unit, GoalKind::Expand, ObjectiveTarget::Tile(site));
        Some(site)
    }

    /// Carry out a chosen move, unless the difficulty's mistake roll
    /// replaces it with a random legal one.
    fn execute(&mut self, engine: &mut Engine, unit: PieceId, chosen: Pos, summary: &mut TurnSummary) {
        let mut target = chosen;
        if self.rng.gen_bool(self.difficulty.mistake_chance().clamp(0.0, 1.0)) {
            if let Some(random) = movement::random_move(engine, unit, &mut self.rng) {
                if random != chosen {
                    debug!(unit = %unit, ?chosen, ?random, "mistake");
                    summary.mistakes += 1;
                }
                target = random;
            }
        }

        if let Some(outcome) = summary.check(engine.move_piece(unit, target.row, target.col)) {
            summary.moves += 1;
            if let Some(report) = outcome.combat {
                summary.attacks += 1;
                if report.captured {
                    debug!(player = %self.player, at = ?target, "city captured");
                    summary.captures += 1;
                }
            }
        }
    }
}

impl Agent for AiController {
    fn name(&self) -> &str {
        &self.name
    }

    fn player(&self) -> PlayerId {
        self.player
    }

    fn take_turn(&mut self, engine: &mut Engine) -> TurnSummary {
        let me = self.player;
        let mut summary = TurnSummary::new(me);
        if engine.is_game_over() || engine.current_player() != me {
            warn!(player = %me, current = %engine.current_player(), "asked to play out of turn");
            return summary;
        }
        self.turns_taken += 1;

        let mut analysis = engine.analysis(me);
        self.profiles.update(engine.state(), me);
        self.refresh_goals(engine.state(), &analysis);

        self.diplomacy(engine, &mut summary);
        if !summary.diplomacy.is_empty() {
            analysis = engine.analysis(me);
            self.refresh_goals(engine.state(), &analysis);
        }

        self.production(engine, &analysis, &mut summary);
        self.objectives.review(engine.state(), me);
        self.move_units(engine, &analysis, &mut summary);

        debug!(
            player = %me,
            moves = summary.moves,
            attacks = summary.attacks,
            mistakes = summary.mistakes,
            "turn planned"
        );
        summary
    }
}
