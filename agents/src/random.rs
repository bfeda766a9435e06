// ═══════════════════════════════════════════════════════════════════════
// Random Agent — plays uniformly random legal commands.
// Serves as baseline and for testing game engine stability.
// ═══════════════════════════════════════════════════════════════════════

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use tilewar_engine::{Engine, PieceId, PieceKind, PlayerId, ProductionKind};

use crate::agent::{Agent, DiplomacyAction, TurnSummary};
use crate::movement::random_move;

pub struct RandomAgent {
    player: PlayerId,
    rng: ChaCha8Rng,
}

impl RandomAgent {
    pub fn new(player: PlayerId, seed: u64) -> Self {
        RandomAgent {
            player,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str { "random" }
    fn player(&self) -> PlayerId { self.player }

    fn take_turn(&mut self, engine: &mut Engine) -> TurnSummary {
        let me = self.player;
        let mut summary = TurnSummary::new(me);
        if engine.is_game_over() || engine.current_player() != me {
            return summary;
        }

        for proposer in engine.pending_proposals(me) {
            if self.rng.gen_bool(0.5) && summary.check(engine.accept_peace(me, proposer)).is_some() {
                summary.diplomacy.push(DiplomacyAction::AcceptedPeace(proposer));
            }
        }
        let peaceful: Vec<PlayerId> = engine.state().player_ids()
            .into_iter()
            .filter(|&o| engine.state().at_peace(me, o) && !engine.state().is_eliminated(o))
            .collect();
        if let Some(&target) = peaceful.choose(&mut self.rng) {
            if self.rng.gen_bool(0.05) && summary.check(engine.declare_war(me, target)).is_some() {
                summary.diplomacy.push(DiplomacyAction::DeclaredWar(target));
            }
        }

        let pieces: Vec<PieceId> = engine.state().board.pieces_of(me).map(|p| p.id).collect();
        for id in pieces {
            if engine.is_game_over() {
                break;
            }
            let Some(piece) = engine.state().board.piece(id) else { continue };
            let (kind, idle, damaged) = (piece.kind, piece.production.is_none(), piece.hp < piece.max_hp);
            match kind {
                PieceKind::City => {
                    if !idle {
                        continue;
                    }
                    let mut options = vec![
                        ProductionKind::Warrior,
                        ProductionKind::Settler,
                        ProductionKind::Science,
                        ProductionKind::Diplomacy,
                    ];
                    if damaged {
                        options.push(ProductionKind::Repair);
                    }
                    let Some(&choice) = options.choose(&mut self.rng) else { continue };
                    if summary.check(engine.set_production(id, Some(choice))).is_some() {
                        summary.productions_set += 1;
                    }
                }
                PieceKind::Settler if engine.can_settler_build_city(id).is_ok() && self.rng.gen_bool(0.7) => {
                    if summary.check(engine.settler_build_city(id)).is_some() {
                        summary.cities_founded += 1;
                    }
                }
                _ => {
                    if !self.rng.gen_bool(0.8) {
                        continue;
                    }
                    let Some(to) = random_move(engine, id, &mut self.rng) else { continue };
                    if let Some(outcome) = summary.check(engine.move_piece(id, to.row, to.col)) {
                        summary.moves += 1;
                        if let Some(report) = outcome.combat {
                            summary.attacks += 1;
                            summary.captures += u32::from(report.captured);
                        }
                    }
                }
            }
        }
        summary
    }
}
