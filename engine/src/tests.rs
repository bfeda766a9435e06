// ═══════════════════════════════════════════════════════════════════════
// Scenario suite for the rules engine
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use crate::types::*;
    use crate::engine::Engine;
    use crate::error::Rejection;
    use crate::events::GameEvent;
    use crate::navigation::MoveKind;
    use crate::setup::{blank_state, GameConfig};
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    // ── Helpers ──────────────────────────────────────────────────────────

    fn engine(state: GameState) -> Engine {
        Engine::from_state(state, Box::new(ChaCha8Rng::seed_from_u64(42)))
    }

    fn at_war(state: &mut GameState, a: PlayerId, b: PlayerId) {
        state.player_mut(a).unwrap().relations.insert(b, Relation::War);
        state.player_mut(b).unwrap().relations.insert(a, Relation::War);
    }

    fn spawn(state: &mut GameState, kind: PieceKind, owner: u8, row: i32, col: i32) -> PieceId {
        state.board.spawn(kind, PlayerId(owner), Pos::new(row, col)).unwrap()
    }

    fn fingerprint(engine: &Engine) -> serde_json::Value {
        serde_json::to_value(engine.state()).unwrap()
    }

    const P0: PlayerId = PlayerId(0);
    const P1: PlayerId = PlayerId(1);
    const P2: PlayerId = PlayerId(2);

    // ═════════════════════════════════════════════════════════════════════
    // COMBAT SCENARIOS
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn warrior_hits_full_health_city_and_stays_put() {
        let mut state = blank_state(8, 8, 2);
        at_war(&mut state, P0, P1);
        let w = spawn(&mut state, PieceKind::Warrior, 0, 3, 3);
        let c = spawn(&mut state, PieceKind::City, 1, 3, 4);
        spawn(&mut state, PieceKind::City, 0, 7, 7);
        let mut engine = engine(state);

        let outcome = engine.move_piece(w, 3, 4).unwrap();
        assert!(outcome.blocked);
        assert!(!outcome.advanced);
        let report = outcome.combat.unwrap();
        assert!(!report.captured);
        assert_eq!(report.defender_hp, 3);

        let board = &engine.state().board;
        assert_eq!(board.piece(c).unwrap().hp, 3);
        assert_eq!(board.piece(c).unwrap().owner, P1);
        let attacker = board.piece(w).unwrap();
        assert_eq!(attacker.pos, Pos::new(3, 3));
        assert!(attacker.has_moved);
    }

    #[test]
    fn destroying_a_warrior_advances_and_takes_the_tile() {
        let mut state = blank_state(8, 8, 2);
        at_war(&mut state, P0, P1);
        let w = spawn(&mut state, PieceKind::Warrior, 0, 3, 3);
        let d = spawn(&mut state, PieceKind::Warrior, 1, 4, 4);
        state.board.piece_mut(d).unwrap().hp = 1;
        state.board.set_owner(Pos::new(4, 4), Some(P1)).unwrap();
        spawn(&mut state, PieceKind::City, 0, 0, 0);
        spawn(&mut state, PieceKind::City, 1, 7, 7);
        let mut engine = engine(state);

        let outcome = engine.move_piece(w, 4, 4).unwrap();
        assert!(outcome.advanced);
        assert!(!outcome.blocked);
        assert!(outcome.combat.unwrap().destroyed);

        let board = &engine.state().board;
        assert!(board.piece(d).is_none());
        assert_eq!(board.piece(w).unwrap().pos, Pos::new(4, 4));
        assert_eq!(board.owner_at(Pos::new(4, 4)), Some(P0));
        assert!(board.is_consistent());
    }

    #[test]
    fn damage_is_exact_on_survivors() {
        let mut state = blank_state(8, 8, 2);
        at_war(&mut state, P0, P1);
        let w = spawn(&mut state, PieceKind::Warrior, 0, 3, 3);
        let d = spawn(&mut state, PieceKind::Warrior, 1, 3, 4);
        spawn(&mut state, PieceKind::City, 0, 0, 0);
        spawn(&mut state, PieceKind::City, 1, 7, 7);
        let mut engine = engine(state);

        let outcome = engine.move_piece(w, 3, 4).unwrap();
        assert!(outcome.blocked);
        assert_eq!(engine.state().board.piece(d).unwrap().hp, 1);
    }

    #[test]
    fn capturing_the_last_city_eliminates_and_wins() {
        let mut state = blank_state(8, 8, 2);
        at_war(&mut state, P0, P1);
        let w = spawn(&mut state, PieceKind::Warrior, 0, 3, 3);
        state.board.piece_mut(w).unwrap().damage = 9;
        let c = spawn(&mut state, PieceKind::City, 1, 3, 4);
        state.board.piece_mut(c).unwrap().production = Some(Production::new(ProductionKind::Warrior));
        for col in 0..5 {
            spawn(&mut state, PieceKind::Warrior, 1, 6, col);
        }
        spawn(&mut state, PieceKind::Settler, 1, 0, 7);
        spawn(&mut state, PieceKind::City, 0, 0, 0);
        let mut engine = engine(state);

        let outcome = engine.move_piece(w, 3, 4).unwrap();
        let report = outcome.combat.unwrap();
        assert!(report.captured);
        assert!(outcome.blocked, "capturing a city never advances the attacker");

        let board = &engine.state().board;
        let city = board.piece(c).unwrap();
        assert_eq!((city.owner, city.hp, city.production), (P0, 2, None));
        assert_eq!(board.owner_at(Pos::new(3, 4)), Some(P0));
        assert_eq!(board.piece(w).unwrap().pos, Pos::new(3, 3));

        let elimination = report.elimination.unwrap();
        assert_eq!(elimination.converted.len(), 1);
        assert_eq!(elimination.destroyed.len(), 5);
        assert_eq!(board.pieces_of(P1).count(), 0);
        assert_eq!(board.count_of(P0, PieceKind::Warrior), 2);

        assert!(engine.is_game_over());
        assert_eq!(engine.winner(), Some(P0));
        assert_eq!(engine.move_piece(w, 2, 2), Err(Rejection::GameOver));
        assert!(matches!(engine.journal().last().unwrap().event, GameEvent::GameOver { winner: P0 }));
    }

    #[test]
    fn game_continues_while_two_city_owners_remain() {
        let mut state = blank_state(8, 8, 3);
        at_war(&mut state, P0, P1);
        let w = spawn(&mut state, PieceKind::Warrior, 0, 3, 3);
        state.board.piece_mut(w).unwrap().damage = 9;
        spawn(&mut state, PieceKind::City, 1, 3, 4);
        spawn(&mut state, PieceKind::City, 0, 0, 0);
        spawn(&mut state, PieceKind::City, 2, 7, 7);
        let mut engine = engine(state);

        engine.move_piece(w, 3, 4).unwrap();
        assert!(!engine.is_game_over());
        assert_eq!(engine.state().board.city_owners().len(), 2);
    }

    // ═════════════════════════════════════════════════════════════════════
    // MOVEMENT LEGALITY
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn peace_forbids_attacks_both_ways_until_war() {
        let mut state = blank_state(8, 8, 2);
        let a = spawn(&mut state, PieceKind::Warrior, 0, 3, 3);
        let b = spawn(&mut state, PieceKind::Warrior, 1, 3, 4);
        spawn(&mut state, PieceKind::City, 0, 0, 0);
        spawn(&mut state, PieceKind::City, 1, 7, 7);
        let mut engine = engine(state);

        assert_eq!(engine.validate_move(a, 3, 4), Err(Rejection::NotAtWar(P1)));
        assert_eq!(
            crate::navigation::validate_move(engine.state(), b, Pos::new(3, 3)),
            Err(Rejection::NotAtWar(P0))
        );

        engine.declare_war(P1, P0).unwrap();
        assert_eq!(engine.validate_move(a, 3, 4), Ok(MoveKind::Attack(b)));
        assert_eq!(
            crate::navigation::validate_move(engine.state(), b, Pos::new(3, 3)),
            Ok(MoveKind::Attack(a))
        );
    }

    #[test]
    fn peaceful_territory_is_closed() {
        let mut state = blank_state(8, 8, 2);
        let w = spawn(&mut state, PieceKind::Warrior, 0, 3, 3);
        state.board.set_owner(Pos::new(3, 4), Some(P1)).unwrap();
        spawn(&mut state, PieceKind::City, 0, 0, 0);
        spawn(&mut state, PieceKind::City, 1, 7, 7);
        let mut engine = engine(state);

        assert_eq!(engine.move_piece(w, 3, 4), Err(Rejection::PeacefulTerritory(P1)));
        engine.declare_war(P0, P1).unwrap();
        let outcome = engine.move_piece(w, 3, 4).unwrap();
        assert!(outcome.advanced);
        assert_eq!(engine.state().board.owner_at(Pos::new(3, 4)), Some(P0));
    }

    #[test]
    fn blockade_stops_others_but_not_its_owner() {
        let mut state = blank_state(8, 8, 3);
        at_war(&mut state, P0, P1);
        // P1 holds the off-diagonal corners of the square (3,3)-(4,4).
        spawn(&mut state, PieceKind::Warrior, 1, 3, 4);
        spawn(&mut state, PieceKind::Warrior, 1, 4, 3);
        let mover = spawn(&mut state, PieceKind::Warrior, 0, 3, 3);
        spawn(&mut state, PieceKind::City, 0, 0, 0);
        spawn(&mut state, PieceKind::City, 1, 7, 7);
        spawn(&mut state, PieceKind::City, 2, 0, 7);
        let engine = engine(state);
        assert_eq!(engine.validate_move(mover, 4, 4), Err(Rejection::Blockaded(P1)));

        // P1 crosses its own blockade to reach the P0 warrior.
        let mut state = engine.state().clone();
        let own = spawn(&mut state, PieceKind::Warrior, 1, 4, 4);
        state.current_player = 1;
        let engine = self::engine(state);
        assert_eq!(
            crate::navigation::blockade_owner(engine.state(), Pos::new(4, 4), Pos::new(3, 3)),
            Some(P1)
        );
        assert_eq!(engine.validate_move(own, 3, 3), Ok(MoveKind::Attack(mover)));
    }

    #[test]
    fn settlers_move_orthogonally_without_jumping() {
        let mut state = blank_state(8, 8, 2);
        let s = spawn(&mut state, PieceKind::Settler, 0, 4, 1);
        spawn(&mut state, PieceKind::Warrior, 0, 4, 3);
        spawn(&mut state, PieceKind::City, 0, 0, 0);
        spawn(&mut state, PieceKind::City, 1, 7, 7);
        let engine = engine(state);

        assert_eq!(engine.validate_move(s, 5, 2), Err(Rejection::SettlerDiagonal));
        assert_eq!(engine.validate_move(s, 4, 5), Err(Rejection::SettlerTooFar));
        assert_eq!(engine.validate_move(s, 4, 4), Err(Rejection::PathObstructed(Pos::new(4, 3))));
        assert_eq!(engine.validate_move(s, 4, 3), Err(Rejection::SettlerCannotCapture));
        assert_eq!(engine.validate_move(s, 1, 1), Ok(MoveKind::Step));
        assert_eq!(engine.validate_move(s, 4, 2), Ok(MoveKind::Step));
    }

    #[test]
    fn off_board_targets_fail_closed() {
        let mut state = blank_state(6, 6, 2);
        let w = spawn(&mut state, PieceKind::Warrior, 0, 0, 0);
        spawn(&mut state, PieceKind::City, 0, 5, 0);
        spawn(&mut state, PieceKind::City, 1, 5, 5);
        let engine = engine(state);
        assert_eq!(engine.validate_move(w, -1, 0), Err(Rejection::OutOfBounds(Pos::new(-1, 0))));
        assert_eq!(engine.validate_move(w, 0, 6), Err(Rejection::OutOfBounds(Pos::new(0, 6))));
        let city = engine.state().board.piece_id_at(Pos::new(5, 0)).unwrap();
        assert_eq!(engine.validate_move(city, 4, 0), Err(Rejection::CityCannotMove));
    }

    // ═════════════════════════════════════════════════════════════════════
    // SETTLERS
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn settler_founds_city_on_own_tile() {
        let mut state = blank_state(8, 8, 2);
        let s = spawn(&mut state, PieceKind::Settler, 0, 4, 4);
        state.board.set_owner(Pos::new(4, 4), Some(P0)).unwrap();
        spawn(&mut state, PieceKind::City, 0, 2, 2);
        spawn(&mut state, PieceKind::City, 1, 7, 7);
        let mut engine = engine(state);

        assert_eq!(engine.can_settler_build_city(s), Ok(()));
        let city = engine.settler_build_city(s).unwrap();
        let board = &engine.state().board;
        assert!(board.piece(s).is_none());
        let built = board.piece(city).unwrap();
        assert_eq!((built.kind, built.owner, built.pos), (PieceKind::City, P0, Pos::new(4, 4)));
        assert_eq!(board.owner_at(Pos::new(4, 4)), Some(P0));
        assert_eq!(engine.state().city_count(P0), 2);
    }

    #[test]
    fn settler_site_rules() {
        let mut state = blank_state(8, 8, 2);
        let near = spawn(&mut state, PieceKind::Settler, 0, 3, 3);
        let foreign = spawn(&mut state, PieceKind::Settler, 0, 6, 1);
        state.board.set_owner(Pos::new(6, 1), Some(P1)).unwrap();
        let wild = spawn(&mut state, PieceKind::Settler, 0, 0, 6);
        let w = spawn(&mut state, PieceKind::Warrior, 0, 5, 5);
        spawn(&mut state, PieceKind::City, 0, 2, 2);
        spawn(&mut state, PieceKind::City, 1, 7, 7);
        let engine = engine(state);

        assert_eq!(engine.can_settler_build_city(near), Err(Rejection::TooCloseToCity(Pos::new(3, 3))));
        assert_eq!(engine.can_settler_build_city(foreign), Err(Rejection::ForeignTile(Pos::new(6, 1))));
        assert_eq!(engine.can_settler_build_city(wild), Ok(()));
        assert_eq!(engine.can_settler_build_city(w), Err(Rejection::NotASettler(w)));
    }

    // ═════════════════════════════════════════════════════════════════════
    // DIPLOMACY
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn peace_needs_proposal_and_acceptance() {
        let mut state = blank_state(8, 8, 2);
        let a = spawn(&mut state, PieceKind::Warrior, 0, 3, 3);
        spawn(&mut state, PieceKind::Warrior, 1, 3, 4);
        spawn(&mut state, PieceKind::City, 0, 0, 0);
        spawn(&mut state, PieceKind::City, 1, 7, 7);
        let mut engine = engine(state);

        engine.declare_war(P0, P1).unwrap();
        assert_eq!(engine.state().relation(P1, P0), Relation::War);

        engine.propose_peace(P0, P1).unwrap();
        assert_eq!(engine.state().relation(P0, P1), Relation::PeaceProposed);
        assert_eq!(engine.state().relation(P1, P0), Relation::War);
        assert!(engine.state().at_war(P0, P1), "a proposal alone does not end the war");
        assert!(matches!(engine.validate_move(a, 3, 4), Ok(MoveKind::Attack(_))));

        engine.accept_peace(P1, P0).unwrap();
        assert!(engine.state().at_peace(P0, P1));
        assert_eq!(engine.state().relation(P0, P1), Relation::Peace);
        assert_eq!(engine.validate_move(a, 3, 4), Err(Rejection::NotAtWar(P1)));
    }

    #[test]
    fn the_proposer_cannot_accept_its_own_offer() {
        let mut engine = engine(blank_state(8, 8, 2));
        engine.declare_war(P0, P1).unwrap();
        engine.propose_peace(P0, P1).unwrap();
        assert_eq!(engine.accept_peace(P0, P1), Err(Rejection::NoProposal(P1)));
    }

    // ═════════════════════════════════════════════════════════════════════
    // TURNS
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn rotation_skips_players_without_cities() {
        let mut state = blank_state(8, 8, 3);
        spawn(&mut state, PieceKind::City, 0, 0, 0);
        spawn(&mut state, PieceKind::Warrior, 1, 4, 4);
        spawn(&mut state, PieceKind::City, 2, 7, 7);
        let mut engine = engine(state);

        let outcome = engine.end_turn().unwrap();
        assert_eq!((outcome.ended, outcome.next), (P0, P2));
        assert_eq!(engine.end_turn().unwrap().next, P0);
        assert_eq!(engine.turn(), 3);
    }

    #[test]
    fn end_turn_resets_only_the_ending_players_flags() {
        let mut state = blank_state(8, 8, 2);
        let mine = spawn(&mut state, PieceKind::Warrior, 0, 3, 3);
        let theirs = spawn(&mut state, PieceKind::Warrior, 1, 5, 5);
        state.board.piece_mut(theirs).unwrap().has_moved = true;
        spawn(&mut state, PieceKind::City, 0, 0, 0);
        spawn(&mut state, PieceKind::City, 1, 7, 7);
        let mut engine = engine(state);

        engine.move_piece(mine, 3, 2).unwrap();
        engine.end_turn().unwrap();
        assert!(!engine.state().board.piece(mine).unwrap().has_moved);
        assert!(engine.state().board.piece(theirs).unwrap().has_moved);
    }

    #[test]
    fn production_advances_only_for_the_ending_player() {
        let mut engine = Engine::new(&GameConfig::standard(2, 3)).unwrap();
        let cities: Vec<PieceId> = engine.state().board.pieces().filter(|p| p.is_city()).map(|p| p.id).collect();
        engine.set_production(cities[0], Some(ProductionKind::Warrior)).unwrap();
        engine.end_turn().unwrap();
        assert_eq!(engine.state().board.piece(cities[0]).unwrap().production.unwrap().progress, 1);
        engine.end_turn().unwrap();
        assert_eq!(engine.state().board.piece(cities[0]).unwrap().production.unwrap().progress, 1);
        let outcome = engine.end_turn().unwrap();
        assert!(matches!(outcome.production[0], GameEvent::ProductionCompleted { spawned: Some(_), .. }));
        assert_eq!(engine.state().board.count_of(P0, PieceKind::Warrior), 2);
    }

    // ═════════════════════════════════════════════════════════════════════
    // ATOMICITY
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn rejected_commands_change_nothing() {
        let mut engine = Engine::new(&GameConfig::standard(3, 9)).unwrap();
        let before = fingerprint(&engine);
        let journal = engine.journal().len();

        let enemy_city = engine.state().board.pieces().find(|p| p.owner == P1 && p.is_city()).unwrap().id;
        let own_city = engine.state().board.pieces().find(|p| p.owner == P0 && p.is_city()).unwrap().id;
        let own_warrior = engine.state().board.pieces().find(|p| p.owner == P0 && !p.is_city()).unwrap().id;

        assert!(engine.move_piece(own_warrior, 50, 50).is_err());
        assert!(engine.move_piece(own_city, 3, 3).is_err());
        assert!(engine.move_piece(enemy_city, 0, 0).is_err());
        assert!(engine.set_production(enemy_city, Some(ProductionKind::Science)).is_err());
        assert!(engine.set_production(own_city, Some(ProductionKind::Repair)).is_err());
        assert!(engine.settler_build_city(own_warrior).is_err());
        assert!(engine.propose_peace(P0, P2).is_err());
        assert!(engine.accept_peace(P2, P1).is_err());
        assert!(engine.declare_war(P0, P0).is_err());

        assert_eq!(fingerprint(&engine), before);
        assert_eq!(engine.journal().len(), journal);
    }

    // ═════════════════════════════════════════════════════════════════════
    // RANDOM PLAY
    // ═════════════════════════════════════════════════════════════════════

    /// Drive a whole game with random legal commands.
    fn play_random(seed: u64, players: usize, max_turns: u32) -> Engine {
        let mut engine = Engine::new(&GameConfig::standard(players, seed)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);
        while !engine.is_game_over() && engine.turn() <= max_turns {
            let me = engine.current_player();
            for other in engine.state().player_ids() {
                if other != me && engine.state().at_peace(me, other) && rng.gen_bool(0.3) {
                    engine.declare_war(me, other).unwrap();
                }
            }
            let ids: Vec<PieceId> = engine.state().board.pieces_of(me).map(|p| p.id).collect();
            for id in ids {
                let Some(piece) = engine.state().board.piece(id) else { continue };
                let (kind, idle) = (piece.kind, piece.production.is_none());
                match kind {
                    PieceKind::City => {
                        if idle {
                            let kind = *[ProductionKind::Warrior, ProductionKind::Settler, ProductionKind::Science]
                                .choose(&mut rng)
                                .unwrap();
                            engine.set_production(id, Some(kind)).unwrap();
                        }
                    }
                    PieceKind::Settler if engine.can_settler_build_city(id).is_ok() => {
                        engine.settler_build_city(id).unwrap();
                    }
                    _ => {
                        let moves = engine.legal_moves(id);
                        if let Some(&(to, _)) = moves.choose(&mut rng) {
                            engine.move_piece(id, to.row, to.col).unwrap();
                        }
                    }
                }
                if engine.is_game_over() {
                    break;
                }
            }
            if engine.end_turn().is_err() {
                break;
            }
            assert!(engine.state().board.is_consistent());
        }
        engine
    }

    #[test]
    fn random_games_stay_consistent() {
        for seed in 0..4 {
            let engine = play_random(seed, 3, 150);
            let state = engine.state();
            assert!(state.board.is_consistent());
            if state.game_over {
                assert_eq!(state.board.city_owners().len(), 1);
                assert_eq!(state.winner, state.board.city_owners().into_iter().next());
            } else {
                assert!(state.city_count(state.current_player_id()) > 0);
            }
            for city in state.board.pieces().filter(|p| p.is_city()) {
                assert!(city.hp >= 1);
            }
        }
    }

    #[test]
    fn same_seed_same_game() {
        let a = play_random(17, 2, 60);
        let b = play_random(17, 2, 60);
        assert_eq!(a.journal(), b.journal());
    }
}
