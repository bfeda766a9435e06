// ═══════════════════════════════════════════════════════════════════════
// Runner — CLI entry point for running games and tournaments
// ═══════════════════════════════════════════════════════════════════════

use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tilewar_agents::{AiManager, DifficultyPreset, PersonalityKind, RandomAgent};
use tilewar_engine::view::render_ascii;
use tilewar_engine::{ActionRecord, Engine, EventSink, GameConfig, PlayerId};
use tilewar_tournament::{run_batch, tiebreak_winner, Database, Decision, Seat};

#[derive(Parser)]
#[command(name = "tilewar", about = "Turn-based grid strategy with AI opponents")]
struct Cli {
    /// Log filter, e.g. `tilewar=debug`. Falls back to RUST_LOG, then `tilewar=info`.
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single game between AI players and print the final board
    Play {
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        #[arg(short, long, default_value_t = 2)]
        players: usize,
        /// Game config as JSON; overrides --seed and --players
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(short, long, default_value = "normal")]
        difficulty: DifficultyPreset,
        /// Personality for every AI seat; alternates when omitted
        #[arg(long)]
        personality: Option<PersonalityKind>,
        /// Seats played by the random baseline instead of the AI
        #[arg(long = "random-seat")]
        random_seats: Vec<u8>,
        #[arg(long, default_value_t = 300)]
        max_turns: u32,
        /// Stream action records as JSON lines to this file (`-` for stdout)
        #[arg(long)]
        events: Option<PathBuf>,
    },
    /// Run a batch of games in parallel and record ratings
    Tournament {
        #[arg(short, long, default_value_t = 100)]
        games: u32,
        /// Seats as `random`, `<difficulty>` or `<difficulty>:<personality>`
        #[arg(long, num_args = 2.., default_values_t = [
            Seat::ai(DifficultyPreset::Hard, PersonalityKind::Militaristic),
            Seat::ai(DifficultyPreset::Hard, PersonalityKind::Expansionist),
        ])]
        seats: Vec<Seat>,
        #[arg(long, default_value_t = 1)]
        base_seed: u64,
        #[arg(long, default_value_t = 300)]
        max_turns: u32,
        #[arg(long, default_value = "results.db")]
        db: PathBuf,
    },
    /// Show leaderboard from database
    Leaderboard {
        #[arg(long, default_value = "results.db")]
        db: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    let outcome = match cli.command {
        Commands::Play { seed, players, config, difficulty, personality, random_seats, max_turns, events } => {
            let play = PlayArgs { seed, players, config, difficulty, personality, random_seats, max_turns, events };
            cmd_play(play)
        }
        Commands::Tournament { games, seats, base_seed, max_turns, db } => {
            cmd_tournament(games, &seats, base_seed, max_turns, &db)
        }
        Commands::Leaderboard { db } => cmd_leaderboard(&db),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tilewar=info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

// ── Event streaming ────────────────────────────────────────────────────

/// Writes each action record as one JSON line.
struct JsonLinesSink {
    out: Box<dyn Write + Send>,
}

impl JsonLinesSink {
    fn open(path: &PathBuf) -> io::Result<Self> {
        let out: Box<dyn Write + Send> = if path.as_os_str() == "-" {
            Box::new(io::stdout())
        } else {
            Box::new(BufWriter::new(File::create(path)?))
        };
        Ok(JsonLinesSink { out })
    }
}

impl EventSink for JsonLinesSink {
    fn record(&mut self, record: &ActionRecord) {
        let written = serde_json::to_writer(&mut self.out, record)
            .map_err(io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"));
        if let Err(e) = written {
            warn!(error = %e, "could not write action record");
        }
    }
}

// ── Commands ───────────────────────────────────────────────────────────

struct PlayArgs {
    seed: u64,
    players: usize,
    config: Option<PathBuf>,
    difficulty: DifficultyPreset,
    personality: Option<PersonalityKind>,
    random_seats: Vec<u8>,
    max_turns: u32,
    events: Option<PathBuf>,
}

fn cmd_play(args: PlayArgs) -> Result<(), Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => GameConfig::from_json_file(path)?,
        None => GameConfig::standard(args.players, args.seed),
    };
    let mut engine = Engine::new(&config)?;
    if let Some(path) = &args.events {
        engine.subscribe(Box::new(JsonLinesSink::open(path)?));
    }

    let mut manager = AiManager::new(config.seed);
    for i in 0..config.players.len() {
        let player = PlayerId(i as u8);
        if args.random_seats.contains(&player.0) {
            manager.register_agent(Box::new(RandomAgent::new(player, config.seed.wrapping_add(i as u64))));
            continue;
        }
        let personality = args.personality.unwrap_or(PersonalityKind::ALL[i % PersonalityKind::ALL.len()]);
        manager.register_ai_player_with(player, args.difficulty, personality);
    }
    info!(seed = config.seed, players = config.players.len(), "game started");

    while !engine.is_game_over() && engine.turn() <= args.max_turns {
        manager.execute_current(&mut engine)?;
    }

    let (winner, decided_by) = match engine.winner() {
        Some(w) => (w, Decision::Victory),
        None => (tiebreak_winner(engine.state()), Decision::Tiebreak),
    };
    // Records streamed to stdout would interleave with the board.
    if args.events.as_ref().map_or(true, |p| p.as_os_str() != "-") {
        println!("{}", render_ascii(engine.state()));
        let name = manager.agent(winner).map_or("?", |a| a.name());
        println!("Winner: {winner} ({name}) by {decided_by:?} after {} turns", engine.turn());
    }
    Ok(())
}

fn cmd_tournament(games: u32, seats: &[Seat], base_seed: u64, max_turns: u32, db_path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let labels: Vec<String> = seats.iter().map(Seat::label).collect();
    println!("=== Tournament: {games} games, seats: {} ===\n", labels.join(", "));

    let mut db = Database::open(db_path)?;
    let seeds: Vec<u64> = (0..u64::from(games)).map(|g| base_seed.wrapping_add(g * 1000)).collect();
    let results = run_batch(&seeds, seats, max_turns);

    let mut wins: Vec<(String, u32)> = Vec::new();
    let mut tiebreaks = 0u32;
    let mut errors = 0u32;
    for (seed, result) in seeds.iter().zip(results) {
        match result {
            Ok(result) => {
                db.record_game(&result)?;
                if result.decided_by == Decision::Tiebreak {
                    tiebreaks += 1;
                }
                if let Some(w) = result.winner_result() {
                    match wins.iter_mut().find(|(name, _)| *name == w.agent_name) {
                        Some((_, count)) => *count += 1,
                        None => wins.push((w.agent_name.clone(), 1)),
                    }
                }
            }
            Err(e) => {
                errors += 1;
                eprintln!("Game with seed {seed}: ERROR -- {e}");
            }
        }
    }

    println!("--- Summary ({games} games, {tiebreaks} by tiebreak, {errors} errors) ---");
    wins.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    for (name, w) in &wins {
        let pct = if games > 0 { f64::from(*w) / f64::from(games) * 100.0 } else { 0.0 };
        println!("  {name:<24}: {w:>4} wins ({pct:.1}%)");
    }
    println!("\nResults saved to: {}", db_path.display());
    println!("Total games in DB: {}", db.game_count()?);
    Ok(())
}

fn cmd_leaderboard(db_path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let db = Database::open(db_path)?;
    let board = db.leaderboard()?;
    if board.is_empty() {
        println!("No agents found. Run some tournaments first.");
        return Ok(());
    }
    println!("=== Leaderboard ===\n");
    println!("{:<24} {:>8} {:>8} {:>8}", "Agent", "ELO", "Games", "Wins");
    println!("{}", "-".repeat(52));
    for entry in &board {
        println!("{:<24} {:>8.1} {:>8} {:>8}", entry.name, entry.elo, entry.games, entry.wins);
    }
    Ok(())
}
