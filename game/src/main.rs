use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use twofold::achievements::{ACHIEVEMENTS, AchievementProgress, find};
use twofold::agent::{HeadlessGame, parse_moves};
use twofold::clock::{Clock, SystemClock};
use twofold::daily::{DailyChallenge, DailyProgress};
use twofold::grid::DEFAULT_SIZE;
use twofold::leaderboard::Leaderboard;
use twofold::round_timer::{TICK, format_clock};
use twofold::session::{PowerUp, Services, SessionConfig};
use twofold::settings::Settings;
use twofold::store::FileStore;
use twofold::{Command, GameMode, SessionController, SessionEvent};
use twofold_engine::HeadlessRunner;

const DEFAULT_LOG_FILE: &str = "twofold.debug.log";

#[derive(Debug, Parser)]
#[command(name = "twofold")]
#[command(about = "Slide-and-merge number puzzle for the terminal")]
struct Cli {
    /// Write debug logs to `twofold.debug.log` (or `--log-file`).
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    /// Where settings, scores and progress live.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Play {
        #[arg(long, default_value = "classic")]
        mode: GameMode,
        #[arg(long)]
        seed: Option<u64>,
        /// Board size for this run; defaults to the stored setting.
        #[arg(long)]
        size: Option<usize>,
        /// Replay file, or a directory to drop one in, written on quit.
        #[arg(long)]
        replay_out: Option<PathBuf>,
    },
    Daily {
        /// `YYYY-MM-DD`; defaults to today (UTC).
        #[arg(long)]
        date: Option<String>,
    },
    Leaderboard {
        #[arg(long)]
        mode: Option<GameMode>,
    },
    Achievements,
    Settings {
        #[arg(long, default_value_t = false)]
        reset: bool,
    },
    Simulate {
        #[arg(long)]
        moves: String,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Clamped to the playable range (3 to 8).
        #[arg(long, default_value_t = DEFAULT_SIZE)]
        size: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.debug, cli.log_file.as_deref())?;
    let store = match cli.data_dir {
        Some(dir) => FileStore::new(dir),
        None => FileStore::from_env(),
    };
    log::debug!("data dir {}", store.dir().display());

    match cli.command {
        Commands::Play {
            mode,
            seed,
            size,
            replay_out,
        } => cmd_play(store, mode, seed, size, replay_out),
        Commands::Daily { date } => cmd_daily(&store, date.as_deref()),
        Commands::Leaderboard { mode } => cmd_leaderboard(&store, mode),
        Commands::Achievements => cmd_achievements(&store),
        Commands::Settings { reset } => cmd_settings(store, reset),
        Commands::Simulate { moves, seed, size } => cmd_simulate(&moves, seed, size),
    }
}

fn setup_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    if !debug && log_file.is_none() {
        return Ok(());
    }
    let path = log_file.unwrap_or(Path::new(DEFAULT_LOG_FILE));
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    WriteLogger::init(
        LevelFilter::Debug,
        ConfigBuilder::new()
            .set_target_level(LevelFilter::Error)
            .build(),
        file,
    )
    .context("installing logger")?;
    Ok(())
}

fn cmd_play(
    store: FileStore,
    mode: GameMode,
    seed: Option<u64>,
    size: Option<usize>,
    replay_out: Option<PathBuf>,
) -> Result<()> {
    let config = SessionConfig {
        seed,
        size,
        ..SessionConfig::default()
    };
    let services = Services {
        store: Box::new(store),
        clock: Box::new(SystemClock),
    };
    let session = SessionController::new(mode, config, services);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("building runtime")?;
    runtime.block_on(play_loop(session, replay_out))
}

/// Player input and countdown ticks feed one loop, so the session sees
/// them strictly one after another.
async fn play_loop(mut session: SessionController, replay_out: Option<PathBuf>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    print_help();
    render(&session);
    loop {
        let events = tokio::select! {
            line = lines.next_line() => {
                match line.context("reading stdin")? {
                    None => break,
                    Some(line) if is_quit(&line) => break,
                    Some(line) => {
                        let events = session.handle_input(&line);
                        if events.is_empty() && !line.trim().is_empty() {
                            println!("(nothing happened)");
                        }
                        events
                    }
                }
            }
            _ = ticker.tick() => session.handle(Command::Tick),
        };
        report(&session, &events);
    }

    if let Some(path) = replay_out {
        save_replay(&session, &path)?;
    }
    Ok(())
}

fn is_quit(line: &str) -> bool {
    matches!(line.trim(), "q" | "quit" | "exit")
}

fn report(session: &SessionController, events: &[SessionEvent]) {
    if events.is_empty() {
        return;
    }
    let mut redraw = false;
    for event in events {
        match event {
            SessionEvent::Ticked { remaining } => {
                let secs = remaining.as_secs();
                if secs % 30 == 0 || secs <= 10 {
                    println!("time left {}", format_clock(*remaining));
                }
            }
            SessionEvent::Won => {
                redraw = true;
                println!("You made it! Press k to keep playing or r to restart.");
            }
            SessionEvent::Over(reason) => {
                redraw = true;
                println!("{reason} Press r to restart.");
            }
            SessionEvent::AchievementUnlocked(id) => {
                if let Some(achievement) = find(id) {
                    println!("Achievement unlocked: {}", achievement.title);
                }
            }
            SessionEvent::NewBest(score) => println!("New best: {score}"),
            SessionEvent::Ranked(rank) => println!("Leaderboard place #{}", rank + 1),
            SessionEvent::PowerUpUsed(power_up) => {
                redraw = true;
                println!("Used {power_up:?}");
            }
            SessionEvent::Started { .. }
            | SessionEvent::Moved(_)
            | SessionEvent::Spawned(_)
            | SessionEvent::Continued => redraw = true,
        }
    }
    if redraw {
        render(session);
    }
}

fn render(session: &SessionController) {
    let state = session.state();
    let mut header = format!(
        "[{}] score {}  best {}",
        state.mode, state.score, state.best
    );
    if let Some(left) = state.moves_remaining {
        header.push_str(&format!("  moves {left}"));
    }
    if let Some(remaining) = state.time_remaining {
        header.push_str(&format!("  time {}", format_clock(remaining)));
    }
    println!("{header}");
    if let Some(challenge) = session.daily() {
        println!("{}: {}", challenge.theme_name, challenge.description);
    }
    print!("{}", session.grid());

    let charges: Vec<String> = [
        (PowerUp::Undo, 'u'),
        (PowerUp::Cleanse, 'c'),
        (PowerUp::Double, 'x'),
    ]
    .into_iter()
    .filter(|(power_up, _)| session.charges(*power_up) > 0)
    .map(|(power_up, key)| format!("{key}={power_up:?}"))
    .collect();
    if !charges.is_empty() {
        println!("power-ups: {}", charges.join(" "));
    }
}

fn print_help() {
    println!("w/a/s/d or up/down/left/right to move, r restart, m <mode> switch mode");
    println!("u undo, c cleanse, x double, k keep playing after a win, q quit");
}

fn save_replay(session: &SessionController, path: &Path) -> Result<()> {
    let payload = session.replay_payload();
    let path = if path.is_dir() {
        path.join(payload.default_file_name(SystemClock.now()))
    } else {
        path.to_path_buf()
    };
    payload
        .write_json_file(&path)
        .with_context(|| format!("writing replay {}", path.display()))?;
    println!("replay saved to {}", path.display());
    Ok(())
}

fn cmd_daily(store: &FileStore, date: Option<&str>) -> Result<()> {
    let key = date.map_or_else(|| SystemClock.today_key(), str::to_string);
    let challenge = DailyChallenge::for_date(&key)?;
    let progress = DailyProgress::load(store);

    println!("{} ({})", challenge.date, challenge.theme_name);
    println!("{}", challenge.description);
    print!("{}", challenge.board);
    let status = if progress.is_completed(&challenge.date) {
        "completed"
    } else {
        "open"
    };
    println!("status: {status}");
    let recent = progress.history(5);
    if !recent.is_empty() {
        println!("recent: {}", recent.join(", "));
    }
    Ok(())
}

fn cmd_leaderboard(store: &FileStore, mode: Option<GameMode>) -> Result<()> {
    let board = Leaderboard::load(store);
    let modes = mode.map_or_else(|| GameMode::ALL.to_vec(), |m| vec![m]);
    for mode in modes {
        println!("{mode}");
        let entries = board.entries(mode);
        if entries.is_empty() {
            println!("  no scores yet");
        }
        for (rank, entry) in entries.iter().enumerate() {
            let when = DateTime::from_timestamp_millis(entry.timestamp)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!("  {}. {:>6}  {when}", rank + 1, entry.score);
        }
    }
    Ok(())
}

fn cmd_achievements(store: &FileStore) -> Result<()> {
    let progress = AchievementProgress::load(store);
    for achievement in ACHIEVEMENTS.iter() {
        let mark = if progress.is_unlocked(achievement.id) {
            'x'
        } else {
            ' '
        };
        println!(
            "[{mark}] {:<16} {}",
            achievement.title, achievement.description
        );
    }
    println!(
        "{}/{} unlocked, win streak {}",
        progress.unlocked_count(),
        ACHIEVEMENTS.len(),
        progress.win_streak()
    );
    Ok(())
}

fn cmd_settings(mut store: FileStore, reset: bool) -> Result<()> {
    let settings = if reset {
        Settings::default()
            .save(&mut store)
            .context("saving settings")?
    } else {
        Settings::load(&store)
    };
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

fn cmd_simulate(script: &str, seed: u64, size: usize) -> Result<()> {
    let moves = parse_moves(script)?;
    let mut runner = HeadlessRunner::new(HeadlessGame::new(seed, size));
    runner.run(moves);

    let state = runner.state();
    println!(
        "frames {}  moves {}  score {}",
        runner.frame(),
        state.moves,
        state.score()
    );
    print!("{}", state.engine.grid());
    if state.is_over() {
        println!("no moves left");
    }
    Ok(())
}
