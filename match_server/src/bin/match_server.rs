use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use game_core::ai::{ControllerConfig, ControllerKind, Difficulty};
use match_server::{SchedulerConfig, SessionConfig, SessionScheduler, TickReport};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Heuristic,
    Pid,
    Technician,
}

impl From<KindArg> for ControllerKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Heuristic => ControllerKind::Heuristic,
            KindArg::Pid => ControllerKind::Pid,
            KindArg::Technician => ControllerKind::Technician,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DifficultyArg {
    Easy,
    Normal,
    Hard,
    Nightmare,
}

impl From<DifficultyArg> for Difficulty {
    fn from(difficulty: DifficultyArg) -> Self {
        match difficulty {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Normal => Difficulty::Normal,
            DifficultyArg::Hard => Difficulty::Hard,
            DifficultyArg::Nightmare => Difficulty::Nightmare,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "match-server", about = "Run NPC-vs-NPC Pong matches on the session scheduler")]
struct Args {
    /// Number of concurrent matches
    #[arg(long, default_value_t = 4)]
    sessions: usize,

    #[arg(long, value_enum, default_value = "technician")]
    top: KindArg,

    #[arg(long, value_enum, default_value = "pid")]
    bottom: KindArg,

    #[arg(long, value_enum, default_value = "normal")]
    difficulty: DifficultyArg,

    /// First seed; session N uses seed + N
    #[arg(long)]
    seed: Option<u64>,

    /// Tick each match on its own timer instead of fast-forwarding
    #[arg(long)]
    realtime: bool,

    /// Give up on fast-forwarded matches after this many ticks
    #[arg(long, default_value_t = 1_000_000)]
    max_ticks: u64,
}

#[derive(Debug, Serialize)]
struct MatchSummary {
    id: u64,
    winner: Option<String>,
    score_top: u8,
    score_bottom: u8,
    ticks: u64,
}

impl From<TickReport> for MatchSummary {
    fn from(report: TickReport) -> Self {
        Self {
            id: report.id.0,
            winner: report.winner.map(|side| side.to_string()),
            score_top: report.score.top,
            score_bottom: report.score.bottom,
            ticks: report.tick,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();
    if args.sessions == 0 {
        bail!("--sessions must be at least 1");
    }

    let config = SchedulerConfig::from_env();
    if args.sessions > config.max_sessions {
        bail!(
            "--sessions {} exceeds MAX_SESSIONS {}",
            args.sessions,
            config.max_sessions
        );
    }
    let scheduler = SessionScheduler::new(config);
    let mut finished = scheduler.subscribe_finished();

    let difficulty = Difficulty::from(args.difficulty);
    let mut ids = Vec::with_capacity(args.sessions);
    for n in 0..args.sessions {
        let mut session = SessionConfig::npc_vs_npc(
            ControllerConfig::new(args.top.into(), difficulty),
            ControllerConfig::new(args.bottom.into(), difficulty),
        );
        if let Some(seed) = args.seed {
            session = session.with_seed(seed.wrapping_add(n as u64));
        }
        ids.push(scheduler.create(session).await?);
    }
    tracing::info!(sessions = ids.len(), realtime = args.realtime, "matches created");

    let mut results = Vec::with_capacity(ids.len());
    if args.realtime {
        for id in &ids {
            scheduler.spawn_loop(*id).await?;
        }
        while results.len() < ids.len() {
            results.push(finished.recv().await?);
        }
    } else {
        let mut ticks = 0;
        while scheduler.session_count().await > 0 && ticks < args.max_ticks {
            let reports = scheduler.tick_all().await;
            results.extend(reports.into_iter().filter(|r| r.winner.is_some()));
            ticks += 1;
        }
        // Whatever is left hit the tick limit
        for id in scheduler.session_ids().await {
            let snapshot = scheduler.stop(id).await?;
            tracing::warn!(session = %id, tick = snapshot.tick, "match did not finish");
            results.push(TickReport {
                id,
                tick: snapshot.tick,
                scored: None,
                winner: None,
                score: snapshot.score,
            });
        }
    }

    results.sort_by_key(|report| report.id);
    let summary: Vec<MatchSummary> = results.into_iter().map(MatchSummary::from).collect();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
