#![deny(warnings)]

//! Headless runner: plays a full game unattended, acknowledging every
//! narrative message as it appears, and prints the final standings.

use std::path::Path;

use anyhow::{bail, Result};
use sim_core::{ActorId, GameConfig, GameEvent, Speaker};
use sim_econ::load_price_tables;
use sim_runtime::GameSession;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct CliArgs {
    seed: Option<u64>,
    days: Option<u64>,
    step: Option<f64>,
    config: Option<String>,
    prices: Option<String>,
    help: bool,
    version: bool,
}

fn parse_args() -> CliArgs {
    let mut args = CliArgs::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--days" => args.days = it.next().and_then(|s| s.parse().ok()),
            "--step" => args.step = it.next().and_then(|s| s.parse().ok()),
            "--config" => args.config = it.next(),
            "--prices" => args.prices = it.next(),
            "--help" | "-h" => args.help = true,
            "--version" => args.version = true,
            _ => {}
        }
    }
    args
}

fn print_usage() {
    println!("cli: headless run of the market game");
    println!();
    println!("USAGE: cli [OPTIONS]");
    println!("  --seed <u64>     master RNG seed (default 42)");
    println!("  --days <u64>     stop after this many simulated days");
    println!("  --step <secs>    wall seconds advanced per frame (default: one day)");
    println!("  --config <path>  JSON game configuration; missing fields take defaults");
    println!("  --prices <dir>   historical close tables instead of the random walk");
    println!("  --version        print version and exit");
}

/// One frame: advance, drain, auto-acknowledge whatever the narrative shows.
fn step_frame(session: &mut GameSession, step: f64) {
    session.update(step);
    for event in session.drain_events() {
        match event {
            GameEvent::MessageShown { speaker, text, .. } => {
                let voice = match speaker {
                    Speaker::Granny => "granny",
                    Speaker::Monkey => "monkey",
                };
                println!("{voice}: {text}");
                session.acknowledge_message();
            }
            GameEvent::ClockStarted => info!("clock started"),
            GameEvent::YearAdvanced { year } => info!(year, "year rolled over"),
            GameEvent::SalaryPaid { actor, amount } => {
                debug!(actor = actor.label(), amount, "salary")
            }
            GameEvent::TradeExecuted { actor, trade } => debug!(
                actor = actor.label(),
                instrument = %trade.instrument,
                cash = trade.cash_value(),
                "trade"
            ),
            GameEvent::TradeRejected { actor, reason, .. } => {
                debug!(actor = actor.label(), %reason, "order rejected")
            }
            GameEvent::GameFinished { day, .. } => info!(day, "game over"),
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args();
    if args.help {
        print_usage();
        return Ok(());
    }
    if args.version {
        println!(
            "cli {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => GameConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => GameConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    if let Some(days) = args.days {
        config.max_game_days = days;
    }
    let step = args.step.unwrap_or(config.seconds_per_day);
    if !step.is_finite() || step <= 0.0 {
        bail!("--step must be a positive number of seconds");
    }

    let mut session = match &args.prices {
        Some(dir) => {
            let tables = load_price_tables(Path::new(dir))?;
            GameSession::with_price_tables(config, &tables)?
        }
        None => GameSession::new(config)?,
    };

    let seconds_per_day = session.config().seconds_per_day;
    let max_days = session.config().max_game_days;
    let frame_budget =
        ((max_days as f64 * seconds_per_day / step).ceil() as u64).saturating_add(256);
    info!(
        seed = session.config().rng_seed,
        days = max_days,
        step,
        "run starting"
    );

    let mut frames = 0u64;
    while !session.is_finished() {
        frames += 1;
        if frames > frame_budget {
            bail!("run exceeded {frame_budget} frames without finishing");
        }
        step_frame(&mut session, step);
    }
    // Let the ending script play out.
    for _ in 0..16 {
        step_frame(&mut session, step.max(2.0));
    }

    let state = session.clock_state();
    let scores = session.scoreboard();
    println!(
        "Run complete | day {} | year {}",
        state.current_day, state.current_year
    );
    for (actor, worth, trades) in [
        (
            ActorId::Player,
            scores.player,
            session.ledger().trades().len(),
        ),
        (
            ActorId::Monkey,
            scores.monkey,
            session.monkey_account().trades().len(),
        ),
        (
            ActorId::Rock,
            scores.rock,
            session.rock_account().trades().len(),
        ),
    ] {
        println!(
            "{:>10} | net worth ${:>12.2} | trades {}",
            actor.label(),
            worth,
            trades
        );
    }
    println!("the winner: {}", scores.leader().label());

    Ok(())
}
