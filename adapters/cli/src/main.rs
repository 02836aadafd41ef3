#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that flies simulated crop missions in the terminal.

mod config;
mod snapshot_transfer;
mod terminal;

use std::{
    io,
    path::PathBuf,
    rc::Rc,
    thread,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crop_mission_channel::MemoryChannel;
use crop_mission_core::{Event, Plot, StressClassifier};
use crop_mission_rendering::{
    MissionFeed, PlaybackRenderer, PresentationBackend, DEFAULT_RENDER_TICK,
};
use crop_mission_simulator::MissionSimulator;
use crop_mission_system_point_generation::SeededScores;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::{
    config::{ConfigOverrides, MissionConfig},
    terminal::{plot_covering, TerminalPresenter},
};

/// Wall-clock interval between two presented frames.
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Parser)]
#[command(name = "crop-mission", version, about = "Simulated crop drone missions")]
struct Cli {
    /// Keep previous frames on screen instead of clearing the terminal.
    #[arg(long, global = true)]
    no_clear: bool,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Runs a scan mission followed by a spray mission.
    Run(RunArgs),
    /// Replays a snapshot printed by `run --export`.
    Replay {
        /// Encoded snapshot string.
        snapshot: String,
        /// Renderer reveal interval in milliseconds.
        #[arg(long)]
        render_tick_ms: Option<u64>,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// TOML file with mission parameters.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(flatten)]
    overrides: ConfigOverrides,
    /// Pause after this many scan readings, resuming once playback catches up.
    #[arg(long)]
    pause_after: Option<usize>,
    /// Print the final mission state as a snapshot string.
    #[arg(long)]
    export: bool,
}

/// Entry point for the crop mission command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let clear = !cli.no_clear;
    match cli.command {
        CliCommand::Run(args) => run(&args, clear),
        CliCommand::Replay {
            snapshot,
            render_tick_ms,
        } => {
            let tick = render_tick_ms.map_or(DEFAULT_RENDER_TICK, Duration::from_millis);
            replay(&snapshot, tick, clear)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: &RunArgs, clear: bool) -> Result<()> {
    let mut config = MissionConfig::load(args.config.as_deref())?;
    config.apply(&args.overrides);
    config.validate()?;

    let center = config.center();
    let plot = Plot::around(center, config.area_acres).context("invalid mission plot")?;
    let channel = Rc::new(MemoryChannel::new());
    let mut simulator = MissionSimulator::new(
        Rc::clone(&channel),
        config.channel_key.as_str(),
        config.simulator(unix_millis()),
        SeededScores::new(config.seed),
    );
    let mut feed = MissionFeed::subscribe(Rc::clone(&channel), &config.channel_key);
    let mut renderer = PlaybackRenderer::new(config.render_tick(), StressClassifier::default());
    let mut presenter = TerminalPresenter::new(io::stdout(), plot, clear)?;

    info!(
        key = config.channel_key.as_str(),
        points = config.point_count,
        seed = config.seed,
        "starting mission"
    );
    inspect(&simulator.start(center))?;

    let mut pause_after = args.pause_after;
    let mut last = Instant::now();
    loop {
        thread::sleep(FRAME_INTERVAL);
        let now = Instant::now();
        let dt = now.duration_since(last);
        last = now;

        inspect(&simulator.advance(dt))?;
        if let Some(state) = feed.take_update() {
            renderer.ingest_optional(state.as_ref());
        }
        let _ = renderer.advance(dt);
        presenter.present(&renderer.dashboard())?;

        let settled = caught_up(&renderer);
        if let Some(after) = pause_after {
            if simulator.is_paused() && settled {
                info!("playback caught up, resuming");
                inspect(&simulator.start(center))?;
                pause_after = None;
            } else if simulator.is_running() && simulator.scan_cursor() >= after {
                info!(after, "pausing mission");
                inspect(&simulator.pause())?;
            }
        }
        if !simulator.is_running() && !simulator.is_paused() && settled {
            break;
        }
    }

    presenter.finish()?;
    info!(
        frames = presenter.frames(),
        phase = ?simulator.phase(),
        "mission finished"
    );

    if args.export {
        let state = channel
            .read(&config.channel_key)
            .context("mission state missing from channel")?;
        println!("{}", snapshot_transfer::encode(&state)?);
    }
    Ok(())
}

fn replay(snapshot: &str, render_tick: Duration, clear: bool) -> Result<()> {
    let state = snapshot_transfer::decode(snapshot).context("failed to decode snapshot")?;
    let mut renderer = PlaybackRenderer::new(render_tick, StressClassifier::default());
    renderer.ingest(&state);
    if render_tick.is_zero() {
        renderer.reveal_all();
    }

    let mut presenter = TerminalPresenter::new(io::stdout(), plot_covering(&state.stream), clear)?;
    presenter.present(&renderer.dashboard())?;

    let mut last = Instant::now();
    while !caught_up(&renderer) {
        thread::sleep(FRAME_INTERVAL);
        let now = Instant::now();
        let steps = renderer.advance(now.duration_since(last));
        last = now;
        if steps > 0 {
            presenter.present(&renderer.dashboard())?;
        }
    }
    presenter.finish()
}

fn inspect(events: &[Event]) -> Result<()> {
    for event in events {
        debug!(?event, "simulator event");
        if let Event::StartRejected { reason } = event {
            return Err(*reason).context("mission start rejected");
        }
    }
    Ok(())
}

fn caught_up(renderer: &PlaybackRenderer) -> bool {
    renderer.revealed().len() == renderer.sorted_points().len()
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
