//! Replay a recorded packet log through a Lua bot and print its outputs.
//!
//! ```text
//! rlbot-lua-replay --scripts bot/ --packets match.jsonl
//! rlbot-lua-replay --config bot/agent.json --index 1 --output controls.jsonl
//! ```
//!
//! Each output line is a JSON object keyed by control name. Set `RUST_LOG`
//! (e.g. `RUST_LOG=rlbot_lua=trace`) to see script logs.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use rlbot_lua_agent::replay::{replay, PacketLog};
use rlbot_lua_agent::{AgentConfig, AgentRegistry};
use rlbot_lua_packet::{AgentIndex, ControllerLayout};

#[derive(Debug, Parser)]
#[command(name = "rlbot-lua-replay", version)]
struct Args {
    /// Agent config file (JSON).
    #[arg(long, conflicts_with = "scripts", required_unless_present = "scripts")]
    config: Option<PathBuf>,

    /// Directory holding classes.lua, structs.lua and bot.lua.
    #[arg(long)]
    scripts: Option<PathBuf>,

    /// Car index the bot is bound to.
    #[arg(long, default_value_t = 0)]
    index: u32,

    /// Controller layout. Overrides the config file when given.
    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,

    /// Packet log, one JSON packet per line.
    #[arg(long)]
    packets: PathBuf,

    /// Where to write outputs. Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    /// throttle, steer, pitch, yaw, roll, jump, boost, handbrake
    Standard,
    /// steer, throttle, pitch, yaw, roll, jump, boost, handbrake, use_item
    Simple,
}

impl From<LayoutArg> for ControllerLayout {
    fn from(value: LayoutArg) -> Self {
        match value {
            LayoutArg::Standard => ControllerLayout::standard(),
            LayoutArg::Simple => ControllerLayout::simple_controller_state(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match (&args.config, &args.scripts) {
        (Some(path), _) => AgentConfig::from_json_file(path)?,
        (None, Some(dir)) => AgentConfig::new("lua", dir),
        (None, None) => anyhow::bail!("either --config or --scripts is required"),
    };
    if let Some(layout) = args.layout {
        config = config.with_layout(layout.into());
    }

    let log = PacketLog::from_path(&args.packets)?;
    tracing::info!(packets = log.len(), path = %args.packets.display(), "packet log loaded");

    let registry = AgentRegistry::new();
    let mut agent = registry.create(&config)?;
    agent.initialize(AgentIndex(args.index))?;

    let report = replay(agent.as_mut(), &log);

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(std::io::BufWriter::new(
            std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };
    for state in &report.outputs {
        serde_json::to_writer(&mut out, state)?;
        writeln!(out)?;
    }
    out.flush()?;

    match report.failure {
        Some(failure) => anyhow::bail!(
            "tick {} failed after {} successful ticks: {}",
            failure.tick,
            report.ticks_run,
            failure.message
        ),
        None => {
            tracing::info!(ticks = report.ticks_run, "replay completed");
            Ok(())
        }
    }
}
