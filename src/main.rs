//! Dot Chase Client
//!
//! Connects to a relay and plays one session from the terminal, or headless
//! with `--headless`.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dot_chase::{
    frontend::{IdleInput, LogRenderer, RawModeWriter, TerminalInput, TerminalRenderer},
    BoundaryPolicy, ClientConfig, LoopExit, SyncLoop, TcpTransport, VERSION,
};

#[derive(Parser)]
#[command(name = "dot-chase")]
#[command(about = "Three-player networked chase client", version)]
struct Cli {
    /// JSON config file; flags override its fields.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Relay address (host:port).
    #[arg(short, long)]
    relay: Option<String>,

    /// Edge rule: wrap or clamp.
    #[arg(short, long)]
    boundary: Option<BoundaryPolicy>,

    /// Ticks the quarry has to survive.
    #[arg(long)]
    countdown_ticks: Option<u32>,

    /// Loop frequency in Hz.
    #[arg(short, long)]
    tick_rate: Option<u32>,

    /// No keyboard or status line; log the session instead.
    #[arg(long)]
    headless: bool,
}

impl Cli {
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_json_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => ClientConfig::default(),
        };

        if let Some(relay) = &self.relay {
            config.relay_addr = relay.clone();
        }
        if let Some(boundary) = self.boundary {
            config.arena.boundary = boundary;
        }
        if let Some(countdown_ticks) = self.countdown_ticks {
            config.session.countdown_ticks = countdown_ticks;
        }
        if let Some(tick_rate) = self.tick_rate {
            config.tick_rate = tick_rate;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn init_logging<W>(make_writer: W) -> Result<()>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.headless {
        init_logging(io::stderr)?;
    } else {
        init_logging(|| RawModeWriter::new(io::stderr()))?;
    }

    let config = cli.client_config()?;

    info!("Dot Chase v{}", VERSION);
    info!(
        "Arena {}x{}, {} boundary, countdown {} ticks at {} Hz",
        config.arena.width,
        config.arena.height,
        config.arena.boundary,
        config.session.countdown_ticks,
        config.tick_rate
    );

    let transport = TcpTransport::connect(config.relay_addr.as_str())
        .await
        .with_context(|| format!("Failed to reach relay at {}", config.relay_addr))?;

    let exit = if cli.headless {
        let renderer = LogRenderer::new(u64::from(config.tick_rate));
        let mut sync = SyncLoop::new(transport, IdleInput, renderer, config.arena, config.session)?;
        tokio::select! {
            result = sync.run(config.tick_interval()) => result,
            _ = tokio::signal::ctrl_c() => Ok(LoopExit::Quit),
        }
    } else {
        let input = TerminalInput::enter().context("Failed to enable raw terminal mode")?;
        let mut sync = SyncLoop::new(
            transport,
            input,
            TerminalRenderer::new(),
            config.arena,
            config.session,
        )?;
        let result = sync.run(config.tick_interval()).await;
        // Restore the terminal before reporting.
        drop(sync);
        result
    };

    match exit.context("Session aborted")? {
        LoopExit::Quit => info!("Left the session"),
        LoopExit::Ended(outcome) => info!("Finished: {} won", outcome.winner),
    }

    Ok(())
}
