/// QMusic Fade - crossfade simulation for track transitions
use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use qmusic_crossfade::ManualVolumePolicy;
use qmusic_fade::{timefmt::format_position, HostConfig, Simulation, TrackSkip, VolumeChange};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "qmusic-fade")]
#[command(about = "Simulate QMusic track transitions with volume crossfades", long_about = None)]
struct Cli {
    /// Configuration file path (default: ./qmusic.toml if present)
    #[arg(short, long, global = true, env = "QMUSIC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a simulated playlist through the crossfade controller
    Simulate(SimulateArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
struct SimulateArgs {
    /// Track durations in milliseconds, comma separated
    #[arg(long, value_delimiter = ',')]
    tracks: Option<Vec<i64>>,

    /// Position update interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Initial player volume
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    volume: Option<u8>,

    /// Skip a track partway through, as TRACK:AT_MS
    #[arg(long)]
    skip: Option<TrackSkip>,

    /// Move the volume slider during the run, as AT_MS:VOLUME
    #[arg(long)]
    volume_change: Option<VolumeChange>,

    /// Fade-out steps per second
    #[arg(long)]
    fade_out_rate: Option<u32>,

    /// Fade-in steps per second
    #[arg(long)]
    fade_in_rate: Option<u32>,

    /// What a volume change does to a running ramp
    #[arg(long, value_enum)]
    manual_volume: Option<PolicyArg>,

    /// Play without crossfading
    #[arg(long)]
    no_crossfade: bool,

    /// Print every crossfade event as a JSON line on stdout
    #[arg(long)]
    json_events: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    CancelRamp,
    FollowRamp,
}

impl From<PolicyArg> for ManualVolumePolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::CancelRamp => ManualVolumePolicy::CancelRamp,
            PolicyArg::FollowRamp => ManualVolumePolicy::FollowRamp,
        }
    }
}

impl SimulateArgs {
    /// Command-line values win over file and environment
    fn apply(&self, config: &mut HostConfig) {
        if let Some(tracks) = &self.tracks {
            config.simulation.tracks_ms.clone_from(tracks);
        }
        if let Some(tick_ms) = self.tick_ms {
            config.simulation.tick_ms = tick_ms;
        }
        if let Some(volume) = self.volume {
            config.player.volume = volume;
        }
        if self.skip.is_some() {
            config.simulation.skip = self.skip;
        }
        if self.volume_change.is_some() {
            config.simulation.volume_change = self.volume_change;
        }
        if let Some(rate) = self.fade_out_rate {
            config.crossfade.fade_out_rate_hz = rate;
        }
        if let Some(rate) = self.fade_in_rate {
            config.crossfade.fade_in_rate_hz = rate;
        }
        if let Some(policy) = self.manual_volume {
            config.crossfade.manual_volume = policy.into();
        }
        if self.no_crossfade {
            config.crossfade.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so JSON events own stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qmusic_fade=info,qmusic_crossfade=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config =
        HostConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Simulate(args) => {
            args.apply(&mut config);
            config.validate().context("Invalid command-line override")?;
            simulate(&config, args.json_events).await?;
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

async fn simulate(config: &HostConfig, json_events: bool) -> anyhow::Result<()> {
    let total_ms = config
        .simulation
        .tracks_ms
        .iter()
        .fold(0i64, |total, duration| total.saturating_add(*duration));

    tracing::info!("Starting QMusic crossfade simulation");
    tracing::info!(
        "Playlist: {} tracks, {}",
        config.simulation.tracks_ms.len(),
        format_position(total_ms)
    );
    tracing::info!(
        "Volume: {}, crossfade {}",
        config.player.volume,
        if config.crossfade.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    let simulation = Simulation::new(config)?;

    let report = simulation
        .run_with(|event| {
            if !json_events {
                return;
            }
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Failed to encode event: {}", e),
            }
        })
        .await
        .context("Simulation failed")?;

    if report.skipped {
        tracing::info!("Skip was applied during the run");
    }
    tracing::info!(
        "Finished after {} ticks, final volume {}",
        report.ticks,
        report.final_volume
    );

    Ok(())
}
