//! riffwork - demo host binary wiring the fetch pipeline, stem cache, mix
//! engine and an audio device together.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "riffwork")]
#[command(author, version, about = "Riffwork collaborative riff playback engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List and inspect audio devices
    Devices(commands::devices::DevicesArgs),

    /// Display WAV file information
    Info(commands::info::InfoArgs),

    /// Resolve and play a single riff through the mix engine
    Play(commands::play::PlayArgs),

    /// Inspect and edit the persistent configuration file
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    tracing::debug!(command = ?std::mem::discriminant(&cli.command), "dispatching command");

    match cli.command {
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Play(args) => commands::play::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
