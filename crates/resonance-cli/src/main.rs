//! `resonance` — a thin smoke-test harness for the simulation kernel.
//!
//! Not part of the kernel's tested surface: every command here just wires a
//! handful of [`resonance_core`]/[`resonance_spatial`] nodes together and
//! drives them through [`resonance_io`], so a change to the graph/scheduler
//! can be heard, not just unit-tested.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "resonance")]
#[command(author, version, about = "Resonance audio engine demo CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available audio output devices.
    Devices,

    /// Print a WAV file's format metadata.
    Info(commands::info::InfoArgs),

    /// Generate a test tone and write it to a WAV file.
    Tone(commands::tone::ToneArgs),

    /// Play a WAV file through an environment at a fixed 3D position.
    Play(commands::play::PlayArgs),

    /// Print the resolved simulation configuration (defaults overridden by
    /// any `resonance.toml` found on the standard search path).
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices => commands::devices::run(),
        Commands::Info(args) => commands::info::run(args),
        Commands::Tone(args) => commands::tone::run(args),
        Commands::Play(args) => commands::play::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
