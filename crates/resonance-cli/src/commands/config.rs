//! `resonance config` — print the resolved simulation configuration
//! (defaults overridden by whatever `resonance.toml` `paths::find_config`
//! turns up).

use anyhow::Result;
use clap::Args;
use resonance_config::{SimulationConfig, paths};

#[derive(Args)]
pub struct ConfigArgs {
    /// Explicit config file path or bare name (default: search the
    /// standard user/system config directories for `resonance.toml`).
    #[arg(long)]
    pub path: Option<String>,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    let resolved = args.path.as_deref().and_then(paths::find_config).or_else(|| paths::find_config("resonance"));

    let config = match &resolved {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };

    match &resolved {
        Some(path) => println!("loaded from: {}", path.display()),
        None => println!("no config file found, using defaults"),
    }
    println!("sample_rate:         {} Hz", config.sample_rate);
    println!("block_size:          {}", config.block_size);
    println!("device_name:         {}", config.device_name.as_deref().unwrap_or("<default>"));
    println!("hrtf_path:           {}", config.hrtf_path.as_ref().map_or("<built-in>".to_string(), |p| p.display().to_string()));
    println!("play_cache_capacity: {}", config.play_cache_capacity);
    Ok(())
}
