//! `resonance play` — load a WAV file into an [`Environment`]'s one-shot
//! `play_async` cache at a fixed 3D position and stream the binaural mix to
//! an output device (or, with `--out`, render it to a WAV file instead of
//! opening a device).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use resonance_core::HrtfData;
use resonance_core::graph::Simulation;
use resonance_io::backend::BackendStreamConfig;
use resonance_io::cpal_backend::CpalBackend;
use resonance_io::pump::run_simulation_output;
use resonance_io::{read_wav_planar, write_wav_planar};
use resonance_spatial::Environment;

#[derive(Args)]
pub struct PlayArgs {
    /// WAV file to play.
    pub path: PathBuf,

    /// Source position, world-space meters: x (left/right).
    #[arg(long, default_value_t = 0.0)]
    pub x: f32,

    /// Source position: y (up).
    #[arg(long, default_value_t = 0.0)]
    pub y: f32,

    /// Source position: z (forward is negative z).
    #[arg(long, default_value_t = -1.0)]
    pub z: f32,

    /// Render to this WAV path instead of opening a live output device.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Block size in frames.
    #[arg(long, default_value_t = 256)]
    pub block_size: usize,
}

pub fn run(args: PlayArgs) -> Result<()> {
    let (planar, spec) = read_wav_planar(&args.path).context("reading input WAV")?;
    let sample_rate = spec.sample_rate as f32;

    let sim = Simulation::new(sample_rate, args.block_size);
    let hrtf = Arc::new(HrtfData::default_dataset(sample_rate));
    let env = Environment::new(&sim, hrtf);
    sim.set_output_node(env.node_id());

    let buffer_handle = sim.load_buffer(sample_rate, planar.len(), &planar);
    let frame_count = planar.first().map_or(0, Vec::len);
    env.play_async(buffer_handle, [args.x, args.y, args.z], true)?;

    match args.out {
        Some(out_path) => {
            let total_blocks = frame_count.div_ceil(args.block_size) + 1;
            let mut left = Vec::with_capacity(total_blocks * args.block_size);
            let mut right = Vec::with_capacity(total_blocks * args.block_size);
            for _ in 0..total_blocks {
                let block = sim.render_block(env.node_id(), 2);
                left.extend_from_slice(&block[0]);
                right.extend_from_slice(&block[1]);
            }
            write_wav_planar(&out_path, &[left, right], sample_rate as u32)?;
            println!("wrote {}", out_path.display());
        }
        None => {
            let backend = CpalBackend::new();
            let config = BackendStreamConfig { sample_rate: spec.sample_rate, buffer_size: args.block_size as u32, channels: 2, device_name: None };
            let _stream = run_simulation_output(&backend, sim, env.node_id(), &config)?;
            println!("playing {} ({:.2}s) — press ctrl-c to stop", args.path.display(), frame_count as f32 / sample_rate);
            std::thread::sleep(Duration::from_secs_f32(frame_count as f32 / sample_rate + 0.5));
        }
    }
    Ok(())
}
