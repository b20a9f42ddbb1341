//! `resonance tone` — synthesize a sine wave, push it through a
//! [`BufferNode`](resonance_core::nodes::BufferNode) → gain subgraph one
//! block at a time, and write the rendered output to a WAV file. Exercises
//! the player/gain/scheduler path without needing a live audio device.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use resonance_core::graph::{NodeState, PropertyValue, Simulation};
use resonance_core::nodes::{buffer_node, gain};
use resonance_io::write_wav_planar;

#[derive(Args)]
pub struct ToneArgs {
    /// Output WAV path.
    pub path: PathBuf,

    /// Tone frequency in Hz.
    #[arg(long, default_value_t = 440.0)]
    pub freq: f32,

    /// Duration in seconds.
    #[arg(long, default_value_t = 1.0)]
    pub seconds: f32,

    /// Output gain, linear (1.0 = unity).
    #[arg(long, default_value_t = 0.5)]
    pub gain: f32,

    /// Simulation sample rate in Hz.
    #[arg(long, default_value_t = 48_000.0)]
    pub sample_rate: f32,

    /// Block size in frames.
    #[arg(long, default_value_t = 256)]
    pub block_size: usize,
}

pub fn run(args: ToneArgs) -> Result<()> {
    let sim = Simulation::new(args.sample_rate, args.block_size);

    let frame_count = (args.sample_rate * args.seconds) as usize;
    let samples: Vec<f32> = (0..frame_count)
        .map(|i| (2.0 * std::f32::consts::PI * args.freq * i as f32 / args.sample_rate).sin())
        .collect();
    let buffer_handle = sim.load_buffer(args.sample_rate, 1, &[samples]);

    let player = sim.create_buffer_node(1, None);
    let gain_node = sim.create_gain_node(1);
    sim.connect(player, 0, gain_node, 0)?;
    sim.set_output_node(gain_node);

    sim.set_property(player, buffer_node::BUFFER, buffer_handle)?;
    sim.set_property(gain_node, gain::GAIN, PropertyValue::Float(args.gain))?;
    sim.set_state(player, NodeState::Playing)?;

    let total_blocks = frame_count.div_ceil(args.block_size);
    let mut rendered: Vec<f32> = Vec::with_capacity(frame_count);
    for _ in 0..total_blocks {
        let block = sim.render_block(gain_node, 1);
        rendered.extend_from_slice(&block[0]);
    }
    rendered.truncate(frame_count);

    write_wav_planar(&args.path, &[rendered], args.sample_rate as u32)?;
    println!("wrote {} ({} frames at {} Hz)", args.path.display(), frame_count, args.sample_rate as u32);
    Ok(())
}
