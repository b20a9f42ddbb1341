//! End-to-end smoke tests driving the CLI's subcommands directly (not via
//! `std::process::Command`, so failures show a normal backtrace).

use std::sync::Arc;

use resonance_core::HrtfData;
use resonance_core::graph::Simulation;
use resonance_io::{read_wav_planar, write_wav_planar};
use resonance_spatial::Environment;
use tempfile::NamedTempFile;

#[test]
fn tone_then_play_round_trips_through_wav() {
    let sample_rate = 48_000.0;
    let frame_count = 4800;
    let samples: Vec<f32> =
        (0..frame_count).map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate).sin()).collect();

    let tone_file = NamedTempFile::new().unwrap();
    write_wav_planar(tone_file.path(), &[samples.clone()], sample_rate as u32).unwrap();

    let (loaded, spec) = read_wav_planar(tone_file.path()).unwrap();
    assert_eq!(spec.channels, 1);
    assert_eq!(loaded[0].len(), frame_count);

    let sim = Simulation::new(sample_rate, 256);
    let hrtf = Arc::new(HrtfData::default_dataset(sample_rate));
    let env = Environment::new(&sim, hrtf);
    sim.set_output_node(env.node_id());

    let handle = sim.load_buffer(sample_rate, 1, &loaded);
    env.play_async(handle, [1.0, 0.0, -1.0], true).unwrap();

    let total_blocks = frame_count.div_ceil(256) + 2;
    let mut left = Vec::new();
    for _ in 0..total_blocks {
        let block = sim.render_block(env.node_id(), 2);
        left.extend_from_slice(&block[0]);
    }
    assert!(left.iter().any(|&s| s.abs() > 1e-4), "expected audible output from the played source");
}

#[test]
fn out_of_range_source_is_silent() {
    let sim = Simulation::new(48_000.0, 128);
    let hrtf = Arc::new(HrtfData::default_dataset(48_000.0));
    let env = Environment::new(&sim, hrtf);
    sim.set_output_node(env.node_id());

    let samples = vec![1.0f32; 1024];
    let handle = sim.load_buffer(48_000.0, 1, &[samples]);
    let source = env.play_async(handle, [0.0, 0.0, -5000.0], true).unwrap();
    source.set_max_distance(100.0).unwrap();

    let block = sim.render_block(env.node_id(), 2);
    assert!(block.iter().all(|ch| ch.iter().all(|&s| s == 0.0)));
}
