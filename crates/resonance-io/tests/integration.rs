//! Integration tests for resonance-io's WAV I/O and output pump.

use resonance_core::graph::{NodeBehavior, ProcessContext, PropertyTable, Simulation};
use resonance_io::pump::SimulationPump;
use resonance_io::{WavSpec, read_wav, read_wav_info, read_wav_planar, write_wav, write_wav_planar};
use tempfile::NamedTempFile;

/// Generate a 1-second sine wave at the given sample rate.
fn sine_wave(sample_rate: u32, freq_hz: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32).sin())
        .collect()
}

// ---------------------------------------------------------------------------
// WAV roundtrip tests -- mono
// ---------------------------------------------------------------------------

#[test]
fn wav_roundtrip_mono_f32_44100() {
    let sr = 44100;
    let samples = sine_wave(sr, 440.0, sr as usize);
    let spec = WavSpec { channels: 1, sample_rate: sr, bits_per_sample: 32 };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
    assert_eq!(loaded_spec.sample_rate, sr);
    assert_eq!(loaded_spec.channels, 1);
    assert_eq!(loaded.len(), samples.len());

    for (a, b) in samples.iter().zip(loaded.iter()) {
        assert!((a - b).abs() < 1e-6, "sample mismatch: {a} vs {b}");
    }
}

#[test]
fn wav_roundtrip_mono_i16_96000() {
    let sr = 96000;
    let samples: Vec<f32> = sine_wave(sr, 1000.0, 4096).into_iter().map(|s| s * 0.9).collect();
    let spec = WavSpec { channels: 1, sample_rate: sr, bits_per_sample: 16 };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
    assert_eq!(loaded_spec.sample_rate, sr);
    assert_eq!(loaded.len(), samples.len());
    for (a, b) in samples.iter().zip(loaded.iter()) {
        assert!((a - b).abs() < 0.001);
    }
}

#[test]
fn wav_write_empty_buffer() {
    let spec = WavSpec { channels: 1, sample_rate: 48000, bits_per_sample: 32 };
    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &[], spec).unwrap();

    let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
    assert_eq!(loaded_spec.sample_rate, 48000);
    assert!(loaded.is_empty());
}

// ---------------------------------------------------------------------------
// WAV planar (multichannel) roundtrip
// ---------------------------------------------------------------------------

#[test]
fn wav_planar_roundtrip_quad() {
    let frames = 512;
    let channels: Vec<Vec<f32>> = (0..4)
        .map(|ch| sine_wave(48000, 220.0 * (ch as f32 + 1.0), frames))
        .collect();

    let file = NamedTempFile::new().unwrap();
    write_wav_planar(file.path(), &channels, 48000).unwrap();

    let (planar, spec) = read_wav_planar(file.path()).unwrap();
    assert_eq!(spec.channels, 4);
    assert_eq!(planar.len(), 4);
    for (orig, loaded) in channels.iter().zip(planar.iter()) {
        for (a, b) in orig.iter().zip(loaded.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}

#[test]
fn wav_mono_mixdown_averages_channels() {
    let left = vec![1.0, -1.0, 0.5];
    let right = vec![-1.0, 1.0, 0.5];
    let file = NamedTempFile::new().unwrap();
    write_wav_planar(file.path(), &[left, right], 44100).unwrap();

    let (mono, _) = read_wav(file.path()).unwrap();
    assert_eq!(mono.len(), 3);
    assert!(mono[0].abs() < 1e-6);
    assert!(mono[1].abs() < 1e-6);
    assert!((mono[2] - 0.5).abs() < 1e-6);
}

// ---------------------------------------------------------------------------
// read_wav_info
// ---------------------------------------------------------------------------

#[test]
fn wav_info_reports_metadata_without_decoding_samples() {
    let sr = 48000;
    let num_samples = 2400; // 50ms
    let samples = sine_wave(sr, 440.0, num_samples);
    let spec = WavSpec { channels: 1, sample_rate: sr, bits_per_sample: 32 };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let info = read_wav_info(file.path()).unwrap();
    assert_eq!(info.channels, 1);
    assert_eq!(info.sample_rate, sr);
    assert_eq!(info.bits_per_sample, 32);
    assert_eq!(info.num_frames, num_samples as u64);
    assert!((info.duration_secs - 0.05).abs() < 1e-6);
}

// ---------------------------------------------------------------------------
// SimulationPump driven end-to-end by a small node graph
// ---------------------------------------------------------------------------

struct RampSource {
    next: f32,
    step: f32,
}

impl NodeBehavior for RampSource {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        for ch in ctx.outputs[0].iter_mut() {
            for sample in ch.iter_mut() {
                *sample = self.next;
                self.next += self.step;
            }
        }
    }
}

#[test]
fn pump_renders_gapless_audio_across_uneven_callback_sizes() {
    let sim = Simulation::new(48_000.0, 16);
    let node = sim.create_node(
        "ramp",
        Box::new(RampSource { next: 0.0, step: 1.0 }),
        &[],
        &[1],
        PropertyTable::new(),
    );
    sim.set_output_node(node);

    let mut pump = SimulationPump::new(sim, node, 1);

    // Device period (10) doesn't evenly divide the simulation block size
    // (16), so the pump must carry the remainder across calls without
    // dropping or duplicating samples.
    let mut collected = Vec::new();
    for _ in 0..4 {
        let mut dst = vec![0.0f32; 10];
        pump.fill(&mut dst);
        collected.extend(dst);
    }

    for (i, &sample) in collected.iter().enumerate() {
        assert!((sample - i as f32).abs() < 1e-6, "sample {i}: expected {i}, got {sample}");
    }
}

// ---------------------------------------------------------------------------
// Offline render: simulation output written straight to a WAV file
// ---------------------------------------------------------------------------

#[test]
fn offline_render_writes_simulation_output_to_wav() {
    let sim = Simulation::new(48_000.0, 256);
    let node = sim.create_node(
        "ramp",
        Box::new(RampSource { next: 0.0, step: 0.0 }),
        &[],
        &[2],
        PropertyTable::new(),
    );
    sim.set_output_node(node);

    let planar = sim.render_block(node, 2);
    assert_eq!(planar.len(), 2);
    assert_eq!(planar[0].len(), 256);

    let file = NamedTempFile::new().unwrap();
    write_wav_planar(file.path(), &planar, 48000).unwrap();

    let (reloaded, spec) = read_wav_planar(file.path()).unwrap();
    assert_eq!(spec.channels, 2);
    assert_eq!(reloaded[0].len(), 256);
}
