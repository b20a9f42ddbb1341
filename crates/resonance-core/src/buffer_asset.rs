//! Immutable PCM buffer assets.
//!
//! A [`Buffer`] holds decoded, resampled-to-simulation-rate PCM data. Once
//! loaded it never changes; [`BufferNode`](crate::nodes::buffer_node::BufferNode)
//! streams from it with a fractional read position. Buffers are owned by a
//! [`BufferStore`] (one per [`crate::graph::Simulation`]) and referenced
//! elsewhere via the opaque [`BufferHandle`] property value — they outlive
//! any node that merely references them.

use crate::graph::property::BufferHandle;
use crate::resample;

/// Immutable, simulation-rate-resampled PCM data.
#[derive(Debug, Clone)]
pub struct Buffer {
    sample_rate: f32,
    channels: usize,
    /// Planar: one `Vec<f32>` per channel, each `frame_count` long.
    data: Vec<Vec<f32>>,
}

impl Buffer {
    /// Loads planar PCM at `source_rate` and resamples it to
    /// `target_rate` if the two differ (±0.5 Hz tolerance). Channel layout
    /// is preserved as-is; remixing to a different channel count happens at
    /// connection time, not at load time.
    pub fn load_from_array(
        source_rate: f32,
        channels: usize,
        frames: &[Vec<f32>],
        target_rate: f32,
    ) -> Self {
        debug_assert_eq!(frames.len(), channels);
        let data = if (source_rate - target_rate).abs() < 0.5 {
            frames.to_vec()
        } else {
            let (p, q) = rational_ratio(target_rate, source_rate);
            frames
                .iter()
                .map(|ch| resample::resample(ch, p, q, 32))
                .collect()
        };
        Self { sample_rate: target_rate, channels, data }
    }

    /// Sample rate of the stored data (always the owning simulation's rate
    /// once loaded).
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Channel count of the stored data.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frame count (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.data.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Planar channel data.
    pub fn channel(&self, index: usize) -> &[f32] {
        self.data.get(index).map(|c| c.as_slice()).unwrap_or(&[])
    }

    /// Rescales every sample by `1 / max(|min|, |max|)`. A no-op if every
    /// sample is already zero (avoids dividing by zero / amplifying noise
    /// floor on silent buffers).
    pub fn normalize(&mut self) {
        let mut peak = 0.0f32;
        for ch in &self.data {
            for &s in ch {
                peak = peak.max(s.abs());
            }
        }
        if peak <= f32::EPSILON {
            return;
        }
        let scale = 1.0 / peak;
        for ch in &mut self.data {
            for s in ch.iter_mut() {
                *s *= scale;
            }
        }
    }

    /// Reads one frame at a fractional position, linearly interpolated,
    /// remixed on the fly to `output.len()` channels via the standard
    /// remix matrix for the buffer's native channel count. `output[c]` is
    /// one sample — this is the per-frame cousin of
    /// [`crate::remix::remix_planar`], used by the buffer player which
    /// needs one frame at a time at an arbitrary fractional position.
    pub fn sample_with_remix(&self, position: f64, output: &mut [f32]) {
        let frame_count = self.frame_count();
        if frame_count == 0 {
            output.fill(0.0);
            return;
        }
        let pos = position.clamp(0.0, (frame_count - 1).max(0) as f64);
        let idx0 = pos.floor() as usize;
        let idx1 = (idx0 + 1).min(frame_count - 1);
        let frac = (pos - idx0 as f64) as f32;

        let mut native = vec![0.0f32; self.channels];
        for (c, slot) in native.iter_mut().enumerate() {
            let a = self.channel(c).get(idx0).copied().unwrap_or(0.0);
            let b = self.channel(c).get(idx1).copied().unwrap_or(0.0);
            *slot = a + (b - a) * frac;
        }

        if output.len() == self.channels {
            output.copy_from_slice(&native);
            return;
        }
        let matrix = crate::remix::build_matrix(self.channels, output.len());
        for (o, row) in matrix.iter().enumerate() {
            output[o] = row.iter().zip(native.iter()).map(|(m, s)| m * s).sum();
        }
    }
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn rational_ratio(target: f32, source: f32) -> (usize, usize) {
    // Quantize to whole Hz before reducing — resample() wants small
    // integer ratios, and real sample rates are always integral anyway.
    let mut p = target.round().max(1.0) as usize;
    let mut q = source.round().max(1.0) as usize;
    let g = gcd(p, q).max(1);
    p /= g;
    q /= g;
    (p, q)
}

/// Owns every loaded [`Buffer`] for one simulation, handing out stable
/// [`BufferHandle`]s. Buffers are never removed individually — a
/// simulation's buffer set lives as long as the simulation itself, since
/// `BufferHandle`s may be held by nodes' properties indefinitely.
#[derive(Default)]
pub struct BufferStore {
    buffers: Vec<Buffer>,
}

impl BufferStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `buffer`, returning a handle to it.
    pub fn insert(&mut self, buffer: Buffer) -> BufferHandle {
        let handle = BufferHandle(self.buffers.len() as u32);
        self.buffers.push(buffer);
        handle
    }

    /// Looks up a buffer by handle.
    pub fn get(&self, handle: BufferHandle) -> Option<&Buffer> {
        self.buffers.get(handle.0 as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_scales_to_unit_peak() {
        let mut b = Buffer::load_from_array(44100.0, 1, &[vec![0.25, -0.5, 0.1]], 44100.0);
        b.normalize();
        assert!((b.channel(0)[1] + 1.0).abs() < 1e-5);
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut b = Buffer::load_from_array(44100.0, 1, &[vec![0.25, -0.5, 0.1]], 44100.0);
        b.normalize();
        let once = b.channel(0).to_vec();
        b.normalize();
        assert_eq!(once, b.channel(0));
    }

    #[test]
    fn normalize_silent_buffer_is_noop() {
        let mut b = Buffer::load_from_array(44100.0, 1, &[vec![0.0; 8]], 44100.0);
        b.normalize();
        assert!(b.channel(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn no_resample_when_rates_match() {
        let b = Buffer::load_from_array(48000.0, 1, &[vec![1.0, 2.0, 3.0]], 48000.0);
        assert_eq!(b.frame_count(), 3);
        assert_eq!(b.channel(0), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn empty_buffer_samples_silence() {
        let b = Buffer::load_from_array(44100.0, 1, &[vec![]], 44100.0);
        let mut out = [1.0f32];
        b.sample_with_remix(0.0, &mut out);
        assert_eq!(out[0], 0.0);
    }
}
