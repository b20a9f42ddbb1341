//! Offline rational-ratio resampling for buffer assets.
//!
//! Used when loading a [`crate::buffer_asset::Buffer`] whose native sample
//! rate differs from the simulation's sample rate. Real-time streams are not
//! resampled this way; they rely on playback rate instead.

use std::f32::consts::PI;

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Design a lowpass FIR filter via a Blackman-windowed sinc, normalized to
/// unity gain at DC. `cutoff` is expressed as a fraction of Nyquist (0, 1].
pub fn design_lowpass(num_taps: usize, cutoff: f32) -> Vec<f32> {
    if num_taps == 0 {
        return Vec::new();
    }
    let m = num_taps as f32 - 1.0;
    let mut taps = vec![0.0f32; num_taps];
    for (n, tap) in taps.iter_mut().enumerate() {
        let x = n as f32 - m / 2.0;
        let sinc = if x.abs() < 1e-6 {
            cutoff
        } else {
            (PI * cutoff * x).sin() / (PI * x)
        };
        let w = if num_taps == 1 {
            1.0
        } else {
            0.42 - 0.5 * (2.0 * PI * n as f32 / m).cos() + 0.08 * (4.0 * PI * n as f32 / m).cos()
        };
        *tap = sinc * w;
    }
    let dc_gain: f32 = taps.iter().sum();
    if dc_gain.abs() > 1e-9 {
        for t in &mut taps {
            *t /= dc_gain;
        }
    }
    taps
}

/// Direct-form FIR filter application, full convolution (`out.len() ==
/// signal.len() + taps.len() - 1`).
pub fn apply_fir(signal: &[f32], taps: &[f32]) -> Vec<f32> {
    if signal.is_empty() || taps.is_empty() {
        return Vec::new();
    }
    let out_len = signal.len() + taps.len() - 1;
    let mut out = vec![0.0f32; out_len];
    for (i, &x) in signal.iter().enumerate() {
        if x == 0.0 {
            continue;
        }
        for (k, &h) in taps.iter().enumerate() {
            out[i + k] += x * h;
        }
    }
    out
}

/// Keep every `factor`-th sample, starting at 0.
pub fn decimate(signal: &[f32], factor: usize) -> Vec<f32> {
    if factor <= 1 {
        return signal.to_vec();
    }
    signal.iter().step_by(factor).copied().collect()
}

/// Insert `factor - 1` zeros between samples.
pub fn interpolate(signal: &[f32], factor: usize) -> Vec<f32> {
    if factor <= 1 {
        return signal.to_vec();
    }
    let mut out = vec![0.0f32; signal.len() * factor];
    for (i, &x) in signal.iter().enumerate() {
        out[i * factor] = x;
    }
    out
}

/// Resample `signal` by the rational ratio `p / q` (new_rate / old_rate is
/// represented as `p, q` in lowest terms internally). `filter_order` controls
/// the anti-aliasing lowpass filter's tap count per phase; a larger order
/// gives a sharper transition band at higher cost. Typical values are in the
/// 8-32 range.
pub fn resample(signal: &[f32], p: usize, q: usize, filter_order: usize) -> Vec<f32> {
    if signal.is_empty() || p == 0 || q == 0 {
        return Vec::new();
    }
    let g = gcd(p, q);
    let p = p / g;
    let q = q / g;
    if p == 1 && q == 1 {
        return signal.to_vec();
    }

    let cutoff = 1.0 / (p.max(q) as f32);
    let num_taps = filter_order * p.max(q) + 1;
    let taps = design_lowpass(num_taps, cutoff);
    // Interpolation gain compensates for the zero-stuffing in `interpolate`.
    let taps: Vec<f32> = taps.iter().map(|t| t * p as f32).collect();

    let upsampled = interpolate(signal, p);
    let filtered = apply_fir(&upsampled, &taps);
    // Center the filter delay so the resampled output is phase-aligned with
    // the input (group delay of a symmetric FIR is (num_taps - 1) / 2).
    let delay = (num_taps - 1) / 2;
    let trimmed = if filtered.len() > delay {
        &filtered[delay..]
    } else {
        &filtered[..]
    };
    decimate(trimmed, q)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcd_basic() {
        assert_eq!(gcd(48, 12), 12);
        assert_eq!(gcd(48000, 44100), gcd(44100, 48000));
    }

    #[test]
    fn lowpass_has_unity_dc_gain() {
        let taps = design_lowpass(63, 0.5);
        let sum: f32 = taps.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3, "{sum}");
    }

    #[test]
    fn identity_ratio_is_passthrough() {
        let signal = vec![1.0, 2.0, 3.0, 4.0];
        let out = resample(&signal, 1, 1, 16);
        assert_eq!(out, signal);
    }

    #[test]
    fn decimate_keeps_every_nth_sample() {
        let signal = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(decimate(&signal, 2), vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn interpolate_zero_stuffs() {
        let signal = vec![1.0, 2.0];
        assert_eq!(interpolate(&signal, 3), vec![1.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn downsample_halves_length_approximately() {
        let signal: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.1).sin()).collect();
        let out = resample(&signal, 1, 2, 16);
        let expected = signal.len() / 2;
        assert!(
            (out.len() as isize - expected as isize).unsigned_abs() <= 2,
            "got {} expected ~{}",
            out.len(),
            expected
        );
    }

    #[test]
    fn upsample_doubles_length_approximately() {
        let signal: Vec<f32> = (0..500).map(|i| (i as f32 * 0.1).sin()).collect();
        let out = resample(&signal, 2, 1, 16);
        let expected = signal.len() * 2;
        assert!(
            (out.len() as isize - expected as isize).unsigned_abs() <= 2,
            "got {} expected ~{}",
            out.len(),
            expected
        );
    }

    #[test]
    fn resampled_sine_preserves_amplitude() {
        let sr = 48000.0;
        let freq = 440.0;
        let signal: Vec<f32> = (0..4800)
            .map(|i| (2.0 * PI * freq * i as f32 / sr).sin())
            .collect();
        let out = resample(&signal, 441, 480, 16); // 48000 -> 44100
        let peak = out.iter().cloned().fold(0.0f32, f32::max);
        assert!(peak > 0.7 && peak < 1.1, "{peak}");
    }
}
