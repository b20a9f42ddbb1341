//! Panning strategies: equal-power amplitude panning and HRTF convolution.

use crate::convolve::FftConvolver;
use crate::hrtf::HrtfData;
use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

/// Equal-power amplitude panner across an arbitrary fixed output channel
/// count, with azimuth-to-gain mapping via cosine/sine crossfade between the
/// two channels nearest the source's angle.
///
/// Channel positions are distributed evenly around the horizontal plane
/// starting at front-center; e.g. for stereo: left at -90deg, right at
/// +90deg (matching a standard two-speaker layout rotated so 0deg is front).
pub struct AmplitudePanner {
    channel_count: usize,
    channel_angles: Vec<f32>,
    base_gains: Vec<f32>,
    elevation_gain: f32,
    gains: Vec<f32>,
}

impl AmplitudePanner {
    /// Create a panner for `channel_count` output channels (1, 2, 4, 6, or
    /// 8). Speaker angles are spaced evenly starting from front-center.
    pub fn new(channel_count: usize) -> Self {
        let channel_angles = speaker_layout(channel_count);
        Self {
            channel_count,
            base_gains: vec![0.0; channel_count],
            elevation_gain: 1.0,
            gains: vec![0.0; channel_count],
            channel_angles,
        }
    }

    /// Number of output channels this panner drives.
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Recompute per-channel gains for a source at `azimuth` degrees
    /// (0 = front, positive = clockwise/right) using equal-power panning
    /// between the two bracketing speakers.
    pub fn set_azimuth(&mut self, azimuth: f32) {
        if self.channel_count == 1 {
            self.base_gains[0] = 1.0;
            self.apply_elevation();
            return;
        }
        let az = wrap_360(azimuth);
        let n = self.channel_angles.len();
        let mut lower = 0;
        for i in 0..n {
            let a = self.channel_angles[i];
            let b = self.channel_angles[(i + 1) % n];
            if angle_between(a, b, az) {
                lower = i;
                break;
            }
        }
        let upper = (lower + 1) % n;
        let span = wrap_360(self.channel_angles[upper] - self.channel_angles[lower]);
        let span = if span <= 0.0 { 360.0 } else { span };
        let offset = wrap_360(az - self.channel_angles[lower]);
        let t = (offset / span).clamp(0.0, 1.0);
        self.base_gains.iter_mut().for_each(|g| *g = 0.0);
        self.base_gains[lower] = (t * FRAC_PI_2).cos();
        self.base_gains[upper] = (t * FRAC_PI_2).sin();
        self.apply_elevation();
    }

    /// Scale all channel gains by `cos(elevation)`: this panner has no
    /// height channels, so a source directly overhead or underfoot (±90deg)
    /// fades to silence rather than snapping to the horizontal plane.
    pub fn set_elevation(&mut self, elevation: f32) {
        self.elevation_gain = elevation.to_radians().cos().max(0.0);
        self.apply_elevation();
    }

    fn apply_elevation(&mut self) {
        for (g, &b) in self.gains.iter_mut().zip(self.base_gains.iter()) {
            *g = b * self.elevation_gain;
        }
    }

    /// Current per-channel gains.
    pub fn gains(&self) -> &[f32] {
        &self.gains
    }

    /// Pan a mono input sample into `output` (one sample per channel).
    pub fn pan_sample(&self, input: f32, output: &mut [f32]) {
        for (o, &g) in output.iter_mut().zip(self.gains.iter()) {
            *o = input * g;
        }
    }

    /// Pan a mono block into per-channel planar output buffers.
    pub fn pan_block(&self, input: &[f32], output: &mut [Vec<f32>]) {
        for (ch, out) in output.iter_mut().enumerate() {
            let g = self.gains[ch];
            for (o, &x) in out.iter_mut().zip(input.iter()) {
                *o = x * g;
            }
        }
    }
}

fn speaker_layout(channel_count: usize) -> Vec<f32> {
    match channel_count {
        1 => vec![0.0],
        2 => vec![-90.0, 90.0],
        4 => vec![-45.0, 45.0, 135.0, 225.0],
        6 => vec![-30.0, 30.0, 90.0, 150.0, 210.0, 270.0],
        8 => vec![-22.5, 22.5, 67.5, 112.5, 157.5, 202.5, 247.5, 292.5],
        n => (0..n).map(|i| i as f32 * 360.0 / n as f32).collect(),
    }
}

fn wrap_360(mut d: f32) -> f32 {
    while d < 0.0 {
        d += 360.0;
    }
    while d >= 360.0 {
        d -= 360.0;
    }
    d
}

fn angle_between(a: f32, b: f32, x: f32) -> bool {
    let a = wrap_360(a);
    let b = wrap_360(b);
    let x = wrap_360(x);
    if a <= b {
        x >= a && x < b
    } else {
        x >= a || x < b
    }
}

/// HRTF convolution panner: crossfades between an old and new impulse
/// response pair when the source angle changes, avoiding the click a hard
/// filter swap would produce.
pub struct HrtfPanner {
    data: Arc<HrtfData>,
    block_size: usize,
    left_old: FftConvolver,
    right_old: FftConvolver,
    left_new: FftConvolver,
    right_new: FftConvolver,
    crossfading: bool,
    fade_position: f32,
    fade_increment: f32,
    azimuth: f32,
    elevation: f32,
}

impl HrtfPanner {
    /// Create a panner against `data`, processing blocks of `block_size`
    /// samples, with crossfades lasting `crossfade_seconds`.
    pub fn new(data: Arc<HrtfData>, block_size: usize, sample_rate: f32, crossfade_seconds: f32) -> Self {
        let mut left_new = FftConvolver::new(block_size);
        let mut right_new = FftConvolver::new(block_size);
        if let Some((l, r)) = data.interpolated(0.0, 0.0) {
            left_new.set_response(&l);
            right_new.set_response(&r);
        }
        let fade_samples = (crossfade_seconds * sample_rate / block_size as f32).max(1.0);
        Self {
            data,
            block_size,
            left_old: FftConvolver::new(block_size),
            right_old: FftConvolver::new(block_size),
            left_new,
            right_new,
            crossfading: false,
            fade_position: 1.0,
            fade_increment: 1.0 / fade_samples,
            azimuth: 0.0,
            elevation: 0.0,
        }
    }

    /// Update the source direction. If it moved, starts a crossfade from the
    /// currently-active response set to the one for the new direction.
    pub fn set_direction(&mut self, azimuth: f32, elevation: f32) {
        if (azimuth - self.azimuth).abs() < 1e-3 && (elevation - self.elevation).abs() < 1e-3 {
            return;
        }
        self.azimuth = azimuth;
        self.elevation = elevation;
        let Some((l, r)) = self.data.interpolated(azimuth, elevation) else {
            return;
        };
        core::mem::swap(&mut self.left_old, &mut self.left_new);
        core::mem::swap(&mut self.right_old, &mut self.right_new);
        self.left_new.set_response(&l);
        self.right_new.set_response(&r);
        self.crossfading = true;
        self.fade_position = 0.0;
    }

    /// Process one mono input block into stereo `(left, right)` output
    /// blocks, each `block_size` samples.
    pub fn process(&mut self, input: &[f32], left_out: &mut [f32], right_out: &mut [f32]) {
        debug_assert_eq!(input.len(), self.block_size);
        if !self.crossfading {
            self.left_new.convolve(input, left_out);
            self.right_new.convolve(input, right_out);
            return;
        }
        let mut left_a = vec![0.0f32; self.block_size];
        let mut right_a = vec![0.0f32; self.block_size];
        let mut left_b = vec![0.0f32; self.block_size];
        let mut right_b = vec![0.0f32; self.block_size];
        self.left_old.convolve(input, &mut left_a);
        self.right_old.convolve(input, &mut right_a);
        self.left_new.convolve(input, &mut left_b);
        self.right_new.convolve(input, &mut right_b);

        let start = self.fade_position;
        for i in 0..self.block_size {
            let t = (start + self.fade_increment * i as f32 / self.block_size as f32).min(1.0);
            left_out[i] = left_a[i] + (left_b[i] - left_a[i]) * t;
            right_out[i] = right_a[i] + (right_b[i] - right_a[i]) * t;
        }
        self.fade_position = (self.fade_position + self.fade_increment).min(1.0);
        if self.fade_position >= 1.0 {
            self.crossfading = false;
        }
    }

    /// Reset convolver history and settle any in-flight crossfade.
    pub fn reset(&mut self) {
        self.left_old.reset();
        self.right_old.reset();
        self.left_new.reset();
        self.right_new.reset();
        self.crossfading = false;
        self.fade_position = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_panner_puts_all_energy_in_one_channel_at_poles() {
        let mut panner = AmplitudePanner::new(2);
        panner.set_azimuth(-90.0);
        assert!(panner.gains()[0] > 0.99);
        assert!(panner.gains()[1] < 0.01);
    }

    #[test]
    fn stereo_panner_center_splits_equally() {
        let mut panner = AmplitudePanner::new(2);
        panner.set_azimuth(0.0);
        let g = panner.gains();
        assert!((g[0] - g[1]).abs() < 0.05);
    }

    #[test]
    fn equal_power_sums_to_unity_power() {
        let mut panner = AmplitudePanner::new(2);
        for az in [-90.0, -45.0, 0.0, 45.0, 90.0] {
            panner.set_azimuth(az);
            let g = panner.gains();
            let power: f32 = g.iter().map(|x| x * x).sum();
            assert!((power - 1.0).abs() < 0.01, "{az}: power={power}");
        }
    }

    #[test]
    fn single_channel_panner_is_always_full_gain() {
        let mut panner = AmplitudePanner::new(1);
        panner.set_azimuth(123.0);
        assert_eq!(panner.gains(), &[1.0]);
    }

    #[test]
    fn overhead_elevation_silences_a_panner_with_no_height_channels() {
        let mut panner = AmplitudePanner::new(2);
        panner.set_azimuth(0.0);
        panner.set_elevation(90.0);
        let g = panner.gains();
        assert!(g[0].abs() < 1e-3 && g[1].abs() < 1e-3, "{g:?}");
    }

    #[test]
    fn zero_elevation_leaves_azimuth_gains_unchanged() {
        let mut panner = AmplitudePanner::new(2);
        panner.set_azimuth(-45.0);
        let before = panner.gains().to_vec();
        panner.set_elevation(0.0);
        assert_eq!(panner.gains(), before.as_slice());
    }

    #[test]
    fn hrtf_panner_produces_nonzero_output() {
        let data = Arc::new(HrtfData::default_dataset(44100.0));
        let mut panner = HrtfPanner::new(data, 64, 44100.0, 0.01);
        let input = vec![1.0; 64];
        let mut left = vec![0.0; 64];
        let mut right = vec![0.0; 64];
        panner.process(&input, &mut left, &mut right);
        assert!(left.iter().any(|&x| x != 0.0) || right.iter().any(|&x| x != 0.0));
    }

    #[test]
    fn hrtf_panner_direction_change_triggers_crossfade() {
        let data = Arc::new(HrtfData::default_dataset(44100.0));
        let mut panner = HrtfPanner::new(data, 64, 44100.0, 0.01);
        assert!(!panner.crossfading);
        panner.set_direction(90.0, 0.0);
        assert!(panner.crossfading);
    }
}
