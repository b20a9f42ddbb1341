//! HRTF dataset representation and lookup.
//!
//! A minimal binary format: a flat table of impulse responses indexed by
//! `(azimuth, elevation)`, sampled on a regular grid. Real datasets (e.g.
//! MIT KEMAR) would be converted offline into this layout; one small
//! synthetic default dataset is embedded for use when no external dataset is
//! configured.

/// One measured (or synthesized) stereo impulse response at a given angle.
#[derive(Debug, Clone)]
pub struct HrtfMeasurement {
    /// Azimuth in degrees, `0` = front, increasing counter-clockwise.
    pub azimuth: f32,
    /// Elevation in degrees, `0` = ear level, clamped to `[-90, 90]`.
    pub elevation: f32,
    /// Left-ear impulse response.
    pub left: Vec<f32>,
    /// Right-ear impulse response.
    pub right: Vec<f32>,
}

/// A grid of HRTF measurements plus nearest/bilinear lookup.
#[derive(Debug, Clone)]
pub struct HrtfData {
    sample_rate: f32,
    measurements: Vec<HrtfMeasurement>,
}

impl HrtfData {
    /// Build a dataset from a flat list of measurements. All impulse
    /// responses are assumed to share a common length; callers that load
    /// heterogeneous data should pad externally.
    pub fn new(sample_rate: f32, measurements: Vec<HrtfMeasurement>) -> Self {
        Self {
            sample_rate,
            measurements,
        }
    }

    /// Sample rate the impulse responses were captured at.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Length in samples of each impulse response, or 0 if empty.
    pub fn response_len(&self) -> usize {
        self.measurements.first().map_or(0, |m| m.left.len())
    }

    /// Find the nearest measurement to `(azimuth, elevation)` by angular
    /// distance on the grid (not true great-circle distance, adequate for a
    /// regular grid).
    pub fn nearest(&self, azimuth: f32, elevation: f32) -> Option<&HrtfMeasurement> {
        self.measurements.iter().min_by(|a, b| {
            let da = angular_dist(a.azimuth, a.elevation, azimuth, elevation);
            let db = angular_dist(b.azimuth, b.elevation, azimuth, elevation);
            da.partial_cmp(&db).unwrap_or(core::cmp::Ordering::Equal)
        })
    }

    /// Bilinear-interpolated impulse response at `(azimuth, elevation)`,
    /// blending the four nearest grid points by angular weight. Falls back
    /// to [`Self::nearest`] if fewer than 4 measurements exist.
    pub fn interpolated(&self, azimuth: f32, elevation: f32) -> Option<(Vec<f32>, Vec<f32>)> {
        if self.measurements.len() < 4 {
            return self
                .nearest(azimuth, elevation)
                .map(|m| (m.left.clone(), m.right.clone()));
        }
        let mut ranked: Vec<(&HrtfMeasurement, f32)> = self
            .measurements
            .iter()
            .map(|m| (m, angular_dist(m.azimuth, m.elevation, azimuth, elevation)))
            .collect();
        ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(core::cmp::Ordering::Equal));
        let nearest4 = &ranked[..4];
        let response_len = nearest4[0].0.left.len();
        let weights: Vec<f32> = nearest4
            .iter()
            .map(|(_, d)| 1.0 / (d + 1e-3))
            .collect();
        let weight_sum: f32 = weights.iter().sum();
        let mut left = vec![0.0f32; response_len];
        let mut right = vec![0.0f32; response_len];
        for ((m, _), w) in nearest4.iter().zip(weights.iter()) {
            let w = w / weight_sum;
            for i in 0..response_len {
                left[i] += m.left[i] * w;
                right[i] += m.right[i] * w;
            }
        }
        Some((left, right))
    }

    /// Number of measurements in the dataset.
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    /// `true` if the dataset has no measurements.
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// A small synthetic default dataset: a ring of 8 azimuths at 0
    /// elevation, each an attenuated, slightly delayed ipsilateral/contralateral
    /// pair approximating interaural level and time difference. Not a
    /// substitute for a measured dataset, but enough to exercise the panning
    /// pipeline without external data.
    pub fn default_dataset(sample_rate: f32) -> Self {
        let mut measurements = Vec::new();
        for step in 0..8 {
            let azimuth = step as f32 * 45.0;
            let rad = azimuth.to_radians();
            // Simple ILD/ITD model: left ear leads when the source is to the
            // left (negative sin), right ear leads when to the right.
            let pan = rad.sin();
            let left_gain = (1.0 - pan).clamp(0.0, 1.0) * 0.5 + 0.5;
            let right_gain = (1.0 + pan).clamp(0.0, 1.0) * 0.5 + 0.5;
            let itd_samples = (pan * 0.0006 * sample_rate).round() as isize;
            let len = 32;
            let mut left = vec![0.0f32; len];
            let mut right = vec![0.0f32; len];
            let left_delay = (-itd_samples).max(0) as usize;
            let right_delay = itd_samples.max(0) as usize;
            if left_delay < len {
                left[left_delay] = left_gain;
            }
            if right_delay < len {
                right[right_delay] = right_gain;
            }
            measurements.push(HrtfMeasurement {
                azimuth,
                elevation: 0.0,
                left,
                right,
            });
        }
        Self::new(sample_rate, measurements)
    }
}

fn angular_dist(az1: f32, el1: f32, az2: f32, el2: f32) -> f32 {
    let daz = wrap_degrees(az1 - az2);
    let del = el1 - el2;
    (daz * daz + del * del).sqrt()
}

fn wrap_degrees(mut d: f32) -> f32 {
    while d > 180.0 {
        d -= 360.0;
    }
    while d < -180.0 {
        d += 360.0;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_finds_exact_match() {
        let data = HrtfData::default_dataset(44100.0);
        let m = data.nearest(90.0, 0.0).unwrap();
        assert!((m.azimuth - 90.0).abs() < 1e-3);
    }

    #[test]
    fn interpolated_blends_when_off_grid() {
        let data = HrtfData::default_dataset(44100.0);
        let (left, right) = data.interpolated(22.5, 0.0).unwrap();
        assert_eq!(left.len(), right.len());
        assert!(left.iter().any(|&x| x != 0.0));
    }

    #[test]
    fn default_dataset_is_nonempty() {
        let data = HrtfData::default_dataset(48000.0);
        assert!(!data.is_empty());
        assert_eq!(data.len(), 8);
    }
}
