//! Distance-attenuation models.
//!
//! `Delegate` is never evaluated directly — the environment resolves it to
//! `Linear` before building the per-block snapshot sources read (see
//! `EnvironmentNode::will_tick`).

/// Distance model discriminant, mirroring the `distance_model`/
/// `panning_strategy` "Delegate" resolution pattern in
/// [`crate::environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum DistanceModel {
    /// Resolved by the environment to `Linear` before reaching a source.
    Delegate = 0,
    /// `1 - d'/max_distance`.
    Linear = 1,
    /// `1/d'`.
    Exponential = 2,
    /// `1/d'^2`.
    InverseSquare = 3,
}

impl DistanceModel {
    /// Maps a raw `distance_model` property value to a model, defaulting to
    /// `Delegate` for anything out of range.
    pub fn from_i64(v: i64) -> Self {
        match v {
            1 => DistanceModel::Linear,
            2 => DistanceModel::Exponential,
            3 => DistanceModel::InverseSquare,
            _ => DistanceModel::Delegate,
        }
    }

    /// The raw `i64` property value for this model.
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

/// Floor applied to `d'` before it hits a reciprocal model's denominator, to
/// keep a source passing directly through the listener from producing an
/// infinite or NaN gain. Inaudible in practice: `0.01` world units is far
/// smaller than any source's `size`/`max_distance` would realistically be
/// set to.
const MIN_RECIPROCAL_DISTANCE: f32 = 0.01;

/// Computes the dry-gain multiplier for a source `distance` world units
/// from the listener, with `max_distance` as the model's falloff horizon
/// and `size` as the source's physical radius (gain is computed from
/// `d' = max(0, distance - size)`, not raw `distance`, so a large source
/// doesn't start attenuating until the listener is outside it).
///
/// `model` must already be resolved (not `Delegate`) — see
/// [`DistanceModel::from_i64`] and the environment's per-block resolution.
pub fn model_gain(model: DistanceModel, distance: f32, max_distance: f32, size: f32) -> f32 {
    let d_prime = (distance - size).max(0.0);
    if d_prime > max_distance {
        return 0.0;
    }
    let gain = match model {
        DistanceModel::Linear => {
            if max_distance <= 0.0 {
                0.0
            } else {
                1.0 - d_prime / max_distance
            }
        }
        DistanceModel::Exponential => 1.0 / d_prime.max(MIN_RECIPROCAL_DISTANCE),
        DistanceModel::InverseSquare => {
            let d = d_prime.max(MIN_RECIPROCAL_DISTANCE);
            1.0 / (d * d)
        }
        DistanceModel::Delegate => 1.0,
    };
    gain.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_model_reaches_zero_at_max_distance() {
        let g = model_gain(DistanceModel::Linear, 100.0, 100.0, 0.0);
        assert!(g.abs() < 1e-5);
    }

    #[test]
    fn linear_model_is_unity_at_zero_distance() {
        let g = model_gain(DistanceModel::Linear, 0.0, 100.0, 0.0);
        assert!((g - 1.0).abs() < 1e-5);
    }

    #[test]
    fn beyond_max_distance_is_zero_for_every_model() {
        for model in [DistanceModel::Linear, DistanceModel::Exponential, DistanceModel::InverseSquare] {
            assert_eq!(model_gain(model, 1000.0, 100.0, 0.0), 0.0);
        }
    }

    #[test]
    fn size_shifts_the_falloff_origin() {
        let with_size = model_gain(DistanceModel::Linear, 10.0, 100.0, 10.0);
        let without_size = model_gain(DistanceModel::Linear, 10.0, 100.0, 0.0);
        assert!(with_size > without_size);
    }

    #[test]
    fn inverse_square_never_produces_nan_or_inf_at_zero_distance() {
        let g = model_gain(DistanceModel::InverseSquare, 0.0, 100.0, 0.0);
        assert!(g.is_finite());
    }
}
