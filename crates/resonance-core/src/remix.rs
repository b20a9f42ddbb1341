//! Channel remixing between the fixed layouts the kernel supports.
//!
//! Environment and effect-send channel counts are restricted to 1, 2, 4, 6,
//! or 8 channels. Remixing between two supported counts is expressed as a
//! dense matrix: `output[o] = sum_i matrix[o][i] * input[i]`.

/// Channel counts the kernel accepts for environment output and effect
/// sends.
pub const SUPPORTED_CHANNEL_COUNTS: [usize; 5] = [1, 2, 4, 6, 8];

/// `true` if `channels` is one of the supported layouts.
pub fn is_supported_channel_count(channels: usize) -> bool {
    SUPPORTED_CHANNEL_COUNTS.contains(&channels)
}

/// Build a row-major `[output_channels][input_channels]` remix matrix.
///
/// Rules, applied in order of specificity:
/// - Equal channel counts: identity.
/// - Mono input to any output: each output channel gets the full mono
///   signal (center-style broadcast), matching how a point source feeds a
///   multichannel panner bus.
/// - Any input to mono output: average all input channels.
/// - Otherwise: channel `i` of the smaller layout maps straight across to
///   channel `i` of the larger one; channels beyond the smaller layout's
///   count are silent on upmix, or folded into channel 0 on downmix via
///   equal-weight averaging of the remainder.
pub fn build_matrix(input_channels: usize, output_channels: usize) -> Vec<Vec<f32>> {
    let mut matrix = vec![vec![0.0f32; input_channels]; output_channels];

    if input_channels == output_channels {
        for i in 0..input_channels {
            matrix[i][i] = 1.0;
        }
        return matrix;
    }

    if input_channels == 1 {
        for row in &mut matrix {
            row[0] = 1.0;
        }
        return matrix;
    }

    if output_channels == 1 {
        let gain = 1.0 / input_channels as f32;
        for i in 0..input_channels {
            matrix[0][i] = gain;
        }
        return matrix;
    }

    let direct = input_channels.min(output_channels);
    for i in 0..direct {
        matrix[i][i] = 1.0;
    }
    if input_channels > output_channels {
        let remainder = input_channels - direct;
        if remainder > 0 {
            let gain = 1.0 / remainder as f32;
            for i in direct..input_channels {
                matrix[output_channels - 1][i] += gain;
            }
        }
    }
    matrix
}

/// Apply a remix matrix to one frame (`input.len() == input_channels`,
/// `output.len() == output_channels`).
pub fn apply_matrix(matrix: &[Vec<f32>], input: &[f32], output: &mut [f32]) {
    for (o, row) in matrix.iter().enumerate() {
        let mut acc = 0.0f32;
        for (i, &w) in row.iter().enumerate() {
            acc += w * input[i];
        }
        output[o] = acc;
    }
}

/// Remix an entire interleaved or per-channel-planar block at once.
/// `input` and `output` are slices of per-channel sample slices (planar).
pub fn remix_planar(matrix: &[Vec<f32>], input: &[&[f32]], output: &mut [Vec<f32>]) {
    let frames = input.first().map_or(0, |c| c.len());
    for frame in 0..frames {
        let in_frame: Vec<f32> = input.iter().map(|c| c[frame]).collect();
        let mut out_frame = vec![0.0f32; output.len()];
        apply_matrix(matrix, &in_frame, &mut out_frame);
        for (ch, v) in out_frame.into_iter().enumerate() {
            output[ch][frame] = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_matrix_passes_through() {
        let m = build_matrix(2, 2);
        let input = [0.3, -0.7];
        let mut output = [0.0; 2];
        apply_matrix(&m, &input, &mut output);
        assert_eq!(output, input);
    }

    #[test]
    fn mono_broadcasts_to_all_outputs() {
        let m = build_matrix(1, 4);
        let input = [0.5];
        let mut output = [0.0; 4];
        apply_matrix(&m, &input, &mut output);
        assert_eq!(output, [0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn downmix_to_mono_averages() {
        let m = build_matrix(4, 1);
        let input = [1.0, 1.0, 1.0, 1.0];
        let mut output = [0.0; 1];
        apply_matrix(&m, &input, &mut output);
        assert!((output[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn supported_channel_counts_reject_five() {
        assert!(!is_supported_channel_count(5));
        assert!(is_supported_channel_count(6));
    }
}
