//! Block and FFT convolution engines.
//!
//! [`BlockConvolver`] is direct time-domain convolution with history
//! carryover between calls. [`FftConvolver`] is overlap-add convolution via
//! an FFT, used where the impulse response is long enough that direct
//! convolution would be too slow (HRTF filtering, reverb).

use rustfft::{Fft as RustFft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

/// Direct-form time-domain convolution with history carryover.
///
/// Suited to short responses (tens to low hundreds of taps); for anything
/// longer, prefer [`FftConvolver`].
pub struct BlockConvolver {
    block_size: usize,
    response: Vec<f32>,
    history: Vec<f32>,
}

impl BlockConvolver {
    /// Create a convolver that will process blocks of `block_size` samples.
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            response: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Set the impulse response. If the length differs from the previous
    /// response, history is zeroed (the old tail no longer corresponds to a
    /// meaningful filter state).
    pub fn set_response(&mut self, response: &[f32]) {
        let len_changed = response.len() != self.response.len();
        self.response = response.to_vec();
        if len_changed {
            self.history = vec![0.0; self.response.len().saturating_sub(1)];
        } else if self.history.len() != self.response.len().saturating_sub(1) {
            self.history = vec![0.0; self.response.len().saturating_sub(1)];
        }
    }

    /// Convolve one block of input, writing `block_size` samples to `output`.
    pub fn convolve(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), self.block_size);
        debug_assert_eq!(output.len(), self.block_size);
        if self.response.is_empty() {
            output.fill(0.0);
            self.append_history(input);
            return;
        }
        let hist_len = self.history.len();
        // extended[i] is the sample `hist_len - i` positions before the
        // current block for i < hist_len, and input otherwise.
        for (n, out) in output.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (k, &h) in self.response.iter().enumerate() {
                if k <= n {
                    acc += h * input[n - k];
                } else {
                    let hist_idx = hist_len as isize - (k as isize - n as isize);
                    if hist_idx >= 0 {
                        acc += h * self.history[hist_idx as usize];
                    }
                }
            }
            *out = acc;
        }
        self.append_history(input);
    }

    fn append_history(&mut self, input: &[f32]) {
        let hist_len = self.history.len();
        if hist_len == 0 {
            return;
        }
        if input.len() >= hist_len {
            self.history.copy_from_slice(&input[input.len() - hist_len..]);
        } else {
            self.history.rotate_left(input.len());
            let start = hist_len - input.len();
            self.history[start..].copy_from_slice(input);
        }
    }

    /// Clear history without changing the response.
    pub fn reset(&mut self) {
        self.history.iter_mut().for_each(|h| *h = 0.0);
    }
}

fn next_pow2(n: usize) -> usize {
    n.next_power_of_two()
}

/// Overlap-add FFT convolution.
///
/// `fft_size = next_pow2(2 * block_size)`, `tail_size = fft_size - block_size`.
pub struct FftConvolver {
    block_size: usize,
    fft_size: usize,
    tail: Vec<f32>,
    fft: Arc<dyn RustFft<f32>>,
    ifft: Arc<dyn RustFft<f32>>,
    response_fft: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl FftConvolver {
    /// Create a convolver for blocks of `block_size` samples.
    pub fn new(block_size: usize) -> Self {
        let fft_size = next_pow2(2 * block_size.max(1));
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let ifft = planner.plan_fft_inverse(fft_size);
        Self {
            block_size,
            fft_size,
            tail: vec![0.0; fft_size - block_size],
            fft,
            ifft,
            response_fft: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    /// The zero-padded length the FFT operates on.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Set the impulse response, zero-padding to `fft_size` if shorter.
    /// Responses longer than `fft_size` are truncated (this engine is meant
    /// for per-block overlap-add with a response length on the order of one
    /// block; longer responses need partitioned convolution, out of scope).
    pub fn set_response(&mut self, response: &[f32]) {
        let mut padded: Vec<Complex<f32>> = response
            .iter()
            .take(self.fft_size)
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        padded.resize(self.fft_size, Complex::new(0.0, 0.0));
        self.fft.process(&mut padded);
        self.response_fft = padded;
    }

    /// Convolve one block, writing `block_size` samples to `output`.
    pub fn convolve(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), self.block_size);
        debug_assert_eq!(output.len(), self.block_size);
        let fft = self.get_fft(input).clone();
        self.convolve_fft(&fft, output);
    }

    /// Convolve with a precomputed FFT of the input block (zero-padded to
    /// [`Self::fft_size`]), as produced by [`Self::get_fft`].
    pub fn convolve_fft(&mut self, input_fft: &[Complex<f32>], output: &mut [f32]) {
        debug_assert_eq!(output.len(), self.block_size);
        for (i, s) in self.scratch.iter_mut().enumerate() {
            *s = input_fft[i] * self.response_fft[i];
        }
        self.ifft.process(&mut self.scratch);
        let scale = 1.0 / self.fft_size as f32;
        for (n, out) in output.iter_mut().enumerate() {
            let mut v = self.scratch[n].re * scale;
            if n < self.tail.len() {
                v += self.tail[n];
            }
            *out = v;
        }
        let tail_len = self.tail.len();
        for (i, t) in self.tail.iter_mut().enumerate() {
            let idx = self.block_size + i;
            *t = if idx < self.fft_size {
                self.scratch[idx].re * scale
            } else {
                0.0
            };
        }
        let _ = tail_len;
    }

    /// Compute (and cache) the zero-padded FFT of `input`, valid until the
    /// next call to [`Self::get_fft`] or [`Self::convolve`].
    pub fn get_fft(&mut self, input: &[f32]) -> &[Complex<f32>] {
        debug_assert_eq!(input.len(), self.block_size);
        for (i, s) in self.scratch.iter_mut().enumerate() {
            *s = if i < input.len() {
                Complex::new(input[i], 0.0)
            } else {
                Complex::new(0.0, 0.0)
            };
        }
        self.fft.process(&mut self.scratch);
        &self.scratch
    }

    /// Clear the overlap-add tail.
    pub fn reset(&mut self) {
        self.tail.iter_mut().for_each(|t| *t = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_convolver_passes_impulse_response() {
        let mut conv = BlockConvolver::new(4);
        conv.set_response(&[0.0, 1.0, 0.0]);
        let mut out = [0.0; 4];
        conv.convolve(&[1.0, 0.0, 0.0, 0.0], &mut out);
        assert!((out[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn block_and_fft_convolver_agree_on_short_response() {
        let block_size = 32;
        let response: Vec<f32> = (0..8).map(|i| 1.0 / (i as f32 + 1.0)).collect();
        let input: Vec<f32> = (0..block_size)
            .map(|i| (i as f32 * 0.3).sin())
            .collect();

        let mut block_conv = BlockConvolver::new(block_size);
        block_conv.set_response(&response);
        let mut block_out = vec![0.0; block_size];
        block_conv.convolve(&input, &mut block_out);

        let mut fft_conv = FftConvolver::new(block_size);
        fft_conv.set_response(&response);
        let mut fft_out = vec![0.0; block_size];
        fft_conv.convolve(&input, &mut fft_out);

        for (a, b) in block_out.iter().zip(fft_out.iter()) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
    }

    #[test]
    fn fft_convolver_fft_size_is_pow2_of_double_block() {
        let conv = FftConvolver::new(100);
        assert_eq!(conv.fft_size(), 256);
    }
}
