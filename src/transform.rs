//! Applies a [`SparseKernel`] to a single prepared input window: one FFT
//! followed by a sparse dot-product per output bin.

use crate::kernel::SparseKernel;
use crate::math::fft;
use num_complex::Complex64;

/// FFTs `input` in place at `kernel.fft_size()`, then fills `output[0..kernel.bins()]`
/// with the per-bin sparse dot-products. The kernel's multipliers already embed
/// conjugation and `1/N` normalization — no further scaling is applied here.
///
/// `input.len()` must be at least `kernel.fft_size()`; `output.len()` must be
/// at least `kernel.bins()`.
pub fn apply(input: &mut [Complex64], kernel: &SparseKernel, output: &mut [Complex64]) {
    assert!(
        input.len() >= kernel.fft_size(),
        "input buffer shorter than kernel fft_size"
    );
    assert!(
        output.len() >= kernel.bins(),
        "output buffer shorter than kernel bin count"
    );

    fft(input, kernel.fft_size());

    for (bin, row) in kernel.rows().iter().enumerate() {
        let mut total = Complex64::new(0.0, 0.0);
        for entry in row {
            total += input[entry.fft_index()] * entry.multiplier();
        }
        output[bin] = total;
    }
}
