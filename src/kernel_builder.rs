//! Constructs a [`SparseKernel`] from the five parameters of a constant-Q
//! analysis: sample rate, frequency range, bins per octave, and the magnitude
//! threshold below which a spectral coefficient is dropped.

use crate::error::{ConstantQError, Result};
use crate::kernel::{KernelEntry, SparseKernel};
use crate::math::{euler, fft, hamming, next_pow2_exp};
use log::{debug, info};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Builds the sparse kernel for `(fs, fmin, fmax, bins_per_octave, threshold)`.
///
/// The kernel is a pure function of its inputs: rebuilding with identical
/// parameters always yields identical rows. See `SPEC_FULL.md` §4.3 for the
/// per-bin atom construction this follows statement-for-statement.
pub fn build_sparse_kernel(
    fs: u32,
    fmin: f64,
    fmax: f64,
    bins_per_octave: u32,
    threshold: f64,
) -> Result<SparseKernel> {
    if fmin <= 0.0 {
        return Err(ConstantQError::NumericOutOfRange(format!(
            "fmin must be positive, got {fmin}"
        )));
    }
    if fmax <= fmin {
        return Err(ConstantQError::NumericOutOfRange(format!(
            "fmax ({fmax}) must exceed fmin ({fmin})"
        )));
    }
    if bins_per_octave == 0 {
        return Err(ConstantQError::NumericOutOfRange(
            "bins_per_octave must be at least 1".to_string(),
        ));
    }

    let bpo = bins_per_octave as f64;
    let q = 1.0 / (2f64.powf(1.0 / bpo) - 1.0);
    let k = (bpo * (fmax / fmin).log2()).ceil() as i64;

    if k <= 0 {
        return Err(ConstantQError::NumericOutOfRange(format!(
            "computed bin count {k} is not positive"
        )));
    }
    let bins = k as usize;

    let fft_len_exp = next_pow2_exp((q * fs as f64 / fmin).ceil());
    let fft_size = 1usize << fft_len_exp;

    info!(
        "building sparse kernel: fs={fs} fmin={fmin} fmax={fmax} bpo={bins_per_octave} \
         thresh={threshold} -> Q={q:.6} bins={bins} fft_size={fft_size}"
    );

    let mut rows: Vec<Vec<KernelEntry>> = vec![Vec::new(); bins];
    let mut scratch = vec![Complex64::new(0.0, 0.0); fft_size];

    for k_idx in (1..=bins).rev() {
        let len = ((q * fs as f64) / (fmin * 2f64.powf((k_idx - 1) as f64 / bpo))).ceil() as usize;

        debug_assert!(
            len <= fft_size,
            "atom length {len} exceeds fft size {fft_size} for bin {k_idx}"
        );

        let window = hamming(len);
        for j in 0..len {
            let exp_multiplier = 2.0 * PI * q * j as f64 / len as f64;
            let eulers = euler(exp_multiplier);
            let hamming_multiplier = window[j] / len as f64;
            scratch[j] = hamming_multiplier * eulers;
        }
        for cell in scratch.iter_mut().skip(len) {
            *cell = Complex64::new(0.0, 0.0);
        }

        fft(&mut scratch, fft_size);

        let mut row = Vec::new();
        for (m, value) in scratch.iter().enumerate() {
            if value.norm() > threshold {
                row.push(KernelEntry::new(m, value.conj() / fft_size as f64));
            }
        }

        debug!(
            "bin {} (row {}): atom length {} -> {} sparse entries",
            k_idx,
            k_idx - 1,
            len,
            row.len()
        );

        rows[k_idx - 1] = row;
    }

    Ok(SparseKernel::new(rows, fft_size, bins))
}
