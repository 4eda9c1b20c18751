//! Bit-twiddling, windowing, and the radix-2 FFT the whole kernel sits on.
//!
//! Every formula here is preserved bit-for-bit from the reference implementation;
//! see `DESIGN.md` for why `next_pow2_exp` looks redundant but isn't touched.

use num_complex::Complex64;
use std::f64::consts::PI;

/// Number of leading zero bits in a 32-bit integer. `0` has all 32 bits zero.
#[inline]
pub fn leading_zeros(x: u32) -> u32 {
    x.leading_zeros()
}

/// Full 32-bit bit reversal of `x`.
#[inline]
pub fn bit_reverse(x: u32) -> u32 {
    x.reverse_bits()
}

/// `floor(ceil(log2(floor(n))))`, preserved exactly as in the reference paper's
/// implementation. Do not simplify: see `DESIGN.md` "Open Question decisions".
pub fn next_pow2_exp(n: f64) -> i32 {
    n.floor().log2().ceil().floor() as i32
}

/// Hamming window of length `len`. `hamming(1) == [1+0i]`.
pub fn hamming(len: usize) -> Vec<Complex64> {
    if len == 1 {
        return vec![Complex64::new(1.0, 0.0)];
    }

    let n = (len - 1) as f64;
    (0..len)
        .map(|i| {
            let w = 0.54 - 0.46 * (2.0 * PI * i as f64 / n).cos();
            Complex64::new(w, 0.0)
        })
        .collect()
}

/// `e^{i*theta}` via Euler's formula.
#[inline]
pub fn euler(theta: f64) -> Complex64 {
    Complex64::new(theta.cos(), theta.sin())
}

/// In-place radix-2 decimation-in-time FFT of the first `n` elements of `x`.
///
/// `n` must be a power of two and `x.len() >= n`. Output is the unnormalized
/// forward DFT with the `e^{-2*pi*i*k/L}` twiddle convention — callers must not
/// apply any additional `1/n` scaling themselves.
pub fn fft(x: &mut [Complex64], n: usize) {
    assert!(x.len() >= n, "fft: buffer shorter than transform length");
    assert!(
        n.is_power_of_two(),
        "fft: transform length {n} is not a power of two"
    );

    if n <= 1 {
        return;
    }

    // Bit-reversal permutation: reverse the full 32-bit index, then shift the
    // irrelevant low bits off so only log2(n) bits of the reversal remain.
    let shift = 1 + leading_zeros(n as u32);
    for k in 0..n {
        let j = (bit_reverse(k as u32) >> shift) as usize;
        if j > k {
            x.swap(j, k);
        }
    }

    // Butterfly updates, stage length doubling each round.
    let mut length = 2;
    while length <= n {
        let half = length / 2;
        for k in 0..half {
            let kth = -2.0 * k as f64 * PI / length as f64;
            let w = euler(kth);
            let mut j = 0;
            while j < n / length {
                let top = j * length + k;
                let bottom = top + half;
                let tao = w * x[bottom];
                x[bottom] = x[top] - tao;
                x[top] = x[top] + tao;
                j += 1;
            }
        }
        length *= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn leading_zeros_matches_reference_vectors() {
        assert_eq!(leading_zeros(0x00F00000), 8);
        assert_eq!(leading_zeros(0x70F00000), 1);
        assert_eq!(leading_zeros(0x000000F0), 24);
        assert_eq!(leading_zeros(0x00000001), 31);
        assert_eq!(leading_zeros(0x00000000), 32);
        assert_eq!(leading_zeros(0xF0F0F0F0), 0);
    }

    #[test]
    fn bit_reverse_is_involution() {
        for x in [0u32, 1, 0x00F00000, 0xFFFFFFFF, 0x12345678] {
            assert_eq!(bit_reverse(bit_reverse(x)), x);
        }
    }

    #[test]
    fn bit_reverse_matches_reference_vectors() {
        assert_eq!(bit_reverse(0x00000001), 0x80000000);
        assert_eq!(bit_reverse(0xFFFFFFFF), 0xFFFFFFFF);
        assert_eq!(bit_reverse(0x00000000), 0x00000000);
        assert_eq!(bit_reverse(0x00F00000), 0x00000F00);
    }

    #[test]
    fn next_pow2_exp_matches_reference_vectors() {
        assert_eq!(next_pow2_exp(15.0), 4);
        assert_eq!(next_pow2_exp(16.0), 4);
        assert_eq!(next_pow2_exp(17.0), 5);
        assert_eq!(next_pow2_exp(2.0), 1);
    }

    #[test]
    fn hamming_single_sample_is_one() {
        let w = hamming(1);
        assert_eq!(w.len(), 1);
        assert_relative_eq!(w[0].re, 1.0);
        assert_relative_eq!(w[0].im, 0.0);
    }

    #[test]
    fn hamming_is_symmetric() {
        let w = hamming(12);
        for n in 0..12 {
            assert_relative_eq!(w[n].re, w[11 - n].re, epsilon = 1e-12);
        }
    }

    #[test]
    fn hamming_matches_reference_vector() {
        let expected = [
            0.08, 0.15302337, 0.34890909, 0.60546483, 0.84123594, 0.98136677, 0.98136677,
            0.84123594, 0.60546483, 0.34890909, 0.15302337, 0.08,
        ];
        let w = hamming(12);
        for (got, want) in w.iter().zip(expected.iter()) {
            assert_relative_eq!(got.re, *want, epsilon = 1e-8);
        }
    }

    fn generate_sin(size: usize, freq: usize) -> Vec<Complex64> {
        (0..size)
            .map(|x| {
                let v = 10.0 * (PI * x as f64 * 2.0 * freq as f64 / size as f64).sin();
                Complex64::new(v, 0.0)
            })
            .collect()
    }

    fn argmax_magnitude(x: &[Complex64]) -> usize {
        x.iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().partial_cmp(&b.1.norm()).unwrap())
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn fft_single_tone_peaks_at_its_bin() {
        for freq in [1usize, 2, 4, 8] {
            let mut samples = generate_sin(32, freq);
            fft(&mut samples, 32);
            assert_eq!(argmax_magnitude(&samples), freq);
        }
    }

    #[test]
    fn fft_round_trips_via_conjugate_scale() {
        let n = 256usize;
        let original: Vec<Complex64> = (0..n)
            .map(|i| Complex64::new((i as f64 * 0.037).sin(), (i as f64 * 0.021).cos()))
            .collect();

        let mut buf = original.clone();
        fft(&mut buf, n);
        for v in buf.iter_mut() {
            *v = v.conj();
        }
        fft(&mut buf, n);
        for v in buf.iter_mut() {
            *v = v.conj() / n as f64;
        }

        for (got, want) in buf.iter().zip(original.iter()) {
            assert_relative_eq!(got.re, want.re, epsilon = 1e-10);
            assert_relative_eq!(got.im, want.im, epsilon = 1e-10);
        }
    }

    #[test]
    fn fft_is_linear() {
        let n = 64usize;
        let a: Vec<Complex64> = (0..n).map(|i| Complex64::new(i as f64, 0.0)).collect();
        let b: Vec<Complex64> = (0..n).map(|i| Complex64::new((n - i) as f64, 0.0)).collect();

        let combined: Vec<Complex64> = a.iter().zip(b.iter()).map(|(x, y)| x + y).collect();

        let mut fa = a.clone();
        let mut fb = b.clone();
        let mut fc = combined.clone();
        fft(&mut fa, n);
        fft(&mut fb, n);
        fft(&mut fc, n);

        for i in 0..n {
            assert_relative_eq!(fc[i].re, fa[i].re + fb[i].re, epsilon = 1e-8);
            assert_relative_eq!(fc[i].im, fa[i].im + fb[i].im, epsilon = 1e-8);
        }
    }
}
