//! The sparse kernel value types: one non-zero cell (`KernelEntry`) and the
//! full per-bin matrix of them (`SparseKernel`).

use num_complex::Complex64;
use std::fmt;

/// One non-zero cell of the sparse kernel: an FFT bin index and the complex
/// multiplier to apply to that bin's value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelEntry {
    fft_index: usize,
    multiplier: Complex64,
}

impl KernelEntry {
    pub fn new(fft_index: usize, multiplier: Complex64) -> Self {
        Self {
            fft_index,
            multiplier,
        }
    }

    #[inline]
    pub fn fft_index(&self) -> usize {
        self.fft_index
    }

    #[inline]
    pub fn multiplier(&self) -> Complex64 {
        self.multiplier
    }
}

impl fmt::Display for KernelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ Index: {}, Multiplier: {} + {}i }}",
            self.fft_index, self.multiplier.re, self.multiplier.im
        )
    }
}

/// The sparse spectral kernel: one row of [`KernelEntry`] per output bin, plus
/// the FFT window length the rows were built against.
///
/// Rows are ordered by ascending `fft_index` within each row (the builder
/// emits them that way naturally); bin `0` is the lowest frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseKernel {
    rows: Vec<Vec<KernelEntry>>,
    fft_size: usize,
    bins: usize,
}

impl SparseKernel {
    pub fn new(rows: Vec<Vec<KernelEntry>>, fft_size: usize, bins: usize) -> Self {
        debug_assert_eq!(rows.len(), bins, "one row per output bin");
        debug_assert!(fft_size.is_power_of_two(), "fft_size must be a power of two");
        Self {
            rows,
            fft_size,
            bins,
        }
    }

    #[inline]
    pub fn rows(&self) -> &[Vec<KernelEntry>] {
        &self.rows
    }

    #[inline]
    pub fn row(&self, bin: usize) -> &[KernelEntry] {
        &self.rows[bin]
    }

    #[inline]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    #[inline]
    pub fn bins(&self) -> usize {
        self.bins
    }
}

impl fmt::Display for SparseKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SparseKernel {{ size: {}, bins: {}, matrix: [", self.fft_size, self.bins)?;
        for (r, row) in self.rows.iter().enumerate() {
            if r != 0 {
                write!(f, ",")?;
            }
            write!(f, "  [")?;
            for (e, entry) in row.iter().enumerate() {
                if e != 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{entry}")?;
            }
            write!(f, "]")?;
        }
        write!(f, "] }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_entry_shape() {
        let entry = KernelEntry::new(3, Complex64::new(0.5, -0.25));
        assert_eq!(entry.to_string(), "{ Index: 3, Multiplier: 0.5 + -0.25i }");
    }

    #[test]
    fn accessors_round_trip() {
        let rows = vec![vec![KernelEntry::new(0, Complex64::new(1.0, 0.0))]];
        let kernel = SparseKernel::new(rows, 4, 1);
        assert_eq!(kernel.bins(), 1);
        assert_eq!(kernel.fft_size(), 4);
        assert_eq!(kernel.row(0).len(), 1);
    }
}
