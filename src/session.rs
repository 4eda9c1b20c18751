//! Caches a sparse kernel and analyzes a PCM buffer at one or many offsets,
//! reusing scratch buffers across calls to keep the hot loop allocation-free.

use crate::error::{ConstantQError, Result};
use crate::kernel::SparseKernel;
use crate::kernel_builder::build_sparse_kernel;
use crate::transform;
use log::debug;
use num_complex::Complex64;
use std::sync::Arc;

/// The two buffers a `Session` threads through every `analyze_snapshot` call
/// to avoid reallocating on the hot path.
struct Scratch {
    input: Vec<Complex64>,
    output: Vec<Complex64>,
}

impl Scratch {
    fn new(kernel: &SparseKernel) -> Self {
        Self {
            input: vec![Complex64::new(0.0, 0.0); kernel.fft_size()],
            output: vec![Complex64::new(0.0, 0.0); kernel.bins()],
        }
    }
}

/// A constant-Q analysis session: one cached kernel, read many times.
/// Thread-confined — create one `Session` per worker rather than sharing it.
pub struct Session {
    kernel: Arc<SparseKernel>,
    scratch: Scratch,
}

impl Session {
    /// Builds (and caches) a sparse kernel for the given parameters.
    pub fn new(fs: u32, fmin: f64, fmax: f64, bins_per_octave: u32, threshold: f64) -> Result<Self> {
        let kernel = build_sparse_kernel(fs, fmin, fmax, bins_per_octave, threshold)?;
        Ok(Self::from_kernel(Arc::new(kernel)))
    }

    /// Wraps an already-built kernel, e.g. one shared across workers.
    pub fn from_kernel(kernel: Arc<SparseKernel>) -> Self {
        let scratch = Scratch::new(&kernel);
        Self { kernel, scratch }
    }

    #[inline]
    pub fn bins(&self) -> usize {
        self.kernel.bins()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.kernel.fft_size()
    }

    #[inline]
    pub fn kernel(&self) -> &Arc<SparseKernel> {
        &self.kernel
    }

    /// Copies `data[start..start+len]` into the input scratch buffer, runs the
    /// transform, and returns the per-bin magnitudes.
    pub fn analyze_snapshot(&mut self, data: &[f64], start: usize, len: usize) -> Result<Vec<f64>> {
        if len < self.kernel.fft_size() {
            return Err(ConstantQError::PreconditionViolation(format!(
                "snapshot length {len} shorter than kernel fft_size {}",
                self.kernel.fft_size()
            )));
        }
        if start + len > data.len() {
            return Err(ConstantQError::PreconditionViolation(format!(
                "snapshot [{start}, {}) runs past data length {}",
                start + len,
                data.len()
            )));
        }

        for i in 0..len {
            self.scratch.input[i] = Complex64::new(data[start + i], 0.0);
        }

        transform::apply(&mut self.scratch.input, &self.kernel, &mut self.scratch.output);

        Ok(self.scratch.output[..self.kernel.bins()]
            .iter()
            .map(|c| c.norm())
            .collect())
    }

    /// Runs `total_analyses` snapshots at offsets `start_frame + i * frame_interval`.
    pub fn analyze(
        &mut self,
        data: &[f64],
        start_frame: usize,
        frame_interval: usize,
        total_analyses: usize,
    ) -> Result<Vec<Vec<f64>>> {
        if data.len() < start_frame + frame_interval * total_analyses {
            return Err(ConstantQError::PreconditionViolation(
                "data too short for requested analyze window".to_string(),
            ));
        }

        debug!(
            "analyze: start_frame={start_frame} frame_interval={frame_interval} \
             total_analyses={total_analyses} fft_size={}",
            self.kernel.fft_size()
        );

        let kernel_len = self.kernel.fft_size();
        let mut results = Vec::with_capacity(total_analyses);
        for i in 0..total_analyses {
            results.push(self.analyze_snapshot(data, start_frame + frame_interval * i, kernel_len)?);
        }
        Ok(results)
    }

    /// Same computation as [`Session::analyze`], but packed row-major into a
    /// single `Vec<f64>` with `values[i * bins + b]`.
    pub fn analyze_to_single(
        &mut self,
        data: &[f64],
        start_frame: usize,
        frame_interval: usize,
        total_analyses: usize,
    ) -> Result<Vec<f64>> {
        let kernel_len = self.kernel.fft_size();
        if total_analyses == 0 {
            return Ok(Vec::new());
        }
        let required = start_frame + kernel_len + frame_interval * (total_analyses - 1);
        if data.len() < required {
            return Err(ConstantQError::PreconditionViolation(format!(
                "data length {} shorter than required {required}",
                data.len()
            )));
        }

        debug!(
            "analyze_to_single: start_frame={start_frame} frame_interval={frame_interval} \
             total_analyses={total_analyses} bins={}",
            self.kernel.bins()
        );

        let bins = self.kernel.bins();
        let mut out = vec![0.0f64; total_analyses * bins];
        for i in 0..total_analyses {
            let snapshot = self.analyze_snapshot(data, start_frame + frame_interval * i, kernel_len)?;
            out[i * bins..(i + 1) * bins].copy_from_slice(&snapshot);
        }
        Ok(out)
    }
}
