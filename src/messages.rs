//! Wire-format message types exchanged between the orchestrator and its
//! workers (§6 of the spec). Field order and types match the byte layout
//! exactly, so `bincode::serialize` reproduces it bit-for-bit; in-process
//! dispatch passes these structs directly over `crossbeam_channel` without a
//! serialization round trip.

use serde::{Deserialize, Serialize};

/// Orchestrator -> worker: build a kernel once and cache it. 32 bytes packed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KernelInitMsg {
    pub fs: i32,
    pub fmin: f64,
    pub fmax: f64,
    pub bins: i32,
    pub thresh: f64,
}

/// Worker -> orchestrator: the kernel is ready. 8 bytes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KernelReadyMsg {
    pub fft_size: i32,
    pub bins: i32,
}

/// Orchestrator -> worker: analyze one shard. The header precedes
/// `(total_samples - 1) * frame_interval + fft_size` contiguous f64 samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeShardMsg {
    pub start_frame: i32,
    pub frame_interval: i32,
    pub total_samples: i32,
    pub sample_start: i32,
    pub audio: Vec<f64>,
}

/// Worker -> orchestrator: one shard's packed magnitude block, row-major with
/// bin as the fast axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeShardReply {
    pub bins: i32,
    pub total_samples: i32,
    pub sample_start: i32,
    pub values: Vec<f64>,
}

/// Status codes delivered to the status sink (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// Kernel construction has started.
    SparseKernelStart,
    /// Kernel construction finished; payload is the total analyzable frames.
    SparseKernelComplete,
    /// One shard's results were just delivered; payload is frames in the block.
    ConstantqItem,
}

impl StatusCode {
    pub fn code(self) -> i32 {
        match self {
            StatusCode::SparseKernelStart => 0,
            StatusCode::SparseKernelComplete => 1,
            StatusCode::ConstantqItem => 2,
        }
    }
}
