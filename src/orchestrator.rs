//! Shards a long signal across N parallel workers, dispatches kernel-init and
//! per-shard analyze jobs, and aggregates the results back through the status
//! and data sinks.
//!
//! Workers are native threads bounded by a `rayon::scope`, matching the
//! teacher's own `rayon` dependency; messages travel over `crossbeam_channel`
//! using the structs in `messages.rs`. The kernel-init worker is handed a
//! `KernelInitMsg` built from the run's config and replies with a
//! `KernelReadyMsg` (fft_size, bins) alongside the `Arc<SparseKernel>` it
//! built, which every shard worker's `Session` then shares by reference so no
//! worker rebuilds the kernel.

use crate::error::{ConstantQError, Result};
use crate::kernel_builder::build_sparse_kernel;
use crate::messages::{AnalyzeShardMsg, AnalyzeShardReply, KernelInitMsg, KernelReadyMsg, StatusCode};
use crate::session::Session;
use crate::sinks::{DataSink, StatusSink};
use crossbeam_channel::bounded;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation: flip this to stop delivering further shard
/// results. In-flight shard computation still runs to completion; only
/// delivery to the sinks (and further dispatch) is suppressed.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The parameters of one end-to-end orchestrated analysis run.
pub struct OrchestratorConfig {
    pub fs: u32,
    pub fmin: f64,
    pub fmax: f64,
    pub bins_per_octave: u32,
    pub threshold: f64,
    pub frame_interval: usize,
    pub worker_count: usize,
}

/// Computes the shard boundaries `[start_w, end_w)` for `worker_count` shards
/// over `[0, sample_num)` frames. The `ceil` partition guarantees every frame
/// is covered exactly once, with the last shard absorbing any rounding.
pub fn shard_bounds(sample_num: usize, worker_count: usize) -> Vec<(usize, usize)> {
    if worker_count == 0 || sample_num == 0 {
        return Vec::new();
    }
    let mut bounds = Vec::with_capacity(worker_count);
    let mut start = 0usize;
    for w in 0..worker_count {
        let end = (((w + 1) as f64 / worker_count as f64) * sample_num as f64).ceil() as usize;
        let end = end.min(sample_num);
        if end > start {
            bounds.push((start, end));
        }
        start = end;
    }
    bounds
}

/// Drives one full analysis run: builds the kernel, shards the signal across
/// `config.worker_count` workers, and forwards every computed cell to
/// `data_sink` while narrating progress through `status_sink`. Returns the
/// [`KernelReadyMsg`] the kernel-init worker replied with, so a caller can
/// recover the true bin count (as opposed to `bins_per_octave`).
pub fn run(
    config: &OrchestratorConfig,
    audio: &[f64],
    mut status_sink: impl StatusSink,
    mut data_sink: impl DataSink,
    cancel: &CancelToken,
) -> Result<KernelReadyMsg> {
    status_sink.status_update(StatusCode::SparseKernelStart, 0);
    info!("orchestrator: starting sparse kernel build");

    // Step 2: one worker builds the kernel once, replying with a KernelReadyMsg
    // alongside the Arc<SparseKernel> shard workers need for dispatch.
    let init_msg = KernelInitMsg {
        fs: config.fs as i32,
        fmin: config.fmin,
        fmax: config.fmax,
        bins: config.bins_per_octave as i32,
        thresh: config.threshold,
    };

    let (kernel_tx, kernel_rx) = bounded(1);
    rayon::scope(|scope| {
        scope.spawn(move |_| {
            let result = build_sparse_kernel(
                init_msg.fs as u32,
                init_msg.fmin,
                init_msg.fmax,
                init_msg.bins as u32,
                init_msg.thresh,
            )
            .map(|kernel| {
                let ready = KernelReadyMsg {
                    fft_size: kernel.fft_size() as i32,
                    bins: kernel.bins() as i32,
                };
                (ready, Arc::new(kernel))
            });
            let _ = kernel_tx.send(result);
        });
    });

    let (ready, kernel) = kernel_rx
        .recv()
        .map_err(|_| ConstantQError::TransportError("kernel-init worker disconnected".to_string()))??;

    info!(
        "orchestrator: kernel ready (fft_size={}, bins={})",
        ready.fft_size, ready.bins
    );

    if config.frame_interval == 0 {
        return Err(ConstantQError::PreconditionViolation(
            "frame_interval must be at least 1".to_string(),
        ));
    }

    let sample_num = if audio.len() >= kernel.fft_size() {
        (audio.len() - kernel.fft_size()) / config.frame_interval
    } else {
        0
    };

    status_sink.status_update(StatusCode::SparseKernelComplete, sample_num as i64);
    info!("orchestrator: {sample_num} frames to analyze");

    if sample_num == 0 || config.worker_count == 0 {
        warn!("orchestrator: nothing to dispatch (sample_num={sample_num}, worker_count={})", config.worker_count);
        return Ok(ready);
    }

    let shards = shard_bounds(sample_num, config.worker_count);
    let (reply_tx, reply_rx) = bounded::<Result<AnalyzeShardReply>>(shards.len().max(1));

    rayon::scope(|scope| {
        for (start_w, end_w) in &shards {
            let total_w = end_w - start_w;
            let audio_sample_size = (total_w - 1) * config.frame_interval + kernel.fft_size();
            let slice_start = start_w * config.frame_interval;
            let slice_end = (slice_start + audio_sample_size).min(audio.len());
            let msg = AnalyzeShardMsg {
                start_frame: 0,
                frame_interval: config.frame_interval as i32,
                total_samples: total_w as i32,
                sample_start: *start_w as i32,
                audio: audio[slice_start..slice_end].to_vec(),
            };

            let kernel = Arc::clone(&kernel);
            let reply_tx = reply_tx.clone();
            let cancel = cancel.clone();

            scope.spawn(move |_| {
                if cancel.is_cancelled() {
                    return;
                }
                let result = analyze_shard(&kernel, &msg);
                let _ = reply_tx.send(result);
            });
        }
    });
    drop(reply_tx);

    for reply in reply_rx.iter() {
        let reply = reply?;
        if cancel.is_cancelled() {
            continue;
        }
        let bins = reply.bins as usize;
        let sample_start = reply.sample_start as usize;
        for i in 0..reply.total_samples as usize {
            for b in 0..bins {
                data_sink.data_update(sample_start + i, b, reply.values[i * bins + b]);
            }
        }
        status_sink.status_update(StatusCode::ConstantqItem, reply.total_samples as i64);
    }

    Ok(ready)
}

/// What one shard worker does with an `AnalyzeShardMsg`: build a session from
/// the shared kernel and run `analyze_to_single` over the local slice.
fn analyze_shard(kernel: &Arc<crate::kernel::SparseKernel>, msg: &AnalyzeShardMsg) -> Result<AnalyzeShardReply> {
    let mut session = Session::from_kernel(Arc::clone(kernel));
    let total_samples = msg.total_samples as usize;
    let frame_interval = msg.frame_interval as usize;
    let start_frame = msg.start_frame as usize;

    let required = start_frame + kernel.fft_size() + frame_interval * total_samples.saturating_sub(1);
    if msg.audio.len() < required {
        error!(
            "analyze_shard: audio slice too short ({} < {required}) for shard at sample_start={}",
            msg.audio.len(),
            msg.sample_start
        );
        return Err(ConstantQError::PreconditionViolation(format!(
            "shard audio slice too short: {} < {required}",
            msg.audio.len()
        )));
    }

    let values = session.analyze_to_single(&msg.audio, start_frame, frame_interval, total_samples)?;

    Ok(AnalyzeShardReply {
        bins: session.bins() as i32,
        total_samples: msg.total_samples,
        sample_start: msg.sample_start,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use std::sync::Mutex;

    #[test]
    fn shard_bounds_cover_every_frame_once() {
        let bounds = shard_bounds(100, 3);
        assert_eq!(bounds, vec![(0, 34), (34, 67), (67, 100)]);
    }

    #[test]
    fn analyze_shard_rejects_undersized_audio() {
        let kernel = build_sparse_kernel(44100, 523.25, 1046.5, 24, 0.0054).unwrap();
        let kernel = Arc::new(kernel);

        let msg = AnalyzeShardMsg {
            start_frame: 0,
            frame_interval: 512,
            total_samples: 4,
            sample_start: 0,
            audio: vec![0.0; kernel.fft_size() - 1],
        };

        let err = analyze_shard(&kernel, &msg).unwrap_err();
        assert!(matches!(err, ConstantQError::PreconditionViolation(_)));
    }

    #[test]
    fn shard_bounds_empty_when_no_frames() {
        assert!(shard_bounds(0, 4).is_empty());
    }

    fn sine_wave(len: usize, fps: u32, freq: f64) -> Vec<f64> {
        (0..len)
            .map(|n| (PI * 2.0 * freq * n as f64 / fps as f64).sin())
            .collect()
    }

    #[test]
    fn end_to_end_run_delivers_every_frame_exactly_once() {
        let config = OrchestratorConfig {
            fs: 44100,
            fmin: 523.25,
            fmax: 1046.5,
            bins_per_octave: 24,
            threshold: 0.0054,
            frame_interval: 512,
            worker_count: 3,
        };

        let audio = sine_wave(4096 + 512 * 20, 44100, 659.25);

        let statuses: Mutex<Vec<(StatusCode, i64)>> = Mutex::new(Vec::new());
        let seen: Mutex<std::collections::HashSet<(usize, usize)>> = Mutex::new(Default::default());

        let status_sink = |code: StatusCode, payload: i64| {
            statuses.lock().unwrap().push((code, payload));
        };
        let data_sink = |frame: usize, bin: usize, _magnitude: f64| {
            assert!(seen.lock().unwrap().insert((frame, bin)), "duplicate cell delivered");
        };

        let cancel = CancelToken::new();
        run(&config, &audio, status_sink, data_sink, &cancel).unwrap();

        let expected_frames = (audio.len() - 4096) / 512;
        let seen = seen.into_inner().unwrap();
        for frame in 0..expected_frames {
            for bin in 0..24 {
                assert!(seen.contains(&(frame, bin)), "missing frame {frame} bin {bin}");
            }
        }

        let statuses = statuses.into_inner().unwrap();
        assert_eq!(statuses[0], (StatusCode::SparseKernelStart, 0));
        assert_eq!(statuses[1], (StatusCode::SparseKernelComplete, expected_frames as i64));
    }

    #[test]
    fn cancelling_before_replies_stops_delivery() {
        let config = OrchestratorConfig {
            fs: 44100,
            fmin: 523.25,
            fmax: 1046.5,
            bins_per_octave: 24,
            threshold: 0.0054,
            frame_interval: 512,
            worker_count: 1,
        };
        let audio = sine_wave(4096 + 512 * 4, 44100, 440.0);

        let delivered = Mutex::new(0usize);
        let status_sink = |_: StatusCode, _: i64| {};
        let data_sink = |_: usize, _: usize, _: f64| {
            *delivered.lock().unwrap() += 1;
        };

        let cancel = CancelToken::new();
        cancel.cancel();
        run(&config, &audio, status_sink, data_sink, &cancel).unwrap();

        assert_eq!(*delivered.lock().unwrap(), 0);
    }
}
