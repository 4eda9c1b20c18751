use anyhow::{anyhow, Result};
use clap::Parser;
use constantq::config::{AnalysisConfig, PresetStore};
use constantq::messages::StatusCode;
use constantq::orchestrator::{self, CancelToken, OrchestratorConfig};
use constantq::sinks::StatusSink;
use log::{error, info};
use std::env;
use std::path::PathBuf;

/// Runs a constant-Q analysis over a WAV file and prints the dominant bin per frame.
#[derive(Parser, Debug)]
#[command(name = "constantq")]
struct Args {
    /// Path to the input WAV file (mono or multi-channel; channels are averaged).
    wav_path: PathBuf,

    /// Named preset to load from the presets file.
    #[arg(long, default_value = "default")]
    preset: String,

    /// Path to the YAML presets file (created with a "default" entry if missing).
    #[arg(long, default_value = "presets.yaml")]
    presets_file: PathBuf,

    /// Override the preset's worker count.
    #[arg(long)]
    worker_count: Option<usize>,

    /// Enable logging (otherwise RUST_LOG is forced off, matching the reference tool).
    #[arg(long)]
    enable_logs: bool,
}

fn main() {
    let args = Args::parse();

    if !args.enable_logs {
        env::set_var("RUST_LOG", "off");
    }
    env_logger::init();

    if let Err(e) = run(args) {
        error!("application encountered an error: {e:?}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut reader = hound::WavReader::open(&args.wav_path)
        .map_err(|e| anyhow!("failed to open {}: {e}", args.wav_path.display()))?;
    let spec = reader.spec();
    info!(
        "loaded {} ({} channels, {} Hz, {:?})",
        args.wav_path.display(),
        spec.channels,
        spec.sample_rate,
        spec.sample_format
    );

    let audio = downmix_to_mono_f64(&mut reader)?;

    let store = PresetStore::new(&args.presets_file)?;
    let mut config: AnalysisConfig = *store
        .get(&args.preset)
        .ok_or_else(|| anyhow!("no preset named '{}' in {}", args.preset, args.presets_file.display()))?;
    config.fs = spec.sample_rate;
    if let Some(worker_count) = args.worker_count {
        config.worker_count = worker_count;
    }

    let orchestrator_config = OrchestratorConfig {
        fs: config.fs,
        fmin: config.fmin,
        fmax: config.fmax,
        bins_per_octave: config.bins_per_octave,
        threshold: config.threshold,
        frame_interval: config.frame_interval,
        worker_count: config.worker_count,
    };

    let mut peak_per_frame: Vec<(usize, f64)> = Vec::new();

    let data_sink = |frame: usize, bin: usize, magnitude: f64| {
        if peak_per_frame.len() <= frame {
            peak_per_frame.resize(frame + 1, (0, 0.0));
        }
        if magnitude > peak_per_frame[frame].1 {
            peak_per_frame[frame] = (bin, magnitude);
        }
    };

    let cancel = CancelToken::new();
    let ready = orchestrator::run(&orchestrator_config, &audio, LoggingStatusSink, data_sink, &cancel)
        .map_err(|e| anyhow!("analysis failed: {e}"))?;
    let bins = ready.bins as usize;

    for (frame, (bin, magnitude)) in peak_per_frame.iter().enumerate() {
        println!("frame {frame}: peak bin {bin}/{bins} magnitude {magnitude:.6}");
    }

    Ok(())
}

struct LoggingStatusSink;

impl StatusSink for LoggingStatusSink {
    fn status_update(&mut self, code: StatusCode, payload: i64) {
        info!("status: {code:?} payload={payload}");
    }
}

fn downmix_to_mono_f64(reader: &mut hound::WavReader<std::io::BufReader<std::fs::File>>) -> Result<Vec<f64>> {
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| v as f64))
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 / max))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    if channels <= 1 {
        return Ok(interleaved);
    }

    Ok(interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f64>() / channels as f64)
        .collect())
}
