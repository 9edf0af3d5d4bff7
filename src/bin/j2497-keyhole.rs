//! Command-line driver for the J2497 keyhole-mitigation waveform generator.
//!
//! Thin by design (§1 scopes the DAC sink, argv parsing, and repeat looping
//! out of the core): loads/merges configuration, builds a [`FrameGenerator`],
//! materializes its finite frame sequence once, then streams `repeat` loops
//! of it as signed 8-bit samples, with warmup/cooldown padding around the
//! whole run.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use j2497_keyhole::config::{GeneratorConfig, PartialGeneratorConfig};
use j2497_keyhole::error::GeneratorError;
use j2497_keyhole::keyhole::FrameGenerator;
use j2497_keyhole::logging::init_logging;
use j2497_keyhole::wav;

/// Lowest sample rate the reference FL2K-class DAC transport supports; the
/// driver's own default, distinct from the library's 800 kHz validation floor.
const DEFAULT_CLI_SAMPLE_RATE: f64 = 7_777_777.0;
/// Matches the reference driver's `REPEAT` constant.
const DEFAULT_REPEAT: u32 = 4096;
/// Warmup/cooldown zero-padding, in seconds, so the DAC hardware doesn't clip
/// the first/last real samples.
const PAD_SECONDS: f64 = 2.0;
const WRITE_CHUNK_BYTES: usize = 4096;

#[derive(Parser)]
#[command(name = "j2497-keyhole")]
#[command(about = "J2497 powerline-carrier keyhole-mitigation waveform generator")]
struct Args {
    /// Output sample rate in Hz (>= 800 kHz). Defaults to 7,777,777 Hz.
    #[arg(long)]
    sample_rate: Option<f64>,

    /// Frame period in microseconds (>= 32,000).
    #[arg(long)]
    period_us: Option<u32>,

    /// Allowed J1708 payload as a hex string (repeatable). Defaults to
    /// LAMP ON (0A00).
    #[arg(long = "allowed-message")]
    allowed_messages: Vec<String>,

    /// Zero keyhole/jam amplitude to observe bare door+retransmission timing.
    #[arg(long)]
    calibration_mode: bool,

    /// Optional JSON configuration file, merged under any CLI flags above.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of times to loop the frame sequence.
    #[arg(long, default_value_t = DEFAULT_REPEAT)]
    repeat: u32,

    /// With --calibration-mode, also dump each frame to a numbered .wav file
    /// in this directory.
    #[arg(long)]
    dump_wav: Option<PathBuf>,

    /// Output path, or "-" for standard output (the default).
    #[arg(long, default_value = "-")]
    output: String,
}

#[derive(Debug, thiserror::Error)]
enum DriverError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error("invalid hex payload {0:?}: {1}")]
    InvalidHexMessage(String, String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn parse_hex_message(s: &str) -> Result<Vec<u8>, DriverError> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return Err(DriverError::InvalidHexMessage(
            s.to_string(),
            "odd number of hex digits".to_string(),
        ));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|e| DriverError::InvalidHexMessage(s.to_string(), e.to_string()))
        })
        .collect()
}

fn load_config(args: &Args) -> Result<GeneratorConfig, DriverError> {
    let mut config = GeneratorConfig::default();
    let mut sample_rate_set_by_file = false;

    if let Some(path) = &args.config {
        let text = std::fs::read_to_string(path).map_err(|e| GeneratorError::ConfigIo {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let partial: PartialGeneratorConfig =
            serde_json::from_str(&text).map_err(|e| GeneratorError::ConfigIo {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        sample_rate_set_by_file = partial.sample_rate.is_some();
        config.merge_from(partial);
    }

    // The CLI's own default sample rate only applies when neither the file
    // nor a CLI flag actually set one — otherwise it would silently clobber
    // a config file's value with its own default.
    if !sample_rate_set_by_file && args.sample_rate.is_none() {
        config.sample_rate = DEFAULT_CLI_SAMPLE_RATE;
    }

    let mut overrides = PartialGeneratorConfig::default();
    overrides.sample_rate = args.sample_rate;
    overrides.period_us = args.period_us;
    if !args.allowed_messages.is_empty() {
        let parsed = args
            .allowed_messages
            .iter()
            .map(|s| parse_hex_message(s))
            .collect::<Result<Vec<_>, _>>()?;
        overrides.allowed_messages = Some(parsed);
    }
    if args.calibration_mode {
        overrides.calibration_mode = Some(true);
    }
    config.merge_from(overrides);

    Ok(config)
}

/// A broken pipe (or an invalid-argument write past a closed fd, as the
/// reference DAC sink can surface on some platforms) ends the write loop
/// cleanly rather than propagating as a hard error.
fn is_sink_closed(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::InvalidInput
    )
}

/// Writes `samples` as signed 8-bit PCM in `WRITE_CHUNK_BYTES`-sized chunks.
/// Returns `Ok(false)` if the sink closed mid-write (clean termination),
/// `Ok(true)` if the full slice was written.
fn write_pcm8(out: &mut dyn Write, samples: &[f32]) -> io::Result<bool> {
    let mut chunk = Vec::with_capacity(WRITE_CHUNK_BYTES);
    for &sample in samples {
        chunk.push((sample.clamp(-1.0, 1.0) * 127.0).round() as i8 as u8);
        if chunk.len() == WRITE_CHUNK_BYTES {
            if let Err(e) = out.write_all(&chunk) {
                if is_sink_closed(&e) {
                    return Ok(false);
                }
                return Err(e);
            }
            chunk.clear();
        }
    }
    if !chunk.is_empty() {
        if let Err(e) = out.write_all(&chunk) {
            if is_sink_closed(&e) {
                return Ok(false);
            }
            return Err(e);
        }
    }
    Ok(true)
}

fn run() -> Result<(), DriverError> {
    init_logging();
    let args = Args::parse();

    let config = load_config(&args)?;
    let generator = FrameGenerator::new(config.clone())?;
    let frame_count = generator.frame_count();

    let frames = generator.collect::<Result<Vec<_>, _>>()?;

    if config.calibration_mode {
        if let Some(dir) = &args.dump_wav {
            for (i, frame) in frames.iter().enumerate() {
                let path = dir.join(format!("frame_{i:04}.wav"));
                wav::write_frame(frame, config.sample_rate.round() as u32, &path)?;
            }
            info!(dir = %dir.display(), count = frames.len(), "dumped calibration frames to wav");
        }
    }

    let mut out: Box<dyn Write> = if args.output == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(File::create(&args.output)?)
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))
            .expect("failed to install SIGINT handler");
    }

    let pad_samples = (config.sample_rate * PAD_SECONDS).round() as usize;
    let silence = vec![0.0f32; pad_samples];

    let progress = ProgressBar::new(args.repeat as u64 * frame_count as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("SEND [{bar:30.cyan}] {percent}% ({pos}/{len} frames) {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    if !write_pcm8(out.as_mut(), &silence)? {
        progress.finish_and_clear();
        info!("sink closed during warmup; exiting");
        return Ok(());
    }

    'outer: for rep in 0..args.repeat {
        for frame in &frames {
            if interrupted.load(Ordering::SeqCst) {
                info!(repeat = rep, "interrupted; ending transmit loop");
                break 'outer;
            }
            if !write_pcm8(out.as_mut(), frame)? {
                progress.finish_and_clear();
                info!("sink closed mid-stream; exiting");
                return Ok(());
            }
            progress.inc(1);
        }
    }
    progress.finish_and_clear();

    if !write_pcm8(out.as_mut(), &silence)? {
        info!("sink closed during cooldown; exiting");
        return Ok(());
    }

    let _ = out.flush();
    info!("clean shutdown");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        warn!(error = %err, "generator terminated with an error");
        eprintln!("j2497-keyhole: {err}");
        std::process::exit(1);
    }
}
