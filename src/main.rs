//! lamco-capture-encoder - capture-to-bitstream encoder
//!
//! Entry point for the command-line tool. Reads raw I420 frames from a file
//! (or generates a test pattern), pushes them through the encoding pipeline
//! and writes the bitstream to the configured output.

use std::fs::File;
use std::future::Future;
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lamco_capture_encoder::config::{CaptureConfig, Config, LoggingConfig, Overrides};
use lamco_capture_encoder::{
    CodecRegistry, ContextSettings, EncodingContext, FrameProducer, OutputTarget, RawFrame,
};

/// Frames the reader may run ahead of the encoder
const MAX_PENDING_FRAMES: usize = 8;

/// Command-line arguments for lamco-capture-encoder
#[derive(Parser, Debug)]
#[command(name = "lamco-capture-encoder")]
#[command(version, about = "Camera frame encoding pipeline", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, env = "LAMCO_ENCODER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Codec to use (rawvideo, h264)
    #[arg(long)]
    pub codec: Option<String>,

    /// Raw I420 input file (omit for a synthetic test pattern)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Frame width
    #[arg(long)]
    pub width: Option<i32>,

    /// Frame height
    #[arg(long)]
    pub height: Option<i32>,

    /// Number of frames to encode (0 = until end of input or Ctrl-C)
    #[arg(short = 'n', long)]
    pub frames: Option<u64>,

    /// Target bit rate in bits per second
    #[arg(long)]
    pub bitrate: Option<u32>,

    /// List available codecs and exit
    #[arg(long)]
    pub list_codecs: bool,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,

    /// Statistics output format (text|json)
    #[arg(long, default_value = "text")]
    pub stats_format: String,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            codec: self.codec.clone(),
            input: self.input.clone(),
            output: self.output.clone(),
            width: self.width,
            height: self.height,
            frames: self.frames,
            bitrate: self.bitrate,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_codecs {
        for id in CodecRegistry::with_defaults().available() {
            println!("{}", id);
        }
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default_config(),
    };
    let config = config.with_overrides(args.overrides());
    config.validate().context("Invalid configuration")?;

    let _log_guard = init_logging(&args, &config.logging)?;

    info!("════════════════════════════════════════════════════════");
    info!("  lamco-capture-encoder v{}", env!("CARGO_PKG_VERSION"));
    info!("  Built: {} {}", env!("BUILD_DATE"), env!("BUILD_TIME"));
    info!("  Commit: {}", env!("GIT_HASH"));
    info!("  Profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });
    info!("════════════════════════════════════════════════════════");
    debug!("Config: {:?}", config);

    let settings = ContextSettings::new(
        OutputTarget::Path(config.output.path.clone()),
        config.capture.width,
        config.capture.height,
    )
    .with_tuning(config.encoder.to_tuning());

    let mut ctx = EncodingContext::new(settings);
    ctx.open(Some(config.encoder.codec_id()))
        .with_context(|| format!("Failed to open codec {}", config.encoder.codec))?;
    ctx.start().context("Failed to start encoder")?;

    info!(
        "Encoding {}x{} with {} to {}",
        config.capture.width,
        config.capture.height,
        config.encoder.codec,
        config.output.path.display()
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let mut capture = {
        let producer = ctx.producer();
        let capture_config = config.capture.clone();
        let fps = config.encoder.fps;
        let cancel = Arc::clone(&cancel);
        tokio::task::spawn_blocking(move || run_capture(&producer, &capture_config, fps, &cancel))
    };

    let captured = tokio::select! {
        result = &mut capture => result.context("Capture task panicked")??,
        () = interrupted(tokio::signal::ctrl_c()) => {
            info!("Interrupted, stopping capture");
            cancel.store(true, Ordering::SeqCst);
            capture.await.context("Capture task panicked")??
        }
    };
    info!("Captured {} frames", captured);

    ctx.stop().context("Failed to stop encoder")?;
    let ctx = tokio::task::spawn_blocking(move || ctx.close().map(|()| ctx))
        .await
        .context("Close task panicked")?
        .context("Failed to close encoder")?;

    let stats = ctx.stats();
    match args.stats_format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&stats)?),
        _ => println!("{}", stats.summary()),
    }

    if stats.encode_errors > 0 || stats.write_failures > 0 {
        warn!(
            "{} encode errors, {} write failures",
            stats.encode_errors, stats.write_failures
        );
    }

    info!("Encoder shut down");
    Ok(())
}

/// Resolve when the signal fires; never resolve if the handler cannot be installed
async fn interrupted(signal: impl Future<Output = io::Result<()>>) {
    if let Err(e) = signal.await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Wait until the encoder has room for another frame
///
/// Returns `false` if capture was cancelled while waiting.
fn wait_for_room(producer: &FrameProducer, cancel: &AtomicBool) -> bool {
    while producer.pending() >= MAX_PENDING_FRAMES {
        if cancel.load(Ordering::SeqCst) {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    true
}

/// Feed frames to the pipeline until the limit, end of input or cancellation
///
/// The reader never runs more than [`MAX_PENDING_FRAMES`] ahead of the
/// encoder, so memory stays bounded whatever the input size.
fn run_capture(
    producer: &FrameProducer,
    capture: &CaptureConfig,
    fps: u32,
    cancel: &AtomicBool,
) -> Result<u64> {
    let width = capture.width as u32;
    let height = capture.height as u32;
    let frame_len = width as usize * height as usize * 3 / 2;
    let limit = if capture.frames == 0 {
        u64::MAX
    } else {
        capture.frames
    };

    let mut input = match &capture.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            Some(BufReader::new(file))
        }
        None => None,
    };

    let interval = Duration::from_secs(1) / fps.max(1);
    let mut count = 0;

    while count < limit && !cancel.load(Ordering::SeqCst) {
        if !wait_for_room(producer, cancel) {
            break;
        }

        let buffer = match input.as_mut() {
            Some(reader) => {
                let mut buffer = vec![0u8; frame_len];
                match reader.read_exact(&mut buffer) {
                    Ok(()) => buffer,
                    Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                        debug!("End of input after {} frames", count);
                        break;
                    }
                    Err(e) => return Err(e).context("Failed to read input frame"),
                }
            }
            None => test_pattern(width, height, count),
        };

        producer.push(RawFrame::contiguous(buffer, width, height)?);
        count += 1;

        if capture.realtime {
            std::thread::sleep(interval);
        }
    }

    Ok(count)
}

/// Moving diagonal gradient in I420
fn test_pattern(width: u32, height: u32, index: u64) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let shift = (index * 4) as usize;
    let mut buffer = Vec::with_capacity(w * h * 3 / 2);

    for y in 0..h {
        buffer.extend((0..w).map(|x| ((x + y + shift) & 0xFF) as u8));
    }
    for y in 0..h / 2 {
        buffer.extend((0..w / 2).map(|x| (((x * 2 + shift) & 0x7F) + 64 + (y & 1)) as u8));
    }
    for y in 0..h / 2 {
        buffer.extend((0..w / 2).map(|_| (((y * 2 + shift) & 0x7F) + 64) as u8));
    }

    buffer
}

fn init_logging(args: &Args, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let log_level = match args.verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "lamco_capture_encoder={level},warn",
            level = log_level
        ))
    });

    // Daily rotated file in addition to stdout
    let (file_layer, guard) = match &logging.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "lamco-capture-encoder.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    match args.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    if let Some(dir) = &logging.log_dir {
        info!("Logging to directory: {}", dir.display());
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_i420_sized() {
        let frame = test_pattern(64, 48, 3);
        assert_eq!(frame.len(), 64 * 48 * 3 / 2);
        assert_ne!(test_pattern(64, 48, 0), test_pattern(64, 48, 1));
    }

    fn gray_frame(width: u32, height: u32) -> RawFrame {
        RawFrame::contiguous(test_pattern(width, height, 0), width, height).unwrap()
    }

    #[test]
    fn test_wait_for_room_stops_on_cancel() {
        let settings = ContextSettings::new(OutputTarget::Writer(Box::new(io::sink())), 16, 16);
        let mut ctx = EncodingContext::new(settings);
        ctx.open(Some(lamco_capture_encoder::CodecId::RAWVIDEO)).unwrap();

        let producer = ctx.producer();
        let cancel = AtomicBool::new(false);
        assert!(wait_for_room(&producer, &cancel));

        // Not started, so nothing drains the queue
        for _ in 0..MAX_PENDING_FRAMES {
            producer.push(gray_frame(16, 16));
        }
        cancel.store(true, Ordering::SeqCst);
        assert!(!wait_for_room(&producer, &cancel));
    }

    #[test]
    fn test_run_capture_bounds_pending_frames() {
        let settings = ContextSettings::new(OutputTarget::Writer(Box::new(io::sink())), 16, 16);
        let mut ctx = EncodingContext::new(settings);
        ctx.open(Some(lamco_capture_encoder::CodecId::RAWVIDEO)).unwrap();
        ctx.start().unwrap();

        let capture = CaptureConfig {
            width: 16,
            height: 16,
            frames: 50,
            input: None,
            realtime: false,
        };
        let captured = run_capture(&ctx.producer(), &capture, 30, &AtomicBool::new(false)).unwrap();
        ctx.stop().unwrap();
        ctx.close().unwrap();

        let stats = ctx.stats();
        assert_eq!(captured, 50);
        assert_eq!(stats.packets_written, 50);
        assert!(stats.peak_queue_depth <= MAX_PENDING_FRAMES);
    }

    #[tokio::test]
    async fn test_signal_error_is_not_an_interrupt() {
        let error = io::Error::new(ErrorKind::Other, "no signal handler");
        let failed = std::future::ready(Err(error));
        let result =
            tokio::time::timeout(Duration::from_millis(50), interrupted(failed)).await;
        assert!(result.is_err());

        let fired = std::future::ready(Ok(()));
        assert!(
            tokio::time::timeout(Duration::from_millis(50), interrupted(fired))
                .await
                .is_ok()
        );
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "lamco-capture-encoder",
            "--codec",
            "rawvideo",
            "-n",
            "10",
            "-vv",
            "--stats-format",
            "json",
        ]);
        assert_eq!(args.codec.as_deref(), Some("rawvideo"));
        assert_eq!(args.frames, Some(10));
        assert_eq!(args.verbose, 2);

        let overrides = args.overrides();
        assert_eq!(overrides.frames, Some(10));
        assert!(overrides.input.is_none());
    }
}
