use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use rxqr::stream::{FrameAdapter, ReplaySource, StreamingDecoder};
use rxqr::{DecodeOutcome, Decoded, EncodeConfig, FileDecoder, PixelFormat, QrEncoder, ScanConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "qrtool", version, about = "rxqr CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log verbosity
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    loglevel: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Decode the QR code in a single image with adaptive downsampling
    Decode {
        #[arg(long)]
        image: PathBuf,
    },
    /// Write a QR image for a payload into a directory
    Encode {
        #[arg(long)]
        text: String,
        #[arg(long, default_value_t = 400)]
        width: u32,
        #[arg(long, default_value_t = 400)]
        height: u32,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Stream a directory of images through the camera decoder
    Replay {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long, default_value_t = 33)]
        interval_ms: u64,
        /// Stop after this long even if frames keep coming
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut env_builder = env_logger::Builder::from_default_env();
    env_builder.filter_level(cli.loglevel.to_level_filter());
    env_builder.format_timestamp_millis();
    env_builder.try_init()?;

    match cli.command {
        Command::Decode { image } => decode_cmd(&image),
        Command::Encode {
            text,
            width,
            height,
            out_dir,
        } => encode_cmd(&text, width, height, &out_dir),
        Command::Replay {
            dir,
            interval_ms,
            timeout_secs,
        } => replay_cmd(&dir, interval_ms, timeout_secs),
    }
}

fn print_decoded(decoded: &Decoded) {
    let meta = &decoded.metadata;
    println!(
        "version={} error_correction={:?} mask={:?} content={}",
        meta.version, meta.error_correction, meta.mask_pattern, decoded.text
    );
}

fn decode_cmd(image: &Path) -> Result<()> {
    let start = Instant::now();
    let scan = FileDecoder::new(ScanConfig::from_env()).decode_file(image);
    let elapsed = start.elapsed();

    println!("Image: {}", image.display());
    println!(
        "Attempts: {} (sample factors {:?}) in {:.1} ms",
        scan.attempts,
        scan.sample_factors,
        elapsed.as_secs_f64() * 1000.0
    );
    match scan.outcome {
        DecodeOutcome::Decoded(decoded) => {
            print_decoded(&decoded);
            Ok(())
        }
        DecodeOutcome::FatalError(err) => {
            Err(err).with_context(|| format!("failed to decode {}", image.display()))
        }
        DecodeOutcome::NotFound | DecodeOutcome::RecoverableFormatError(_) => {
            bail!("no QR code found in {}", image.display())
        }
    }
}

fn encode_cmd(text: &str, width: u32, height: u32, out_dir: &Path) -> Result<()> {
    let path = QrEncoder::new(EncodeConfig::default())
        .encode_to_dir(text, width, height, out_dir)
        .with_context(|| format!("failed to write QR image into {}", out_dir.display()))?;
    println!("{}", path.display());
    Ok(())
}

fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if ext == "png" || ext == "jpg" || ext == "jpeg" || ext == "gif" || ext == "bmp" {
                    images.push(path);
                }
            }
        }
    }

    images.sort();
    images
}

fn replay_cmd(dir: &Path, interval_ms: u64, timeout_secs: u64) -> Result<()> {
    let images = collect_images(dir);
    if images.is_empty() {
        bail!("no images found under {}", dir.display());
    }
    info!("replaying {} image(s) from {}", images.len(), dir.display());

    let source = ReplaySource::from_paths(&images, Duration::from_millis(interval_ms))
        .context("failed to load replay images")?;
    let adapter = FrameAdapter::new(Box::new(source), PixelFormat::Nv21);
    let scan = StreamingDecoder::new(ScanConfig::from_env()).start(adapter)?;

    // Every frame has been delivered by then; the timeout caps slow replays
    let replay = Duration::from_millis(interval_ms) * (images.len() as u32 + 1);
    let deadline = Instant::now() + replay.min(Duration::from_secs(timeout_secs));
    let mut decoded = 0usize;
    while Instant::now() < deadline {
        match scan.results().recv_timeout(Duration::from_millis(50)) {
            Ok(Ok(result)) => {
                decoded += 1;
                print_decoded(&result);
            }
            Ok(Err(err)) => return Err(err).context("camera scan failed"),
            Err(_) => {}
        }
    }
    scan.stop();
    for result in scan.results().iter() {
        match result {
            Ok(result) => {
                decoded += 1;
                print_decoded(&result);
            }
            Err(err) => return Err(err).context("camera scan failed"),
        }
    }

    let stats = scan.stats();
    println!(
        "Frames: {} delivered, {} examined, {} dropped while busy, {} decode(s)",
        stats.frames(),
        stats.accepted(),
        stats.dropped(),
        decoded
    );
    Ok(())
}
