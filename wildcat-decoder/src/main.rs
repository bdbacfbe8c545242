//! Wildcat decoder (wildcat-decode) - command-line driver
//!
//! Decodes one container file through a [`Session`] and writes the result as
//! an IEEE-float WAV at the target rate.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wildcat_common::config::load_config;
use wildcat_common::time::frames_to_millis;
use wildcat_decoder::{Session, SessionOptions, NATIVE_SAMPLE_RATE};

/// Command-line arguments for wildcat-decode
#[derive(Parser, Debug)]
#[command(name = "wildcat-decode")]
#[command(about = "Decode an audio container to a float WAV file")]
#[command(version)]
struct Args {
    /// Encoded input file
    input: PathBuf,

    /// WAV file to write
    #[arg(short, long, required_unless_present = "tags")]
    output: Option<PathBuf>,

    /// Output sample rate (Hz), overrides the config file
    #[arg(short, long, env = "WILDCAT_RATE")]
    rate: Option<u32>,

    /// Decode budget per read (ms), overrides the config file
    #[arg(long)]
    buffer_ms: Option<u32>,

    /// First native-rate frame to decode
    #[arg(long, default_value_t = 0)]
    start: u64,

    /// Native-rate frame to stop at (default: end of stream)
    #[arg(long)]
    end: Option<u64>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print container tags and exit
    #[arg(long)]
    tags: bool,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wildcat_decoder=info,wildcat_decode=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(rate) = args.rate {
        config.target_sample_rate = rate;
    }
    if let Some(ms) = args.buffer_ms {
        config.buffer_duration_ms = ms;
    }
    config.validate().context("Invalid decoder settings")?;

    let blob = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    info!("Read {} bytes from {}", blob.len(), args.input.display());

    let mut session: Session = Session::with_options(SessionOptions::from(&config));
    let total = session
        .open(blob, config.target_sample_rate, config.buffer_duration_ms)
        .context("Failed to open decode session")?;
    let channels = session.channel_count();
    info!(
        "Opened stream: {} channels, {} frames ({} ms)",
        channels,
        total,
        frames_to_millis(total, NATIVE_SAMPLE_RATE)
    );

    if args.tags {
        match session.tags() {
            Some(tags) => {
                if let Some(vendor) = &tags.vendor {
                    println!("VENDOR={}", vendor);
                }
                for (key, value) in tags.iter() {
                    println!("{}={}", key, value);
                }
            }
            None => println!("(no tags)"),
        }
        session.close();
        return Ok(());
    }

    let Some(output) = args.output else {
        bail!("--output is required unless --tags is given");
    };

    let end = args.end.unwrap_or(total).min(total);
    if args.start > 0 {
        session
            .seek(args.start)
            .with_context(|| format!("Failed to seek to frame {}", args.start))?;
    }

    let spec = WavSpec {
        channels: u16::try_from(channels).context("Too many channels for WAV output")?,
        sample_rate: config.target_sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&output, spec)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let mut written_frames: u64 = 0;
    let mut last_logged_percent = 0;
    while session.position() < end {
        let before = session.position();
        let frames = session.read(end).context("Decode failed")?;
        if session.position() == before {
            info!("Stream ended at frame {}", before);
            break;
        }
        if let Some(samples) = session.output(frames) {
            for &sample in samples {
                writer.write_sample(sample).context("Failed to write WAV sample")?;
            }
        }
        written_frames += frames as u64;

        let span = end.saturating_sub(args.start).max(1);
        let percent = session.position().saturating_sub(args.start) * 100 / span;
        if percent >= last_logged_percent + 10 {
            last_logged_percent = percent;
            info!("Decoded {}%", percent);
        }
    }

    writer.finalize().context("Failed to finalize WAV file")?;
    session.close();

    info!(
        "Wrote {} frames at {} Hz ({} ms) to {}",
        written_frames,
        config.target_sample_rate,
        frames_to_millis(written_frames, config.target_sample_rate),
        output.display()
    );
    Ok(())
}
