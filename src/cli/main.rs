use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc;

use volwatch::audio::{StreamType, VolumeQuery, VolumeState, WpctlQuery};
use volwatch::observer::{VolumeChangeListener, VolumeObserver};
use volwatch::source::{ChangeSource, IntervalSource, PactlSource};

#[derive(Parser)]
#[command(name = "volwatch-cli")]
#[command(about = "Query system volume state")]
#[command(version = "0.1.0")]
struct Args {
    /// Output format
    #[arg(short, long, default_value = "human")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current volume for one stream
    Get {
        /// Stream to query
        #[arg(short, long, default_value = "media")]
        stream: String,
    },

    /// Show current volume for every stream
    Streams,

    /// Follow volume changes until interrupted
    Watch {
        /// Stream to watch
        #[arg(short, long, default_value = "media")]
        stream: String,

        /// Poll on a timer instead of subscribing to pactl
        #[arg(short, long)]
        poll: bool,
    },
}

/// Listener that forwards changes to the printing loop.
struct ChannelListener {
    tx: mpsc::UnboundedSender<(u32, u32)>,
}

impl VolumeChangeListener for ChannelListener {
    fn on_volume_changed(&self, current: u32, max: u32) {
        let _ = self.tx.send((current, max));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Keep stdout machine-readable; library warnings go to stderr
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    match args.command {
        Commands::Get { ref stream } => {
            let stream = parse_stream(stream)?;
            let query = WpctlQuery::new();
            let state = query
                .query(stream)
                .with_context(|| format!("Failed to read {} volume", stream))?;
            print_state(&state, &args.format)?;
        }

        Commands::Streams => {
            let query = WpctlQuery::new();
            let mut states = Vec::new();

            for stream in StreamType::ALL {
                match query.query(stream) {
                    Ok(state) => states.push(state),
                    Err(e) => eprintln!("{}: unavailable ({:#})", stream, e),
                }
            }

            match args.format {
                OutputFormat::Human => {
                    for state in &states {
                        print_state(state, &OutputFormat::Human)?;
                    }
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&states)?);
                }
            }
        }

        Commands::Watch { ref stream, poll } => {
            let stream = parse_stream(stream)?;
            watch(stream, poll, &args.format).await?;
        }
    }

    Ok(())
}

async fn watch(stream: StreamType, poll: bool, format: &OutputFormat) -> Result<()> {
    let query = Arc::new(WpctlQuery::new());
    let source: Arc<dyn ChangeSource> = if poll {
        Arc::new(IntervalSource::new(Duration::from_secs(1)))
    } else {
        Arc::new(PactlSource::new())
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut observer = VolumeObserver::new(query, source);
    observer.register(stream, Arc::new(ChannelListener { tx }));

    eprintln!("Watching {} volume, press Ctrl+C to stop", stream);

    loop {
        tokio::select! {
            change = rx.recv() => match change {
                Some((current, max)) => print_change(stream, current, max, format)?,
                None => break,
            },
            _ = signal::ctrl_c() => break,
        }
    }

    observer.unregister();
    Ok(())
}

fn parse_stream(name: &str) -> Result<StreamType> {
    StreamType::parse(name).with_context(|| {
        format!(
            "Unknown stream type: {} (expected one of: media, ring, alarm, notification, system)",
            name
        )
    })
}

fn print_state(state: &VolumeState, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            let muted = if state.muted { " [muted]" } else { "" };
            println!("{}: {}/{}{}", state.stream, state.current, state.max, muted);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(state)?);
        }
    }
    Ok(())
}

fn print_change(stream: StreamType, current: u32, max: u32, format: &OutputFormat) -> Result<()> {
    let now = Local::now();
    match format {
        OutputFormat::Human => {
            println!("{} {} {}/{}", now.format("%H:%M:%S"), stream, current, max);
        }
        OutputFormat::Json => {
            let line = serde_json::json!({
                "time": now.format("%Y-%m-%dT%H:%M:%S").to_string(),
                "stream": stream,
                "current": current,
                "max": max,
            });
            println!("{}", line);
        }
    }
    Ok(())
}
