use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

mod config;
use config::Config;

use volwatch::audio::{StreamType, WpctlQuery};
use volwatch::observer::{VolumeChangeListener, VolumeObserver};
use volwatch::source::{ChangeSource, IntervalSource, PactlSource};

#[derive(Parser)]
#[command(name = "volwatchd")]
#[command(about = "System volume watcher daemon")]
#[command(version = "0.1.0")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = volwatch::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Stream to watch (overrides the configured one)
    #[arg(short, long)]
    stream: Option<String>,

    /// Use the polling source even if pactl is configured
    #[arg(short, long)]
    poll: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Listener used by the daemon: every change goes to the log.
struct LogListener {
    stream: StreamType,
}

impl VolumeChangeListener for LogListener {
    fn on_volume_changed(&self, current: u32, max: u32) {
        info!("{} volume changed to {}/{}", self.stream, current, max);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration (written with defaults on first run)
    let config_path = expand_path(&args.config)?;
    let config = Config::load(Some(&config_path))?;

    init_logging(&config, args.verbose);

    info!("Starting volwatchd v{}", env!("CARGO_PKG_VERSION"));

    let stream_name = args.stream.as_deref().unwrap_or(&config.audio.stream);
    let stream = StreamType::parse(stream_name)
        .with_context(|| format!("Unknown stream type: {}", stream_name))?;

    let query = build_query(&config);
    let source = build_source(&config, args.poll)?;

    let mut observer = VolumeObserver::new(query, source);
    observer.register(stream, Arc::new(LogListener { stream }));

    info!("Volume watcher started for {} stream", stream);

    wait_for_shutdown().await;
    info!("Received shutdown signal, stopping daemon...");

    observer.unregister();
    info!("Volume watcher stopped");
    Ok(())
}

fn init_logging(config: &Config, verbose: bool) {
    let log_level = if verbose {
        log::LevelFilter::Debug
    } else {
        config
            .logging
            .level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    };

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(log_level);
    if !config.logging.timestamps {
        builder.format_timestamp(None);
    }
    builder.init();
}

fn build_query(config: &Config) -> Arc<WpctlQuery> {
    let mut query = WpctlQuery::new();

    for (name, target) in &config.audio.targets {
        match StreamType::parse(name) {
            Some(stream) => query.set_target(stream, target.clone()),
            None => warn!("Ignoring target for unknown stream type: {}", name),
        }
    }

    Arc::new(query)
}

fn build_source(config: &Config, force_poll: bool) -> Result<Arc<dyn ChangeSource>> {
    let poll_interval = Duration::from_secs(config.monitoring.poll_interval.max(1));

    if force_poll {
        return Ok(Arc::new(IntervalSource::new(poll_interval)));
    }

    match config.monitoring.source.as_str() {
        "pactl" => Ok(Arc::new(PactlSource::new())),
        "poll" => Ok(Arc::new(IntervalSource::new(poll_interval))),
        other => bail!("Unknown notification source: {}", other),
    }
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn expand_path(path: &str) -> Result<PathBuf> {
    if path.starts_with('~') {
        let home = std::env::var("HOME")
            .context("HOME environment variable not set")?;
        Ok(PathBuf::from(path.replacen('~', &home, 1)))
    } else {
        Ok(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path() {
        // Test regular path
        let path = expand_path("/tmp/test.toml").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/test.toml"));

        // Test relative path
        let path = expand_path("./test.toml").unwrap();
        assert_eq!(path, PathBuf::from("./test.toml"));
    }

    #[test]
    fn test_expand_home_path() {
        std::env::set_var("HOME", "/home/testuser");
        let path = expand_path("~/.config/volwatch/config.toml").unwrap();
        assert_eq!(
            path,
            PathBuf::from("/home/testuser/.config/volwatch/config.toml")
        );
    }

    #[test]
    fn test_build_source_rejects_unknown() {
        let mut config = Config::default();
        config.monitoring.source = "dbus".to_string();

        assert!(build_source(&config, false).is_err());
        // Forcing poll sidesteps the configured source entirely
        assert!(build_source(&config, true).is_ok());
    }
}
