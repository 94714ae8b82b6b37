use log::{debug, warn};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Handle to one subscription on a change source.
///
/// Yields a payload-less tick per raw notification. Dropping the feed ends
/// the subscription.
pub struct ChangeFeed {
    rx: mpsc::UnboundedReceiver<()>,
}

impl ChangeFeed {
    /// Build a feed from the receiving half of a tick channel. This is how
    /// custom `ChangeSource` implementations hand out subscriptions.
    pub fn from_receiver(rx: mpsc::UnboundedReceiver<()>) -> Self {
        ChangeFeed { rx }
    }

    /// Wait for the next tick. Returns `None` once the source is gone.
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

/// A system facility that reports "something changed" with no payload and no
/// per-topic filtering. Consumers re-read whatever state they care about on
/// every tick.
pub trait ChangeSource: Send + Sync {
    /// Install one subscription. Must be called from within a tokio runtime.
    fn subscribe(&self) -> ChangeFeed;
}

/// Change source backed by a `pactl subscribe` child process.
///
/// pactl reports changes to every PulseAudio/PipeWire object, so most ticks
/// are unrelated to volume; filtering is the subscriber's job. One child is
/// shared by all feeds and killed once the last feed is dropped. If the
/// child cannot be started the feed simply stays quiet (best-effort).
pub struct PactlSource {
    program: String,
    args: Vec<String>,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<()>>>>,
    pumping: Arc<AtomicBool>,
}

impl PactlSource {
    pub fn new() -> Self {
        Self::with_command("pactl", ["subscribe"])
    }

    /// Use a different event-emitting command, one tick per output line.
    pub fn with_command<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PactlSource {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            pumping: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for PactlSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeSource for PactlSource {
    fn subscribe(&self) -> ChangeFeed {
        let (tx, rx) = mpsc::unbounded_channel();

        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);

        // One pump per source, started with the first live feed
        if !self.pumping.swap(true, Ordering::SeqCst) {
            let program = self.program.clone();
            let args = self.args.clone();
            let subscribers = Arc::clone(&self.subscribers);
            let pumping = Arc::clone(&self.pumping);

            tokio::spawn(async move {
                pump_events(&program, &args, &subscribers).await;
                pumping.store(false, Ordering::SeqCst);
            });
        }

        ChangeFeed { rx }
    }
}

/// Forward each line of the child's stdout to every live feed.
async fn pump_events(
    program: &str,
    args: &[String],
    subscribers: &Mutex<Vec<mpsc::UnboundedSender<()>>>,
) {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to start {}: {}", program, e);
            return;
        }
    };

    let stdout = match child.stdout.take() {
        Some(stdout) => stdout,
        None => return,
    };

    debug!("Started {} event stream", program);
    let mut lines = BufReader::new(stdout).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(_line)) => {
                let mut subs = subscribers.lock().unwrap_or_else(|e| e.into_inner());
                subs.retain(|tx| tx.send(()).is_ok());
                if subs.is_empty() {
                    debug!("Last change feed dropped, stopping {}", program);
                    break;
                }
            }
            Ok(None) => {
                warn!("{} event stream ended", program);
                break;
            }
            Err(e) => {
                warn!("Error reading {} events: {}", program, e);
                break;
            }
        }
    }
}

/// Timer-driven change source for hosts without pactl.
///
/// Every tick is a "maybe something changed" notification; downstream
/// deduplication makes polling indistinguishable from real change events.
pub struct IntervalSource {
    period: Duration,
}

impl IntervalSource {
    pub fn new(period: Duration) -> Self {
        IntervalSource { period }
    }
}

impl ChangeSource for IntervalSource {
    fn subscribe(&self) -> ChangeFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        let period = self.period;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if tx.send(()).is_err() {
                    break;
                }
            }
        });

        ChangeFeed { rx }
    }
}
