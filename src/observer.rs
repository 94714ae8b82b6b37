use log::{debug, warn};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::audio::{StreamType, VolumeQuery};
use crate::source::ChangeSource;

/// Callback receiving deduplicated volume changes for one stream.
///
/// Invoked on the runtime the observer was created on, from a single task,
/// so implementations need no locking of their own for this callback and
/// see changes in notification order.
pub trait VolumeChangeListener: Send + Sync {
    fn on_volume_changed(&self, current: u32, max: u32);
}

/// One live registration: stream, dedup baseline, and the dispatch task.
struct Subscription {
    stream: StreamType,
    /// Checked under lock at the point of invocation; flipped by unregister
    gate: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
}

/// Bridges a payload-less change source into typed volume-change callbacks.
///
/// On each raw notification the observer re-reads the registered stream's
/// volume and invokes the listener only when the value actually moved. Most
/// ticks from a source like `pactl subscribe` are unrelated to volume; this
/// filtering is the component's whole job.
///
/// At most one subscription is live per observer. Dropping the observer
/// unregisters it.
pub struct VolumeObserver {
    audio: Arc<dyn VolumeQuery>,
    source: Arc<dyn ChangeSource>,
    runtime: Handle,
    subscription: Option<Subscription>,
}

impl VolumeObserver {
    /// Create an observer delivering callbacks on the current tokio runtime.
    ///
    /// Must be called from within a runtime context.
    pub fn new(audio: Arc<dyn VolumeQuery>, source: Arc<dyn ChangeSource>) -> Self {
        Self::with_runtime(audio, source, Handle::current())
    }

    /// Create an observer delivering callbacks on an explicit runtime.
    pub fn with_runtime(
        audio: Arc<dyn VolumeQuery>,
        source: Arc<dyn ChangeSource>,
        runtime: Handle,
    ) -> Self {
        VolumeObserver {
            audio,
            source,
            runtime,
            subscription: None,
        }
    }

    /// Start watching `stream`, replacing any prior subscription.
    ///
    /// The current volume is captured as the deduplication baseline, so a
    /// notification that changes nothing never fires the listener, while the
    /// first real change after registration does. Source or query failures
    /// never surface here; they are logged and the feed degrades to silence.
    ///
    /// The listener must not call `unregister` on this observer from inside
    /// the callback.
    pub fn register(&mut self, stream: StreamType, listener: Arc<dyn VolumeChangeListener>) {
        self.unregister();

        // Baseline before the first tick; on failure the first successful
        // read after a notification becomes the baseline without firing.
        let mut last_known = match self.audio.query(stream) {
            Ok(state) => Some(state.current),
            Err(e) => {
                debug!("Initial volume read for {} failed: {:#}", stream, e);
                None
            }
        };

        let mut feed = self.source.subscribe();
        let audio = Arc::clone(&self.audio);
        let gate = Arc::new(Mutex::new(true));
        let task_gate = Arc::clone(&gate);

        let task = self.runtime.spawn(async move {
            while feed.recv().await.is_some() {
                let state = match audio.query(stream) {
                    Ok(state) => state,
                    Err(e) => {
                        debug!("Volume query for {} failed: {:#}", stream, e);
                        continue;
                    }
                };

                match last_known {
                    Some(prev) if prev == state.current => continue,
                    Some(_) => last_known = Some(state.current),
                    None => {
                        last_known = Some(state.current);
                        continue;
                    }
                }

                let active = task_gate.lock().unwrap_or_else(|e| e.into_inner());
                if !*active {
                    break;
                }
                listener.on_volume_changed(state.current, state.max);
                drop(active);
            }
        });

        debug!("Registered volume observer for {}", stream);
        self.subscription = Some(Subscription { stream, gate, task });
    }

    /// Stop watching. Safe to call any number of times.
    ///
    /// After this returns no callback will fire and none is mid-flight; a
    /// callback already executing is waited for.
    pub fn unregister(&mut self) {
        if let Some(sub) = self.subscription.take() {
            {
                let mut active = sub.gate.lock().unwrap_or_else(|e| e.into_inner());
                *active = false;
            }
            sub.task.abort();
            debug!("Unregistered volume observer for {}", sub.stream);
        }
    }

    pub fn is_registered(&self) -> bool {
        self.subscription.is_some()
    }

    /// Stream of the live subscription, if any.
    pub fn stream(&self) -> Option<StreamType> {
        self.subscription.as_ref().map(|sub| sub.stream)
    }
}

impl Drop for VolumeObserver {
    fn drop(&mut self) {
        if self.is_registered() {
            warn!("Volume observer dropped while registered, unregistering");
            self.unregister();
        }
    }
}
