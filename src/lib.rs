//! Volume Change Notification Bridge
//!
//! A Rust library for watching system audio volume on Linux. The platform
//! only reports "something changed" with no payload, so this crate re-reads
//! the volume on every notification, filters out the noise, and delivers
//! typed per-stream change events with explicit register/unregister
//! lifecycle.

pub mod audio;
pub mod observer;
pub mod source;

pub use audio::{StreamType, VolumeQuery, VolumeState, WpctlQuery};
pub use observer::{VolumeChangeListener, VolumeObserver};
pub use source::{ChangeFeed, ChangeSource, IntervalSource, PactlSource};

/// Current version of the volume watcher
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file path relative to home directory
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/volwatch/config.toml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_constants() {
        assert!(DEFAULT_CONFIG_PATH.contains("volwatch"));
    }
}
