use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::process::Command;

/// Number of integer volume steps reported by the wpctl backend.
///
/// wpctl prints volume as a float where 1.0 is 100%; boosted sinks can go
/// above it, in which case `current` exceeds `max`.
pub const VOLUME_STEPS: u32 = 100;

/// Universal wpctl identifier for the default playback device.
pub const DEFAULT_SINK: &str = "@DEFAULT_AUDIO_SINK@";

/// Logical audio channel category with an independent volume level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Media,
    Ring,
    Alarm,
    Notification,
    System,
}

impl StreamType {
    pub const ALL: [StreamType; 5] = [
        StreamType::Media,
        StreamType::Ring,
        StreamType::Alarm,
        StreamType::Notification,
        StreamType::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Media => "media",
            StreamType::Ring => "ring",
            StreamType::Alarm => "alarm",
            StreamType::Notification => "notification",
            StreamType::System => "system",
        }
    }

    /// Parse a lowercase stream name as produced by `as_str`.
    pub fn parse(name: &str) -> Option<StreamType> {
        match name {
            "media" => Some(StreamType::Media),
            "ring" => Some(StreamType::Ring),
            "alarm" => Some(StreamType::Alarm),
            "notification" => Some(StreamType::Notification),
            "system" => Some(StreamType::System),
            _ => None,
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one stream's volume, recomputed on demand and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolumeState {
    pub stream: StreamType,
    /// Current volume in integer steps (may exceed `max` on boosted sinks)
    pub current: u32,
    /// Maximum regular volume in integer steps
    pub max: u32,
    pub muted: bool,
}

/// Read-only access to the platform's current volume for a stream.
///
/// Implementations must be safe to call concurrently from independent
/// observers.
pub trait VolumeQuery: Send + Sync {
    fn query(&self, stream: StreamType) -> Result<VolumeState>;
}

/// Volume query backed by `wpctl get-volume`.
///
/// Each stream type maps to a wpctl object target. All streams point at the
/// default sink unless remapped with `set_target` (e.g. to a specific node
/// id for a dedicated alarm output).
pub struct WpctlQuery {
    targets: HashMap<StreamType, String>,
}

impl WpctlQuery {
    pub fn new() -> Self {
        WpctlQuery {
            targets: HashMap::new(),
        }
    }

    /// Override the wpctl target queried for one stream.
    pub fn set_target(&mut self, stream: StreamType, target: impl Into<String>) {
        self.targets.insert(stream, target.into());
    }

    pub fn target(&self, stream: StreamType) -> &str {
        self.targets
            .get(&stream)
            .map(String::as_str)
            .unwrap_or(DEFAULT_SINK)
    }
}

impl Default for WpctlQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeQuery for WpctlQuery {
    fn query(&self, stream: StreamType) -> Result<VolumeState> {
        let target = self.target(stream);

        let output = Command::new("wpctl")
            .args(["get-volume", target])
            .output()
            .context("Failed to execute wpctl")?;

        if !output.status.success() {
            bail!("wpctl get-volume {} exited with {}", target, output.status);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (current, muted) = parse_volume_output(&stdout)
            .with_context(|| format!("Unexpected wpctl output: {:?}", stdout.trim()))?;

        Ok(VolumeState {
            stream,
            current,
            max: VOLUME_STEPS,
            muted,
        })
    }
}

/// Parse `wpctl get-volume` output into integer steps plus mute flag.
///
/// Output format: "Volume: 0.45 [MUTED]" or "Volume: 0.45"
fn parse_volume_output(output: &str) -> Option<(u32, bool)> {
    let parts: Vec<&str> = output.split_whitespace().collect();

    if parts.len() < 2 || parts[0] != "Volume:" {
        return None;
    }

    let volume_float: f32 = parts[1].parse().ok()?;
    if !volume_float.is_finite() || volume_float < 0.0 {
        return None;
    }

    let current = (volume_float * VOLUME_STEPS as f32).round() as u32;
    let muted = output.contains("[MUTED]");

    Some((current, muted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_volume() {
        assert_eq!(parse_volume_output("Volume: 0.45\n"), Some((45, false)));
        assert_eq!(parse_volume_output("Volume: 1.00"), Some((100, false)));
        assert_eq!(parse_volume_output("Volume: 0.00"), Some((0, false)));
    }

    #[test]
    fn test_parse_muted_volume() {
        assert_eq!(
            parse_volume_output("Volume: 0.45 [MUTED]\n"),
            Some((45, true))
        );
    }

    #[test]
    fn test_parse_boosted_volume() {
        // Boosted sinks report above 1.0; the value passes through unclamped
        assert_eq!(parse_volume_output("Volume: 1.50"), Some((150, false)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_volume_output(""), None);
        assert_eq!(parse_volume_output("Volume:"), None);
        assert_eq!(parse_volume_output("Volume: loud"), None);
        assert_eq!(parse_volume_output("Error: no such node"), None);
        assert_eq!(parse_volume_output("Volume: -0.2"), None);
    }

    #[test]
    fn test_stream_name_round_trip() {
        for stream in StreamType::ALL {
            assert_eq!(StreamType::parse(stream.as_str()), Some(stream));
        }
        assert_eq!(StreamType::parse("podcast"), None);
        assert_eq!(StreamType::parse("Media"), None);
    }

    #[test]
    fn test_default_targets() {
        let query = WpctlQuery::new();
        for stream in StreamType::ALL {
            assert_eq!(query.target(stream), DEFAULT_SINK);
        }
    }

    #[test]
    fn test_target_override() {
        let mut query = WpctlQuery::new();
        query.set_target(StreamType::Alarm, "55");

        assert_eq!(query.target(StreamType::Alarm), "55");
        assert_eq!(query.target(StreamType::Media), DEFAULT_SINK);
    }
}
