//! Progress line parsing
//!
//! The external tool reports encoding status on stderr as key=value pairs:
//!
//! ```text
//! frame=  120 fps= 25 q=28.0 size=     512KiB time=00:00:04.80 bitrate= 873.2kbits/s speed=1.02x
//! ```
//!
//! The core mandates no parsing; this module is the optional collaborator
//! that turns those lines into structured updates for a `ProgressSink`.

use serde::{Deserialize, Serialize};

/// One parsed progress report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Frames processed so far
    pub frames: Option<u64>,
    /// Current processing rate in frames per second
    pub fps: Option<f64>,
    /// Position in the output, in seconds
    pub time_seconds: Option<f64>,
    /// Processing speed relative to real time
    pub speed: Option<f64>,
}

impl ProgressUpdate {
    /// Parse a status line; returns `None` for lines that carry no
    /// recognizable progress fields
    pub fn parse(line: &str) -> Option<Self> {
        let update = Self {
            frames: field(line, "frame=").and_then(|v| v.parse().ok()),
            fps: field(line, "fps=").and_then(|v| v.parse().ok()),
            time_seconds: field(line, "time=").and_then(parse_timestamp),
            speed: field(line, "speed=")
                .map(|v| v.trim_end_matches('x'))
                .and_then(|v| v.parse().ok()),
        };

        if update.frames.is_none() && update.time_seconds.is_none() {
            return None;
        }
        Some(update)
    }
}

/// Extract the whitespace-delimited value following `key` in `line`
///
/// The key must sit at a token boundary (start of line or after
/// whitespace), so `frame=` never matches inside `dup_frame=`.
fn field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let mut from = 0;
    loop {
        let at = line[from..].find(key)? + from;
        if at == 0 || line[..at].ends_with(char::is_whitespace) {
            let rest = line[at + key.len()..].trim_start();
            let end = rest
                .find(char::is_whitespace)
                .unwrap_or(rest.len());
            let value = &rest[..end];
            return (!value.is_empty()).then_some(value);
        }
        from = at + key.len();
    }
}

/// Parse `HH:MM:SS.cc` into seconds
fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}
