use std::time::Duration as StdDuration;

use serde::{Deserialize, Serialize};
use web_time::{SystemTime, UNIX_EPOCH};

/// Wall-clock stamp split into seconds and nanoseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(default)]
pub struct Time {
    pub secs: u32,
    pub nsecs: u32,
}

impl Time {
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            secs: elapsed.as_secs() as u32,
            nsecs: elapsed.subsec_nanos(),
        }
    }

    /// The zero stamp means "latest available" in transform lookups.
    pub fn is_zero(&self) -> bool {
        self.secs == 0 && self.nsecs == 0
    }

    pub fn as_duration(&self) -> StdDuration {
        StdDuration::new(self.secs as u64, self.nsecs)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Duration {
    pub secs: i32,
    pub nsecs: i32,
}

impl Duration {
    pub fn is_zero(&self) -> bool {
        self.secs == 0 && self.nsecs == 0
    }

    /// Negative durations clamp to zero.
    pub fn as_std(&self) -> StdDuration {
        let total_nanos = self.secs as i64 * 1_000_000_000 + self.nsecs as i64;
        StdDuration::from_nanos(total_nanos.max(0) as u64)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Header {
    pub seq: u32,
    pub stamp: Time,
    pub frame_id: String,
}

impl Header {
    pub fn with_frame(frame_id: impl Into<String>) -> Self {
        Self {
            frame_id: frame_id.into(),
            ..Default::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ColorRGBA {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for ColorRGBA {
    fn default() -> Self {
        Self {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            a: 1.0,
        }
    }
}

impl ColorRGBA {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}
