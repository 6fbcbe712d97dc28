//! Deployment description of one sensor floor.
//!
//! [`FloorConfig`] is plain data: every field has a default so a partial
//! TOML document is enough.  Loading and persisting it is the CLI's job.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BAUD_RATE_DEFAULT, DEFAULT_THRESHOLD, TILE_SIZE_SMALL};

/// How the byte-stream framer recovers from garbage and dropped bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramingMode {
    /// Dispatch at exactly 17 buffered bytes, reset on a sentinel once the
    /// buffer holds 17 or more.  Matches deployed transceiver tooling.
    #[default]
    Legacy,
    /// Hunt for the sentinel and let a later in-frame sentinel followed by
    /// the room address supersede a truncated candidate.
    Resync,
}

/// Serial endpoint, by device name or by position in the enumerated list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
    Index(usize),
    Name(String),
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Name("/dev/ttyUSB0".to_string())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Index(i) => write!(f, "device #{i}"),
            Endpoint::Name(name) => f.write_str(name),
        }
    }
}

/// Physical arrangement of the tiles.
///
/// Id lists are flat `[a0, b0, a1, b1, …]` pairs; a pair containing `-1`
/// marks a position without a tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LayoutConfig {
    /// `rows × cols` tiles in row-major order.  An empty `custom_ids` list
    /// assigns `(row, col)` to every tile.
    Grid {
        rows: usize,
        cols: usize,
        #[serde(default = "default_tile_size")]
        tile_size: [f32; 2],
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        custom_ids: Vec<i32>,
    },
    /// Tiles placed left to right, wrapping every `per_row` tiles.
    Strip {
        ids: Vec<i32>,
        per_row: usize,
        #[serde(default = "default_tile_size")]
        tile_size: [f32; 2],
    },
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig::Grid {
            rows: 1,
            cols: 1,
            tile_size: TILE_SIZE_SMALL,
            custom_ids: Vec::new(),
        }
    }
}

/// Everything needed to bring one floor online.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorConfig {
    /// Room (group) address the transceiver stamps on every frame.
    #[serde(default = "default_room")]
    pub room: [u8; 2],

    /// Translation applied to every vertex of the floor.
    #[serde(default)]
    pub origin: [f32; 3],

    /// Normalised value above which a field counts as active.
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    #[serde(default)]
    pub port: Endpoint,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Open attempts before the worker gives up.
    #[serde(default = "default_max_reconnects")]
    pub max_reconnects: u32,

    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,

    /// Sleep between read-loop iterations.
    #[serde(default = "default_loop_sleep_ms")]
    pub loop_sleep_ms: u64,

    /// Cadence of the staleness scan.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Age after which an active tile is re-polled.
    #[serde(default = "default_staleness_ms")]
    pub staleness_ms: u64,

    #[serde(default)]
    pub framing: FramingMode,

    #[serde(default)]
    pub layout: LayoutConfig,
}

fn default_room() -> [u8; 2] {
    [1, 1]
}
fn default_tile_size() -> [f32; 2] {
    TILE_SIZE_SMALL
}
fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}
fn default_baud_rate() -> u32 {
    BAUD_RATE_DEFAULT
}
fn default_max_reconnects() -> u32 {
    5
}
fn default_reconnect_backoff_ms() -> u64 {
    100
}
fn default_loop_sleep_ms() -> u64 {
    2
}
fn default_poll_interval_ms() -> u64 {
    10
}
fn default_staleness_ms() -> u64 {
    100
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            room: default_room(),
            origin: [0.0; 3],
            threshold: default_threshold(),
            port: Endpoint::default(),
            baud_rate: default_baud_rate(),
            max_reconnects: default_max_reconnects(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
            loop_sleep_ms: default_loop_sleep_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            staleness_ms: default_staleness_ms(),
            framing: FramingMode::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl FloorConfig {
    /// Grid layout with default ids and small tiles.
    pub fn grid(room: [u8; 2], rows: usize, cols: usize) -> Self {
        Self {
            room,
            layout: LayoutConfig::Grid {
                rows,
                cols,
                tile_size: TILE_SIZE_SMALL,
                custom_ids: Vec::new(),
            },
            ..Self::default()
        }
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn loop_sleep(&self) -> Duration {
        Duration::from_millis(self.loop_sleep_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn staleness(&self) -> Duration {
        Duration::from_millis(self.staleness_ms)
    }
}
