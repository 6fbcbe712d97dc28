//! Periodic blob report: one line of text or one JSON object per tick.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use sensfloor_runtime::{ConnectionState, SensorFloor};
use sensfloor_types::Vertex;

#[derive(Debug, Serialize)]
pub struct BlobReport {
    pub timestamp: String,
    pub state: &'static str,
    pub blobs: Vec<BlobSummary>,
}

#[derive(Debug, Serialize)]
pub struct BlobSummary {
    /// Tiles touched, as `"aa:bb"`.
    pub tiles: Vec<String>,
    pub fields: usize,
    /// Mean of the outline's distinct corners.
    pub centroid: [f32; 2],
    pub outline: Vec<[f32; 2]>,
}

pub fn state_name(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Idle => "idle",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Connected => "connected",
        ConnectionState::Failed => "failed",
    }
}

impl BlobReport {
    pub fn capture(floor: &SensorFloor) -> Self {
        let blobs = floor
            .blobs()
            .iter()
            .map(|blob| {
                let mut tiles: Vec<String> = blob.fields.iter().map(|f| f.tile.to_string()).collect();
                tiles.dedup();
                let outline = blob.outline(floor.vertices());
                BlobSummary {
                    tiles,
                    fields: blob.fields.len(),
                    centroid: centroid(&outline),
                    outline: outline.iter().map(|v| [v.x, v.y]).collect(),
                }
            })
            .collect();
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            state: state_name(floor.connection_state()),
            blobs,
        }
    }

    pub fn to_text(&self) -> String {
        if self.blobs.is_empty() {
            return format!("{} [{}] no blobs", self.timestamp, self.state);
        }
        let parts: Vec<String> = self
            .blobs
            .iter()
            .map(|b| {
                format!(
                    "({:.1}, {:.1}) {} field(s) on {}",
                    b.centroid[0],
                    b.centroid[1],
                    b.fields,
                    b.tiles.join(",")
                )
            })
            .collect();
        format!(
            "{} [{}] {} blob(s): {}",
            self.timestamp,
            self.state,
            self.blobs.len(),
            parts.join("; ")
        )
    }
}

/// Closed outlines repeat their first vertex; it is counted once.
fn centroid(outline: &[Vertex]) -> [f32; 2] {
    let corners = match outline {
        [first, .., last] if first == last => &outline[..outline.len() - 1],
        _ => outline,
    };
    if corners.is_empty() {
        return [0.0, 0.0];
    }
    let n = corners.len() as f32;
    let (sx, sy) = corners.iter().fold((0.0, 0.0), |(x, y), v| (x + v.x, y + v.y));
    [sx / n, sy / n]
}
