//! `sensfloor-types` – shared vocabulary of the sensor-floor workspace.
//!
//! Every other crate speaks in these types: tile identifiers as they appear
//! on the wire, vertices and triangles of the floor mesh, the published
//! [`Blob`] outlines, the deployment [`FloorConfig`], and the single
//! [`FloorError`] enum.

pub mod config;
pub mod error;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use config::{Endpoint, FloorConfig, FramingMode, LayoutConfig};
pub use error::FloorError;

/// Number of triangular fields every tile reports.
pub const FIELDS_PER_TILE: usize = 8;

/// Footprint of a small (square) tile, in floor units.
pub const TILE_SIZE_SMALL: [f32; 2] = [50.0, 50.0];

/// Footprint of a large (rectangular) tile, in floor units.
pub const TILE_SIZE_LARGE: [f32; 2] = [50.0, 100.0];

/// Default serial baud rate of the transceiver.
pub const BAUD_RATE_DEFAULT: u32 = 115_200;

/// Default activation threshold for normalised field values.
pub const DEFAULT_THRESHOLD: f32 = 0.07;

// ────────────────────────────────────────────────────────────────────────────
// Identifiers
// ────────────────────────────────────────────────────────────────────────────

/// Two-byte tile (module) address, exactly as carried in bytes 3-4 of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u8, pub u8);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}", self.0, self.1)
    }
}

/// Address of one field: the owning tile plus the field's position in the fan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldRef {
    pub tile: TileId,
    pub field: u8,
}

impl FieldRef {
    pub fn new(tile: TileId, field: u8) -> Self {
        Self { tile, field }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Mesh primitives
// ────────────────────────────────────────────────────────────────────────────

/// A position on the floor.  Compared by exact equality, which is what lets
/// neighbouring tiles share their boundary vertices.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Return this vertex shifted by `offset`.
    pub fn translated(self, offset: [f32; 3]) -> Self {
        Self::new(self.x + offset[0], self.y + offset[1], self.z + offset[2])
    }
}

/// Three indices into the shared vertex buffer.  The first index is always
/// the tile centre; the other two walk the tile outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle(pub [usize; 3]);

impl Triangle {
    pub fn new(a: usize, b: usize, c: usize) -> Self {
        Self([a, b, c])
    }

    pub fn indices(&self) -> [usize; 3] {
        self.0
    }

    /// Number of vertex indices this triangle has in common with `other`.
    /// Two means the triangles share a full edge.
    pub fn shared_vertices(&self, other: &Triangle) -> usize {
        self.0.iter().filter(|i| other.0.contains(i)).count()
    }

    /// True when all three indices are distinct.
    pub fn is_proper(&self) -> bool {
        let [a, b, c] = self.0;
        a != b && b != c && a != c
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

/// Closed outline of one cluster of active fields.
///
/// `indices` is a loop into the floor's vertex buffer whose first and last
/// entries are equal; `fields` lists the cluster members in discovery order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Blob {
    pub indices: Vec<usize>,
    pub fields: Vec<FieldRef>,
}

impl Blob {
    /// True when the loop starts and ends on the same vertex.
    pub fn is_closed(&self) -> bool {
        self.indices.len() > 1 && self.indices.first() == self.indices.last()
    }

    /// Resolve the loop's indices to positions.  Indices outside `vertices`
    /// are skipped.
    pub fn outline(&self, vertices: &[Vertex]) -> Vec<Vertex> {
        self.indices
            .iter()
            .filter_map(|&i| vertices.get(i).copied())
            .collect()
    }
}

/// An RGBA colour.  Carried for the rendering layer only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::new(255, 0, 0, 255)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_id_displays_as_hex_pair() {
        assert_eq!(TileId(0x0a, 0xff).to_string(), "0a:ff");
    }

    #[test]
    fn triangle_shared_vertices_counts_common_indices() {
        let a = Triangle::new(0, 1, 2);
        assert_eq!(a.shared_vertices(&Triangle::new(0, 2, 7)), 2);
        assert_eq!(a.shared_vertices(&Triangle::new(0, 5, 7)), 1);
        assert_eq!(a.shared_vertices(&Triangle::new(4, 5, 6)), 0);
        assert_eq!(a.shared_vertices(&a), 3);
    }

    #[test]
    fn triangle_with_repeated_index_is_not_proper() {
        assert!(Triangle::new(0, 1, 2).is_proper());
        assert!(!Triangle::new(0, 1, 0).is_proper());
    }

    #[test]
    fn blob_outline_resolves_positions() {
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        ];
        let blob = Blob {
            indices: vec![0, 1, 2, 0],
            fields: vec![FieldRef::new(TileId(0, 0), 3)],
        };
        assert!(blob.is_closed());
        let outline = blob.outline(&vertices);
        assert_eq!(outline.len(), 4);
        assert_eq!(outline[1], Vertex::new(1.0, 0.0, 0.0));
        assert_eq!(outline[0], outline[3]);
    }

    #[test]
    fn empty_blob_is_not_closed() {
        assert!(!Blob::default().is_closed());
    }

    #[test]
    fn vertex_translation() {
        let v = Vertex::new(1.0, 2.0, 3.0).translated([10.0, -2.0, 0.5]);
        assert_eq!(v, Vertex::new(11.0, 0.0, 3.5));
    }

    #[test]
    fn blob_json_roundtrip() {
        let blob = Blob {
            indices: vec![4, 5, 6, 4],
            fields: vec![FieldRef::new(TileId(1, 2), 0)],
        };
        let json = serde_json::to_string(&blob).unwrap();
        let back: Blob = serde_json::from_str(&json).unwrap();
        assert_eq!(blob, back);
    }

    #[test]
    fn default_highlight_is_opaque_red() {
        assert_eq!(Rgba::default(), Rgba::new(255, 0, 0, 255));
    }
}
