//! Floor mesh construction.
//!
//! Every tile is a fan of eight triangular fields around its centre vertex:
//!
//! ```text
//! 7-6-5
//! |\|/|
//! 8 0 4
//! |/|\|
//! 1-2-3
//! ```
//!
//! Field enumeration starts with the triangle in the top right-most corner
//! `(0, 6, 5)` and walks clockwise.  All tiles share one vertex buffer;
//! positions are deduplicated by exact equality, so neighbouring tiles
//! reference the same boundary vertices and their fields become
//! edge-adjacent.
//!
//! # Example
//!
//! ```rust
//! use sensfloor_perception::geometry::build_layout;
//! use sensfloor_types::{LayoutConfig, TILE_SIZE_SMALL};
//!
//! let layout = LayoutConfig::Grid {
//!     rows: 1,
//!     cols: 2,
//!     tile_size: TILE_SIZE_SMALL,
//!     custom_ids: Vec::new(),
//! };
//! let floor = build_layout(&layout).unwrap();
//!
//! assert_eq!(floor.tiles.len(), 2);
//! // 9 + 9 positions, 3 of them shared along the common edge.
//! assert_eq!(floor.vertices.len(), 15);
//! ```

use sensfloor_types::{FIELDS_PER_TILE, FloorError, LayoutConfig, TileId, Triangle, Vertex};
use tracing::error;

/// Fan order as offsets into the nine positions of a tile.
const FAN: [[usize; 3]; FIELDS_PER_TILE] = [
    [0, 6, 5],
    [0, 5, 4],
    [0, 4, 3],
    [0, 3, 2],
    [0, 2, 1],
    [0, 1, 8],
    [0, 8, 7],
    [0, 7, 6],
];

/// Placement of one tile within the shared vertex buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePlan {
    pub id: TileId,
    pub center: usize,
    pub fields: [Triangle; FIELDS_PER_TILE],
}

/// Output of the builder: the vertex buffer plus one plan per present tile,
/// in placement order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloorGeometry {
    pub vertices: Vec<Vertex>,
    pub tiles: Vec<TilePlan>,
}

impl FloorGeometry {
    /// Shift every vertex by `offset`.
    pub fn translate(&mut self, offset: [f32; 3]) {
        for v in &mut self.vertices {
            *v = v.translated(offset);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// GeometryBuilder
// ────────────────────────────────────────────────────────────────────────────

/// Incrementally places tiles into a shared, deduplicated vertex buffer.
#[derive(Debug, Default)]
pub struct GeometryBuilder {
    vertices: Vec<Vertex>,
    tiles: Vec<TilePlan>,
}

impl GeometryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `p` unless an identical position already exists; return its
    /// index either way.  Linear scan; setup-time only.
    pub fn add_vertex(&mut self, p: Vertex) -> usize {
        if let Some(i) = self.vertices.iter().position(|v| *v == p) {
            return i;
        }
        self.vertices.push(p);
        self.vertices.len() - 1
    }

    /// Place one tile with its lower-left corner at `origin`.
    ///
    /// With `id == None` only the vertices are placed, keeping the mesh
    /// continuous around a missing tile.
    pub fn add_tile(&mut self, id: Option<TileId>, origin: [f32; 2], tile_size: [f32; 2]) {
        let [x, y] = origin;
        let [w, h] = tile_size;
        let (sx, sy) = (w * 0.5, h * 0.5);

        let positions = [
            Vertex::new(x + sx, y + sy, 0.0),
            Vertex::new(x, y, 0.0),
            Vertex::new(x + sx, y, 0.0),
            Vertex::new(x + w, y, 0.0),
            Vertex::new(x + w, y + sy, 0.0),
            Vertex::new(x + w, y + h, 0.0),
            Vertex::new(x + sx, y + h, 0.0),
            Vertex::new(x, y + h, 0.0),
            Vertex::new(x, y + sy, 0.0),
        ];
        let idx = positions.map(|p| self.add_vertex(p));

        if let Some(id) = id {
            let fields = FAN.map(|[a, b, c]| Triangle::new(idx[a], idx[b], idx[c]));
            self.tiles.push(TilePlan {
                id,
                center: idx[0],
                fields,
            });
        }
    }

    pub fn build(self) -> FloorGeometry {
        FloorGeometry {
            vertices: self.vertices,
            tiles: self.tiles,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Layouts
// ────────────────────────────────────────────────────────────────────────────

/// Build the geometry described by `layout`.
///
/// # Errors
///
/// * [`FloorError::InsufficientTileIds`] when a grid's custom id list is
///   shorter than two entries per tile.  No tiles are produced.
/// * [`FloorError::InvalidLayout`] for empty grids, non-positive tile sizes,
///   odd-length or out-of-range id lists, and `per_row == 0` strips.
pub fn build_layout(layout: &LayoutConfig) -> Result<FloorGeometry, FloorError> {
    match layout {
        LayoutConfig::Grid {
            rows,
            cols,
            tile_size,
            custom_ids,
        } => build_grid(*rows, *cols, *tile_size, custom_ids),
        LayoutConfig::Strip {
            ids,
            per_row,
            tile_size,
        } => build_strip(ids, *per_row, *tile_size),
    }
}

fn build_grid(
    rows: usize,
    cols: usize,
    tile_size: [f32; 2],
    custom_ids: &[i32],
) -> Result<FloorGeometry, FloorError> {
    check_tile_size(tile_size)?;
    if rows == 0 || cols == 0 {
        return Err(FloorError::InvalidLayout(format!("empty grid {rows}x{cols}")));
    }
    let required = rows * cols * 2;
    if !custom_ids.is_empty() && custom_ids.len() < required {
        error!(
            required,
            provided = custom_ids.len(),
            "not enough custom tile ids to fill the floor"
        );
        return Err(FloorError::InsufficientTileIds {
            required,
            provided: custom_ids.len(),
        });
    }

    let mut builder = GeometryBuilder::new();
    for row in 0..rows {
        for col in 0..cols {
            let id = if custom_ids.is_empty() {
                Some(default_id(row, col)?)
            } else {
                let n = (row * cols + col) * 2;
                tile_id_from_pair(custom_ids[n], custom_ids[n + 1])?
            };
            let origin = [tile_size[0] * col as f32, tile_size[1] * row as f32];
            builder.add_tile(id, origin, tile_size);
        }
    }
    Ok(builder.build())
}

fn build_strip(ids: &[i32], per_row: usize, tile_size: [f32; 2]) -> Result<FloorGeometry, FloorError> {
    check_tile_size(tile_size)?;
    if per_row == 0 {
        return Err(FloorError::InvalidLayout("strip needs per_row > 0".into()));
    }
    if ids.len() % 2 != 0 {
        return Err(FloorError::InvalidLayout(format!(
            "strip id list has odd length {}",
            ids.len()
        )));
    }

    let mut builder = GeometryBuilder::new();
    for (i, pair) in ids.chunks_exact(2).enumerate() {
        let id = tile_id_from_pair(pair[0], pair[1])?;
        let (row, col) = (i / per_row, i % per_row);
        let origin = [tile_size[0] * col as f32, tile_size[1] * row as f32];
        builder.add_tile(id, origin, tile_size);
    }
    Ok(builder.build())
}

fn check_tile_size([w, h]: [f32; 2]) -> Result<(), FloorError> {
    if w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite() {
        Ok(())
    } else {
        Err(FloorError::InvalidLayout(format!("tile size {w}x{h}")))
    }
}

fn default_id(row: usize, col: usize) -> Result<TileId, FloorError> {
    match (u8::try_from(row), u8::try_from(col)) {
        (Ok(r), Ok(c)) => Ok(TileId(r, c)),
        _ => Err(FloorError::InvalidLayout(format!(
            "default id ({row}, {col}) does not fit in two bytes"
        ))),
    }
}

/// `-1` in either half marks an absent tile.
fn tile_id_from_pair(a: i32, b: i32) -> Result<Option<TileId>, FloorError> {
    if a < 0 || b < 0 {
        return Ok(None);
    }
    match (u8::try_from(a), u8::try_from(b)) {
        (Ok(a), Ok(b)) => Ok(Some(TileId(a, b))),
        _ => Err(FloorError::InvalidLayout(format!("tile id ({a}, {b}) out of range"))),
    }
}
