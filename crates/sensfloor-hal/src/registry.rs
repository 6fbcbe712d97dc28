//! [`TileRegistry`] – the single source of truth for current sensor values.
//!
//! Tiles live in an arena (`Vec<Tile>`) in placement order; a secondary
//! index maps the two-byte [`TileId`] to the arena slot.  The registry is
//! filled once from the floor geometry and never resized afterwards.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use sensfloor_perception::{ActiveField, FloorGeometry, TilePlan};
use sensfloor_types::{FIELDS_PER_TILE, FieldRef, FloorError, TileId, Triangle};
use tracing::error;

/// One triangular sub-region of a tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub triangle: Triangle,
    /// Latest normalised sample, `0.0` until the first update.
    pub value: f32,
}

impl Field {
    pub fn is_active(&self, threshold: f32) -> bool {
        self.value > threshold
    }
}

/// One physical sensor module.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub id: TileId,
    pub fields: [Field; FIELDS_PER_TILE],
    /// Whether the latest frame carried a sample at or above threshold.
    pub has_active_field: bool,
    /// Time of the last accepted frame; `None` until the first one.
    pub last_update: Option<Instant>,
}

impl Tile {
    fn from_plan(plan: &TilePlan) -> Self {
        Self {
            id: plan.id,
            fields: plan.fields.map(|triangle| Field {
                triangle,
                value: 0.0,
            }),
            has_active_field: false,
            last_update: None,
        }
    }

    /// Time since the last update, or `None` for a tile never heard from.
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.last_update
            .map(|t| now.saturating_duration_since(t))
    }

    /// True when any field is above `threshold`.
    pub fn any_active(&self, threshold: f32) -> bool {
        self.fields.iter().any(|f| f.is_active(threshold))
    }
}

/// Arena of tiles with a lookup by identifier pair.
#[derive(Debug, Default)]
pub struct TileRegistry {
    tiles: Vec<Tile>,
    index: HashMap<TileId, usize>,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from every planned tile.
    ///
    /// Duplicate identifiers are logged and returned; the first tile with a
    /// given id wins and the duplicate is not registered.
    pub fn from_geometry(geometry: &FloorGeometry) -> (Self, Vec<FloorError>) {
        let mut registry = Self::new();
        let mut faults = Vec::new();
        for plan in &geometry.tiles {
            if let Err(e) = registry.insert(plan) {
                error!(error = %e, "skipping tile");
                faults.push(e);
            }
        }
        (registry, faults)
    }

    /// Register a tile built from `plan`, returning its arena slot.
    ///
    /// # Errors
    ///
    /// Returns [`FloorError::DuplicateTile`] when the id is already taken.
    pub fn insert(&mut self, plan: &TilePlan) -> Result<usize, FloorError> {
        if self.index.contains_key(&plan.id) {
            return Err(FloorError::DuplicateTile(plan.id));
        }
        let slot = self.tiles.len();
        self.tiles.push(Tile::from_plan(plan));
        self.index.insert(plan.id, slot);
        Ok(slot)
    }

    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.index.get(&id).map(|&slot| &self.tiles[slot])
    }

    pub fn get_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        match self.index.get(&id) {
            Some(&slot) => self.tiles.get_mut(slot),
            None => None,
        }
    }

    /// All tiles in placement order.
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Every field above `threshold`, tile by tile in fan order.
    ///
    /// Only tiles whose latest frame flagged an active field are scanned.
    pub fn active_fields(&self, threshold: f32) -> Vec<ActiveField> {
        self.tiles
            .iter()
            .filter(|tile| tile.has_active_field)
            .flat_map(|tile| {
                tile.fields
                    .iter()
                    .enumerate()
                    .filter(|(_, f)| f.is_active(threshold))
                    .map(|(i, f)| ActiveField {
                        field: FieldRef::new(tile.id, i as u8),
                        triangle: f.triangle,
                    })
            })
            .collect()
    }
}
