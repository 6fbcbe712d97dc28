//! `sensfloor-perception` – from tile layout to blob outlines.
//!
//! # Modules
//!
//! - [`geometry`] – [`GeometryBuilder`][geometry::GeometryBuilder] and
//!   [`build_layout`][geometry::build_layout]: shared, deduplicated vertex
//!   buffer and the eight-field fan of every tile, for grid and strip
//!   layouts.
//! - [`cluster`] – [`find_blobs`][cluster::find_blobs]: groups active fields
//!   that share triangle edges and traces each group's outline into a closed
//!   polygon.

pub mod cluster;
pub mod geometry;

pub use cluster::{ActiveField, Edge, find_blobs};
pub use geometry::{FloorGeometry, GeometryBuilder, TilePlan, build_layout};
