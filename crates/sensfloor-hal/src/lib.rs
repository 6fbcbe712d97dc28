//! `sensfloor-hal` – tile state and the transport it is fed from.
//!
//! # Modules
//!
//! - [`registry`] – [`TileRegistry`][registry::TileRegistry]: arena of
//!   [`Tile`][registry::Tile]s with a lookup by tile id.
//! - [`decoder`] – [`FrameDecoder`][decoder::FrameDecoder]: validates a frame's
//!   room address and writes its samples into the addressed tile.
//! - [`link`] – [`SerialLink`][link::SerialLink] trait for the byte transport.
//! - [`sim`] – [`SimLink`][sim::SimLink]: in-memory transport for tests and
//!   demos.
//! - `serial` – `SerialPortLink` over a real port (feature `serial`).

pub mod decoder;
pub mod link;
pub mod registry;
#[cfg(feature = "serial")]
pub mod serial;
pub mod sim;

pub use decoder::FrameDecoder;
pub use link::{SerialLink, resolve_endpoint};
pub use registry::{Field, Tile, TileRegistry};
#[cfg(feature = "serial")]
pub use serial::SerialPortLink;
pub use sim::{SimHandle, SimLink};
