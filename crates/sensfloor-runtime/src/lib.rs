//! `sensfloor-runtime` – the running sensor floor.
//!
//! # Modules
//!
//! - [`floor`] – [`SensorFloor`][floor::SensorFloor]: configure a layout,
//!   start and stop the worker, read blobs and connection state, adjust the
//!   threshold.
//! - [`worker`] – the single background thread that owns the serial link and
//!   the tile registry, and [`ConnectionState`][worker::ConnectionState].
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with an optional OTLP span exporter.

pub mod floor;
pub mod telemetry;
pub mod worker;

pub use floor::SensorFloor;
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use worker::{ConnectionState, LinkSettings};
