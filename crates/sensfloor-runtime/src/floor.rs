//! [`SensorFloor`] – the host-facing handle.
//!
//! Configure once, then start and stop the background worker as often as
//! needed.  While the worker runs it owns the tile registry; the host reads
//! blobs, connection state, and the static vertex buffer, and adjusts the
//! threshold.  Stopping joins the worker before the registry is touched
//! again, and dropping the handle stops it.
//!
//! # Example
//!
//! ```rust
//! use sensfloor_hal::SimLink;
//! use sensfloor_runtime::{ConnectionState, SensorFloor};
//! use sensfloor_types::FloorConfig;
//!
//! let mut floor = SensorFloor::configure(FloorConfig::grid([1, 1], 2, 2)).unwrap();
//! assert_eq!(floor.tile_count(), 4);
//!
//! let (link, _handle) = SimLink::new();
//! floor.start(Box::new(link)).unwrap();
//! floor.stop();
//! assert_eq!(floor.connection_state(), ConnectionState::Idle);
//! ```

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use sensfloor_hal::{FrameDecoder, SerialLink, TileRegistry};
use sensfloor_kernel::{PollCadence, ReconnectPolicy, StalenessScheduler};
use sensfloor_perception::{FloorGeometry, build_layout};
use sensfloor_protocol::Framer;
use sensfloor_types::{Blob, Endpoint, FloorConfig, FloorError, LayoutConfig, Rgba, Vertex};
use tracing::{error, info};

use crate::worker::{ConnectionState, LinkSettings, Shared, Worker};

pub struct SensorFloor {
    config: FloorConfig,
    geometry: FloorGeometry,
    registry: Option<TileRegistry>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<TileRegistry>>,
    highlight: Mutex<Rgba>,
}

impl SensorFloor {
    /// Build the floor geometry and tile registry described by `config`.
    ///
    /// Duplicate tile ids are logged and skipped; the floor still builds.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the layout cannot be built, for
    /// example when a custom id list is too short for the grid.
    pub fn configure(config: FloorConfig) -> Result<Self, FloorError> {
        if !config.threshold.is_finite() {
            return Err(FloorError::Config(format!(
                "threshold must be finite, got {}",
                config.threshold
            )));
        }
        let mut geometry = build_layout(&config.layout)?;
        geometry.translate(config.origin);
        let (registry, faults) = TileRegistry::from_geometry(&geometry);

        info!(
            tiles = registry.len(),
            vertices = geometry.vertices.len(),
            skipped = faults.len(),
            room = ?config.room,
            "floor configured"
        );
        Ok(Self {
            shared: Arc::new(Shared::new(config.threshold)),
            config,
            geometry,
            registry: Some(registry),
            handle: None,
            highlight: Mutex::new(Rgba::default()),
        })
    }

    /// Grid shortcut: `custom_ids` is a flat `[a0, b0, a1, b1, …]` list, a
    /// `-1` in a pair leaving that cell without a tile.
    pub fn configure_grid(
        room: [u8; 2],
        rows: usize,
        cols: usize,
        tile_size: [f32; 2],
        custom_ids: Option<Vec<i32>>,
    ) -> Result<Self, FloorError> {
        Self::configure(FloorConfig {
            room,
            layout: LayoutConfig::Grid {
                rows,
                cols,
                tile_size,
                custom_ids: custom_ids.unwrap_or_default(),
            },
            ..FloorConfig::default()
        })
    }

    pub fn config(&self) -> &FloorConfig {
        &self.config
    }

    /// Start the worker on `link` with the configured endpoint, baud rate
    /// and reconnect budget.
    pub fn start(&mut self, link: Box<dyn SerialLink>) -> Result<(), FloorError> {
        let target = self.config.port.clone();
        let (baud_rate, max_reconnects) = (self.config.baud_rate, self.config.max_reconnects);
        self.start_with(link, target, baud_rate, max_reconnects)
    }

    /// Start the worker on `link`, opening `target`.  A running worker is
    /// stopped first.
    ///
    /// # Errors
    ///
    /// Returns [`FloorError::Connection`] when the worker thread cannot be
    /// spawned.  Open failures are not errors here; they surface through
    /// [`connection_state`][Self::connection_state].
    pub fn start_with(
        &mut self,
        link: Box<dyn SerialLink>,
        target: Endpoint,
        baud_rate: u32,
        max_reconnects: u32,
    ) -> Result<(), FloorError> {
        self.stop();
        let registry = self.take_registry();

        let config = &self.config;
        let worker = Worker {
            link,
            settings: LinkSettings {
                target: target.clone(),
                baud_rate,
                policy: ReconnectPolicy::new(max_reconnects, config.reconnect_backoff()),
            },
            framer: Framer::new(config.framing, config.room),
            decoder: FrameDecoder::new(config.room),
            registry,
            scheduler: StalenessScheduler::new(config.room, config.staleness()),
            cadence: PollCadence::new(config.poll_interval(), config.loop_sleep()),
            loop_sleep: config.loop_sleep(),
            shared: Arc::clone(&self.shared),
        };

        self.shared.running().store(true, Ordering::Release);
        self.shared.set_state(ConnectionState::Connecting);
        let spawned = thread::Builder::new()
            .name("sensfloor-worker".to_string())
            .spawn(move || worker.run());
        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.running().store(false, Ordering::Release);
                self.shared.set_state(ConnectionState::Idle);
                self.registry = Some(self.rebuild_registry());
                Err(FloorError::Connection {
                    target: target.to_string(),
                    details: format!("cannot spawn worker: {e}"),
                })
            }
        }
    }

    /// Stop the worker and wait for it to exit.  No-op when idle.
    pub fn stop(&mut self) {
        self.shared.running().store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(registry) => self.registry = Some(registry),
                Err(_) => {
                    error!("worker panicked; tile state reset");
                    self.registry = Some(self.rebuild_registry());
                }
            }
        }
        if self.shared.state() != ConnectionState::Failed {
            self.shared.set_state(ConnectionState::Idle);
        }
    }

    /// Snapshot of the latest published blobs.
    pub fn blobs(&self) -> Vec<Blob> {
        self.shared.blobs().as_ref().clone()
    }

    /// Latest blobs resolved to vertex positions.
    pub fn blob_outlines(&self) -> Vec<Vec<Vertex>> {
        self.shared
            .blobs()
            .iter()
            .map(|b| b.outline(&self.geometry.vertices))
            .collect()
    }

    /// The shared, translated vertex buffer blob indices point into.
    pub fn vertices(&self) -> &[Vertex] {
        &self.geometry.vertices
    }

    pub fn tile_count(&self) -> usize {
        self.geometry
            .tiles
            .iter()
            .map(|t| t.id)
            .collect::<std::collections::BTreeSet<_>>()
            .len()
    }

    pub fn threshold(&self) -> f32 {
        self.shared.threshold()
    }

    /// Change the activity threshold.  The worker reclusters on its next
    /// cycle.
    pub fn set_threshold(&self, threshold: f32) {
        self.shared.set_threshold(threshold);
    }

    pub fn highlight_color(&self) -> Rgba {
        *self.highlight.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn set_highlight_color(&self, color: Rgba) {
        *self.highlight.lock().unwrap_or_else(|p| p.into_inner()) = color;
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Whether a worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn take_registry(&mut self) -> TileRegistry {
        match self.registry.take() {
            Some(registry) => registry,
            None => self.rebuild_registry(),
        }
    }

    fn rebuild_registry(&self) -> TileRegistry {
        TileRegistry::from_geometry(&self.geometry).0
    }
}

impl Drop for SensorFloor {
    fn drop(&mut self) {
        self.stop();
    }
}
