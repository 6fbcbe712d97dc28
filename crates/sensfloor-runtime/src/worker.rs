//! The background worker: the only thread that touches the serial link and
//! the tile registry.
//!
//! Each loop cycle either (re)connects through the [`ReconnectPolicy`] or
//! performs one bounded read through the framer and decoder, reclusters
//! after each accepted frame, and on every n-th cycle polls stale tiles.
//! Results cross to the host only through [`Shared`].

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use sensfloor_hal::{FrameDecoder, SerialLink, TileRegistry};
use sensfloor_kernel::{PollCadence, ReconnectPolicy, StalenessScheduler};
use sensfloor_perception::find_blobs;
use sensfloor_protocol::Framer;
use sensfloor_types::{Blob, Endpoint, FloorError};
use tracing::{debug, error, info, info_span, warn};

/// Largest single read from the link.
const READ_CHUNK: usize = 1024;

// ────────────────────────────────────────────────────────────────────────────
// Connection state
// ────────────────────────────────────────────────────────────────────────────

/// Observable state of the serial connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No worker running.
    Idle,
    /// Opening the link, possibly retrying.
    Connecting,
    Connected,
    /// The attempt budget ran out; the worker has exited.
    Failed,
}

impl ConnectionState {
    fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Idle => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Failed => 3,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Failed,
            _ => ConnectionState::Idle,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared state
// ────────────────────────────────────────────────────────────────────────────

/// State read by the host while the worker runs.
#[derive(Debug)]
pub(crate) struct Shared {
    running: AtomicBool,
    state: AtomicU8,
    threshold: AtomicU32,
    blobs: Mutex<Arc<Vec<Blob>>>,
}

impl Shared {
    pub(crate) fn new(threshold: f32) -> Self {
        Self {
            running: AtomicBool::new(false),
            state: AtomicU8::new(ConnectionState::Idle.to_u8()),
            threshold: AtomicU32::new(threshold.to_bits()),
            blobs: Mutex::new(Arc::new(Vec::new())),
        }
    }

    pub(crate) fn running(&self) -> &AtomicBool {
        &self.running
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }

    pub(crate) fn threshold(&self) -> f32 {
        f32::from_bits(self.threshold.load(Ordering::Relaxed))
    }

    pub(crate) fn set_threshold(&self, value: f32) {
        self.threshold.store(value.to_bits(), Ordering::Relaxed);
    }

    fn lock_blobs(&self) -> MutexGuard<'_, Arc<Vec<Blob>>> {
        self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current blob list.  Never observes a partially built list.
    pub(crate) fn blobs(&self) -> Arc<Vec<Blob>> {
        Arc::clone(&self.lock_blobs())
    }

    /// Swap in a fully built list.
    pub(crate) fn publish(&self, blobs: Vec<Blob>) {
        let next = Arc::new(blobs);
        *self.lock_blobs() = next;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Worker
// ────────────────────────────────────────────────────────────────────────────

/// Connection parameters for one worker run.
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub target: Endpoint,
    pub baud_rate: u32,
    pub policy: ReconnectPolicy,
}

pub(crate) struct Worker {
    pub(crate) link: Box<dyn SerialLink>,
    pub(crate) settings: LinkSettings,
    pub(crate) framer: Framer,
    pub(crate) decoder: FrameDecoder,
    pub(crate) registry: TileRegistry,
    pub(crate) scheduler: StalenessScheduler,
    pub(crate) cadence: PollCadence,
    pub(crate) loop_sleep: Duration,
    pub(crate) shared: Arc<Shared>,
}

impl Worker {
    /// Run until stopped or the connection budget is spent, then hand the
    /// registry back.
    pub(crate) fn run(mut self) -> TileRegistry {
        let span = info_span!("sensfloor_worker", endpoint = %self.settings.target);
        let _enter = span.enter();

        info!(endpoints = ?self.link.list_endpoints(), "available serial endpoints");
        info!(
            room = ?self.decoder.room(),
            framing = ?self.framer.mode(),
            staleness_ms = self.scheduler.window().as_millis() as u64,
            tiles = self.registry.len(),
            "worker started"
        );
        let mut published_threshold = self.shared.threshold();
        self.publish(published_threshold);

        while self.shared.is_running() {
            if !self.link.is_open() {
                if !self.connect() {
                    break;
                }
                continue;
            }

            let threshold = self.shared.threshold();
            if threshold != published_threshold {
                debug!(threshold, "threshold changed, reclustering");
                self.publish(threshold);
                published_threshold = threshold;
            }

            if let Err(e) = self.drain(threshold) {
                warn!(error = %e, "serial read failed, reconnecting");
                if !self.connect() {
                    break;
                }
                continue;
            }
            if self.cadence.tick() {
                self.poll_stale(threshold, Instant::now());
            }
            thread::sleep(self.loop_sleep);
        }

        if self.shared.state() != ConnectionState::Failed {
            self.shared.set_state(ConnectionState::Idle);
        }
        let stats = self.framer.stats();
        info!(
            frames = stats.frames,
            resyncs = stats.resyncs,
            discarded = stats.discarded,
            "worker stopped"
        );
        self.registry
    }

    /// Open the link.  Returns `false` when the loop should end.
    fn connect(&mut self) -> bool {
        self.shared.set_state(ConnectionState::Connecting);
        let settings = &self.settings;
        match settings.policy.connect(
            self.link.as_mut(),
            &settings.target,
            settings.baud_rate,
            self.shared.running(),
        ) {
            Ok(_) => {
                self.shared.set_state(ConnectionState::Connected);
                true
            }
            Err(e) => {
                if self.shared.is_running() {
                    error!(error = %e, "connection failed");
                    self.shared.set_state(ConnectionState::Failed);
                    self.shared.running().store(false, Ordering::Release);
                }
                false
            }
        }
    }

    /// Feed one bounded read through the framer and decoder.  Bytes beyond
    /// [`READ_CHUNK`] wait for the next cycle so the running flag and the
    /// staleness scan are never starved by a busy link.
    fn drain(&mut self, threshold: f32) -> Result<(), FloorError> {
        let available = self.link.bytes_available()?;
        if available == 0 {
            return Ok(());
        }
        let mut buf = [0u8; READ_CHUNK];
        let n = self.link.read_bytes(&mut buf[..available.min(READ_CHUNK)])?;
        let now = Instant::now();
        for frame in self.framer.feed(&buf[..n]) {
            match self.decoder.apply(&frame, &mut self.registry, threshold, now) {
                Ok(_) => self.publish(threshold),
                Err(e @ FloorError::ProtocolMismatch { .. }) => {
                    debug!(error = %e, "frame discarded");
                }
                Err(e) => warn!(error = %e, "frame discarded"),
            }
        }
        Ok(())
    }

    fn publish(&self, threshold: f32) {
        let blobs = find_blobs(self.registry.active_fields(threshold));
        self.shared.publish(blobs);
    }

    fn poll_stale(&mut self, threshold: f32, now: Instant) {
        for frame in self.scheduler.scan(&self.registry, threshold, now) {
            debug!(tile = %frame.tile, "polling stale tile");
            if let Err(e) = self.link.write_frame(&frame.to_bytes()) {
                warn!(error = %e, tile = %frame.tile, "poll request not sent");
            }
        }
    }
}
