//! [`StalenessScheduler`] – re-polls tiles that stopped talking while active.
//!
//! A tile that keeps reporting a high reading is expected to keep sending
//! frames.  When its last frame is older than the staleness window and one
//! of its fields is still above threshold, the module is suspected stalled
//! and gets a status-request frame addressed to it.  Tiles never heard from
//! have no baseline and are never polled.

use std::time::{Duration, Instant};

use sensfloor_hal::TileRegistry;
use sensfloor_protocol::Frame;
use sensfloor_types::TileId;

// ────────────────────────────────────────────────────────────────────────────
// Scheduler
// ────────────────────────────────────────────────────────────────────────────

/// Selects stale, still-active tiles and builds their poll requests.
///
/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
/// use sensfloor_hal::TileRegistry;
/// use sensfloor_kernel::StalenessScheduler;
///
/// let scheduler = StalenessScheduler::new([1, 1], Duration::from_millis(100));
/// let registry = TileRegistry::new();
/// assert!(scheduler.scan(&registry, 0.07, Instant::now()).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct StalenessScheduler {
    room: [u8; 2],
    window: Duration,
}

impl StalenessScheduler {
    pub fn new(room: [u8; 2], window: Duration) -> Self {
        Self { room, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Ids of tiles whose age exceeds the window and that still hold a
    /// field above `threshold`, in registry order.
    pub fn stale_tiles(&self, registry: &TileRegistry, threshold: f32, now: Instant) -> Vec<TileId> {
        registry
            .iter()
            .filter(|tile| matches!(tile.age(now), Some(age) if age > self.window))
            .filter(|tile| tile.any_active(threshold))
            .map(|tile| tile.id)
            .collect()
    }

    /// One poll-request frame per stale tile.
    pub fn scan(&self, registry: &TileRegistry, threshold: f32, now: Instant) -> Vec<Frame> {
        self.stale_tiles(registry, threshold, now)
            .into_iter()
            .map(|id| Frame::poll_request(self.room, id))
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Cadence
// ────────────────────────────────────────────────────────────────────────────

/// Fires on every n-th loop cycle, where n is the poll interval divided by
/// the loop sleep (at least 1).
#[derive(Debug, Clone)]
pub struct PollCadence {
    every: u64,
    cycles: u64,
}

impl PollCadence {
    pub fn new(poll_interval: Duration, loop_sleep: Duration) -> Self {
        let every = if loop_sleep.is_zero() {
            1
        } else {
            (poll_interval.as_micros() / loop_sleep.as_micros()).max(1) as u64
        };
        Self { every, cycles: 0 }
    }

    pub fn every(&self) -> u64 {
        self.every
    }

    /// Count one loop cycle and report whether a scan is due.
    pub fn tick(&mut self) -> bool {
        self.cycles = self.cycles.wrapping_add(1);
        self.cycles % self.every == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensfloor_perception::build_layout;
    use sensfloor_protocol::{FRAME_LEN, MeaningFlag};
    use sensfloor_types::{LayoutConfig, TILE_SIZE_SMALL};

    const ROOM: [u8; 2] = [0x01, 0x01];

    fn registry() -> TileRegistry {
        let geometry = build_layout(&LayoutConfig::Grid {
            rows: 1,
            cols: 2,
            tile_size: TILE_SIZE_SMALL,
            custom_ids: Vec::new(),
        })
        .unwrap();
        TileRegistry::from_geometry(&geometry).0
    }

    fn touch(reg: &mut TileRegistry, id: TileId, at: Instant, value: f32) {
        let tile = reg.get_mut(id).unwrap();
        tile.last_update = Some(at);
        tile.fields[2].value = value;
    }

    #[test]
    fn stale_active_tile_gets_exactly_one_poll() {
        let mut reg = registry();
        let now = Instant::now() + Duration::from_secs(1);
        touch(&mut reg, TileId(0, 1), now - Duration::from_millis(150), 0.5);

        let scheduler = StalenessScheduler::new(ROOM, Duration::from_millis(100));
        let polls = scheduler.scan(&reg, 0.07, now);
        assert_eq!(polls.len(), 1);

        let poll = polls[0];
        assert_eq!(poll.tile, TileId(0, 1));
        assert_eq!(poll.room, ROOM);
        assert!(poll.meaning.contains(MeaningFlag::StatusRequest));
        let bytes = poll.to_bytes();
        assert_eq!(bytes.len(), FRAME_LEN);
        assert_eq!(bytes[7], 0x04);
        assert!(bytes[9..].iter().all(|&b| b == 0));

        // Still stale at the next tick: polled again.
        assert_eq!(scheduler.scan(&reg, 0.07, now).len(), 1);
    }

    #[test]
    fn recent_tile_is_not_polled() {
        let mut reg = registry();
        let now = Instant::now() + Duration::from_secs(1);
        touch(&mut reg, TileId(0, 0), now - Duration::from_millis(50), 0.5);

        let scheduler = StalenessScheduler::new(ROOM, Duration::from_millis(100));
        assert!(scheduler.scan(&reg, 0.07, now).is_empty());
    }

    #[test]
    fn quiet_or_never_updated_tiles_are_not_polled() {
        let mut reg = registry();
        let now = Instant::now() + Duration::from_secs(1);
        // Stale but below threshold.
        touch(&mut reg, TileId(0, 0), now - Duration::from_millis(500), 0.01);
        // Active value but never updated.
        reg.get_mut(TileId(0, 1)).unwrap().fields[0].value = 0.9;

        let scheduler = StalenessScheduler::new(ROOM, Duration::from_millis(100));
        assert!(scheduler.stale_tiles(&reg, 0.07, now).is_empty());
    }

    #[test]
    fn cadence_fires_every_nth_cycle() {
        let mut cadence = PollCadence::new(Duration::from_millis(10), Duration::from_millis(2));
        assert_eq!(cadence.every(), 5);
        let fired: Vec<bool> = (0..10).map(|_| cadence.tick()).collect();
        assert_eq!(fired.iter().filter(|&&f| f).count(), 2);
        assert!(fired[4] && fired[9]);
    }

    #[test]
    fn cadence_never_divides_by_zero() {
        let mut cadence = PollCadence::new(Duration::from_millis(10), Duration::ZERO);
        assert!(cadence.tick());
        let slow = PollCadence::new(Duration::from_millis(1), Duration::from_millis(5));
        assert_eq!(slow.every(), 1);
    }
}
