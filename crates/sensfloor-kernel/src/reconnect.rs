//! [`ReconnectPolicy`] – bounded attempts to open the serial link.
//!
//! Each call to [`ReconnectPolicy::connect`] gets a fresh budget of
//! `max_attempts` opens, sleeping the fixed backoff after every failed one.
//! A budget of zero fails immediately without touching the link.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use sensfloor_hal::SerialLink;
use sensfloor_types::{Endpoint, FloorError};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Try to open `target` until it succeeds, the budget is spent, or
    /// `running` is cleared.  Returns the number of attempts used.
    ///
    /// # Errors
    ///
    /// Returns the last [`FloorError::Connection`] once the budget is spent,
    /// or a connection error describing the cancellation.
    pub fn connect(
        &self,
        link: &mut dyn SerialLink,
        target: &Endpoint,
        baud_rate: u32,
        running: &AtomicBool,
    ) -> Result<u32, FloorError> {
        let mut last = FloorError::Connection {
            target: target.to_string(),
            details: "no connection attempts allowed".to_string(),
        };

        for attempt in 1..=self.max_attempts {
            if !running.load(Ordering::Acquire) {
                return Err(FloorError::Connection {
                    target: target.to_string(),
                    details: "stopped while connecting".to_string(),
                });
            }
            info!(endpoint = %target, attempt, baud_rate, "connecting");
            match link.open(target, baud_rate) {
                Ok(()) => {
                    info!(endpoint = %target, attempt, "connected");
                    return Ok(attempt);
                }
                Err(e) => {
                    warn!(error = %e, attempt, max = self.max_attempts, "open failed");
                    last = e;
                    thread::sleep(self.backoff);
                }
            }
        }

        error!(endpoint = %target, attempts = self.max_attempts, "giving up on connection");
        Err(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensfloor_hal::SimLink;

    fn running() -> AtomicBool {
        AtomicBool::new(true)
    }

    #[test]
    fn first_attempt_succeeds() {
        let (mut link, handle) = SimLink::new();
        let policy = ReconnectPolicy::new(3, Duration::ZERO);
        let used = policy
            .connect(&mut link, &Endpoint::Index(0), 115_200, &running())
            .unwrap();
        assert_eq!(used, 1);
        assert!(handle.is_open());
    }

    #[test]
    fn retries_until_open() {
        let (mut link, handle) = SimLink::new();
        handle.fail_next_opens(2);
        let policy = ReconnectPolicy::new(5, Duration::from_millis(1));
        let used = policy
            .connect(&mut link, &Endpoint::Index(0), 115_200, &running())
            .unwrap();
        assert_eq!(used, 3);
    }

    #[test]
    fn exhausted_budget_returns_last_error() {
        let (mut link, handle) = SimLink::new();
        handle.fail_all_opens();
        let policy = ReconnectPolicy::new(4, Duration::ZERO);
        let err = policy
            .connect(&mut link, &Endpoint::Index(0), 115_200, &running())
            .unwrap_err();
        assert!(matches!(err, FloorError::Connection { .. }));
        assert_eq!(handle.open_attempts(), 4);
    }

    #[test]
    fn zero_budget_never_opens() {
        let (mut link, handle) = SimLink::new();
        let policy = ReconnectPolicy::new(0, Duration::ZERO);
        assert!(policy
            .connect(&mut link, &Endpoint::Index(0), 115_200, &running())
            .is_err());
        assert_eq!(handle.open_attempts(), 0);
    }

    #[test]
    fn cleared_flag_cancels() {
        let (mut link, handle) = SimLink::new();
        let policy = ReconnectPolicy::new(3, Duration::ZERO);
        let stopped = AtomicBool::new(false);
        assert!(policy
            .connect(&mut link, &Endpoint::Index(0), 115_200, &stopped)
            .is_err());
        assert_eq!(handle.open_attempts(), 0);
    }
}
