//! In-process simulated transceiver for tests and demos without hardware.
//!
//! [`SimLink`] implements [`SerialLink`] over shared in-memory buffers.  The
//! paired [`SimHandle`] stays with the test: it queues inbound bytes, injects
//! open failures or a disconnect, and inspects the frames the worker wrote.
//!
//! # Example
//!
//! ```rust
//! use sensfloor_hal::link::SerialLink;
//! use sensfloor_hal::sim::SimLink;
//! use sensfloor_types::Endpoint;
//!
//! let (mut link, handle) = SimLink::new();
//! link.open(&Endpoint::Index(0), 115_200).expect("sim open must succeed");
//!
//! handle.push_bytes(&[0xFD, 0x01, 0x01]);
//! assert_eq!(link.bytes_available().unwrap(), 3);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use sensfloor_types::{Endpoint, FloorError};

use crate::link::{SerialLink, resolve_endpoint};

/// Name of the single endpoint a fresh [`SimLink`] offers.
pub const SIM_ENDPOINT: &str = "sim0";

#[derive(Debug, Default)]
struct SimState {
    endpoints: Vec<String>,
    inbound: VecDeque<u8>,
    written: Vec<Vec<u8>>,
    open: bool,
    open_attempts: u32,
    /// Number of upcoming `open` calls that fail.
    failing_opens: u32,
    fail_forever: bool,
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Simulated serial link.  Always succeeds unless told otherwise.
#[derive(Debug)]
pub struct SimLink {
    state: Arc<Mutex<SimState>>,
}

/// Test-side control of a [`SimLink`].
#[derive(Debug, Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimLink {
    /// Create a link offering [`SIM_ENDPOINT`] and its control handle.
    pub fn new() -> (Self, SimHandle) {
        let state = Arc::new(Mutex::new(SimState {
            endpoints: vec![SIM_ENDPOINT.to_string()],
            ..SimState::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            SimHandle { state },
        )
    }
}

impl SimHandle {
    /// Queue bytes for the link to deliver.
    pub fn push_bytes(&self, bytes: &[u8]) {
        lock(&self.state).inbound.extend(bytes.iter().copied());
    }

    /// Bytes queued but not yet read.
    pub fn pending(&self) -> usize {
        lock(&self.state).inbound.len()
    }

    /// Every frame written so far, oldest first.
    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        lock(&self.state).written.clone()
    }

    pub fn open_attempts(&self) -> u32 {
        lock(&self.state).open_attempts
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).open
    }

    /// Make the next `count` open calls fail.
    pub fn fail_next_opens(&self, count: u32) {
        lock(&self.state).failing_opens = count;
    }

    /// Make every open call fail.
    pub fn fail_all_opens(&self) {
        lock(&self.state).fail_forever = true;
    }

    /// Drop the connection; the next read reports an error.
    pub fn disconnect(&self) {
        lock(&self.state).open = false;
    }
}

impl SerialLink for SimLink {
    fn list_endpoints(&self) -> Vec<String> {
        lock(&self.state).endpoints.clone()
    }

    fn open(&mut self, target: &Endpoint, _baud_rate: u32) -> Result<(), FloorError> {
        let name = resolve_endpoint(&*self, target)?;
        let mut state = lock(&self.state);
        state.open_attempts += 1;
        state.open = false;

        let failing = if state.failing_opens > 0 {
            state.failing_opens -= 1;
            true
        } else {
            state.fail_forever
        };
        if failing {
            return Err(FloorError::Connection {
                target: name,
                details: "simulated open failure".to_string(),
            });
        }
        if !state.endpoints.contains(&name) {
            return Err(FloorError::Connection {
                target: name,
                details: "no such endpoint".to_string(),
            });
        }
        state.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        lock(&self.state).open
    }

    fn bytes_available(&mut self) -> Result<usize, FloorError> {
        let state = lock(&self.state);
        if !state.open {
            return Err(disconnected());
        }
        Ok(state.inbound.len())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, FloorError> {
        let mut state = lock(&self.state);
        if !state.open {
            return Err(disconnected());
        }
        let n = buf.len().min(state.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), FloorError> {
        let mut state = lock(&self.state);
        if !state.open {
            return Err(disconnected());
        }
        state.written.push(bytes.to_vec());
        Ok(())
    }
}

fn disconnected() -> FloorError {
    FloorError::Connection {
        target: SIM_ENDPOINT.to_string(),
        details: "link closed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_flow_in_order_and_in_chunks() {
        let (mut link, handle) = SimLink::new();
        link.open(&Endpoint::Name(SIM_ENDPOINT.into()), 115_200).unwrap();
        handle.push_bytes(&[1, 2, 3, 4, 5]);

        let mut buf = [0u8; 3];
        assert_eq!(link.read_bytes(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(link.bytes_available().unwrap(), 2);
        assert_eq!(link.read_bytes(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(handle.pending(), 0);
    }

    #[test]
    fn written_frames_are_recorded() {
        let (mut link, handle) = SimLink::new();
        link.open(&Endpoint::Index(0), 115_200).unwrap();
        link.write_frame(&[0xFD, 1, 2]).unwrap();
        assert_eq!(handle.written_frames(), vec![vec![0xFD, 1, 2]]);
    }

    #[test]
    fn injected_failures_count_attempts() {
        let (mut link, handle) = SimLink::new();
        handle.fail_next_opens(2);
        assert!(link.open(&Endpoint::Index(0), 115_200).is_err());
        assert!(link.open(&Endpoint::Index(0), 115_200).is_err());
        assert!(link.open(&Endpoint::Index(0), 115_200).is_ok());
        assert_eq!(handle.open_attempts(), 3);
        assert!(handle.is_open());
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let (mut link, _handle) = SimLink::new();
        assert!(link.open(&Endpoint::Name("/dev/ttyACM9".into()), 115_200).is_err());
        assert!(link.open(&Endpoint::Index(3), 115_200).is_err());
    }

    #[test]
    fn disconnect_surfaces_as_read_error() {
        let (mut link, handle) = SimLink::new();
        link.open(&Endpoint::Index(0), 115_200).unwrap();
        handle.disconnect();
        assert!(!link.is_open());
        assert!(link.bytes_available().is_err());
        assert!(link.read_bytes(&mut [0u8; 4]).is_err());
    }
}
