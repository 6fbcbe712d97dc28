//! `SerialLink` – the byte transport the worker reads frames from.
//!
//! Implementations own the physical port (or a stand-in for it).  The rest
//! of the system only ever talks to the trait, so the worker runs the same
//! way against real hardware, a capture file, or an in-process simulation.

use sensfloor_types::{Endpoint, FloorError};

/// A bidirectional, non-blocking byte transport to the transceiver.
pub trait SerialLink: Send {
    /// Names of the endpoints this transport can open, in index order.
    fn list_endpoints(&self) -> Vec<String>;

    /// Open `target` at `baud_rate`, closing any previously open endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`FloorError::Connection`] when the endpoint cannot be opened.
    fn open(&mut self, target: &Endpoint, baud_rate: u32) -> Result<(), FloorError>;

    /// Whether an endpoint is currently open.
    fn is_open(&self) -> bool;

    /// Number of bytes that can be read without blocking.
    fn bytes_available(&mut self) -> Result<usize, FloorError>;

    /// Read up to `buf.len()` bytes, returning how many were read.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, FloorError>;

    /// Write one complete frame.
    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), FloorError>;
}

/// Resolve `target` to an endpoint name using `link`'s endpoint list.
///
/// Names pass through unchanged; an index must fall inside the list.
pub fn resolve_endpoint(link: &dyn SerialLink, target: &Endpoint) -> Result<String, FloorError> {
    match target {
        Endpoint::Name(name) => Ok(name.clone()),
        Endpoint::Index(i) => {
            let endpoints = link.list_endpoints();
            endpoints
                .get(*i)
                .cloned()
                .ok_or_else(|| FloorError::Connection {
                    target: target.to_string(),
                    details: format!("{} endpoint(s) available", endpoints.len()),
                })
        }
    }
}
