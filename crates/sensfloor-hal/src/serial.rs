//! [`SerialPortLink`] – a [`SerialLink`] over a real serial port.
//!
//! Compiled only with the `serial` feature.  Ports are opened 8N1 with a
//! short read timeout; a timeout is reported as zero bytes read.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use sensfloor_types::{Endpoint, FloorError};
use tracing::debug;

use crate::link::{SerialLink, resolve_endpoint};

const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Serial port transport backed by the `serialport` crate.
#[derive(Default)]
pub struct SerialPortLink {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

impl SerialPortLink {
    pub fn new() -> Self {
        Self::default()
    }

    fn io_error(&mut self, e: impl std::fmt::Display) -> FloorError {
        self.port = None;
        FloorError::Connection {
            target: self.name.clone(),
            details: e.to_string(),
        }
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, FloorError> {
        let name = self.name.clone();
        self.port.as_mut().ok_or(FloorError::Connection {
            target: name,
            details: "port not open".to_string(),
        })
    }
}

impl SerialLink for SerialPortLink {
    fn list_endpoints(&self) -> Vec<String> {
        match serialport::available_ports() {
            Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
            Err(e) => {
                debug!(error = %e, "serial port enumeration failed");
                Vec::new()
            }
        }
    }

    fn open(&mut self, target: &Endpoint, baud_rate: u32) -> Result<(), FloorError> {
        self.port = None;
        let name = resolve_endpoint(&*self, target)?;
        let port = serialport::new(&name, baud_rate)
            .timeout(READ_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .open()
            .map_err(|e| FloorError::Connection {
                target: name.clone(),
                details: e.to_string(),
            })?;
        self.name = name;
        self.port = Some(port);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn bytes_available(&mut self) -> Result<usize, FloorError> {
        let result = self.port()?.bytes_to_read();
        match result {
            Ok(n) => Ok(n as usize),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, FloorError> {
        let result = self.port()?.read(buf);
        match result {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => Ok(0),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), FloorError> {
        let port = self.port()?;
        let result = port.write_all(bytes).and_then(|()| port.flush());
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
