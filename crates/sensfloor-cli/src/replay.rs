//! [`ReplayLink`] – plays a raw byte capture back as if it came off the wire.
//!
//! The capture is delivered in small chunks, one per read, so the worker
//! sees the same fragmented stream a serial port produces.  At the end the
//! link either starts over (`looping`) or stays open and silent.

use std::fs;
use std::path::PathBuf;

use sensfloor_hal::SerialLink;
use sensfloor_types::{Endpoint, FloorError};
use tracing::{debug, info};

/// Bytes handed out per read.
const CHUNK: usize = 64;

pub struct ReplayLink {
    path: PathBuf,
    looping: bool,
    data: Option<Vec<u8>>,
    cursor: usize,
}

impl ReplayLink {
    pub fn new(path: impl Into<PathBuf>, looping: bool) -> Self {
        Self {
            path: path.into(),
            looping,
            data: None,
            cursor: 0,
        }
    }

    fn remaining(&mut self) -> usize {
        let Some(data) = self.data.as_ref() else {
            return 0;
        };
        if self.cursor >= data.len() && self.looping && !data.is_empty() {
            debug!(path = %self.path.display(), "capture rewound");
            self.cursor = 0;
        }
        data.len().saturating_sub(self.cursor)
    }

    fn closed(&self) -> FloorError {
        FloorError::Connection {
            target: self.path.display().to_string(),
            details: "capture not open".to_string(),
        }
    }
}

impl SerialLink for ReplayLink {
    fn list_endpoints(&self) -> Vec<String> {
        vec![self.path.display().to_string()]
    }

    /// Loads the capture; the target and baud rate are ignored.
    fn open(&mut self, _target: &Endpoint, _baud_rate: u32) -> Result<(), FloorError> {
        let data = fs::read(&self.path).map_err(|e| FloorError::Connection {
            target: self.path.display().to_string(),
            details: e.to_string(),
        })?;
        info!(path = %self.path.display(), bytes = data.len(), "capture loaded");
        self.data = Some(data);
        self.cursor = 0;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.data.is_some()
    }

    fn bytes_available(&mut self) -> Result<usize, FloorError> {
        if self.data.is_none() {
            return Err(self.closed());
        }
        Ok(self.remaining().min(CHUNK))
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, FloorError> {
        if self.data.is_none() {
            return Err(self.closed());
        }
        let n = self.remaining().min(CHUNK).min(buf.len());
        let start = self.cursor;
        if let Some(data) = self.data.as_ref() {
            buf[..n].copy_from_slice(&data[start..start + n]);
        }
        self.cursor += n;
        Ok(n)
    }

    /// Poll requests have nowhere to go; they are dropped.
    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), FloorError> {
        if self.data.is_none() {
            return Err(self.closed());
        }
        debug!(len = bytes.len(), "poll request dropped during replay");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(bytes: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("floor.bin");
        fs::write(&path, bytes).expect("write capture");
        (dir, path)
    }

    fn drain(link: &mut ReplayLink, limit: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 256];
        while out.len() < limit {
            let n = link.read_bytes(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    #[test]
    fn capture_is_delivered_in_chunks_then_goes_quiet() {
        let bytes: Vec<u8> = (0..150u8).collect();
        let (_dir, path) = capture(&bytes);
        let mut link = ReplayLink::new(&path, false);
        link.open(&Endpoint::Index(0), 115_200).unwrap();

        assert_eq!(link.bytes_available().unwrap(), CHUNK);
        assert_eq!(drain(&mut link, 1000), bytes);
        assert_eq!(link.bytes_available().unwrap(), 0);
        assert!(link.is_open());
    }

    #[test]
    fn looping_capture_rewinds() {
        let (_dir, path) = capture(&[1, 2, 3]);
        let mut link = ReplayLink::new(&path, true);
        link.open(&Endpoint::Index(0), 115_200).unwrap();
        assert_eq!(drain(&mut link, 7), vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn missing_capture_fails_to_open() {
        let mut link = ReplayLink::new("/nonexistent/floor.bin", false);
        assert!(matches!(
            link.open(&Endpoint::Index(0), 115_200),
            Err(FloorError::Connection { .. })
        ));
        assert!(link.bytes_available().is_err());
    }
}
