use thiserror::Error;

use crate::TileId;

/// Error type spanning floor configuration, wire decoding, the serial link,
/// and boundary extraction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FloorError {
    #[error("not enough custom tile ids: layout needs {required}, got {provided}")]
    InsufficientTileIds { required: usize, provided: usize },

    #[error("duplicate tile id {0}")]
    DuplicateTile(TileId),

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error("frame from room {received:02x?}, expected {expected:02x?}")]
    ProtocolMismatch { expected: [u8; 2], received: [u8; 2] },

    #[error("frame from unregistered tile {0}")]
    UnknownTile(TileId),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("connection to {target} failed: {details}")]
    Connection { target: String, details: String },

    #[error("non-manifold edge ({a}, {b}) referenced {count} times")]
    NonManifoldBoundary { a: usize, b: usize, count: usize },

    #[error("configuration error: {0}")]
    Config(String),
}

impl FloorError {
    /// True for the setup-time faults that abort building (part of) a floor.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FloorError::InsufficientTileIds { .. }
                | FloorError::DuplicateTile(_)
                | FloorError::InvalidLayout(_)
                | FloorError::Config(_)
        )
    }
}
