//! `sensfloor-protocol` – the transceiver wire format.
//!
//! Moves bytes between the serial link and the rest of the system without
//! caring what the tiles are doing.
//!
//! # Modules
//!
//! - [`frame`] – [`Frame`][frame::Frame]: the fixed 17-byte message, its
//!   [`Meaning`][frame::Meaning] flags, sample normalisation, and the
//!   status-request (poll) frame.
//! - [`framer`] – [`Framer`][framer::Framer]: stateful splitter that turns an
//!   unbounded byte stream into frames, resynchronising on the `0xFD`
//!   sentinel.

pub mod frame;
pub mod framer;

pub use frame::{
    FRAME_LEN, FRAME_START, Frame, Meaning, MeaningFlag, PARAM_CAPACITANCE, SAMPLE_OFFSET,
    normalize_sample,
};
pub use framer::{Framer, FramerStats};
