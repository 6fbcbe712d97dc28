//! The fixed 17-byte transceiver frame.
//!
//! | Offset | Field |
//! |---|---|
//! | 0 | start sentinel `0xFD` |
//! | 1-2 | room address |
//! | 3-4 | tile address |
//! | 5-6 | reserved (sensor / parameter on some frame kinds) |
//! | 7 | meaning flags, see [`MeaningFlag`] |
//! | 8 | parameter selector (`0x00` = capacitance) |
//! | 9-16 | eight samples centred at `0x80` |
//!
//! All fields are single bytes, so there is no byte order to worry about.

use std::fmt;

use sensfloor_types::{FIELDS_PER_TILE, FloorError, TileId};

/// Length of every frame on the wire.
pub const FRAME_LEN: usize = 17;

/// First byte of every frame.
pub const FRAME_START: u8 = 0xFD;

/// Parameter selector for capacitance values.
pub const PARAM_CAPACITANCE: u8 = 0x00;

/// Offset of the first sample byte.
pub const SAMPLE_OFFSET: usize = 9;

// ────────────────────────────────────────────────────────────────────────────
// Meaning byte
// ────────────────────────────────────────────────────────────────────────────

/// One bit of the meaning (control) byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeaningFlag {
    /// Transceiver acknowledgement; on sensor-module frames the same bit
    /// signals a significant change.
    Acknowledgement,
    /// Master message to synchronise.
    Synchronize,
    StatusRequest,
    StatusAnswer,
    /// Capacitance samples are signed (centred at `0x80`).
    SignedValues,
    Configuration,
    Recalibrate,
    /// The frame stems from the transceiver rather than a tile.
    FromTransceiver,
}

impl MeaningFlag {
    pub const ALL: [MeaningFlag; 8] = [
        MeaningFlag::Acknowledgement,
        MeaningFlag::Synchronize,
        MeaningFlag::StatusRequest,
        MeaningFlag::StatusAnswer,
        MeaningFlag::SignedValues,
        MeaningFlag::Configuration,
        MeaningFlag::Recalibrate,
        MeaningFlag::FromTransceiver,
    ];

    /// Bit mask of this flag within the meaning byte.
    pub fn bit(self) -> u8 {
        match self {
            MeaningFlag::Acknowledgement => 1,
            MeaningFlag::Synchronize => 1 << 1,
            MeaningFlag::StatusRequest => 1 << 2,
            MeaningFlag::StatusAnswer => 1 << 3,
            MeaningFlag::SignedValues => 1 << 4,
            MeaningFlag::Configuration => 1 << 5,
            MeaningFlag::Recalibrate => 1 << 6,
            MeaningFlag::FromTransceiver => 1 << 7,
        }
    }
}

/// Decoded meaning byte: the set of [`MeaningFlag`]s a frame carries.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Meaning {
    bits: u8,
}

impl Meaning {
    pub fn from_byte(byte: u8) -> Self {
        Self { bits: byte }
    }

    pub fn from_flags(flags: &[MeaningFlag]) -> Self {
        Self {
            bits: flags.iter().fold(0, |acc, f| acc | f.bit()),
        }
    }

    pub fn to_byte(self) -> u8 {
        self.bits
    }

    pub fn contains(self, flag: MeaningFlag) -> bool {
        self.bits & flag.bit() != 0
    }

    /// Flags present, lowest bit first.
    pub fn flags(self) -> impl Iterator<Item = MeaningFlag> {
        MeaningFlag::ALL
            .into_iter()
            .filter(move |f| self.contains(*f))
    }
}

impl fmt::Debug for Meaning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.flags()).finish()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Frame
// ────────────────────────────────────────────────────────────────────────────

/// A parsed 17-byte frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub room: [u8; 2],
    pub tile: TileId,
    pub reserved: [u8; 2],
    pub meaning: Meaning,
    pub parameter: u8,
    pub samples: [u8; FIELDS_PER_TILE],
}

impl Frame {
    /// Parse `bytes` as one frame.
    ///
    /// # Errors
    ///
    /// Returns [`FloorError::MalformedFrame`] when `bytes` is not exactly
    /// [`FRAME_LEN`] long or does not begin with [`FRAME_START`].
    pub fn parse(bytes: &[u8]) -> Result<Self, FloorError> {
        if bytes.len() != FRAME_LEN {
            return Err(FloorError::MalformedFrame(format!(
                "expected {FRAME_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[0] != FRAME_START {
            return Err(FloorError::MalformedFrame(format!(
                "start byte {:#04x}",
                bytes[0]
            )));
        }
        let mut samples = [0u8; FIELDS_PER_TILE];
        samples.copy_from_slice(&bytes[SAMPLE_OFFSET..FRAME_LEN]);
        Ok(Self {
            room: [bytes[1], bytes[2]],
            tile: TileId(bytes[3], bytes[4]),
            reserved: [bytes[5], bytes[6]],
            meaning: Meaning::from_byte(bytes[7]),
            parameter: bytes[8],
            samples,
        })
    }

    /// Status request asking `tile` for a fresh capacitance reading.
    pub fn poll_request(room: [u8; 2], tile: TileId) -> Self {
        Self {
            room,
            tile,
            reserved: [0, 0],
            meaning: Meaning::from_flags(&[MeaningFlag::StatusRequest]),
            parameter: PARAM_CAPACITANCE,
            samples: [0; FIELDS_PER_TILE],
        }
    }

    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        let mut out = [0u8; FRAME_LEN];
        out[0] = FRAME_START;
        out[1..3].copy_from_slice(&self.room);
        out[3] = self.tile.0;
        out[4] = self.tile.1;
        out[5..7].copy_from_slice(&self.reserved);
        out[7] = self.meaning.to_byte();
        out[8] = self.parameter;
        out[SAMPLE_OFFSET..].copy_from_slice(&self.samples);
        out
    }

    /// Samples normalised to `[-1.0, 1.0)`, in fan order.
    pub fn normalized_samples(&self) -> [f32; FIELDS_PER_TILE] {
        self.samples.map(normalize_sample)
    }
}

/// Map a raw sample byte to `(byte - 128) / 128`.
pub fn normalize_sample(byte: u8) -> f32 {
    (i32::from(byte) - 0x80) as f32 / 128.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> [u8; FRAME_LEN] {
        [
            0xFD, 0x01, 0x02, 0x03, 0x04, 0x00, 0x00, 0x98, 0x00, 0x80, 0xFF, 0x00, 0x81, 0x7F,
            0xC0, 0x40, 0x80,
        ]
    }

    #[test]
    fn parse_extracts_addresses_and_samples() {
        let frame = Frame::parse(&sample_frame()).unwrap();
        assert_eq!(frame.room, [0x01, 0x02]);
        assert_eq!(frame.tile, TileId(0x03, 0x04));
        assert_eq!(frame.parameter, PARAM_CAPACITANCE);
        assert_eq!(frame.samples[1], 0xFF);
        assert!(frame.meaning.contains(MeaningFlag::StatusAnswer));
        assert!(frame.meaning.contains(MeaningFlag::SignedValues));
        assert!(frame.meaning.contains(MeaningFlag::FromTransceiver));
        assert!(!frame.meaning.contains(MeaningFlag::StatusRequest));
    }

    #[test]
    fn normalized_samples_follow_offset_formula() {
        let bytes = sample_frame();
        let frame = Frame::parse(&bytes).unwrap();
        let values = frame.normalized_samples();
        for (i, v) in values.iter().enumerate() {
            let expected = (f32::from(bytes[SAMPLE_OFFSET + i]) - 128.0) / 128.0;
            assert!((v - expected).abs() < f32::EPSILON, "sample {i}");
            assert!((-1.0..=1.0).contains(v));
        }
        assert!((values[0] - 0.0).abs() < f32::EPSILON);
        assert!((values[2] - (-1.0)).abs() < f32::EPSILON);
        assert!((values[1] - 127.0 / 128.0).abs() < f32::EPSILON);
    }

    #[test]
    fn poll_request_layout() {
        let bytes = Frame::poll_request([0x01, 0x01], TileId(0x05, 0x06)).to_bytes();
        assert_eq!(
            bytes,
            [0xFD, 0x01, 0x01, 0x05, 0x06, 0, 0, 0x04, 0x00, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn to_bytes_reproduces_parsed_input() {
        let bytes = sample_frame();
        assert_eq!(Frame::parse(&bytes).unwrap().to_bytes(), bytes);
    }

    #[test]
    fn parse_rejects_wrong_length_and_start() {
        assert!(matches!(
            Frame::parse(&sample_frame()[..16]),
            Err(FloorError::MalformedFrame(_))
        ));
        let mut bytes = sample_frame();
        bytes[0] = 0x00;
        assert!(matches!(
            Frame::parse(&bytes),
            Err(FloorError::MalformedFrame(_))
        ));
    }

    #[test]
    fn meaning_flags_iterate_in_bit_order() {
        let meaning = Meaning::from_byte(0b1000_0101);
        let flags: Vec<_> = meaning.flags().collect();
        assert_eq!(
            flags,
            vec![
                MeaningFlag::Acknowledgement,
                MeaningFlag::StatusRequest,
                MeaningFlag::FromTransceiver
            ]
        );
        assert_eq!(Meaning::from_flags(&flags).to_byte(), 0b1000_0101);
    }
}
