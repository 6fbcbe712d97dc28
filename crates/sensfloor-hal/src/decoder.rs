//! Message decoder: applies a parsed [`Frame`] to the [`TileRegistry`].
//!
//! The decoder only validates addressing.  A frame for another room or an
//! unregistered tile is returned as an error and leaves the registry
//! untouched; the caller decides how loudly to log it.

use std::time::Instant;

use sensfloor_protocol::Frame;
use sensfloor_types::{FloorError, TileId};

use crate::registry::TileRegistry;

/// Decoder bound to one room address.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    room: [u8; 2],
}

impl FrameDecoder {
    pub fn new(room: [u8; 2]) -> Self {
        Self { room }
    }

    pub fn room(&self) -> [u8; 2] {
        self.room
    }

    /// Write the frame's samples into the addressed tile.
    ///
    /// On success the tile's `last_update` is `now`, every field holds the
    /// normalised sample in fan order, and `has_active_field` reflects
    /// whether any sample is at or above `threshold`.
    ///
    /// # Errors
    ///
    /// - [`FloorError::ProtocolMismatch`] when the room address differs.
    /// - [`FloorError::UnknownTile`] when no tile carries the address.
    pub fn apply(
        &self,
        frame: &Frame,
        registry: &mut TileRegistry,
        threshold: f32,
        now: Instant,
    ) -> Result<TileId, FloorError> {
        if frame.room != self.room {
            return Err(FloorError::ProtocolMismatch {
                expected: self.room,
                received: frame.room,
            });
        }
        let tile = registry
            .get_mut(frame.tile)
            .ok_or(FloorError::UnknownTile(frame.tile))?;

        let values = frame.normalized_samples();
        tile.last_update = Some(now);
        for (field, value) in tile.fields.iter_mut().zip(values) {
            field.value = value;
        }
        tile.has_active_field = values.iter().any(|&v| v >= threshold);
        Ok(tile.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use sensfloor_perception::build_layout;
    use sensfloor_protocol::{Meaning, MeaningFlag, PARAM_CAPACITANCE};
    use sensfloor_types::{FloorConfig, LayoutConfig, TILE_SIZE_SMALL};

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

    fn frame(room: [u8; 2], tile: TileId, samples: [u8; 8]) -> Frame {
        Frame {
            room,
            tile,
            reserved: [0, 0],
            meaning: Meaning::from_flags(&[MeaningFlag::FromTransceiver]),
            parameter: PARAM_CAPACITANCE,
            samples,
        }
    }

    #[test]
    fn samples_are_normalised_in_fan_order() {
        let mut reg = registry();
        let samples = [0x00, 0x40, 0x80, 0xC0, 0xFF, 0x81, 0x7F, 0x90];
        let decoder = FrameDecoder::new(ROOM);
        let id = decoder
            .apply(&frame(ROOM, TileId(0, 1), samples), &mut reg, 0.07, Instant::now())
            .unwrap();
        assert_eq!(id, TileId(0, 1));

        let tile = reg.get(TileId(0, 1)).unwrap();
        for (i, byte) in samples.iter().enumerate() {
            let expected = (*byte as f32 - 128.0) / 128.0;
            assert!((tile.fields[i].value - expected).abs() < f32::EPSILON);
            assert!((-1.0..=1.0).contains(&tile.fields[i].value));
        }
        assert!(tile.has_active_field);
        // The other tile is untouched.
        assert!(reg.get(TileId(0, 0)).unwrap().last_update.is_none());
    }

    #[test]
    fn same_frame_twice_only_moves_timestamp() {
        let mut reg = registry();
        let decoder = FrameDecoder::new(ROOM);
        let f = frame(ROOM, TileId(0, 0), [0xA0; 8]);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(5);

        decoder.apply(&f, &mut reg, 0.07, t0).unwrap();
        let first: Vec<f32> = reg.get(TileId(0, 0)).unwrap().fields.iter().map(|x| x.value).collect();
        decoder.apply(&f, &mut reg, 0.07, t1).unwrap();
        let tile = reg.get(TileId(0, 0)).unwrap();
        let second: Vec<f32> = tile.fields.iter().map(|x| x.value).collect();

        assert_eq!(first, second);
        assert_eq!(tile.last_update, Some(t1));
    }

    #[test]
    fn foreign_room_is_rejected_without_mutation() {
        let mut reg = registry();
        let decoder = FrameDecoder::new(ROOM);
        let err = decoder
            .apply(&frame([0x02, 0x01], TileId(0, 0), [0xFF; 8]), &mut reg, 0.07, Instant::now())
            .unwrap_err();
        assert_eq!(
            err,
            FloorError::ProtocolMismatch {
                expected: ROOM,
                received: [0x02, 0x01]
            }
        );
        let tile = reg.get(TileId(0, 0)).unwrap();
        assert!(tile.last_update.is_none());
        assert!(tile.fields.iter().all(|f| f.value == 0.0));
    }

    #[test]
    fn unregistered_tile_is_reported() {
        let mut reg = registry();
        let err = FrameDecoder::new(ROOM)
            .apply(&frame(ROOM, TileId(3, 3), [0xFF; 8]), &mut reg, 0.07, Instant::now())
            .unwrap_err();
        assert_eq!(err, FloorError::UnknownTile(TileId(3, 3)));
    }

    #[test]
    fn active_flag_follows_latest_frame() {
        let mut reg = registry();
        let decoder = FrameDecoder::new(FloorConfig::default().room);
        let room = decoder.room();
        let now = Instant::now();

        decoder.apply(&frame(room, TileId(0, 0), [0xFF; 8]), &mut reg, 0.07, now).unwrap();
        assert!(reg.get(TileId(0, 0)).unwrap().has_active_field);

        decoder.apply(&frame(room, TileId(0, 0), [0x80; 8]), &mut reg, 0.07, now).unwrap();
        assert!(!reg.get(TileId(0, 0)).unwrap().has_active_field);
    }
}
