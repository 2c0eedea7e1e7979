//! Register-level bit layouts for the seal peripheral.
//!
//! Bit-exact register map, so golden vectors and host drivers built against
//! the hardware carry over unchanged:
//!
//! | Register  | Op    | Layout |
//! |-----------|-------|--------|
//! | SEAL_DATA | write | `value[31:0]` into the pending buffer |
//! | SEAL_DATA | read  | pulsed, 3 phases (see [`crate::readback`]) |
//! | SEAL_CTRL | write | bit1 = commit, bit0 = crcReset, bits 9:2 = sensorId |
//! | SEAL_CTRL | read  | bit0 = busy, bit1 = ready, bit2 = commitDropped |

/// SEAL_CTRL write: standalone checksum-reset request.
pub const CTRL_CRC_RESET: u16 = 1 << 0;
/// SEAL_CTRL write: commit request. Priority over `CTRL_CRC_RESET`.
pub const CTRL_COMMIT: u16 = 1 << 1;
/// SEAL_CTRL write: sensor id field position.
pub const CTRL_SENSOR_SHIFT: u16 = 2;
/// SEAL_CTRL writes are 10 bits wide; upper bits are ignored.
pub const CTRL_WRITE_MASK: u16 = 0x03FF;

/// SEAL_CTRL read: sequencer is mid-commit.
pub const STATUS_BUSY: u32 = 1 << 0;
/// SEAL_CTRL read: sequencer is idle and will accept a commit.
pub const STATUS_READY: u32 = 1 << 1;
/// SEAL_CTRL read: a commit request raced an in-progress commit and was
/// dropped. Sticky until the next successful commit completes.
pub const STATUS_COMMIT_DROPPED: u32 = 1 << 2;

/// Decoded SEAL_CTRL write word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CtrlWrite {
    pub commit: bool,
    pub crc_reset: bool,
    pub sensor_id: u8,
}

impl CtrlWrite {
    /// Decode a raw bus word. Bits above the 10-bit field are ignored.
    pub fn decode(word: u16) -> Self {
        let word = word & CTRL_WRITE_MASK;
        CtrlWrite {
            commit: word & CTRL_COMMIT != 0,
            crc_reset: word & CTRL_CRC_RESET != 0,
            sensor_id: (word >> CTRL_SENSOR_SHIFT) as u8,
        }
    }

    /// Encode back into a bus word.
    pub fn encode(&self) -> u16 {
        let mut word = u16::from(self.sensor_id) << CTRL_SENSOR_SHIFT;
        if self.commit {
            word |= CTRL_COMMIT;
        }
        if self.crc_reset {
            word |= CTRL_CRC_RESET;
        }
        word
    }

    /// Convenience encoding of a commit request for `sensor_id`.
    pub fn commit_word(sensor_id: u8) -> u16 {
        CtrlWrite {
            commit: true,
            crc_reset: false,
            sensor_id,
        }
        .encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decode_commit_with_sensor() {
        let w = CtrlWrite::decode((0xAB << CTRL_SENSOR_SHIFT) | CTRL_COMMIT);
        assert!(w.commit);
        assert!(!w.crc_reset);
        assert_eq!(w.sensor_id, 0xAB);
    }

    #[test]
    fn decode_masks_high_bits() {
        let w = CtrlWrite::decode(0xFC00 | CTRL_CRC_RESET);
        assert!(w.crc_reset);
        assert!(!w.commit);
        assert_eq!(w.sensor_id, 0);
    }

    proptest! {
        #[test]
        fn encode_decode_roundtrips(word in 0u16..0x0400) {
            prop_assert_eq!(CtrlWrite::decode(word).encode(), word);
        }
    }
}
