//! Host-side checksum port: a thin MMIO bridge letting the host use the
//! shared coprocessor for ad hoc checksums while the sequencer is idle.
//!
//! The bridge itself is stateless; it decodes bus words into coprocessor
//! requests and encodes status reads. All arbitration lives in
//! [`crate::arbiter`].
//!
//! | Op    | Layout |
//! |-------|--------|
//! | write | bit 8 = init, bits 7:0 = data byte |
//! | read  | bit 16 = busy, bits 15:0 = result |

use crate::crc16::CrcRequest;

/// Host write word: initialize the checksum engine.
pub const HOST_INIT: u32 = 1 << 8;
/// Host read word: engine busy (forced high while the sequencer owns it).
pub const HOST_BUSY: u32 = 1 << 16;

/// Decode a host register write. Init and feed are mutually exclusive; init
/// wins, discarding the data byte.
pub fn decode_write(word: u32) -> CrcRequest {
    if word & HOST_INIT != 0 {
        CrcRequest::init_pulse()
    } else {
        CrcRequest::feed_pulse(word as u8)
    }
}

/// Encode a host register read from the (ownership-masked) busy flag and
/// the engine result.
pub fn encode_read(busy: bool, result: u16) -> u32 {
    let mut word = u32::from(result);
    if busy {
        word |= HOST_BUSY;
    }
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_wins_over_data_byte() {
        let req = decode_write(HOST_INIT | 0xA7);
        assert!(req.init);
        assert!(!req.feed);
    }

    #[test]
    fn plain_write_feeds_low_byte() {
        let req = decode_write(0x0000_00C3);
        assert!(!req.init);
        assert!(req.feed);
        assert_eq!(req.data, 0xC3);
    }

    #[test]
    fn read_packs_busy_and_result() {
        assert_eq!(encode_read(false, 0x6161), 0x0000_6161);
        assert_eq!(encode_read(true, 0x6161), 0x0001_6161);
    }
}
