//! Read-back multiplexer: serializes a wide sealed record across three
//! narrow register reads.
//!
//! A 2-bit phase counter advances by exactly one on each discrete read
//! pulse, wrapping 2 -> 0. A commit completion forces the phase back to 0
//! regardless of where a caller's read sequence was.
//!
//! Integration hazard (documented, not a defect): the read pulse must be a
//! true single-tick pulse. A caller holding a "read active" line across
//! ticks advances the phase once per tick and desynchronizes from its own
//! expectation.

use crate::sequencer::SealedRecord;

/// Number of read phases.
pub const PHASES: u8 = 3;

/// Read-phase counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadMux {
    phase: u8,
}

impl ReadMux {
    /// Counter at phase 0.
    pub const fn new() -> Self {
        ReadMux { phase: 0 }
    }

    /// Current phase (0..=2).
    pub const fn phase(&self) -> u8 {
        self.phase
    }

    /// Phase counter after one read pulse.
    #[must_use]
    pub const fn advanced(self) -> Self {
        ReadMux {
            phase: (self.phase + 1) % PHASES,
        }
    }

    /// The word exposed at the current phase:
    ///
    /// - phase 0: `value[31:0]`
    /// - phase 1: `{sessionId[7:0], monoCount[23:0]}`
    /// - phase 2: `{monoCount[31:24], crc16[15:0], 0x00}`
    pub fn word(&self, rec: &SealedRecord) -> u32 {
        match self.phase {
            0 => rec.value,
            1 => (u32::from(rec.session_id) << 24) | (rec.mono_count & 0x00FF_FFFF),
            _ => (rec.mono_count & 0xFF00_0000) | (u32::from(rec.crc16) << 8),
        }
    }
}
