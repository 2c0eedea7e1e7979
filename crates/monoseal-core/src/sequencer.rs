//! Seal sequencer: the core state machine.
//!
//! Accepts a candidate reading, drives the shared checksum coprocessor
//! through the arbiter, latches a sealed record, and advances the monotonic
//! counter. Cycles `Idle -> Feeding -> Latching -> Idle` forever; no state
//! is skipped and no tick performs work in more than one state.
//!
//! Integrity contract:
//! - `mono_count` increments by exactly 1, only at the `Latching -> Idle`
//!   transition. No other path (dropped commit, standalone checksum reset,
//!   host port traffic) touches it.
//! - `session_id` is sampled from the external free-running session counter
//!   at the first successful commit after reset and frozen until reset.
//! - The sealed `crc16` is a pure function of
//!   `(sensor_id, value, mono_count at commit start)`; it never depends on
//!   the session id.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::crc16::CrcRequest;
use crate::readback::ReadMux;
use crate::regs::CtrlWrite;

/// Length of the byte encoding fed through the coprocessor per commit.
pub const SEAL_MESSAGE_LEN: usize = 9;

/// Fixed byte encoding of a commit: sensor id, then value and the
/// commit-start counter, both little-endian.
pub fn seal_message(sensor_id: u8, value: u32, mono_count: u32) -> [u8; SEAL_MESSAGE_LEN] {
    let mut msg = [0u8; SEAL_MESSAGE_LEN];
    msg[0] = sensor_id;
    msg[1..5].copy_from_slice(&value.to_le_bytes());
    msg[5..9].copy_from_slice(&mono_count.to_le_bytes());
    msg
}

/// Sequencer state register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SealState {
    Idle,
    Feeding,
    Latching,
}

/// Durable output of a successful commit.
///
/// Exactly one live instance per core, overwritten whole at each commit
/// completion. The previous record is fully superseded; an external
/// consumer (see [`crate::record_log`]) must capture records after each
/// commit if history is required.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedRecord {
    pub value: u32,
    pub sensor_id: u8,
    /// Counter value at commit start (pre-increment).
    pub mono_count: u32,
    pub session_id: u8,
    pub crc16: u16,
}

/// Per-tick inputs to the sequencer.
#[derive(Clone, Copy, Debug, Default)]
pub struct SeqInputs {
    /// SEAL_DATA write: candidate value into the pending buffer.
    pub data_write: Option<u32>,
    /// SEAL_CTRL write, already decoded.
    pub ctrl_write: Option<CtrlWrite>,
    /// Single-tick SEAL_DATA read pulse.
    pub read_pulse: bool,
    /// External free-running session counter (sampled at first latch).
    pub session_counter: u8,
    /// Coprocessor busy flag as of this tick.
    pub crc_busy: bool,
    /// Coprocessor result; meaningful only while `crc_busy` is false.
    pub crc_result: u16,
}

/// The seal sequencer. All fields are registers in the synchronous model;
/// [`Sequencer::step`] is the only mutation path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sequencer {
    state: SealState,
    /// Candidate buffer; plain register write, accepted in any state.
    pending_value: u32,
    /// Snapshot of the commit in flight, taken on acceptance.
    cur_value: u32,
    cur_sensor: u8,
    cur_mono: u32,
    byte_idx: u8,
    mono_count: u32,
    session_id: u8,
    session_locked: bool,
    commit_dropped: bool,
    sealed: SealedRecord,
    mux: ReadMux,
}

impl Sequencer {
    /// Sequencer at its post-reset baseline.
    pub const fn new() -> Self {
        Sequencer {
            state: SealState::Idle,
            pending_value: 0,
            cur_value: 0,
            cur_sensor: 0,
            cur_mono: 0,
            byte_idx: 0,
            mono_count: 0,
            session_id: 0,
            session_locked: false,
            commit_dropped: false,
            sealed: SealedRecord {
                value: 0,
                sensor_id: 0,
                mono_count: 0,
                session_id: 0,
                crc16: 0,
            },
            mux: ReadMux::new(),
        }
    }

    pub const fn state(&self) -> SealState {
        self.state
    }

    pub const fn is_idle(&self) -> bool {
        matches!(self.state, SealState::Idle)
    }

    /// Next counter value to be sealed (the live register, not a snapshot).
    pub const fn mono_count(&self) -> u32 {
        self.mono_count
    }

    pub const fn session_locked(&self) -> bool {
        self.session_locked
    }

    pub const fn session_id(&self) -> u8 {
        self.session_id
    }

    pub const fn commit_dropped(&self) -> bool {
        self.commit_dropped
    }

    pub const fn sealed(&self) -> &SealedRecord {
        &self.sealed
    }

    pub const fn read_phase(&self) -> u8 {
        self.mux.phase()
    }

    pub(crate) const fn byte_index(&self) -> u8 {
        self.byte_idx
    }

    /// The SEAL_DATA word exposed at the current read phase. Combinational;
    /// the phase advances via the `read_pulse` input to [`Sequencer::step`].
    pub fn read_word(&self) -> u32 {
        self.mux.word(&self.sealed)
    }

    /// Advance one tick. Pure transition: returns the next sequencer state
    /// and the coprocessor request asserted this tick.
    ///
    /// Control-word semantics:
    /// - ctrl writes are inspected only while `Idle`; commit has priority
    ///   over a standalone checksum reset (the commit path pulses `init`
    ///   itself, so a separate reset would be redundant).
    /// - a commit request while non-idle is dropped and sets the sticky
    ///   `commit_dropped` flag; a standalone reset while non-idle is
    ///   ignored entirely.
    #[must_use]
    pub fn step(&self, inp: &SeqInputs) -> (Sequencer, CrcRequest) {
        let mut next = *self;
        let mut req = CrcRequest::IDLE;

        // Pending-buffer and read-phase registers update regardless of the
        // commit state machine; the latch arm below may override the phase.
        if let Some(v) = inp.data_write {
            next.pending_value = v;
        }
        if inp.read_pulse {
            next.mux = self.mux.advanced();
        }

        match self.state {
            SealState::Idle => {
                if let Some(ctrl) = inp.ctrl_write {
                    if ctrl.commit {
                        next.cur_value = next.pending_value;
                        next.cur_sensor = ctrl.sensor_id;
                        next.cur_mono = self.mono_count;
                        next.byte_idx = 0;
                        next.state = SealState::Feeding;
                        req = CrcRequest::init_pulse();
                        debug!(
                            sensor_id = ctrl.sensor_id,
                            value = next.cur_value,
                            mono = self.mono_count,
                            "commit accepted"
                        );
                    } else if ctrl.crc_reset {
                        req = CrcRequest::init_pulse();
                        trace!("standalone checksum reset");
                    }
                }
            }
            SealState::Feeding => {
                if self.dropped_request(inp) {
                    next.commit_dropped = true;
                }
                if !inp.crc_busy {
                    let msg = seal_message(self.cur_sensor, self.cur_value, self.cur_mono);
                    req = CrcRequest::feed_pulse(msg[self.byte_idx as usize]);
                    next.byte_idx = self.byte_idx + 1;
                    if usize::from(next.byte_idx) == SEAL_MESSAGE_LEN {
                        next.state = SealState::Latching;
                    }
                }
            }
            SealState::Latching => {
                if self.dropped_request(inp) {
                    next.commit_dropped = true;
                }
                if !inp.crc_busy {
                    let session_id = if self.session_locked {
                        self.session_id
                    } else {
                        inp.session_counter
                    };
                    next.sealed = SealedRecord {
                        value: self.cur_value,
                        sensor_id: self.cur_sensor,
                        mono_count: self.cur_mono,
                        session_id,
                        crc16: inp.crc_result,
                    };
                    next.session_id = session_id;
                    next.session_locked = true;
                    next.mono_count = self.mono_count.wrapping_add(1);
                    next.commit_dropped = false;
                    next.mux = ReadMux::new();
                    next.state = SealState::Idle;
                    debug!(
                        sensor_id = self.cur_sensor,
                        mono = self.cur_mono,
                        crc16 = format_args!("{:#06x}", inp.crc_result),
                        session_id,
                        "record sealed"
                    );
                }
            }
        }

        (next, req)
    }

    fn dropped_request(&self, inp: &SeqInputs) -> bool {
        if let Some(ctrl) = inp.ctrl_write {
            if ctrl.commit {
                debug!(sensor_id = ctrl.sensor_id, "commit dropped: sequencer busy");
                return true;
            }
        }
        false
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}
