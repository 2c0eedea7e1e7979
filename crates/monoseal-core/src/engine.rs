//! The composed seal core: coprocessor, arbiter, sequencer and host port
//! advanced by a single synchronous scheduler.
//!
//! Every tick: decode this tick's bus activity, compute the sequencer's
//! transition against the coprocessor's pre-tick state, decide ownership,
//! route exactly one client's request into the coprocessor, and commit both
//! next states at the tick boundary. No component ever observes a
//! half-updated tick.
//!
//! Bus operations (`write_data`, `write_ctrl`, `read_pulse`, host
//! register access) each occupy exactly one tick.

use tracing::trace;

use crate::arbiter::{self, Owner};
use crate::crc16::CrcEngine;
use crate::host;
use crate::observe::Observation;
use crate::regs::{self, CtrlWrite};
use crate::sequencer::{SealedRecord, SeqInputs, Sequencer};

/// Bus activity for one tick. At most one seal-register and one
/// host-register access per tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickInputs {
    /// SEAL_DATA write.
    pub data_write: Option<u32>,
    /// SEAL_CTRL write (raw word; high bits ignored).
    pub ctrl_write: Option<u16>,
    /// Single-tick SEAL_DATA read pulse.
    pub read_pulse: bool,
    /// Host checksum register write.
    pub host_write: Option<u32>,
}

/// The composed core.
#[derive(Clone, Debug)]
pub struct SealCore {
    crc: CrcEngine,
    seq: Sequencer,
    /// External free-running session counter input (not owned by the core;
    /// sampled only at first-commit time).
    session_counter: u8,
    /// Ownership during the last tick. Shadow state for observation only;
    /// the arbitration decision itself is recomputed combinationally every
    /// tick and never read back.
    last_owner: Owner,
}

impl SealCore {
    /// Core at its post-reset baseline: sequencer idle and ready,
    /// accumulator initialized, counter and session lock cleared.
    pub fn new() -> Self {
        SealCore {
            crc: CrcEngine::new(),
            seq: Sequencer::new(),
            session_counter: 0,
            last_owner: Owner::HostPeripheral,
        }
    }

    /// Full reset: the sole fatal-recovery path. Returns all core state
    /// (monotonic counter included) to the baseline; only the external
    /// session counter input survives.
    pub fn reset(&mut self) {
        let session_counter = self.session_counter;
        *self = SealCore::new();
        self.session_counter = session_counter;
    }

    /// Drive the external session counter input.
    pub fn set_session_counter(&mut self, value: u8) {
        self.session_counter = value;
    }

    /// Advance one tick.
    pub fn tick(&mut self, inp: &TickInputs) {
        let seq_inputs = SeqInputs {
            data_write: inp.data_write,
            ctrl_write: inp.ctrl_write.map(CtrlWrite::decode),
            read_pulse: inp.read_pulse,
            session_counter: self.session_counter,
            crc_busy: self.crc.busy(),
            crc_result: self.crc.result(),
        };
        let (next_seq, seq_req) = self.seq.step(&seq_inputs);
        let host_req = inp.host_write.map(host::decode_write).unwrap_or_default();

        let owner = arbiter::owner(&self.seq, &seq_req);
        let routed = arbiter::route(owner, seq_req, host_req);
        trace!(?owner, ?routed, "tick");

        self.crc = self.crc.step(routed);
        self.seq = next_seq;
        self.last_owner = owner;
    }

    /// A tick with no bus activity.
    pub fn idle_tick(&mut self) {
        self.tick(&TickInputs::default());
    }

    /// Run idle ticks until the sequencer returns to idle, bounded by
    /// `max_ticks`. Returns whether idle was reached.
    pub fn run_until_idle(&mut self, max_ticks: usize) -> bool {
        for _ in 0..max_ticks {
            if self.seq.is_idle() {
                return true;
            }
            self.idle_tick();
        }
        self.seq.is_idle()
    }

    // --- SEAL register interface -----------------------------------------

    /// SEAL_DATA write: latch a candidate value into the pending buffer.
    pub fn write_data(&mut self, value: u32) {
        self.tick(&TickInputs {
            data_write: Some(value),
            ..TickInputs::default()
        });
    }

    /// SEAL_CTRL write: commit and/or standalone checksum reset.
    pub fn write_ctrl(&mut self, word: u16) {
        self.tick(&TickInputs {
            ctrl_write: Some(word),
            ..TickInputs::default()
        });
    }

    /// Pulsed SEAL_DATA read: returns the word at the current phase and
    /// advances the phase counter by one.
    pub fn read_pulse(&mut self) -> u32 {
        let word = self.seq.read_word();
        self.tick(&TickInputs {
            read_pulse: true,
            ..TickInputs::default()
        });
        word
    }

    /// SEAL_CTRL read: `{commitDropped, ready, busy}`. Combinational; does
    /// not consume a tick.
    pub fn read_ctrl(&self) -> u32 {
        let mut word = 0;
        if self.seq.is_idle() {
            word |= regs::STATUS_READY;
        } else {
            word |= regs::STATUS_BUSY;
        }
        if self.seq.commit_dropped() {
            word |= regs::STATUS_COMMIT_DROPPED;
        }
        word
    }

    // --- Host checksum register ------------------------------------------

    /// Host checksum register write: init or feed a byte. Discarded by the
    /// arbiter on any tick the sequencer owns the coprocessor.
    pub fn host_write(&mut self, word: u32) {
        self.tick(&TickInputs {
            host_write: Some(word),
            ..TickInputs::default()
        });
    }

    /// Host checksum register read: `{busy, result}`. While the sequencer
    /// owns the coprocessor the busy flag reads 1 regardless of the real
    /// engine state, so host software cannot race a commit. Combinational.
    pub fn host_read(&self) -> u32 {
        let busy = !self.seq.is_idle() || self.crc.busy();
        host::encode_read(busy, self.crc.result())
    }

    // --- Convenience and observation --------------------------------------

    /// Full commit from the register interface: candidate write, commit
    /// control write, then idle ticks until the sequencer is idle again.
    /// Returns false if the commit did not finish within `max_ticks`.
    pub fn commit(&mut self, sensor_id: u8, value: u32, max_ticks: usize) -> bool {
        self.write_data(value);
        self.write_ctrl(regs::CtrlWrite::commit_word(sensor_id));
        self.run_until_idle(max_ticks)
    }

    /// The live sealed record.
    pub fn sealed(&self) -> &SealedRecord {
        self.seq.sealed()
    }

    /// Shadow snapshot of all internals, for property tests and fuzzing.
    /// Decoupled from the production register surface.
    pub fn observe(&self) -> Observation {
        Observation {
            state: self.seq.state(),
            mono_count: self.seq.mono_count(),
            session_id: self.seq.session_id(),
            session_locked: self.seq.session_locked(),
            commit_dropped: self.seq.commit_dropped(),
            read_phase: self.seq.read_phase(),
            byte_index: self.seq.byte_index(),
            crc_result: self.crc.result(),
            crc_busy: self.crc.busy(),
            owner: self.last_owner,
            sealed: *self.seq.sealed(),
        }
    }
}

impl Default for SealCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Worst-case ticks for one commit when the core is otherwise idle: an
/// accept tick, nine bytes at one feed plus eight shift ticks each, and a
/// latch tick, with margin.
pub const COMMIT_TICK_BUDGET: usize = 128;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc16::crc16_modbus;
    use crate::sequencer::seal_message;

    #[test]
    fn fresh_core_reads_ready() {
        let core = SealCore::new();
        assert_eq!(core.read_ctrl(), regs::STATUS_READY);
    }

    #[test]
    fn commit_completes_within_budget() {
        let mut core = SealCore::new();
        core.set_session_counter(0xAB);
        assert!(core.commit(0x42, 0xDEAD_BEEF, COMMIT_TICK_BUDGET));
        let rec = core.sealed();
        assert_eq!(rec.value, 0xDEAD_BEEF);
        assert_eq!(rec.sensor_id, 0x42);
        assert_eq!(rec.mono_count, 0);
        assert_eq!(rec.session_id, 0xAB);
        assert_eq!(rec.crc16, crc16_modbus(&seal_message(0x42, 0xDEAD_BEEF, 0)));
    }

    #[test]
    fn status_goes_busy_during_commit() {
        let mut core = SealCore::new();
        core.write_data(0x1111_2222);
        core.write_ctrl(regs::CtrlWrite::commit_word(0x01));
        assert_eq!(core.read_ctrl() & regs::STATUS_BUSY, regs::STATUS_BUSY);
        assert_eq!(core.read_ctrl() & regs::STATUS_READY, 0);
        assert!(core.run_until_idle(COMMIT_TICK_BUDGET));
        assert_eq!(core.read_ctrl(), regs::STATUS_READY);
    }

    #[test]
    fn host_sees_busy_while_sequencer_owns() {
        let mut core = SealCore::new();
        core.write_data(0x0102_0304);
        core.write_ctrl(regs::CtrlWrite::commit_word(0x55));
        // Mid-commit the host port must read busy even on ticks where the
        // engine itself is between bytes.
        let mut saw_mid_commit_tick = false;
        while core.read_ctrl() & regs::STATUS_BUSY != 0 {
            assert_eq!(core.host_read() & host::HOST_BUSY, host::HOST_BUSY);
            saw_mid_commit_tick = true;
            core.idle_tick();
        }
        assert!(saw_mid_commit_tick);
        assert_eq!(core.host_read() & host::HOST_BUSY, 0);
    }

    #[test]
    fn reset_preserves_session_counter_input_only() {
        let mut core = SealCore::new();
        core.set_session_counter(0x77);
        assert!(core.commit(0x01, 1, COMMIT_TICK_BUDGET));
        assert!(core.observe().session_locked);

        core.reset();
        let obs = core.observe();
        assert!(!obs.session_locked);
        assert_eq!(obs.mono_count, 0);
        assert_eq!(core.read_ctrl(), regs::STATUS_READY);

        // The external counter input is still driven; the next first commit
        // re-locks from it.
        assert!(core.commit(0x01, 2, COMMIT_TICK_BUDGET));
        assert_eq!(core.sealed().session_id, 0x77);
    }
}
