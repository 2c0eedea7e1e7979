//! Shadow observation and the per-tick invariant rail.
//!
//! [`Observation`] snapshots every internal register of the core purely for
//! assertions; it is the software analog of hierarchical signal probing in
//! a testbench and is deliberately decoupled from the production register
//! surface.
//!
//! [`first_counterexample`] replays an arbitrary bus-operation trace on a
//! fresh core and checks the rail after every tick, returning the earliest
//! violating step. Property tests and the fuzz target share it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arbiter::Owner;
use crate::engine::{SealCore, TickInputs};
use crate::sequencer::{SealState, SealedRecord};

/// Snapshot of the core's internal registers after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    pub state: SealState,
    pub mono_count: u32,
    pub session_id: u8,
    pub session_locked: bool,
    pub commit_dropped: bool,
    pub read_phase: u8,
    pub byte_index: u8,
    pub crc_result: u16,
    pub crc_busy: bool,
    /// Coprocessor ownership during the tick that produced this snapshot.
    pub owner: Owner,
    pub sealed: SealedRecord,
}

/// A broken tick-level invariant.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("monotonic counter moved by more than one: {prev} -> {next}")]
    MonoSkip { prev: u32, next: u32 },
    #[error("monotonic counter changed outside a latch completion: {prev} -> {next}")]
    MonoOutsideLatch { prev: u32, next: u32 },
    #[error("session lock released without a reset")]
    SessionUnlocked,
    #[error("session id changed after lock: {prev:#04x} -> {next:#04x}")]
    SessionChanged { prev: u8, next: u8 },
    #[error("commit_dropped raised while the sequencer was idle")]
    DroppedRaisedWhileIdle,
    #[error("sealed record mutated outside a latch completion")]
    RecordMutatedOutsideLatch,
}

/// Check one tick transition `prev -> next` against the core invariants:
///
/// - `mono_count` never decreases and never skips (delta 0 or 1);
/// - `mono_count` moves only on the `Latching -> Idle` transition;
/// - the session lock is one-way and freezes the session id;
/// - `commit_dropped` rises only while the sequencer is non-idle;
/// - the sealed record changes only when a latch completes.
pub fn check_step(prev: &Observation, next: &Observation) -> Result<(), InvariantViolation> {
    let delta = next.mono_count.wrapping_sub(prev.mono_count);
    if delta > 1 {
        return Err(InvariantViolation::MonoSkip {
            prev: prev.mono_count,
            next: next.mono_count,
        });
    }
    let latched = prev.state == SealState::Latching && next.state == SealState::Idle;
    if delta == 1 && !latched {
        return Err(InvariantViolation::MonoOutsideLatch {
            prev: prev.mono_count,
            next: next.mono_count,
        });
    }
    if latched && delta != 1 {
        return Err(InvariantViolation::MonoOutsideLatch {
            prev: prev.mono_count,
            next: next.mono_count,
        });
    }
    if prev.session_locked {
        if !next.session_locked {
            return Err(InvariantViolation::SessionUnlocked);
        }
        if next.session_id != prev.session_id {
            return Err(InvariantViolation::SessionChanged {
                prev: prev.session_id,
                next: next.session_id,
            });
        }
    }
    if !prev.commit_dropped && next.commit_dropped && prev.state == SealState::Idle {
        return Err(InvariantViolation::DroppedRaisedWhileIdle);
    }
    if next.sealed != prev.sealed && !latched {
        return Err(InvariantViolation::RecordMutatedOutsideLatch);
    }
    Ok(())
}

/// One register-level operation of a replayable trace. Serde-able so fuzz
/// findings can be kept as regression fixtures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusOp {
    WriteData(u32),
    WriteCtrl(u16),
    ReadData,
    ReadCtrl,
    HostWrite(u32),
    HostRead,
    SetSession(u8),
    /// Idle ticks (bounded by the u8 so traces stay short).
    Wait(u8),
}

/// The earliest rail violation in a trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counterexample {
    pub violation: InvariantViolation,
    /// Index into the replayed op slice.
    pub at_op: usize,
    /// Snapshot after the violating tick.
    pub observation: Observation,
}

/// Replay `ops` on a fresh core, checking the invariant rail after every
/// tick. Returns the first counterexample, or `None` when the whole trace
/// holds.
pub fn first_counterexample(ops: &[BusOp]) -> Option<Counterexample> {
    let mut core = SealCore::new();
    let mut prev = core.observe();

    let mut check = |core: &SealCore, prev: &mut Observation, at_op: usize| {
        let next = core.observe();
        let out = check_step(prev, &next).err().map(|violation| Counterexample {
            violation,
            at_op,
            observation: next,
        });
        *prev = next;
        out
    };

    for (i, op) in ops.iter().enumerate() {
        match *op {
            BusOp::WriteData(v) => {
                core.write_data(v);
                if let Some(cx) = check(&core, &mut prev, i) {
                    return Some(cx);
                }
            }
            BusOp::WriteCtrl(w) => {
                core.write_ctrl(w);
                if let Some(cx) = check(&core, &mut prev, i) {
                    return Some(cx);
                }
            }
            BusOp::ReadData => {
                let _ = core.read_pulse();
                if let Some(cx) = check(&core, &mut prev, i) {
                    return Some(cx);
                }
            }
            BusOp::ReadCtrl => {
                // Combinational read; no tick, nothing can move.
                let _ = core.read_ctrl();
            }
            BusOp::HostWrite(w) => {
                core.host_write(w);
                if let Some(cx) = check(&core, &mut prev, i) {
                    return Some(cx);
                }
            }
            BusOp::HostRead => {
                let _ = core.host_read();
            }
            BusOp::SetSession(s) => {
                core.set_session_counter(s);
            }
            BusOp::Wait(n) => {
                for _ in 0..n {
                    core.tick(&TickInputs::default());
                    if let Some(cx) = check(&core, &mut prev, i) {
                        return Some(cx);
                    }
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::CtrlWrite;

    fn base_obs() -> Observation {
        Observation {
            state: SealState::Idle,
            mono_count: 0,
            session_id: 0,
            session_locked: false,
            commit_dropped: false,
            read_phase: 0,
            byte_index: 0,
            crc_result: 0xFFFF,
            crc_busy: false,
            owner: Owner::HostPeripheral,
            sealed: SealedRecord::default(),
        }
    }

    #[test]
    fn rail_accepts_an_unchanged_tick() {
        let obs = base_obs();
        assert_eq!(check_step(&obs, &obs), Ok(()));
    }

    #[test]
    fn rail_catches_a_counter_skip() {
        let prev = base_obs();
        let mut next = base_obs();
        next.mono_count = 2;
        assert!(matches!(
            check_step(&prev, &next),
            Err(InvariantViolation::MonoSkip { .. })
        ));
    }

    #[test]
    fn rail_catches_increment_outside_latch() {
        let prev = base_obs();
        let mut next = base_obs();
        next.mono_count = 1;
        assert!(matches!(
            check_step(&prev, &next),
            Err(InvariantViolation::MonoOutsideLatch { .. })
        ));
    }

    #[test]
    fn rail_catches_session_unlock_and_drift() {
        let mut prev = base_obs();
        prev.session_locked = true;
        prev.session_id = 0x42;

        let mut unlocked = prev;
        unlocked.session_locked = false;
        assert_eq!(
            check_step(&prev, &unlocked),
            Err(InvariantViolation::SessionUnlocked)
        );

        let mut drifted = prev;
        drifted.session_id = 0x43;
        assert!(matches!(
            check_step(&prev, &drifted),
            Err(InvariantViolation::SessionChanged { .. })
        ));
    }

    #[test]
    fn rail_catches_drop_flag_rising_while_idle() {
        let prev = base_obs();
        let mut next = base_obs();
        next.commit_dropped = true;
        assert_eq!(
            check_step(&prev, &next),
            Err(InvariantViolation::DroppedRaisedWhileIdle)
        );
    }

    #[test]
    fn representative_trace_has_no_counterexample() {
        let ops = [
            BusOp::SetSession(0xAB),
            BusOp::WriteData(0xDEAD_BEEF),
            BusOp::WriteCtrl(CtrlWrite::commit_word(0x42)),
            // A racing commit and host traffic while the seal runs.
            BusOp::WriteCtrl(CtrlWrite::commit_word(0x43)),
            BusOp::HostWrite(0x0000_0055),
            BusOp::Wait(120),
            BusOp::ReadData,
            BusOp::ReadData,
            BusOp::ReadData,
            BusOp::ReadCtrl,
            BusOp::WriteCtrl(CtrlWrite::commit_word(0x44)),
            BusOp::Wait(120),
        ];
        assert_eq!(first_counterexample(&ops), None);
    }
}
