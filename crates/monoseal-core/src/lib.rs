//! Tamper-evident, monotonic record-sealing engine.
//!
//! This crate is a tick-accurate software model of a record-sealing
//! peripheral: a synchronous sequencer that commits sensor readings into
//! append-only, CRC16-checksummed records carrying a non-backfillable
//! ordering proof, sharing a single checksum coprocessor with a
//! lower-priority host-accessible port.
//!
//! Structure:
//! - [`crc16`] — the bit-serial CRC16-MODBUS coprocessor (one shared instance).
//! - [`arbiter`] — priority mutex routing exactly one client per tick.
//! - [`host`] — the host-side checksum port (the arbiter's second client).
//! - [`sequencer`] — the seal state machine: feed, latch, monotonic counter,
//!   session-id locking.
//! - [`readback`] — multi-phase read-back of a wide record over a narrow port.
//! - [`engine`] — the composed core and its register-level bus operations.
//! - [`observe`] — shadow state and the per-tick invariant rail (test/fuzz
//!   surface, decoupled from the register interface).
//! - [`record_log`] — host-side append-only, hash-chained export of sealed
//!   records.
//!
//! Scheduling model: a single synchronous scheduler advances one discrete
//! tick at a time. Every component's next state is a pure function of its
//! current state and the current tick's inputs; there is no blocking and no
//! preemption. "Waiting" means a component re-evaluates its wait condition
//! on the next tick.

use serde::{Deserialize, Serialize};

pub mod arbiter;
pub mod crc16;
pub mod engine;
pub mod hash;
pub mod host;
pub mod observe;
pub mod readback;
pub mod record_log;
pub mod regs;
pub mod sequencer;

pub use engine::{SealCore, TickInputs};
pub use sequencer::SealedRecord;

/// 32-byte hash newtype used for record-log chaining.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    /// Genesis value for hash chains.
    pub const ZERO: Hash32 = Hash32([0u8; 32]);
}
