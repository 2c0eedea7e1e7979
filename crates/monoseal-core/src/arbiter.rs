//! Coprocessor arbitration between the seal sequencer and the host port.
//!
//! Pure combinational routing, re-evaluated every tick; ownership is never
//! stored state. The sequencer always wins: its integrity proof depends on
//! no foreign byte polluting the 9-byte feed sequence, so the routed
//! request triple is all-or-nothing — exactly one client's `{init, feed,
//! data}` per tick, never a bitwise mix.

use crate::crc16::CrcRequest;
use crate::sequencer::Sequencer;

/// Which client drives the coprocessor this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Owner {
    Sequencer,
    HostPeripheral,
}

/// Ownership decision for one tick.
///
/// The sequencer owns the engine whenever it is mid-commit, and also on any
/// tick it asserts a request of its own while its state register still
/// reads idle: the commit-accept tick pulses `init` before the transition
/// to feeding lands, and a standalone checksum reset does the same. Either
/// pulse would otherwise be lost to the host.
pub fn owner(seq: &Sequencer, seq_req: &CrcRequest) -> Owner {
    if !seq.is_idle() || seq_req.is_active() {
        Owner::Sequencer
    } else {
        Owner::HostPeripheral
    }
}

/// Route exactly one client's request to the coprocessor. The loser's
/// request is discarded for the tick.
pub fn route(owner: Owner, seq_req: CrcRequest, host_req: CrcRequest) -> CrcRequest {
    match owner {
        Owner::Sequencer => seq_req,
        Owner::HostPeripheral => host_req,
    }
}
