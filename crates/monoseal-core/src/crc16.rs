//! Bit-serial CRC16-MODBUS checksum coprocessor.
//!
//! One shared, stateful instance per core. The engine consumes one byte per
//! `feed` strobe and then shifts one bit per tick for eight ticks; `busy`
//! is combinational over the remaining-bit counter, so it reads true from
//! the accepting tick until the eighth shift completes. `result` is valid
//! and stable exactly while `busy` is false.

/// Reflected CRC-16/MODBUS polynomial (0x8005 bit-reversed).
pub const POLY: u16 = 0xA001;

/// Accumulator value after `init`.
pub const INIT: u16 = 0xFFFF;

/// Shift ticks per accepted byte.
pub const BITS_PER_BYTE: u8 = 8;

/// Coprocessor control/data inputs for one tick.
///
/// The arbiter guarantees that the engine sees exactly one client's request
/// per tick, never a bitwise mix of two.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CrcRequest {
    /// Reset the accumulator to [`INIT`], cancelling any in-progress byte.
    /// Takes priority over `feed` within the same tick.
    pub init: bool,
    /// Strobe: accept `data` and start the shift sequence. Silently ignored
    /// while busy; callers must poll `busy`.
    pub feed: bool,
    /// Byte presented with `feed`.
    pub data: u8,
}

impl CrcRequest {
    /// A tick with no request asserted.
    pub const IDLE: CrcRequest = CrcRequest {
        init: false,
        feed: false,
        data: 0,
    };

    /// An `init` pulse.
    pub const fn init_pulse() -> Self {
        CrcRequest {
            init: true,
            feed: false,
            data: 0,
        }
    }

    /// A `feed` strobe carrying `data`.
    pub const fn feed_pulse(data: u8) -> Self {
        CrcRequest {
            init: false,
            feed: true,
            data,
        }
    }

    /// True if any control line is asserted this tick.
    pub const fn is_active(&self) -> bool {
        self.init || self.feed
    }
}

/// Checksum coprocessor state: 16-bit accumulator plus the remaining-bit
/// counter (0 = idle, 1..=8 = shifts left for the current byte).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrcEngine {
    acc: u16,
    bits_left: u8,
}

impl CrcEngine {
    /// Engine at its post-reset baseline.
    pub const fn new() -> Self {
        CrcEngine {
            acc: INIT,
            bits_left: 0,
        }
    }

    /// True while a byte is being processed. Combinational from the
    /// remaining-bit counter.
    pub const fn busy(&self) -> bool {
        self.bits_left != 0
    }

    /// Raw accumulator. A stable CRC result exactly when `busy()` is false.
    pub const fn result(&self) -> u16 {
        self.acc
    }

    /// Advance one tick: pure transition from current state and this tick's
    /// routed request to the next state.
    ///
    /// Priority order: `init` cancels everything; an in-progress byte shifts
    /// once; otherwise a `feed` strobe is accepted. A `feed` during a busy
    /// tick is dropped silently.
    #[must_use]
    pub fn step(self, req: CrcRequest) -> CrcEngine {
        if req.init {
            return CrcEngine::new();
        }
        if self.bits_left > 0 {
            let carry = self.acc & 1 != 0;
            let shifted = self.acc >> 1;
            return CrcEngine {
                acc: if carry { shifted ^ POLY } else { shifted },
                bits_left: self.bits_left - 1,
            };
        }
        if req.feed {
            return CrcEngine {
                acc: self.acc ^ u16::from(req.data),
                bits_left: BITS_PER_BYTE,
            };
        }
        self
    }
}

impl Default for CrcEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Pure byte-at-a-time CRC16-MODBUS reference.
///
/// Matches what the tick-level engine computes after feeding `data` byte by
/// byte from a freshly initialized accumulator. Used for golden vectors and
/// record-log verification.
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc = INIT;
    for &b in data {
        crc ^= u16::from(b);
        for _ in 0..BITS_PER_BYTE {
            let carry = crc & 1 != 0;
            crc >>= 1;
            if carry {
                crc ^= POLY;
            }
        }
    }
    crc
}
