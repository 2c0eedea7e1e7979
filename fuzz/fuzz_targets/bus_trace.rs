#![no_main]

use libfuzzer_sys::fuzz_target;
use monoseal_core::observe::{first_counterexample, BusOp};

/// Decode arbitrary bytes into a bounded register-operation trace.
fn decode_ops(data: &[u8]) -> Vec<BusOp> {
    let mut ops = Vec::new();
    let mut it = data.iter().copied();
    while let Some(tag) = it.next() {
        if ops.len() >= 256 {
            break;
        }
        let mut word = |n: usize| -> u32 {
            let mut w = 0u32;
            for _ in 0..n {
                w = (w << 8) | u32::from(it.next().unwrap_or(0));
            }
            w
        };
        ops.push(match tag % 8 {
            0 => BusOp::WriteData(word(4)),
            1 => BusOp::WriteCtrl(word(2) as u16),
            2 => BusOp::ReadData,
            3 => BusOp::ReadCtrl,
            4 => BusOp::HostWrite(word(4)),
            5 => BusOp::HostRead,
            6 => BusOp::SetSession(word(1) as u8),
            _ => BusOp::Wait(word(1) as u8 % 64),
        });
    }
    ops
}

fuzz_target!(|data: &[u8]| {
    let ops = decode_ops(data);
    // The tick invariants must hold on every reachable trace, and the
    // replay itself must never panic.
    assert!(first_counterexample(&ops).is_none());
});
