//! Deterministic bus fingerprint: boots a scripted board, exercises every
//! peripheral and hashes the resolved bus plus final device state.

use i8008_bus::{CycleState, PinScript, System, SystemConfig, TraceLog};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn script() -> PinScript {
    let mut script = PinScript::new();
    script
        .repeat(CycleState::Stopped, 8)
        .interrupt_ack(0x0000)
        .execute()
        .fetch(0x0000)
        .fetch(0x0001)
        .memory_write(0x0800, 0x5A)
        .memory_read(0x0800)
        .output(8, 0xFE)
        .input(1)
        .input(3)
        .input(2)
        .output(9, b'k')
        .output(31, 0x01);
    for _ in 0..6 {
        script.execute();
    }
    script.interrupt_ack(0x0010).execute();
    script
}

fn fingerprint() -> String {
    let config = SystemConfig {
        tracing_enabled: true,
        ..SystemConfig::default()
    };
    let Ok(mut system) = System::new(config) else {
        return String::from("invalid config");
    };
    if system.load_rom(&[0x2E, 0x40, 0xC7, 0x05]).is_err() {
        return String::from("rom too large");
    }
    system.push_console_input(b"ok");

    let mut log = TraceLog::new();
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for (index, pins) in script().pins().iter().enumerate() {
        if index == 60 && system.set_button(0, true).is_err() {
            return String::from("no button source");
        }
        match system.step_with_trace(*pins, &mut log) {
            Ok(outcome) => {
                hash_bytes(&mut hash, &[0x10, outcome.bus.unwrap_or(0), u8::from(outcome.int)]);
            }
            Err(fault) => hash_bytes(&mut hash, format!("{fault}").as_bytes()),
        }
    }

    let events = u64::try_from(log.events.len()).unwrap_or(u64::MAX);
    hash_bytes(&mut hash, &events.to_le_bytes());
    hash_bytes(&mut hash, system.memory().ram());
    hash_bytes(&mut hash, system.console_output());
    let checkpoints: Vec<u8> = system.monitor().checkpoints().collect();
    hash_bytes(&mut hash, &checkpoints);
    hash_bytes(&mut hash, &[system.output_port(8), system.interrupts().status_byte()]);
    let diag = system.diagnostics();
    hash_bytes(&mut hash, &diag.state_count.to_le_bytes());
    hash_bytes(&mut hash, &diag.interrupts_acknowledged.to_le_bytes());

    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}
