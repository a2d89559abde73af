#![no_main]

use i8008_bus::{parse_intel_hex, BusFault, BusPins, System, SystemConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_intel_hex(text);
    }

    let mut system = System::new(SystemConfig::default()).expect("default config is valid");
    let _ = system.load_rom(data);

    for chunk in data.chunks(2) {
        let control = chunk[0];
        if control & 0x80 != 0 {
            let _ = system.set_button(0, control & 0x40 != 0);
        }
        system.set_reset(control == 0xFF);
        let pins = BusPins {
            status: control & 0x07,
            sync: control & 0x08 != 0,
            core_drive: chunk.get(1).copied().filter(|_| control & 0x10 != 0),
        };
        if let Err(BusFault::Contention { drivers }) = system.step(pins) {
            assert!(drivers.len() >= 2);
        }
    }
});
