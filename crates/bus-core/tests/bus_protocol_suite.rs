//! Bus protocol coverage: address latching, region decode, port dispatch and
//! single-driver arbitration over scripted processor cycles.

#![allow(clippy::pedantic, clippy::nursery, clippy::too_many_lines)]

use i8008_bus::{
    io_cycle_byte, port_from_bus, BusFault, BusPins, CycleState, CycleType, Driver,
    InterruptPhase, MemoryLayout, PinScript, System, SystemConfig, TickOutcome, TraceEvent,
    TraceLog, UNMAPPED_READ_VALUE,
};
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn system_with(layout: MemoryLayout) -> System {
    System::new(SystemConfig {
        memory: layout,
        ..SystemConfig::default()
    })
    .unwrap()
}

#[test]
fn fetches_read_rom_during_t3() {
    let mut system = system_with(MemoryLayout::STANDARD);
    system.load_rom(&[0x2E, 0x40, 0xC7]).unwrap();

    let mut script = PinScript::new();
    script.fetch(0x0000).fetch(0x0001).memory_read(0x0002);
    let run = script.run(&mut system);

    assert!(run.faults().is_empty());
    assert_eq!(
        run.transfer_values(),
        vec![Some(0x2E), Some(0x40), Some(0xC7)]
    );
    assert_eq!(system.diagnostics().bus_cycle_count, 3);
    assert_eq!(system.diagnostics().state_count, 9);
}

#[rstest]
#[case::standard(MemoryLayout::STANDARD, 0x0800, 0x0C00)]
#[case::extended(MemoryLayout::EXTENDED, 0x1000, 0x1800)]
fn regions_decode_per_layout(
    #[case] layout: MemoryLayout,
    #[case] ram_base: u16,
    #[case] unmapped: u16,
) {
    let mut system = system_with(layout);
    system.load_rom(&[0xA5]).unwrap();

    let mut script = PinScript::new();
    script
        .memory_read(0x0000)
        .memory_write(ram_base, 0x5A)
        .memory_read(ram_base)
        .memory_write(unmapped, 0x11)
        .memory_read(unmapped)
        .memory_write(0x0000, 0x99)
        .memory_read(0x0000);
    let run = script.run(&mut system);

    assert!(run.faults().is_empty());
    assert_eq!(
        run.transfer_values(),
        vec![
            Some(0xA5),
            Some(0x5A),
            Some(0x5A),
            Some(0x11),
            Some(UNMAPPED_READ_VALUE),
            Some(0x99),
            Some(0xA5),
        ]
    );
    assert_eq!(system.memory().peek(ram_base), 0x5A);
    assert_eq!(system.diagnostics().ram_write_count, 1);
    assert_eq!(system.diagnostics().discarded_write_count, 2);
}

#[test]
fn incomplete_address_is_never_served() {
    let mut system = system_with(MemoryLayout::STANDARD);
    system.load_rom(&[0x3C; 16]).unwrap();

    let mut script = PinScript::new();
    script
        .state(CycleState::T1, Some(0x04))
        .state(CycleState::T2, None)
        .state(CycleState::T3, None);
    let run = script.run(&mut system);

    assert!(run.faults().is_empty());
    assert!(run.outcomes().all(|outcome| outcome.driver != Some(Driver::Memory)));
    assert_eq!(system.diagnostics().unlatched_access_count, 1);
}

#[test]
fn stale_address_does_not_leak_into_next_cycle() {
    let mut system = system_with(MemoryLayout::STANDARD);
    system.load_rom(&[0x00, 0x11, 0x22, 0x33]).unwrap();

    // Second T1 floats the bus; the first cycle's low byte must not be reused.
    let mut script = PinScript::new();
    script
        .state(CycleState::T1, Some(0x01))
        .state(CycleState::T1, None)
        .state(CycleState::T2, Some(0x40))
        .state(CycleState::T3, None);
    let run = script.run(&mut system);

    assert!(run.faults().is_empty());
    assert_eq!(run.results[6].as_ref().unwrap().bus, None);
    assert_eq!(system.diagnostics().unlatched_access_count, 1);
    assert_eq!(system.diagnostics().bus_cycle_count, 2);
}

#[test]
fn status_glitch_between_sync_edges_is_ignored() {
    let mut system = system_with(MemoryLayout::STANDARD);
    system.load_rom(&[0x44, 0x55]).unwrap();

    let mut script = PinScript::new();
    script.repeat(CycleState::Stopped, 8);
    script
        .raw(BusPins::new(CycleState::T1, true).driving(0x01))
        .raw(BusPins::new(CycleState::T1I, false).driving(0x01))
        .raw(BusPins::new(CycleState::T2, true).driving(0x40))
        .raw(BusPins::new(CycleState::T3, false).driving(0x40))
        .raw(BusPins::new(CycleState::T3, true))
        .raw(BusPins::new(CycleState::T3, false));
    let run = script.run(&mut system);

    assert!(run.faults().is_empty());
    let t3 = run.results[20].as_ref().unwrap();
    assert_eq!(t3.bus, Some(0x55));
    assert_eq!(t3.driver, Some(Driver::Memory));
    assert_eq!(system.diagnostics().glitch_count, 2);
    assert_eq!(system.interrupts().phase(), InterruptPhase::Pending);
}

#[test]
fn led_port_latches_written_byte() {
    let mut system = system_with(MemoryLayout::STANDARD);

    let mut script = PinScript::new();
    script.output(8, 0xFE);
    let run = script.run(&mut system);

    assert!(run.faults().is_empty());
    assert_eq!(system.output_port(8), 0xFE);
    assert_eq!(system.monitor().mirrored(8), 0xFE);
    let journal: Vec<_> = system.monitor().journal().copied().collect();
    assert_eq!(journal.len(), 1);
    assert_eq!((journal[0].port, journal[0].value), (8, 0xFE));
    assert_eq!(system.diagnostics().port_write_count, 1);
}

#[test]
fn button_port_and_interrupt_path_are_decoupled() {
    let mut system = system_with(MemoryLayout::STANDARD);

    let mut first = PinScript::new();
    first.input(1);
    assert_eq!(first.run(&mut system).transfer_values(), vec![Some(0x00)]);

    system.set_button(0, true).unwrap();
    let mut held = PinScript::new();
    for _ in 0..6 {
        held.execute();
    }
    held.input(1).input(6);
    let run = held.run(&mut system);

    // Startup request is still in flight, so the edge sits in the pending byte.
    assert_eq!(run.transfer_values(), vec![Some(0x00), Some(0x01)]);
    assert_eq!(system.diagnostics().debounced_edge_count, 1);
}

#[test]
fn host_input_port_is_served() {
    let mut system = system_with(MemoryLayout::STANDARD);
    system.set_input_port(1, 0x5A).unwrap();

    let mut script = PinScript::new();
    script.input(1).input(0).input(5);
    let run = script.run(&mut system);

    assert!(run.faults().is_empty());
    assert_eq!(
        run.transfer_values(),
        vec![Some(0x5A), Some(0xFF), Some(0xFF)]
    );
    assert_eq!(system.diagnostics().port_read_count, 3);
}

#[test]
fn console_ports_move_bytes_both_ways() {
    let mut system = system_with(MemoryLayout::STANDARD);
    system.push_console_input(b"A");

    let mut script = PinScript::new();
    script.input(3).input(2).input(3).output(9, b'!').output(9, b'?');
    let run = script.run(&mut system);

    assert!(run.faults().is_empty());
    let values = run.transfer_values();
    assert_eq!(&values[..3], &[Some(0x01), Some(b'A'), Some(0x00)]);
    assert_eq!(system.console_output(), b"!?");
    assert_eq!(system.take_console_output(), b"!?".to_vec());
    assert!(system.console_output().is_empty());
}

#[test]
fn checkpoint_port_history_is_recorded() {
    let mut system = system_with(MemoryLayout::STANDARD);

    let mut script = PinScript::new();
    script.output(31, 0x01).output(8, 0x0F).output(31, 0x02);
    script.run(&mut system);

    assert_eq!(
        system.monitor().checkpoints().collect::<Vec<_>>(),
        vec![0x01, 0x02]
    );
    assert_eq!(system.monitor().journal().count(), 3);
}

#[test]
fn trace_reports_cycle_in_bus_order() {
    let mut system = System::new(SystemConfig {
        tracing_enabled: true,
        ..SystemConfig::default()
    })
    .unwrap();
    system.load_rom(&[0x00, 0x00, 0x00, 0x00, 0x7E]).unwrap();

    let mut script = PinScript::new();
    script.memory_read(0x0004);
    let mut log = TraceLog::new();
    for pins in script.pins() {
        system.step_with_trace(*pins, &mut log).unwrap();
    }

    let entered: Vec<_> = log
        .events
        .iter()
        .filter_map(|event| match event {
            TraceEvent::StateEntered { state, .. } => Some(*state),
            _ => None,
        })
        .collect();
    assert_eq!(
        entered,
        vec![CycleState::T1, CycleState::T2, CycleState::T3]
    );
    assert!(log.events.contains(&TraceEvent::CycleTypeLatched {
        tick: 2,
        cycle_type: CycleType::MemoryRead,
    }));
    assert!(log.events.contains(&TraceEvent::BusDriven {
        tick: 4,
        driver: Driver::Memory,
        value: 0x7E,
    }));
}

#[test]
fn trace_is_silent_when_disabled() {
    let mut system = system_with(MemoryLayout::STANDARD);
    let mut script = PinScript::new();
    script.fetch(0x0000);

    let mut log = TraceLog::new();
    for pins in script.pins() {
        system.step_with_trace(*pins, &mut log).unwrap();
    }
    assert!(log.events.is_empty());
}

#[test]
fn core_driving_over_memory_is_contention() {
    let mut system = system_with(MemoryLayout::STANDARD);

    let mut script = PinScript::new();
    script
        .state(CycleState::T1, Some(0x00))
        .state(CycleState::T2, Some(0x40))
        .state(CycleState::T3, Some(0x12));
    let run = script.run(&mut system);

    let faults = run.faults();
    assert_eq!(faults.len(), 2);
    let BusFault::Contention { drivers } = faults[0] else {
        panic!("expected contention, got {:?}", faults[0]);
    };
    assert!(drivers.contains(Driver::Core));
    assert!(drivers.contains(Driver::Memory));
    assert_eq!(system.diagnostics().fault_count_protocol, 2);
}

#[derive(Debug, Clone)]
enum Cycle {
    Fetch(u16),
    Read(u16),
    Write(u16, u8),
    Input(u8),
    Output(u8, u8),
    Execute,
    Ack(u16),
    Button(bool),
}

fn cycle_strategy() -> impl Strategy<Value = Cycle> {
    prop_oneof![
        2 => (0_u16..0x4000).prop_map(Cycle::Fetch),
        2 => (0_u16..0x4000).prop_map(Cycle::Read),
        2 => (0_u16..0x4000, any::<u8>()).prop_map(|(addr, value)| Cycle::Write(addr, value)),
        2 => (0_u8..8).prop_map(Cycle::Input),
        2 => (8_u8..32, any::<u8>()).prop_map(|(port, value)| Cycle::Output(port, value)),
        2 => Just(Cycle::Execute),
        3 => (0_u16..0x4000).prop_map(Cycle::Ack),
        1 => any::<bool>().prop_map(Cycle::Button),
    ]
}

/// Runs the cycles in order, applying button changes between them.
fn run_cycles(system: &mut System, cycles: &[Cycle]) -> Vec<Result<TickOutcome, BusFault>> {
    let mut results = Vec::new();
    let mut script = PinScript::new();
    for cycle in cycles {
        match *cycle {
            Cycle::Fetch(addr) => script.fetch(addr),
            Cycle::Read(addr) => script.memory_read(addr),
            Cycle::Write(addr, value) => script.memory_write(addr, value),
            Cycle::Input(port) => script.input(port),
            Cycle::Output(port, value) => script.output(port, value),
            Cycle::Execute => script.execute(),
            Cycle::Ack(pc) => script.interrupt_ack(pc),
            Cycle::Button(pressed) => {
                results.extend(script.run(system).results);
                script = PinScript::new();
                system.set_button(0, pressed).unwrap();
                continue;
            }
        };
    }
    results.extend(script.run(system).results);
    results
}

proptest! {
    #[test]
    fn well_formed_cycles_never_contend(cycles in proptest::collection::vec(cycle_strategy(), 1..60)) {
        let mut system = system_with(MemoryLayout::STANDARD);
        let results = run_cycles(&mut system, &cycles);

        for result in &results {
            let outcome = result.as_ref();
            prop_assert!(outcome.is_ok(), "unexpected fault {:?}", outcome.err());
            if let Ok(outcome) = outcome {
                prop_assert_eq!(outcome.bus.is_some(), outcome.driver.is_some());
            }
        }
        prop_assert_eq!(system.diagnostics().fault_count_protocol, 0);
        prop_assert_eq!(system.diagnostics().fault_count_sequencing, 0);
    }

    #[test]
    fn ram_write_reads_back(offset in 0_u16..0x0400, value in any::<u8>()) {
        let mut system = system_with(MemoryLayout::STANDARD);
        let addr = 0x0800 + offset;
        let mut script = PinScript::new();
        script.memory_write(addr, value).fetch(0x0000).memory_read(addr);
        let run = script.run(&mut system);

        prop_assert_eq!(run.transfer_values()[2], Some(value));
        prop_assert_eq!(system.memory().ram()[usize::from(offset)], value);
    }

    #[test]
    fn arbitrary_pins_only_fault_with_several_drivers(
        pins in proptest::collection::vec(
            (0_u8..8, any::<bool>(), proptest::option::of(any::<u8>())),
            1..200,
        )
    ) {
        let mut system = system_with(MemoryLayout::STANDARD);
        for (status, sync, core_drive) in pins {
            let result = system.step(BusPins { status, sync, core_drive });
            if let Err(BusFault::Contention { drivers }) = result {
                prop_assert!(drivers.len() >= 2);
            }
        }
    }

    #[test]
    fn io_cycle_byte_names_only_its_port(port in 0_u8..32) {
        let byte = io_cycle_byte(port);
        prop_assert_eq!(CycleType::from_bus(byte), CycleType::IoOperation);
        prop_assert_eq!(port_from_bus(byte), port);
    }
}
