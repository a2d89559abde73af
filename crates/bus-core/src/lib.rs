//! Bus-side model of an Intel 8008 board: status decoding, memory and I/O
//! controllers, interrupt delivery and single-driver bus arbitration.

/// Status-line decoding and SYNC-qualified state latching.
pub mod status;
pub use status::{
    decode_status, CycleState, CycleType, Observation, StatusDecoder, SyncLatch,
    STATUS_ENCODING_TABLE,
};

/// Two-phase clock derived from the master oscillator.
pub mod phase;
pub use phase::{Phase, PhaseGenerator, PhaseLevels, MASTER_TICKS_PER_PERIOD};

/// Fixed-priority bus arbitration.
pub mod arbiter;
pub use arbiter::{resolve, BusGrant, BusRequests, Driver, DriverSet, Resolution, DRIVER_PRIORITY};

/// Fault and configuration error taxonomy.
pub mod fault;
pub use fault::{BusFault, ConfigError, FaultClass};

/// ROM/RAM map, address latch and memory controller.
pub mod memory;
pub use memory::{
    AddressLatch, MemoryController, MemoryEvent, MemoryLayout, MemoryRegion, ADDRESS_MASK,
    ADDRESS_SPACE_BYTES, UNMAPPED_READ_VALUE,
};

/// Port numbering, I/O controller, console and OUT monitor.
pub mod io;
pub use io::{
    io_cycle_byte, is_input_port, port_direction, port_from_bus, Console, InputSource,
    IoController, IoEvent, IoMode, IoMonitor, IoPhase, JournalEntry, PortDirection, PortMap,
    PortSlot, PortTable, CHECKPOINT_CAPACITY, JOURNAL_CAPACITY, PORT_COUNT,
};

/// Button debouncing and RST-injecting interrupt controller.
pub mod interrupt;
pub use interrupt::{
    rst_opcode, rst_target, Debouncer, Edge, InterruptConfig, InterruptController,
    InterruptEvent, InterruptOrigin, InterruptPhase, InterruptSourceConfig, MAX_INTERRUPT_SOURCES,
    RST_VECTOR_COUNT,
};

/// Saturating bus diagnostics.
pub mod diag;
pub use diag::BusDiagnostics;

/// Host-facing configuration, pin and trace contract.
pub mod api;
pub use api::{BusPins, SystemConfig, TickOutcome, TraceEvent, TraceLog, TraceSink};

/// Intel HEX ROM image parsing.
pub mod hex;
pub use hex::{parse_intel_hex, HexError, ImageError};

/// Per-period event loop over every peripheral.
pub mod system;
pub use system::System;

/// Scripted processor-side pin sequences.
pub mod script;
pub use script::{PinScript, ScriptRun, PERIODS_PER_STATE};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
