//! I/O side of the bus: port numbering, port table, controller and devices.

use std::fmt;

pub mod console;
pub mod controller;
pub mod monitor;
pub mod ports;

pub use console::Console;
pub use controller::{IoController, IoEvent, IoMode, IoPhase};
pub use monitor::{IoMonitor, JournalEntry, CHECKPOINT_CAPACITY, JOURNAL_CAPACITY};
pub use ports::{InputSource, PortMap, PortSlot, PortTable};

/// Number of addressable ports (5-bit port numbers).
pub const PORT_COUNT: usize = 32;

/// Input/output group of a port number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum PortDirection {
    /// Read by `INP`; the port drives the bus during T3.
    Input,
    /// Written by `OUT`; the port latches the bus during T3.
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// Ports 0-7 are input-group: bits 4:3 of the port number are both clear.
#[must_use]
pub const fn is_input_port(port: u8) -> bool {
    port & 0x18 == 0
}

/// Group of `port`.
#[must_use]
pub const fn port_direction(port: u8) -> PortDirection {
    if is_input_port(port) {
        PortDirection::Input
    } else {
        PortDirection::Output
    }
}

/// Extracts the port number from the T2 byte of an I/O cycle (D5:D1).
#[must_use]
pub const fn port_from_bus(value: u8) -> u8 {
    (value >> 1) & 0x1F
}

/// Builds the T2 byte the processor emits for an I/O cycle on `port`.
#[must_use]
pub const fn io_cycle_byte(port: u8) -> u8 {
    (crate::status::CycleType::IoOperation.tag() << 6) | ((port & 0x1F) << 1)
}
