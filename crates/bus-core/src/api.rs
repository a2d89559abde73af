//! Host-facing configuration, pin and trace contracts.

use crate::arbiter::{Driver, DriverSet};
use crate::interrupt::{Edge, InterruptConfig, InterruptOrigin};
use crate::io::PortMap;
use crate::memory::{MemoryLayout, MemoryRegion};
use crate::status::{CycleState, CycleType};
use crate::ConfigError;

/// Top-level configuration for a [`crate::System`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SystemConfig {
    /// ROM/RAM sizing.
    pub memory: MemoryLayout,
    /// Interrupt controller parameters.
    pub interrupts: InterruptConfig,
    /// On-board device port numbers.
    pub ports: PortMap,
    /// Enables trace callback dispatch.
    pub tracing_enabled: bool,
}

impl SystemConfig {
    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first section's [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.memory.validate()?;
        self.interrupts.validate()?;
        self.ports.validate()
    }
}

/// Processor-side pins for one clock period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BusPins {
    /// `S2 S1 S0` in bits 2..0.
    pub status: u8,
    /// SYNC level.
    pub sync: bool,
    /// Byte the processor drives, or `None` when it floats the bus.
    pub core_drive: Option<u8>,
}

impl BusPins {
    /// Pins announcing `state` with the processor's bus floating.
    #[must_use]
    pub const fn new(state: CycleState, sync: bool) -> Self {
        Self {
            status: state.status_bits(),
            sync,
            core_drive: None,
        }
    }

    /// Same pins with the processor driving `value`.
    #[must_use]
    pub const fn driving(self, value: u8) -> Self {
        Self {
            core_drive: Some(value),
            ..self
        }
    }
}

/// Resolved bus and control lines after one clock period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TickOutcome {
    /// Tick index.
    pub tick: u64,
    /// State decoded from the status lines.
    pub state: CycleState,
    /// Resolved bus value (`None` when floating).
    pub bus: Option<u8>,
    /// Winning driver.
    pub driver: Option<Driver>,
    /// INT line.
    pub int: bool,
    /// READY line; tied high.
    pub ready: bool,
    /// Reset was held during this tick; nothing was sampled.
    pub in_reset: bool,
}

/// Trace event emitted in bus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TraceEvent {
    /// SYNC rising edge announced a state.
    StateEntered {
        /// Tick index.
        tick: u64,
        /// Announced state.
        state: CycleState,
    },
    /// Cycle type captured at T2.
    CycleTypeLatched {
        /// Tick index.
        tick: u64,
        /// Captured type.
        cycle_type: CycleType,
    },
    /// A driver won the bus.
    BusDriven {
        /// Tick index.
        tick: u64,
        /// Winner.
        driver: Driver,
        /// Value on the bus.
        value: u8,
    },
    /// Status changed without a SYNC edge and was ignored.
    StatusGlitch {
        /// Tick index.
        tick: u64,
        /// Glitched state.
        seen: CycleState,
        /// State held from the last SYNC edge.
        stable: CycleState,
    },
    /// Several drivers requested the bus.
    Contention {
        /// Tick index.
        tick: u64,
        /// Every requester.
        drivers: DriverSet,
    },
    /// Debounced edge on an interrupt source input.
    DebouncedEdge {
        /// Tick index.
        tick: u64,
        /// Source index.
        source: u8,
        /// Edge direction.
        edge: Edge,
    },
    /// Interrupt request accepted; INT raised.
    InterruptRaised {
        /// Tick index.
        tick: u64,
        /// Request origin.
        origin: InterruptOrigin,
        /// RST vector.
        vector: u8,
    },
    /// RST opcode fetched; request withdrawn.
    InterruptAcknowledged {
        /// Tick index.
        tick: u64,
        /// Request origin.
        origin: InterruptOrigin,
        /// RST vector.
        vector: u8,
    },
    /// Acknowledge cut short by a new cycle.
    InterruptAborted {
        /// Tick index.
        tick: u64,
        /// Request origin.
        origin: InterruptOrigin,
    },
    /// Input port served.
    PortRead {
        /// Tick index.
        tick: u64,
        /// Port number.
        port: u8,
        /// Value driven.
        value: u8,
    },
    /// Output port latched.
    PortWrite {
        /// Tick index.
        tick: u64,
        /// Port number.
        port: u8,
        /// Value latched.
        value: u8,
    },
    /// RAM write committed.
    MemoryWrite {
        /// Tick index.
        tick: u64,
        /// Target address.
        addr: u16,
        /// Value written.
        value: u8,
    },
    /// Write to ROM or unmapped space dropped.
    WriteDiscarded {
        /// Tick index.
        tick: u64,
        /// Target address.
        addr: u16,
        /// Region of the address.
        region: MemoryRegion,
    },
    /// T3 reached with no complete address latched.
    UnlatchedAccess {
        /// Tick index.
        tick: u64,
    },
    /// Reset held; every latch cleared.
    Reset {
        /// Tick index.
        tick: u64,
    },
}

/// Sink trait for trace hooks.
pub trait TraceSink {
    /// Records an event in bus order.
    fn on_event(&mut self, event: TraceEvent);
}

/// In-memory trace sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceLog {
    /// Events in arrival order.
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }
}

impl TraceSink for TraceLog {
    fn on_event(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}
