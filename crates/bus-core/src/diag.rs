//! Saturating bus diagnostics counters.

use crate::{BusFault, FaultClass};

/// Counters accumulated while stepping the bus.
///
/// Counters survive a reset so a host can inspect what led up to it; only
/// [`BusDiagnostics::reset`] clears them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BusDiagnostics {
    /// The last fault observed, if any.
    pub last_fault: Option<BusFault>,
    /// Tick of the last fault.
    pub last_fault_tick: u64,
    /// Saturating counter for protocol-class faults (contention).
    pub fault_count_protocol: u32,
    /// Saturating counter for sequencing-class faults (aborted acknowledges).
    pub fault_count_sequencing: u32,
    /// SYNC rising edges seen.
    pub state_count: u32,
    /// Bus cycles opened by T1 or T1I.
    pub bus_cycle_count: u32,
    /// Status changes between SYNC edges.
    pub glitch_count: u32,
    /// T3 states reached without a complete address.
    pub unlatched_access_count: u32,
    /// Committed RAM writes.
    pub ram_write_count: u32,
    /// Writes dropped on ROM or unmapped space.
    pub discarded_write_count: u32,
    /// Input ports served.
    pub port_read_count: u32,
    /// Output ports latched.
    pub port_write_count: u32,
    /// Debounced input edges.
    pub debounced_edge_count: u32,
    /// Interrupt requests raised, startup included.
    pub interrupts_raised: u32,
    /// Interrupt requests acknowledged.
    pub interrupts_acknowledged: u32,
    /// Reset assertions.
    pub reset_count: u32,
}

const fn bump(counter: &mut u32) {
    *counter = counter.saturating_add(1);
}

impl BusDiagnostics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fault and bumps its class counter.
    pub const fn record_fault(&mut self, fault: BusFault, tick: u64) {
        self.last_fault = Some(fault);
        self.last_fault_tick = tick;
        match fault.class() {
            FaultClass::Protocol => bump(&mut self.fault_count_protocol),
            FaultClass::Sequencing => bump(&mut self.fault_count_sequencing),
        }
    }

    /// Records a SYNC rising edge; `opens_cycle` for T1/T1I.
    pub const fn record_state(&mut self, opens_cycle: bool) {
        bump(&mut self.state_count);
        if opens_cycle {
            bump(&mut self.bus_cycle_count);
        }
    }

    /// Records a status glitch.
    pub const fn record_glitch(&mut self) {
        bump(&mut self.glitch_count);
    }

    /// Records a T3 with no usable address.
    pub const fn record_unlatched_access(&mut self) {
        bump(&mut self.unlatched_access_count);
    }

    /// Records a committed RAM write.
    pub const fn record_ram_write(&mut self) {
        bump(&mut self.ram_write_count);
    }

    /// Records a dropped write.
    pub const fn record_discarded_write(&mut self) {
        bump(&mut self.discarded_write_count);
    }

    /// Records an input port read.
    pub const fn record_port_read(&mut self) {
        bump(&mut self.port_read_count);
    }

    /// Records an output port write.
    pub const fn record_port_write(&mut self) {
        bump(&mut self.port_write_count);
    }

    /// Records a debounced edge.
    pub const fn record_debounced_edge(&mut self) {
        bump(&mut self.debounced_edge_count);
    }

    /// Records an interrupt request being raised.
    pub const fn record_interrupt_raised(&mut self) {
        bump(&mut self.interrupts_raised);
    }

    /// Records an interrupt acknowledge completing.
    pub const fn record_interrupt_acknowledged(&mut self) {
        bump(&mut self.interrupts_acknowledged);
    }

    /// Records a reset assertion.
    pub const fn record_reset(&mut self) {
        bump(&mut self.reset_count);
    }

    /// Clears every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
