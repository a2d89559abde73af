//! I/O port dispatch state machine.
//!
//! `Idle -> T1 -> T2 -> T3 -> Idle`. A cycle that turns out not to be an I/O
//! cycle is abandoned at T2.

use crate::io::ports::PortTable;
use crate::io::{is_input_port, port_from_bus};
use crate::status::{CycleState, CycleType, Observation, SyncLatch};

/// Dispatch phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum IoPhase {
    /// Waiting for a bus cycle.
    #[default]
    Idle,
    /// Cycle opened; waiting for the T2 byte.
    T1,
    /// I/O cycle latched; waiting for T3.
    T2,
    /// Transfer state.
    T3,
}

/// Whether the controller takes part in bus arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum IoMode {
    /// Serves input ports and latches output ports.
    #[default]
    Arbitrating,
    /// Mirrors output ports and never drives.
    Passive,
}

/// Port transfer completed in a T3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum IoEvent {
    /// An input port answered an `INP`.
    InputServed {
        /// Port number.
        port: u8,
        /// Byte driven onto the bus.
        value: u8,
    },
    /// An output port latched an `OUT`.
    OutputLatched {
        /// Port number.
        port: u8,
        /// Latched byte.
        value: u8,
    },
}

/// Port dispatcher in front of a [`PortTable`].
#[derive(Debug, Clone)]
pub struct IoController {
    mode: IoMode,
    phase: IoPhase,
    sync: SyncLatch,
    cycle_type: Option<CycleType>,
    port: Option<u8>,
    transferred: bool,
    table: PortTable,
}

impl IoController {
    /// Creates a controller over `table`.
    #[must_use]
    pub fn new(mode: IoMode, table: PortTable) -> Self {
        Self {
            mode,
            phase: IoPhase::Idle,
            sync: SyncLatch::new(),
            cycle_type: None,
            port: None,
            transferred: false,
            table,
        }
    }

    /// Arbitration mode.
    #[must_use]
    pub const fn mode(&self) -> IoMode {
        self.mode
    }

    /// Current dispatch phase.
    #[must_use]
    pub const fn phase(&self) -> IoPhase {
        self.phase
    }

    /// Port latched at T2 of the current cycle.
    #[must_use]
    pub const fn latched_port(&self) -> Option<u8> {
        self.port
    }

    /// Cycle type latched at T2 of the current cycle.
    #[must_use]
    pub const fn cycle_type(&self) -> Option<CycleType> {
        self.cycle_type
    }

    /// Port table.
    #[must_use]
    pub const fn table(&self) -> &PortTable {
        &self.table
    }

    /// Mutable port table, for host inputs and device refresh.
    pub fn table_mut(&mut self) -> &mut PortTable {
        &mut self.table
    }

    /// Drive request for the φ1 step: input data for the whole of T3 only.
    #[must_use]
    pub fn drive_request(&self, obs: &Observation) -> Option<u8> {
        if self.mode == IoMode::Passive
            || !matches!(self.phase, IoPhase::T2 | IoPhase::T3)
            || self.sync.settled(obs) != Some(CycleState::T3)
        {
            return None;
        }
        let port = self.port?;
        is_input_port(port).then(|| self.table.read_input(port))
    }

    /// φ2 step: advance the phase and perform the T3 transfer.
    pub fn sample(&mut self, obs: &Observation, bus: Option<u8>) -> Option<IoEvent> {
        self.sync.sample(obs.state, obs.sync);
        if obs.cycle_start() {
            self.begin_cycle();
            return None;
        }
        let state = self.sync.settled(obs)?;
        match (self.phase, state) {
            (IoPhase::T1, CycleState::T2) => {
                self.latch_t2(bus);
                None
            }
            (IoPhase::T1, CycleState::T1 | CycleState::T1I | CycleState::Wait) => None,
            (IoPhase::T2 | IoPhase::T3, CycleState::T3) => {
                self.phase = IoPhase::T3;
                self.transfer(bus)
            }
            (IoPhase::T2, CycleState::T2 | CycleState::Wait) | (IoPhase::Idle, _) => None,
            _ => {
                self.finish_cycle();
                None
            }
        }
    }

    /// Returns to `Idle` and clears every latch and output register.
    pub fn reset(&mut self) {
        self.sync = SyncLatch::new();
        self.finish_cycle();
        self.table.reset();
    }

    fn begin_cycle(&mut self) {
        self.phase = IoPhase::T1;
        self.cycle_type = None;
        self.port = None;
        self.transferred = false;
    }

    fn latch_t2(&mut self, bus: Option<u8>) {
        let Some(value) = bus else {
            return;
        };
        let cycle_type = CycleType::from_bus(value);
        self.cycle_type = Some(cycle_type);
        if cycle_type == CycleType::IoOperation {
            self.port = Some(port_from_bus(value));
            self.phase = IoPhase::T2;
        } else {
            self.finish_cycle();
        }
    }

    fn transfer(&mut self, bus: Option<u8>) -> Option<IoEvent> {
        if self.transferred {
            return None;
        }
        let port = self.port?;
        if is_input_port(port) {
            self.transferred = true;
            return match self.mode {
                IoMode::Arbitrating => Some(IoEvent::InputServed {
                    port,
                    value: self.table.read_input(port),
                }),
                IoMode::Passive => None,
            };
        }
        let value = bus?;
        self.transferred = true;
        self.table
            .write_output(port, value)
            .then_some(IoEvent::OutputLatched { port, value })
    }

    fn finish_cycle(&mut self) {
        self.phase = IoPhase::Idle;
        self.cycle_type = None;
        self.port = None;
        self.transferred = false;
    }
}
