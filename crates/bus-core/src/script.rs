//! Scripted processor-side pin sequences.
//!
//! The instruction core is outside this crate; a [`PinScript`] stands in for
//! it by producing the status, SYNC and bus drive it would present for whole
//! bus cycles. Every state spans two clock periods: SYNC high, then SYNC low.

use crate::api::{BusPins, TickOutcome};
use crate::io::io_cycle_byte;
use crate::status::{CycleState, CycleType};
use crate::{BusFault, System};

/// Clock periods per processor state.
pub const PERIODS_PER_STATE: usize = 2;

/// Builder for a sequence of [`BusPins`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinScript {
    pins: Vec<BusPins>,
    transfers: Vec<usize>,
}

impl PinScript {
    /// Creates an empty script.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pins: Vec::new(),
            transfers: Vec::new(),
        }
    }

    /// Appends one state with the processor driving `drive` in both periods.
    pub fn state(&mut self, state: CycleState, drive: Option<u8>) -> &mut Self {
        for sync in [true, false] {
            self.pins.push(BusPins {
                status: state.status_bits(),
                sync,
                core_drive: drive,
            });
        }
        self
    }

    /// Appends `count` states of `state` with the bus floating.
    pub fn repeat(&mut self, state: CycleState, count: usize) -> &mut Self {
        for _ in 0..count {
            self.state(state, None);
        }
        self
    }

    /// Appends a raw period, for glitch and malformed-SYNC stimulus.
    pub fn raw(&mut self, pins: BusPins) -> &mut Self {
        self.pins.push(pins);
        self
    }

    /// Instruction fetch from `addr`.
    pub fn fetch(&mut self, addr: u16) -> &mut Self {
        self.memory_cycle(CycleState::T1, CycleType::InstructionFetch, addr, None)
    }

    /// Memory data read from `addr`.
    pub fn memory_read(&mut self, addr: u16) -> &mut Self {
        self.memory_cycle(CycleState::T1, CycleType::MemoryRead, addr, None)
    }

    /// Memory data write of `value` to `addr`.
    pub fn memory_write(&mut self, addr: u16, value: u8) -> &mut Self {
        self.memory_cycle(CycleState::T1, CycleType::MemoryWrite, addr, Some(value))
    }

    /// Interrupt-acknowledge cycle: T1I/T2 carry `pc`, T3 fetches the injected opcode.
    pub fn interrupt_ack(&mut self, pc: u16) -> &mut Self {
        self.memory_cycle(CycleState::T1I, CycleType::InstructionFetch, pc, None)
    }

    /// `INP` from `port`.
    pub fn input(&mut self, port: u8) -> &mut Self {
        self.state(CycleState::T1, Some(0x00));
        self.state(CycleState::T2, Some(io_cycle_byte(port)));
        self.mark_transfer();
        self.state(CycleState::T3, None)
    }

    /// `OUT` of `value` to `port`.
    pub fn output(&mut self, port: u8, value: u8) -> &mut Self {
        self.state(CycleState::T1, Some(value));
        self.state(CycleState::T2, Some(io_cycle_byte(port)));
        self.mark_transfer();
        self.state(CycleState::T3, Some(value))
    }

    /// Internal execution states (T4, T5) that close an instruction.
    pub fn execute(&mut self) -> &mut Self {
        self.state(CycleState::T4, None).state(CycleState::T5, None)
    }

    /// Pins in order.
    #[must_use]
    pub fn pins(&self) -> &[BusPins] {
        &self.pins
    }

    /// Number of clock periods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Returns `true` for an empty script.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Runs every period against `system`.
    pub fn run(&self, system: &mut System) -> ScriptRun {
        let results = self.pins.iter().map(|pins| system.step(*pins)).collect();
        ScriptRun {
            results,
            transfers: self.transfers.clone(),
        }
    }

    fn memory_cycle(
        &mut self,
        first: CycleState,
        cycle_type: CycleType,
        addr: u16,
        write: Option<u8>,
    ) -> &mut Self {
        let [high, low] = addr.to_be_bytes();
        self.state(first, Some(low));
        self.state(CycleState::T2, Some((cycle_type.tag() << 6) | (high & 0x3F)));
        self.mark_transfer();
        self.state(CycleState::T3, write)
    }

    fn mark_transfer(&mut self) {
        self.transfers.push(self.pins.len());
    }
}

/// Results of running a [`PinScript`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRun {
    /// One result per clock period.
    pub results: Vec<Result<TickOutcome, BusFault>>,
    transfers: Vec<usize>,
}

impl ScriptRun {
    /// Bus value at the first T3 period of every scripted cycle, in order.
    #[must_use]
    pub fn transfer_values(&self) -> Vec<Option<u8>> {
        self.transfers
            .iter()
            .map(|index| match self.results.get(*index) {
                Some(Ok(outcome)) => outcome.bus,
                _ => None,
            })
            .collect()
    }

    /// Every fault, in order.
    #[must_use]
    pub fn faults(&self) -> Vec<BusFault> {
        self.results
            .iter()
            .filter_map(|result| result.as_ref().err().copied())
            .collect()
    }

    /// Successful outcomes, in order.
    pub fn outcomes(&self) -> impl Iterator<Item = &TickOutcome> + '_ {
        self.results.iter().filter_map(|result| result.as_ref().ok())
    }
}
