//! Memory controller: address latching, region decode and T3 data transfer.

use crate::memory::latch::AddressLatch;
use crate::memory::map::{MemoryLayout, MemoryRegion, ADDRESS_MASK, UNMAPPED_READ_VALUE};
use crate::status::{CycleState, CycleType, Observation, SyncLatch};
use crate::ConfigError;

/// Memory-side effect reported from a sample step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryEvent {
    /// A byte was committed into RAM.
    Written {
        /// Target address.
        addr: u16,
        /// Committed value.
        value: u8,
    },
    /// A write targeted ROM or unmapped space and was dropped.
    WriteDiscarded {
        /// Target address.
        addr: u16,
        /// Region the address decoded to.
        region: MemoryRegion,
    },
    /// T3 arrived without a complete address for this cycle.
    Unlatched,
}

/// ROM/RAM backing store plus the bus-side latching logic in front of it.
#[derive(Debug, Clone)]
pub struct MemoryController {
    layout: MemoryLayout,
    rom: Box<[u8]>,
    ram: Box<[u8]>,
    sync: SyncLatch,
    latch: AddressLatch,
    cycle_open: bool,
    ack_cycle: bool,
    transfer_done: bool,
}

impl MemoryController {
    /// Creates a controller with zero-filled ROM and RAM.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMemoryLayout`] for a malformed layout.
    pub fn new(layout: MemoryLayout) -> Result<Self, ConfigError> {
        layout.validate()?;
        Ok(Self {
            layout,
            rom: vec![0; usize::from(layout.rom_size)].into_boxed_slice(),
            ram: vec![0; usize::from(layout.ram_size)].into_boxed_slice(),
            sync: SyncLatch::new(),
            latch: AddressLatch::new(),
            cycle_open: false,
            ack_cycle: false,
            transfer_done: false,
        })
    }

    /// Region layout in use.
    #[must_use]
    pub const fn layout(&self) -> MemoryLayout {
        self.layout
    }

    /// Copies `image` into ROM starting at address zero; the remainder is zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RomImageTooLarge`] when the image does not fit.
    pub fn load_rom(&mut self, image: &[u8]) -> Result<(), ConfigError> {
        if image.len() > self.rom.len() {
            return Err(ConfigError::RomImageTooLarge {
                len: image.len(),
                capacity: self.rom.len(),
            });
        }
        self.rom.fill(0);
        self.rom[..image.len()].copy_from_slice(image);
        Ok(())
    }

    /// Reads a byte the way a T3 read would see it, without touching bus state.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        match self.layout.decode(addr) {
            MemoryRegion::Rom => self.rom[usize::from(addr & (self.layout.rom_size - 1))],
            MemoryRegion::Ram => self.ram[self.ram_index(addr)],
            MemoryRegion::Unmapped => UNMAPPED_READ_VALUE,
        }
    }

    /// RAM contents.
    #[must_use]
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// Address latch as captured so far in the current cycle.
    #[must_use]
    pub const fn latch(&self) -> &AddressLatch {
        &self.latch
    }

    /// Returns `true` while the current cycle was opened by T1I.
    #[must_use]
    pub const fn in_acknowledge_cycle(&self) -> bool {
        self.ack_cycle
    }

    /// Invalidates the address latch when a new bus cycle opens.
    pub fn on_cycle_start_edge(&mut self, state: CycleState) {
        self.latch.begin_cycle();
        self.cycle_open = true;
        self.ack_cycle = state == CycleState::T1I;
        self.transfer_done = false;
    }

    /// Read data for `address` when `state` is T3 of a fetch or read cycle.
    ///
    /// Unmapped addresses are still driven, with `0xFF`.
    #[must_use]
    pub fn maybe_drive_read(
        &self,
        state: Option<CycleState>,
        cycle_type: Option<CycleType>,
        address: Option<u16>,
    ) -> Option<u8> {
        if state != Some(CycleState::T3) || !cycle_type.is_some_and(CycleType::reads_memory) {
            return None;
        }
        address.map(|addr| self.peek(addr))
    }

    /// Commits `bus` into RAM when `state` is T3 of a write cycle.
    ///
    /// A floating bus leaves the transfer open for a later tick of the same T3.
    pub fn maybe_accept_write(
        &mut self,
        state: Option<CycleState>,
        cycle_type: Option<CycleType>,
        address: Option<u16>,
        bus: Option<u8>,
    ) -> Option<MemoryEvent> {
        if state != Some(CycleState::T3) || cycle_type != Some(CycleType::MemoryWrite) {
            return None;
        }
        let addr = address?;
        let value = bus?;
        self.transfer_done = true;
        match self.layout.decode(addr) {
            MemoryRegion::Ram => {
                let index = self.ram_index(addr);
                self.ram[index] = value;
                Some(MemoryEvent::Written {
                    addr: addr & ADDRESS_MASK,
                    value,
                })
            }
            region => Some(MemoryEvent::WriteDiscarded { addr, region }),
        }
    }

    /// Drive request for the φ1 step, from registered state only.
    #[must_use]
    pub fn drive_request(&self, obs: &Observation) -> Option<u8> {
        if self.ack_cycle {
            return None;
        }
        self.maybe_drive_read(
            self.sync.settled(obs),
            self.latch.cycle_type(),
            self.latch.address(),
        )
    }

    /// φ2 step: latch address halves and accept write data from the resolved bus.
    pub fn sample(&mut self, obs: &Observation, bus: Option<u8>) -> Option<MemoryEvent> {
        self.sync.sample(obs.state, obs.sync);
        if obs.cycle_start() {
            self.on_cycle_start_edge(obs.state);
        }
        if !self.cycle_open {
            return None;
        }
        match self.sync.settled(obs)? {
            CycleState::T1 | CycleState::T1I => {
                if let Some(value) = bus {
                    self.latch.capture_low(value);
                }
                None
            }
            CycleState::T2 => {
                if let Some(value) = bus {
                    if !self.latch.has_high() {
                        self.latch.capture_high(value);
                    }
                }
                None
            }
            CycleState::T3 if !self.transfer_done && !self.ack_cycle => {
                if self.latch.address().is_none() {
                    self.transfer_done = true;
                    return Some(MemoryEvent::Unlatched);
                }
                self.maybe_accept_write(
                    Some(CycleState::T3),
                    self.latch.cycle_type(),
                    self.latch.address(),
                    bus,
                )
            }
            CycleState::T3 | CycleState::T4 | CycleState::T5 | CycleState::Wait => None,
            CycleState::Stopped => {
                self.cycle_open = false;
                None
            }
        }
    }

    /// Clears every latch. ROM and RAM contents survive.
    pub fn reset(&mut self) {
        self.sync = SyncLatch::new();
        self.latch = AddressLatch::new();
        self.cycle_open = false;
        self.ack_cycle = false;
        self.transfer_done = false;
    }

    fn ram_index(&self, addr: u16) -> usize {
        usize::from((addr & ADDRESS_MASK) - self.layout.ram_base())
    }
}
