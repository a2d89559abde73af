//! Cycle-driven event loop tying the peripherals to one shared bus.
//!
//! Each call to [`System::step`] covers one processor clock period. The phase
//! generator splits it into a φ1 drive step, where every peripheral offers a
//! drive request from its registered state and the arbiter resolves them, and
//! a φ2 sample step, where every peripheral latches from that one resolved
//! value. No peripheral sees another's same-period output.

use crate::api::{BusPins, SystemConfig, TickOutcome, TraceEvent, TraceSink};
use crate::arbiter::{resolve, BusRequests, Driver, Resolution};
use crate::diag::BusDiagnostics;
use crate::hex::{parse_intel_hex, ImageError};
use crate::interrupt::{InterruptController, InterruptEvent};
use crate::io::{Console, IoController, IoEvent, IoMode, IoMonitor, PortTable};
use crate::memory::{MemoryController, MemoryEvent};
use crate::phase::{Phase, PhaseGenerator, MASTER_TICKS_PER_PERIOD};
use crate::status::{decode_status, Observation, StatusDecoder};
use crate::{BusFault, ConfigError};

struct NullSink;

impl TraceSink for NullSink {
    fn on_event(&mut self, _event: TraceEvent) {}
}

struct Tracer<'a> {
    sink: &'a mut dyn TraceSink,
    enabled: bool,
}

impl Tracer<'_> {
    fn emit(&mut self, event: TraceEvent) {
        if self.enabled {
            self.sink.on_event(event);
        }
    }
}

/// Memory, I/O and interrupt peripherals sharing one bus.
#[derive(Debug, Clone)]
pub struct System {
    config: SystemConfig,
    clock: PhaseGenerator,
    decoder: StatusDecoder,
    memory: MemoryController,
    io: IoController,
    monitor: IoMonitor,
    interrupts: InterruptController,
    console: Console,
    diagnostics: BusDiagnostics,
    tick: u64,
    reset_asserted: bool,
    reset_traced: bool,
}

impl System {
    /// Builds a system in its post-reset state with zeroed ROM and RAM.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found in `config`.
    pub fn new(config: SystemConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let memory = MemoryController::new(config.memory)?;
        let io = IoController::new(IoMode::Arbitrating, PortTable::with_map(&config.ports)?);
        let interrupts = InterruptController::new(config.interrupts.clone())?;
        Ok(Self {
            clock: PhaseGenerator::new(),
            decoder: StatusDecoder::new(),
            memory,
            io,
            monitor: IoMonitor::new(config.ports.checkpoint),
            interrupts,
            console: Console::new(),
            diagnostics: BusDiagnostics::new(),
            tick: 0,
            reset_asserted: false,
            reset_traced: false,
            config,
        })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Copies a raw image into ROM.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RomImageTooLarge`] when the image does not fit.
    pub fn load_rom(&mut self, image: &[u8]) -> Result<(), ConfigError> {
        self.memory.load_rom(image)
    }

    /// Parses Intel HEX text and copies the result into ROM.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError`] for malformed text or an oversized image.
    pub fn load_rom_hex(&mut self, text: &str) -> Result<(), ImageError> {
        let image = parse_intel_hex(text)?;
        self.memory.load_rom(&image)?;
        Ok(())
    }

    /// Drives the reset line. Asserting it clears every latch at once and
    /// keeps the system in reset on every step until released.
    pub fn set_reset(&mut self, asserted: bool) {
        if asserted && !self.reset_asserted {
            self.diagnostics.record_reset();
            self.reset_traced = false;
            self.apply_reset();
        }
        self.reset_asserted = asserted;
    }

    /// Returns `true` while reset is held.
    #[must_use]
    pub const fn in_reset(&self) -> bool {
        self.reset_asserted
    }

    /// Sets the raw level of interrupt source `index` (the board button is 0).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownInterruptSource`] for an unconfigured index.
    pub fn set_button(&mut self, index: usize, pressed: bool) -> Result<(), ConfigError> {
        self.interrupts.set_input(index, pressed)
    }

    /// Sets the byte a host-driven input port presents.
    ///
    /// # Errors
    ///
    /// Rejects ports the host does not drive.
    pub fn set_input_port(&mut self, port: u8, value: u8) -> Result<(), ConfigError> {
        self.io.table_mut().set_external(port, value)
    }

    /// Current value of an output register.
    #[must_use]
    pub const fn output_port(&self, port: u8) -> u8 {
        self.io.table().output(port)
    }

    /// Queues bytes on the console receive port.
    pub fn push_console_input(&mut self, bytes: &[u8]) {
        self.console.push_input(bytes);
    }

    /// Bytes the program wrote to the console transmit port.
    #[must_use]
    pub fn console_output(&self) -> &[u8] {
        self.console.output()
    }

    /// Drains the console transmit log.
    pub fn take_console_output(&mut self) -> Vec<u8> {
        self.console.take_output()
    }

    /// INT line level.
    #[must_use]
    pub const fn int_line(&self) -> bool {
        !self.reset_asserted && self.interrupts.int_line()
    }

    /// Diagnostics counters.
    #[must_use]
    pub const fn diagnostics(&self) -> &BusDiagnostics {
        &self.diagnostics
    }

    /// Passive OUT monitor.
    #[must_use]
    pub const fn monitor(&self) -> &IoMonitor {
        &self.monitor
    }

    /// Memory controller.
    #[must_use]
    pub const fn memory(&self) -> &MemoryController {
        &self.memory
    }

    /// I/O controller.
    #[must_use]
    pub const fn io(&self) -> &IoController {
        &self.io
    }

    /// Interrupt controller.
    #[must_use]
    pub const fn interrupts(&self) -> &InterruptController {
        &self.interrupts
    }

    /// Ticks stepped since construction.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.tick
    }

    /// Advances one clock period.
    ///
    /// # Errors
    ///
    /// Returns the [`BusFault`] detected this period. The period's state
    /// changes are committed regardless.
    pub fn step(&mut self, pins: BusPins) -> Result<TickOutcome, BusFault> {
        self.step_with_trace(pins, &mut NullSink)
    }

    /// Like [`System::step`], forwarding trace events to `sink` when tracing is enabled.
    ///
    /// # Errors
    ///
    /// Same as [`System::step`].
    pub fn step_with_trace(
        &mut self,
        pins: BusPins,
        sink: &mut dyn TraceSink,
    ) -> Result<TickOutcome, BusFault> {
        let tick = self.tick;
        self.tick = self.tick.wrapping_add(1);
        let mut tracer = Tracer {
            sink,
            enabled: self.config.tracing_enabled,
        };

        if self.reset_asserted {
            self.apply_reset();
            if !self.reset_traced {
                self.reset_traced = true;
                tracer.emit(TraceEvent::Reset { tick });
            }
            return Ok(TickOutcome {
                tick,
                state: decode_status(pins.status),
                bus: pins.core_drive,
                driver: pins.core_drive.map(|_| Driver::Core),
                int: false,
                ready: true,
                in_reset: true,
            });
        }

        let obs = self.observe(pins, &mut tracer, tick);
        let mut first_fault = None;
        let mut resolution = None;
        for _ in 0..MASTER_TICKS_PER_PERIOD {
            match self.clock.tick().active() {
                Some(Phase::Phi1) => {
                    let resolved = self.drive_phase(&obs, pins.core_drive);
                    if resolved.is_contended() {
                        let fault = BusFault::Contention {
                            drivers: resolved.requested,
                        };
                        self.diagnostics.record_fault(fault, tick);
                        tracer.emit(TraceEvent::Contention {
                            tick,
                            drivers: resolved.requested,
                        });
                        first_fault.get_or_insert(fault);
                    }
                    if let Some(grant) = resolved.grant {
                        tracer.emit(TraceEvent::BusDriven {
                            tick,
                            driver: grant.driver,
                            value: grant.value,
                        });
                    }
                    resolution = Some(resolved);
                }
                Some(Phase::Phi2) => {
                    let bus = resolution.and_then(|resolved| resolved.value());
                    if let Err(fault) = self.sample_phase(&obs, bus, &mut tracer) {
                        first_fault.get_or_insert(fault);
                    }
                }
                None => {}
            }
        }

        if let Some(fault) = first_fault {
            return Err(fault);
        }
        Ok(TickOutcome {
            tick,
            state: obs.state,
            bus: resolution.and_then(|resolved| resolved.value()),
            driver: resolution.and_then(|resolved| resolved.grant.map(|grant| grant.driver)),
            int: self.interrupts.int_line(),
            ready: true,
            in_reset: false,
        })
    }

    fn observe(&mut self, pins: BusPins, tracer: &mut Tracer<'_>, tick: u64) -> Observation {
        let obs = self.decoder.observe(pins.status, pins.sync);
        if obs.sync_rising {
            self.diagnostics.record_state(obs.cycle_start());
            tracer.emit(TraceEvent::StateEntered {
                tick,
                state: obs.state,
            });
        } else if let Some(stable) = self
            .decoder
            .stable_state()
            .filter(|_| self.decoder.is_glitch(&obs))
        {
            self.diagnostics.record_glitch();
            tracer.emit(TraceEvent::StatusGlitch {
                tick,
                seen: obs.state,
                stable,
            });
        }
        Observation { tick, ..obs }
    }

    fn drive_phase(&mut self, obs: &Observation, core: Option<u8>) -> Resolution {
        let ports = self.config.ports;
        let table = self.io.table_mut();
        table.refresh_device(ports.console_rx, self.console.rx_value());
        table.refresh_device(ports.console_status, self.console.status_value());
        table.refresh_device(ports.interrupt_status, self.interrupts.status_byte());
        table.refresh_device(ports.interrupt_active, self.interrupts.active_byte());

        resolve(&BusRequests {
            interrupt: self.interrupts.drive_request(obs),
            core,
            memory: self.memory.drive_request(obs),
            io: self.io.drive_request(obs),
        })
    }

    fn sample_phase(
        &mut self,
        obs: &Observation,
        bus: Option<u8>,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), BusFault> {
        let tick = obs.tick;
        if let Some(cycle_type) = self.decoder.capture_cycle_type(obs, bus) {
            tracer.emit(TraceEvent::CycleTypeLatched { tick, cycle_type });
        }

        match self.memory.sample(obs, bus) {
            Some(MemoryEvent::Written { addr, value }) => {
                self.diagnostics.record_ram_write();
                tracer.emit(TraceEvent::MemoryWrite { tick, addr, value });
            }
            Some(MemoryEvent::WriteDiscarded { addr, region }) => {
                self.diagnostics.record_discarded_write();
                tracer.emit(TraceEvent::WriteDiscarded { tick, addr, region });
            }
            Some(MemoryEvent::Unlatched) => {
                self.diagnostics.record_unlatched_access();
                tracer.emit(TraceEvent::UnlatchedAccess { tick });
            }
            None => {}
        }

        match self.io.sample(obs, bus) {
            Some(IoEvent::InputServed { port, value }) => {
                self.diagnostics.record_port_read();
                tracer.emit(TraceEvent::PortRead { tick, port, value });
                if port == self.config.ports.console_rx {
                    self.console.consume_rx();
                }
            }
            Some(IoEvent::OutputLatched { port, value }) => {
                self.diagnostics.record_port_write();
                tracer.emit(TraceEvent::PortWrite { tick, port, value });
                self.route_output(port, value);
            }
            None => {}
        }

        self.monitor.sample(obs, bus);

        let acknowledge = self.interrupts.sample(obs);
        if let Err(BusFault::AcknowledgeAborted { origin }) = acknowledge {
            tracer.emit(TraceEvent::InterruptAborted { tick, origin });
        }
        if let Err(fault) = acknowledge {
            self.diagnostics.record_fault(fault, tick);
        }
        for event in self.interrupts.drain_events() {
            match event {
                InterruptEvent::DebouncedEdge { source, edge } => {
                    self.diagnostics.record_debounced_edge();
                    tracer.emit(TraceEvent::DebouncedEdge { tick, source, edge });
                }
                InterruptEvent::Raised { origin, vector } => {
                    self.diagnostics.record_interrupt_raised();
                    tracer.emit(TraceEvent::InterruptRaised {
                        tick,
                        origin,
                        vector,
                    });
                }
                InterruptEvent::Acknowledged { origin, vector } => {
                    self.diagnostics.record_interrupt_acknowledged();
                    tracer.emit(TraceEvent::InterruptAcknowledged {
                        tick,
                        origin,
                        vector,
                    });
                }
            }
        }
        acknowledge
    }

    fn route_output(&mut self, port: u8, value: u8) {
        let ports = self.config.ports;
        if port == ports.console_tx {
            self.console.transmit(value);
        } else if port == ports.interrupt_mask {
            self.interrupts.set_mask(value);
        }
    }

    fn apply_reset(&mut self) {
        self.clock.reset();
        self.decoder.reset();
        self.memory.reset();
        self.io.reset();
        self.monitor.reset();
        self.interrupts.reset();
    }
}
