//! Port roles and the 32-slot port table.

use crate::io::{port_direction, PortDirection, PORT_COUNT};
use crate::ConfigError;

/// Value read from a port with no input assigned.
pub const UNASSIGNED_READ_VALUE: u8 = 0xFF;

/// Where an input port's byte comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InputSource {
    /// Constant byte.
    Fixed(u8),
    /// Byte supplied by the host through `set_input_port`.
    External,
    /// Byte refreshed by the system from an on-board device every tick.
    Device,
}

/// Role of one port slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum PortSlot {
    /// Input port with its byte source.
    Input(InputSource),
    /// One-byte output register.
    Output,
    /// Input-group port nobody answers; reads `0xFF`.
    Unassigned,
}

/// Port numbers of the on-board devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PortMap {
    /// Button/input bank (host-driven input).
    pub button: u8,
    /// Console receive data.
    pub console_rx: u8,
    /// Console status (`1` while receive data is waiting).
    pub console_status: u8,
    /// Interrupt pending-source byte.
    pub interrupt_status: u8,
    /// Interrupt active-source byte.
    pub interrupt_active: u8,
    /// LED/output bank.
    pub led: u8,
    /// Console transmit data.
    pub console_tx: u8,
    /// Interrupt enable mask.
    pub interrupt_mask: u8,
    /// Diagnostic checkpoint channel.
    pub checkpoint: u8,
}

impl Default for PortMap {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl PortMap {
    /// Reference board assignment.
    pub const DEFAULT: Self = Self {
        button: 1,
        console_rx: 2,
        console_status: 3,
        interrupt_status: 6,
        interrupt_active: 7,
        led: 8,
        console_tx: 9,
        interrupt_mask: 10,
        checkpoint: 31,
    };

    const fn inputs(&self) -> [u8; 5] {
        [
            self.button,
            self.console_rx,
            self.console_status,
            self.interrupt_status,
            self.interrupt_active,
        ]
    }

    const fn outputs(&self) -> [u8; 4] {
        [self.led, self.console_tx, self.interrupt_mask, self.checkpoint]
    }

    /// Checks ranges, groups and uniqueness.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] port rule that is broken.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let roles = self
            .inputs()
            .into_iter()
            .map(|port| (port, PortDirection::Input))
            .chain(
                self.outputs()
                    .into_iter()
                    .map(|port| (port, PortDirection::Output)),
            );
        let mut seen = 0_u32;
        for (port, expected) in roles {
            if usize::from(port) >= PORT_COUNT {
                return Err(ConfigError::PortOutOfRange { port });
            }
            if port_direction(port) != expected {
                return Err(ConfigError::PortWrongGroup { port, expected });
            }
            let bit = 1_u32 << port;
            if seen & bit != 0 {
                return Err(ConfigError::PortConflict { port });
            }
            seen |= bit;
        }
        Ok(())
    }
}

/// 32 port slots with their input bytes and output registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortTable {
    slots: [PortSlot; PORT_COUNT],
    inputs: [u8; PORT_COUNT],
    outputs: [u8; PORT_COUNT],
}

impl Default for PortTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PortTable {
    /// Every output-group port is a register; every input-group port is unassigned.
    #[must_use]
    pub fn new() -> Self {
        let mut slots = [PortSlot::Unassigned; PORT_COUNT];
        for (port, slot) in (0_u8..).zip(slots.iter_mut()) {
            if port_direction(port) == PortDirection::Output {
                *slot = PortSlot::Output;
            }
        }
        Self {
            slots,
            inputs: [0; PORT_COUNT],
            outputs: [0; PORT_COUNT],
        }
    }

    /// Builds the table for a validated board map.
    ///
    /// # Errors
    ///
    /// Propagates [`PortMap::validate`] failures.
    pub fn with_map(map: &PortMap) -> Result<Self, ConfigError> {
        map.validate()?;
        let mut table = Self::new();
        table.assign_input(map.button, InputSource::External)?;
        for port in [
            map.console_rx,
            map.console_status,
            map.interrupt_status,
            map.interrupt_active,
        ] {
            table.assign_input(port, InputSource::Device)?;
        }
        Ok(table)
    }

    /// Attaches an input source to an input-group port.
    ///
    /// # Errors
    ///
    /// Rejects out-of-range and output-group ports.
    pub fn assign_input(&mut self, port: u8, source: InputSource) -> Result<(), ConfigError> {
        let index = Self::index(port)?;
        if port_direction(port) != PortDirection::Input {
            return Err(ConfigError::PortWrongGroup {
                port,
                expected: PortDirection::Input,
            });
        }
        self.slots[index] = PortSlot::Input(source);
        Ok(())
    }

    /// Role of `port`; out-of-range ports wrap into the 5-bit space.
    #[must_use]
    pub const fn slot(&self, port: u8) -> PortSlot {
        self.slots[(port & 0x1F) as usize]
    }

    /// Sets the byte a host-driven input presents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotHostInput`] unless the port has an
    /// [`InputSource::External`] source.
    pub fn set_external(&mut self, port: u8, value: u8) -> Result<(), ConfigError> {
        let index = Self::index(port)?;
        if self.slots[index] != PortSlot::Input(InputSource::External) {
            return Err(ConfigError::NotHostInput { port });
        }
        self.inputs[index] = value;
        Ok(())
    }

    /// Refreshes a device-backed input. Other slots are left untouched.
    pub fn refresh_device(&mut self, port: u8, value: u8) {
        let index = usize::from(port & 0x1F);
        if self.slots[index] == PortSlot::Input(InputSource::Device) {
            self.inputs[index] = value;
        }
    }

    /// Byte an `INP` from `port` receives.
    #[must_use]
    pub const fn read_input(&self, port: u8) -> u8 {
        let index = (port & 0x1F) as usize;
        match self.slots[index] {
            PortSlot::Input(InputSource::Fixed(value)) => value,
            PortSlot::Input(InputSource::External | InputSource::Device) => self.inputs[index],
            PortSlot::Output | PortSlot::Unassigned => UNASSIGNED_READ_VALUE,
        }
    }

    /// Latches `value` into an output register; returns `false` for non-output slots.
    pub fn write_output(&mut self, port: u8, value: u8) -> bool {
        let index = usize::from(port & 0x1F);
        if self.slots[index] == PortSlot::Output {
            self.outputs[index] = value;
            true
        } else {
            false
        }
    }

    /// Current value of an output register (`0` for non-output slots).
    #[must_use]
    pub const fn output(&self, port: u8) -> u8 {
        self.outputs[(port & 0x1F) as usize]
    }

    /// Clears every output register. Input bytes are external and survive.
    pub fn reset(&mut self) {
        self.outputs = [0; PORT_COUNT];
    }

    fn index(port: u8) -> Result<usize, ConfigError> {
        let index = usize::from(port);
        if index < PORT_COUNT {
            Ok(index)
        } else {
            Err(ConfigError::PortOutOfRange { port })
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{InputSource, PortMap, PortSlot, PortTable, UNASSIGNED_READ_VALUE};
    use crate::io::PortDirection;
    use crate::ConfigError;

    #[test]
    fn default_map_is_valid() {
        assert_eq!(PortMap::default().validate(), Ok(()));
        let table = PortTable::with_map(&PortMap::DEFAULT).unwrap();
        assert_eq!(table.slot(1), PortSlot::Input(InputSource::External));
        assert_eq!(table.slot(2), PortSlot::Input(InputSource::Device));
        assert_eq!(table.slot(0), PortSlot::Unassigned);
        assert_eq!(table.slot(8), PortSlot::Output);
        assert_eq!(table.slot(31), PortSlot::Output);
    }

    #[rstest]
    #[case(PortMap { led: 40, ..PortMap::DEFAULT }, ConfigError::PortOutOfRange { port: 40 })]
    #[case(
        PortMap { button: 12, ..PortMap::DEFAULT },
        ConfigError::PortWrongGroup { port: 12, expected: PortDirection::Input }
    )]
    #[case(
        PortMap { checkpoint: 4, ..PortMap::DEFAULT },
        ConfigError::PortWrongGroup { port: 4, expected: PortDirection::Output }
    )]
    #[case(PortMap { console_rx: 1, ..PortMap::DEFAULT }, ConfigError::PortConflict { port: 1 })]
    fn bad_maps_are_rejected(#[case] map: PortMap, #[case] expected: ConfigError) {
        assert_eq!(map.validate(), Err(expected));
    }

    #[test]
    fn output_register_round_trips() {
        let mut table = PortTable::new();
        assert!(table.write_output(8, 0xFE));
        assert_eq!(table.output(8), 0xFE);
        assert!(!table.write_output(1, 0x01));
        table.reset();
        assert_eq!(table.output(8), 0x00);
    }

    #[test]
    fn input_sources_read_as_configured() {
        let mut table = PortTable::new();
        table.assign_input(0, InputSource::Fixed(0x42)).unwrap();
        table.assign_input(1, InputSource::External).unwrap();
        table.assign_input(2, InputSource::Device).unwrap();
        assert_eq!(table.read_input(0), 0x42);
        assert_eq!(table.read_input(1), 0x00);
        table.set_external(1, 0x81).unwrap();
        table.refresh_device(2, 0x07);
        assert_eq!(table.read_input(1), 0x81);
        assert_eq!(table.read_input(2), 0x07);
        assert_eq!(table.read_input(5), UNASSIGNED_READ_VALUE);
        assert_eq!(table.read_input(9), UNASSIGNED_READ_VALUE);
    }

    #[test]
    fn host_cannot_drive_device_or_output_ports() {
        let mut table = PortTable::with_map(&PortMap::DEFAULT).unwrap();
        assert_eq!(
            table.set_external(2, 0x00),
            Err(ConfigError::NotHostInput { port: 2 })
        );
        assert_eq!(
            table.set_external(8, 0x00),
            Err(ConfigError::NotHostInput { port: 8 })
        );
        assert_eq!(
            table.set_external(32, 0x00),
            Err(ConfigError::PortOutOfRange { port: 32 })
        );
        assert_eq!(
            table.assign_input(9, InputSource::External),
            Err(ConfigError::PortWrongGroup {
                port: 9,
                expected: PortDirection::Input
            })
        );
    }
}
