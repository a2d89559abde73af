//! Combinational bus arbitration.
//!
//! Each peripheral decides from its own registered state whether it drives
//! the bus this tick. The arbiter only folds those requests in priority order;
//! it holds no state and adds no latency.

use std::fmt;

/// Parties that can put a value on the shared data bus, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Driver {
    /// Interrupt controller during its acknowledge window.
    Interrupt,
    /// The processor's own instruction core.
    Core,
    /// Memory controller.
    Memory,
    /// I/O controller.
    Io,
}

/// Drivers in descending priority.
pub const DRIVER_PRIORITY: [Driver; 4] = [Driver::Interrupt, Driver::Core, Driver::Memory, Driver::Io];

impl Driver {
    const fn bit(self) -> u8 {
        match self {
            Self::Interrupt => 0x01,
            Self::Core => 0x02,
            Self::Memory => 0x04,
            Self::Io => 0x08,
        }
    }

    /// Lowercase name used in messages and traces.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Interrupt => "interrupt",
            Self::Core => "core",
            Self::Memory => "memory",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compact set of drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DriverSet(u8);

impl DriverSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Returns a copy with `driver` added.
    #[must_use]
    pub const fn with(self, driver: Driver) -> Self {
        Self(self.0 | driver.bit())
    }

    /// Returns `true` when `driver` is a member.
    #[must_use]
    pub const fn contains(self, driver: Driver) -> bool {
        self.0 & driver.bit() != 0
    }

    /// Number of members.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Returns `true` when nobody is in the set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in priority order.
    pub fn iter(self) -> impl Iterator<Item = Driver> {
        DRIVER_PRIORITY
            .into_iter()
            .filter(move |driver| self.contains(*driver))
    }
}

impl fmt::Display for DriverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("nobody");
        }
        for (index, driver) in self.iter().enumerate() {
            if index > 0 {
                f.write_str("+")?;
            }
            f.write_str(driver.name())?;
        }
        Ok(())
    }
}

/// Drive requests collected from every peripheral for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BusRequests {
    /// Interrupt controller's RST opcode, during its acknowledge window.
    pub interrupt: Option<u8>,
    /// Value driven by the processor itself.
    pub core: Option<u8>,
    /// Memory controller's read data.
    pub memory: Option<u8>,
    /// I/O controller's input-port data.
    pub io: Option<u8>,
}

impl BusRequests {
    /// Returns the request of a single driver.
    #[must_use]
    pub const fn request(&self, driver: Driver) -> Option<u8> {
        match driver {
            Driver::Interrupt => self.interrupt,
            Driver::Core => self.core,
            Driver::Memory => self.memory,
            Driver::Io => self.io,
        }
    }

    /// Set of drivers with an active request.
    #[must_use]
    pub fn active(&self) -> DriverSet {
        DRIVER_PRIORITY
            .into_iter()
            .filter(|driver| self.request(*driver).is_some())
            .fold(DriverSet::EMPTY, DriverSet::with)
    }
}

/// The winning driver and the value it places on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusGrant {
    /// Winning driver.
    pub driver: Driver,
    /// Bus value.
    pub value: u8,
}

/// Result of one arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    /// Highest-priority active request, or `None` when the bus floats.
    pub grant: Option<BusGrant>,
    /// Every driver that requested the bus.
    pub requested: DriverSet,
}

impl Resolution {
    /// Resolved bus value.
    #[must_use]
    pub fn value(&self) -> Option<u8> {
        self.grant.map(|grant| grant.value)
    }

    /// Returns `true` when more than one driver asked for the bus.
    #[must_use]
    pub const fn is_contended(&self) -> bool {
        self.requested.len() > 1
    }
}

/// Selects the highest-priority active request.
#[must_use]
pub fn resolve(requests: &BusRequests) -> Resolution {
    let grant = DRIVER_PRIORITY.into_iter().find_map(|driver| {
        requests
            .request(driver)
            .map(|value| BusGrant { driver, value })
    });
    Resolution {
        grant,
        requested: requests.active(),
    }
}
