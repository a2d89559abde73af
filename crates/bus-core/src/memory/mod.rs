//! Memory side of the bus: region map, address latch and controller.

pub mod controller;
pub mod latch;
pub mod map;

pub use controller::{MemoryController, MemoryEvent};
pub use latch::AddressLatch;
pub use map::{
    MemoryLayout, MemoryRegion, ADDRESS_MASK, ADDRESS_SPACE_BYTES, UNMAPPED_READ_VALUE,
};
