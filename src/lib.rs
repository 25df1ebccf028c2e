#![no_std]

extern crate alloc;

mod codec;
mod event;
mod frame;
mod sensor;

// Counts-per-unit response from node 7F: CpF = 1000, CpT = 500
//         7F7    8   00 00 03 E8 00 00 01 F4

/// Most payload bytes a classic CAN 2.0 frame can carry.
pub const MAX_PAYLOAD_BYTES: usize = 8;

/// Full width of one log line: the last payload column ends at offset 42.
pub const LINE_WIDTH: usize = 43;

pub use event::*;
pub use frame::*;
pub use sensor::*;

pub use embedded_can::StandardId;
