//! A memory-mapped peripheral that interprets the DWARF-5 line-number
//! program and publishes the evolving state of the Line Number State
//! Machine (LNSM) through a small register file, raising an interrupt on
//! every emitted matrix row.
#![no_std]

pub mod config;
pub mod decoder;
pub mod error;
pub mod latch;
pub mod leb128;
pub mod lnsm;
pub mod peripheral;
pub mod queue;
pub mod register;

pub use config::Config;
pub use decoder::{Decoder, RowEmit};
pub use error::PeripheralError;
pub use lnsm::LineNumberState;
pub use peripheral::Peripheral;
pub use register::AccessWidth;
