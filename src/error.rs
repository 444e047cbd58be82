//! Error types for the register/decoder boundary.
//!
//! This peripheral has no serial/digital/SPI-bus personality, so there is no
//! `embedded_hal`/`embedded_io` trait surface for this type to implement
//! (§10.2 — dropped alongside those dependencies, see DESIGN.md).

/// Errors that can occur while driving the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralError {
    /// The opcode byte queue was full when a `PROGRAM_CODE` write attempted
    /// to enqueue another byte (§4.2 backpressure is unobservable on the bus
    /// side in hardware; in this software model it surfaces here instead of
    /// silently stalling).
    QueueFull,
}

impl core::fmt::Display for PeripheralError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::QueueFull => write!(f, "opcode byte queue is full"),
        }
    }
}
