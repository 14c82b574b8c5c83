//! DSPI configuration

use core::ops::RangeInclusive;

/// Allowed frame sizes, in bits per transferred word.
pub const FRAME_SIZE_RANGE: RangeInclusive<u8> = 4..=16;

/// Master or slave operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// The instance drives the clock and chip selects
    Master,
    /// The instance follows an external clock
    Slave,
}

/// Steady state clock polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPolarity {
    /// Clock low when idle
    IdleLow,
    /// Clock high when idle
    IdleHigh,
}

/// Clock edge on which data is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPhase {
    /// Data captured on the leading edge, changed on the trailing edge
    CaptureLeading,
    /// Data changed on the leading edge, captured on the trailing edge
    CaptureTrailing,
}

/// Shift direction of each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Most significant bit first
    MsbFirst,
    /// Least significant bit first
    LsbFirst,
}

/// Configuration of one DSPI instance, consumed by
/// [`SpiDriver::initialize`](crate::driver::SpiDriver::initialize).
///
/// There is no default configuration; every field must be spelled out by
/// the caller. The driver keeps no copy of this record, so reconfiguring
/// always means passing a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Master or slave role
    pub role: Role,
    /// Run with the hardware TX/RX FIFOs instead of single-register transfer
    pub fifo_enabled: bool,
    /// Clock idle level
    pub polarity: ClockPolarity,
    /// Sample edge
    pub phase: ClockPhase,
    /// Bits per transferred word, within [`FRAME_SIZE_RANGE`]
    pub frame_size: u8,
    /// Shift direction
    pub bit_order: BitOrder,
    /// Baud-rate divisor; merged into the attribute register's divisor field
    pub baud_divisor: u32,
}

/// Errors reported while selecting or configuring an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The channel index names no hardware instance
    InvalidChannel,
    /// The frame size is outside [`FRAME_SIZE_RANGE`]
    InvalidFrameSize,
}
