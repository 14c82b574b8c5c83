//! This library supports synchronous serial communication through the DSPI
//! peripherals of NXP Kinetis K64 microcontrollers.
//!
//! The K64 family carries three DSPI instances sharing one register layout
//! at different base addresses, each behind its own clock gate in the
//! shared SIM clock gating registers. This library takes one instance from
//! its power-gated reset state to a configured, running transfer engine and
//! performs blocking byte transmission. Which instance is meant is named by
//! a [`Channel`]; all register access funnels through the
//! [`SpiDriver`](driver::SpiDriver) handle resolved from it.
//!
//! # Usage
//!
//! ```no_run
//! use kinetis_dspi::config::{BitOrder, ClockPhase, ClockPolarity, Config, Role};
//! use kinetis_dspi::driver::SpiDriver;
//! use kinetis_dspi::Channel;
//!
//! let config = Config {
//!     role: Role::Master,
//!     fifo_enabled: true,
//!     polarity: ClockPolarity::IdleLow,
//!     phase: ClockPhase::CaptureLeading,
//!     frame_size: 8,
//!     bit_order: BitOrder::MsbFirst,
//!     baud_divisor: 4,
//! };
//! let mut spi = unsafe { SpiDriver::new(Channel::Spi0) };
//! spi.initialize(&config).unwrap();
//! spi.start_transfer().unwrap();
//! spi.send_byte(0xA5).unwrap();
//! ```
//!
//! # Scope and limitations
//!
//! Transmission is one-way and byte-at-a-time: nothing is collected from
//! the receive path, and there is no interrupt or DMA driven mode. Pin
//! muxing that routes the physical signals, and everything in the SIM
//! beyond this driver's own gate bits, must be set up elsewhere.
//!
//! - `send_byte` busy-polls the completion flag. The poll is bounded, so a
//!   misconfigured or ungated instance surfaces as a timeout error instead
//!   of a hang, but on a system with a scheduler the caller should wrap
//!   transmission in its own yielding wait.
//! - A channel must only be driven from one context at a time; the driver
//!   performs no locking.
#![no_std]

mod pac;

pub mod config;
pub mod driver;

mod ehal;

use core::convert::TryFrom;

use crate::config::ConfigError;

/// One DSPI instance among the three sharing the same register layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// SPI0
    Spi0,
    /// SPI1
    Spi1,
    /// SPI2
    Spi2,
}

impl TryFrom<u8> for Channel {
    type Error = ConfigError;

    /// Resolve a raw instance index, for callers arriving from untyped
    /// configuration sources.
    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Channel::Spi0),
            1 => Ok(Channel::Spi1),
            2 => Ok(Channel::Spi2),
            _ => Err(ConfigError::InvalidChannel),
        }
    }
}
