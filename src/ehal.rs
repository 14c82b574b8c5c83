//! Implements embedded-hal error compatibility
//!
//! Generic SPI code working in terms of the embedded-hal traits can
//! classify this driver's transfer errors through
//! [`embedded_hal::spi::Error`].

use embedded_hal::spi::{Error, ErrorKind};

use crate::driver::TransferError;

impl Error for TransferError {
    fn kind(&self) -> ErrorKind {
        // Neither a halted engine nor a completion timeout maps onto one of
        // the bus-level kinds.
        ErrorKind::Other
    }
}
