//! DSPI and clock-gating register definitions
//!
//! This module is based on register definitions from the MK64F12 reference
//! manual. Only the registers this driver touches are named; the remainder
//! of each block is reserved padding kept for layout fidelity.

#![allow(unused)]

use vcell::VolatileCell;

pub mod sim;
pub mod spi;

/// One 32-bit read/write hardware register.
#[repr(transparent)]
pub struct Register(VolatileCell<u32>);

impl Register {
    pub(crate) const fn new(value: u32) -> Self {
        Register(VolatileCell::new(value))
    }

    /// Volatile read of the live register value.
    #[inline(always)]
    pub fn read(&self) -> u32 {
        self.0.get()
    }

    /// Volatile write of the whole register.
    #[inline(always)]
    pub fn write(&self, value: u32) {
        self.0.set(value)
    }

    /// Read-modify-write. The live value is re-read on every call; nothing
    /// is cached on the driver side.
    #[inline(always)]
    pub fn modify<F: FnOnce(u32) -> u32>(&self, f: F) {
        self.0.set(f(self.0.get()))
    }
}
