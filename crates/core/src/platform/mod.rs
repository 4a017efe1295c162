//! Hardware access seam.
//!
//! Everything the commit protocol needs from the machine goes through
//! [`Platform`]: configuration-space and MMIO access, interrupt masking,
//! store barriers, blocking settle delays and the firmware warm reboot.
//! [`crate::sim::SimulatedConsole`] implements it in memory; [`native`]
//! implements it on the console itself.
//!
//! ## Configuration address format
//!
//! ```text
//! 31      23      15      10   7     1 0
//! ┌───────┬───────┬───────┬────┬──────┬─┐
//! │Enable │ Resv  │  Bus  │Dev │Func│Reg│
//! │  1b   │  7b   │  8b   │ 5b │ 3b │6b │
//! └───────┴───────┴───────┴────┴──────┴─┘
//! ```

use std::ops::{Deref, DerefMut};
use std::time::Duration;

#[cfg(all(feature = "native", target_arch = "x86"))]
pub mod native;

/// Configuration address port.
pub const CONFIG_ADDRESS_PORT: u16 = 0xCF8;
/// Configuration data port.
pub const CONFIG_DATA_PORT: u16 = 0xCFC;

/// Bus/device/function/offset of a configuration-space dword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigAddress {
    pub bus: u8,
    pub device: u8,
    pub function: u8,
    pub offset: u8,
}

impl ConfigAddress {
    pub const fn new(bus: u8, device: u8, function: u8, offset: u8) -> Self {
        ConfigAddress { bus, device, function, offset }
    }

    /// Value written to the address port to select this dword.
    pub const fn port_value(self) -> u32 {
        0x8000_0000
            | ((self.bus as u32) << 16)
            | (((self.device as u32) & 0x1F) << 11)
            | (((self.function as u32) & 0x07) << 8)
            | ((self.offset as u32) & 0xFC)
    }
}

/// North-bridge PLL control register (host bridge, function 3).
pub const NB_PLL: ConfigAddress = ConfigAddress::new(0, 0, 3, 0x6C);
/// Graphics-core PLL coefficient register (NVPLL_COEFF).
pub const GPU_PLL: u32 = 0xFD68_0500;

/// Configuration-space dword access.
pub trait ConfigBus {
    fn read_config(&mut self, addr: ConfigAddress) -> u32;
    fn write_config(&mut self, addr: ConfigAddress, value: u32);
}

/// 32-bit memory-mapped register access.
pub trait Mmio {
    fn read32(&mut self, addr: u32) -> u32;
    fn write32(&mut self, addr: u32, value: u32);
}

/// Everything the commit protocol touches.
pub trait Platform: ConfigBus + Mmio {
    /// Mask interrupt delivery on the executing core.
    ///
    /// # Safety
    /// Must be paired with [`Platform::unmask_interrupts`]; use
    /// [`CriticalRegion`] rather than calling this directly.
    unsafe fn mask_interrupts(&mut self);

    /// # Safety
    /// Only valid after a matching [`Platform::mask_interrupts`].
    unsafe fn unmask_interrupts(&mut self);

    /// Issue `nops` no-op cycles followed by a store fence.
    fn barrier(&mut self, nops: u32);

    /// Block the only thread while a PLL relocks or the bus settles.
    fn settle(&mut self, duration: Duration);

    /// Hand control back to firmware. Does not return on real hardware.
    fn warm_reboot(&mut self);
}

/// Interrupt-masked window over a [`Platform`].
///
/// Interrupts are unmasked when the guard drops, on every exit path.
pub struct CriticalRegion<'a, P: Platform + ?Sized> {
    platform: &'a mut P,
}

impl<'a, P: Platform + ?Sized> CriticalRegion<'a, P> {
    pub fn enter(platform: &'a mut P) -> Self {
        // SAFETY: unmasked again in Drop.
        unsafe { platform.mask_interrupts() };
        CriticalRegion { platform }
    }
}

impl<P: Platform + ?Sized> Deref for CriticalRegion<'_, P> {
    type Target = P;
    fn deref(&self) -> &P { self.platform }
}

impl<P: Platform + ?Sized> DerefMut for CriticalRegion<'_, P> {
    fn deref_mut(&mut self) -> &mut P { self.platform }
}

impl<P: Platform + ?Sized> Drop for CriticalRegion<'_, P> {
    fn drop(&mut self) {
        // SAFETY: masked in `enter`.
        unsafe { self.platform.unmask_interrupts() };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nb_pll_port_value() {
        assert_eq!(NB_PLL.port_value(), 0x8000_036C);
    }

    #[test]
    fn test_port_value_fields() {
        let a = ConfigAddress::new(1, 0x1F, 7, 0xFF);
        assert_eq!(a.port_value(), 0x8001_FFFC);
    }
}
