//! Console backend: real port I/O, interrupt flag and firmware reboot.
//!
//! Runs in ring 0 on the console's 32-bit x86 CPU, where the title owns the
//! machine and `cli`/`sti` and `in`/`out` are legal.

use core::arch::asm;
use std::time::Duration;

use super::{ConfigAddress, ConfigBus, Mmio, Platform, CONFIG_ADDRESS_PORT, CONFIG_DATA_PORT};

/// Firmware routine selector for a warm (quick) reboot.
const HAL_QUICK_REBOOT_ROUTINE: u32 = 2;

#[link(name = "xboxkrnl")]
extern "stdcall" {
    fn HalReturnToFirmware(routine: u32);
}

#[inline]
unsafe fn outl(port: u16, value: u32) {
    asm!("out dx, eax", in("dx") port, in("eax") value, options(nomem, nostack, preserves_flags));
}

#[inline]
unsafe fn inl(port: u16) -> u32 {
    let value: u32;
    asm!("in eax, dx", in("dx") port, out("eax") value, options(nomem, nostack, preserves_flags));
    value
}

/// The console the program is running on.
pub struct NativeConsole {
    _private: (),
}

impl NativeConsole {
    /// # Safety
    /// Only one instance may exist, and only when running with ring-0
    /// privileges on the console.
    pub unsafe fn new() -> Self {
        NativeConsole { _private: () }
    }
}

impl ConfigBus for NativeConsole {
    fn read_config(&mut self, addr: ConfigAddress) -> u32 {
        unsafe {
            outl(CONFIG_ADDRESS_PORT, addr.port_value());
            inl(CONFIG_DATA_PORT)
        }
    }

    fn write_config(&mut self, addr: ConfigAddress, value: u32) {
        unsafe {
            outl(CONFIG_ADDRESS_PORT, addr.port_value());
            outl(CONFIG_DATA_PORT, value);
        }
    }
}

impl Mmio for NativeConsole {
    fn read32(&mut self, addr: u32) -> u32 {
        unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
    }

    fn write32(&mut self, addr: u32, value: u32) {
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, value) }
    }
}

impl Platform for NativeConsole {
    unsafe fn mask_interrupts(&mut self) {
        asm!("cli", options(nomem, nostack, preserves_flags));
    }

    unsafe fn unmask_interrupts(&mut self) {
        asm!("sti", options(nomem, nostack, preserves_flags));
    }

    fn barrier(&mut self, nops: u32) {
        for _ in 0..nops {
            unsafe { asm!("nop", options(nomem, nostack, preserves_flags)) };
        }
        unsafe { asm!("sfence", options(nostack, preserves_flags)) };
    }

    fn settle(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn warm_reboot(&mut self) {
        log::info!("returning to firmware");
        unsafe { HalReturnToFirmware(HAL_QUICK_REBOOT_ROUTINE) };
        loop {
            unsafe { asm!("hlt", options(nomem, nostack, preserves_flags)) };
        }
    }
}
