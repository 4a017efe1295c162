//! Simulated console.
//!
//! An in-memory register file implementing [`Platform`], used for dry runs
//! on a desktop and as the write log in tests. Every access is appended to
//! an ordered [`HardwareOp`] log so ordering rules can be asserted.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::platform::{ConfigAddress, ConfigBus, Mmio, Platform, GPU_PLL, NB_PLL};
use crate::regdump::RegisterImage;

/// North-bridge PLL as found on a stock console: 133 MHz bus, 200 MHz memory.
pub const RETAIL_NB_PLL: u32 = 0x0023_0801;
/// Graphics-core PLL as found on a stock console: 233 MHz.
pub const RETAIL_GPU_PLL: u32 = 0x0001_1C01;

/// One observable hardware access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareOp {
    ConfigRead { addr: ConfigAddress, value: u32 },
    ConfigWrite { addr: ConfigAddress, value: u32, interrupts_masked: bool },
    MmioRead { addr: u32, value: u32 },
    MmioWrite { addr: u32, value: u32, interrupts_masked: bool },
    MaskInterrupts,
    UnmaskInterrupts,
    Barrier(u32),
    Settle(Duration),
    Reboot,
}

impl HardwareOp {
    pub fn is_write(&self) -> bool {
        matches!(self, HardwareOp::ConfigWrite { .. } | HardwareOp::MmioWrite { .. })
    }
}

pub struct SimulatedConsole {
    config_space: BTreeMap<ConfigAddress, u32>,
    mmio: BTreeMap<u32, u32>,
    log: Vec<HardwareOp>,
    interrupts_masked: bool,
    reboots: u32,
    /// Actually sleep on settle instead of only recording it
    pub realtime: bool,
}

impl SimulatedConsole {
    /// Console with nothing mapped; unmapped reads float high.
    pub fn new() -> Self {
        SimulatedConsole {
            config_space: BTreeMap::new(),
            mmio: BTreeMap::new(),
            log: Vec::new(),
            interrupts_masked: false,
            reboots: 0,
            realtime: false,
        }
    }

    /// Stock clock configuration.
    pub fn retail() -> Self {
        Self::from_image(&RegisterImage { nb_pll: RETAIL_NB_PLL, gpu_pll: RETAIL_GPU_PLL })
    }

    pub fn from_image(image: &RegisterImage) -> Self {
        let mut sim = Self::new();
        sim.config_space.insert(NB_PLL, image.nb_pll);
        sim.mmio.insert(GPU_PLL, image.gpu_pll);
        sim
    }

    /// Current contents of the two PLL registers.
    pub fn image(&self) -> RegisterImage {
        RegisterImage {
            nb_pll: self.config_space.get(&NB_PLL).copied().unwrap_or(0xFFFF_FFFF),
            gpu_pll: self.mmio.get(&GPU_PLL).copied().unwrap_or(0xFFFF_FFFF),
        }
    }

    pub fn log(&self) -> &[HardwareOp] { &self.log }

    pub fn clear_log(&mut self) { self.log.clear(); }

    /// Register writes only, in order.
    pub fn writes(&self) -> Vec<&HardwareOp> {
        self.log.iter().filter(|op| op.is_write()).collect()
    }

    pub fn reboot_count(&self) -> u32 { self.reboots }

    pub fn interrupts_masked(&self) -> bool { self.interrupts_masked }
}

impl Default for SimulatedConsole {
    fn default() -> Self { Self::new() }
}

impl ConfigBus for SimulatedConsole {
    fn read_config(&mut self, addr: ConfigAddress) -> u32 {
        let value = self.config_space.get(&addr).copied().unwrap_or(0xFFFF_FFFF);
        self.log.push(HardwareOp::ConfigRead { addr, value });
        value
    }

    fn write_config(&mut self, addr: ConfigAddress, value: u32) {
        self.config_space.insert(addr, value);
        self.log.push(HardwareOp::ConfigWrite { addr, value, interrupts_masked: self.interrupts_masked });
    }
}

impl Mmio for SimulatedConsole {
    fn read32(&mut self, addr: u32) -> u32 {
        let value = self.mmio.get(&addr).copied().unwrap_or(0xFFFF_FFFF);
        self.log.push(HardwareOp::MmioRead { addr, value });
        value
    }

    fn write32(&mut self, addr: u32, value: u32) {
        self.mmio.insert(addr, value);
        self.log.push(HardwareOp::MmioWrite { addr, value, interrupts_masked: self.interrupts_masked });
    }
}

impl Platform for SimulatedConsole {
    unsafe fn mask_interrupts(&mut self) {
        if self.interrupts_masked {
            log::warn!("interrupts masked twice");
        }
        self.interrupts_masked = true;
        self.log.push(HardwareOp::MaskInterrupts);
    }

    unsafe fn unmask_interrupts(&mut self) {
        self.interrupts_masked = false;
        self.log.push(HardwareOp::UnmaskInterrupts);
    }

    fn barrier(&mut self, nops: u32) {
        self.log.push(HardwareOp::Barrier(nops));
    }

    fn settle(&mut self, duration: Duration) {
        self.log.push(HardwareOp::Settle(duration));
        if self.realtime {
            std::thread::sleep(duration);
        }
    }

    fn warm_reboot(&mut self) {
        self.reboots += 1;
        self.log.push(HardwareOp::Reboot);
        log::info!("simulated console rebooted ({} total)", self.reboots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::CriticalRegion;

    #[test]
    fn test_retail_readback() {
        let mut sim = SimulatedConsole::retail();
        assert_eq!(sim.read_config(NB_PLL), RETAIL_NB_PLL);
        assert_eq!(sim.read32(GPU_PLL), RETAIL_GPU_PLL);
        assert_eq!(sim.log().len(), 2);
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn test_unmapped_floats_high() {
        let mut sim = SimulatedConsole::new();
        assert_eq!(sim.read_config(ConfigAddress::new(0, 1, 0, 0)), 0xFFFF_FFFF);
        assert_eq!(sim.read32(0x1000), 0xFFFF_FFFF);
    }

    #[test]
    fn test_critical_region_masks_and_restores() {
        let mut sim = SimulatedConsole::retail();
        {
            let mut cs = CriticalRegion::enter(&mut sim);
            assert!(cs.interrupts_masked());
            cs.write_config(NB_PLL, 0x1234);
        }
        assert!(!sim.interrupts_masked());
        assert_eq!(sim.log(), &[
            HardwareOp::MaskInterrupts,
            HardwareOp::ConfigWrite { addr: NB_PLL, value: 0x1234, interrupts_masked: true },
            HardwareOp::UnmaskInterrupts,
        ]);
    }

    #[test]
    fn test_critical_region_released_on_unwind() {
        let mut sim = SimulatedConsole::retail();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _cs = CriticalRegion::enter(&mut sim);
            panic!("abort inside the protected window");
        }));
        assert!(result.is_err());
        assert!(!sim.interrupts_masked());
        assert_eq!(sim.log().last(), Some(&HardwareOp::UnmaskInterrupts));
    }

    #[test]
    fn test_image_tracks_writes() {
        let mut sim = SimulatedConsole::retail();
        sim.write32(GPU_PLL, 0x0001_6F04);
        assert_eq!(sim.image(), RegisterImage { nb_pll: RETAIL_NB_PLL, gpu_pll: 0x0001_6F04 });
        sim.warm_reboot();
        assert_eq!(sim.reboot_count(), 1);
    }
}
