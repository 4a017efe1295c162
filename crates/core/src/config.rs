//! Tuning configuration.
//!
//! All constants that describe the retail console (reference oscillator,
//! CPU multiplier, plausible frequency bands) and the commit protocol timing
//! live here, so the frontend can override the few that make sense to change
//! for a dry run (e.g. settle delay on the simulated console).

use std::time::Duration;

/// Nominal reference oscillator used by the bus solver, in MHz.
pub const BUS_BASE_CLOCK_MHZ: f32 = 16.667;
/// Same oscillator in kHz, for the exact integer graphics-core decode.
pub const GPU_BASE_CLOCK_KHZ: u32 = 16_667;
/// Fixed CPU : front-side-bus multiplier.
pub const CPU_RATIO: f32 = 5.5;
/// Settle delay around every PLL store.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// An inclusive band of plausible frequencies for one clock domain, plus the
/// value substituted when a hardware readback falls outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub min: u32,
    pub max: u32,
    pub fallback: u32,
}

impl Band {
    pub const fn new(min: u32, max: u32, fallback: u32) -> Self {
        Band { min, max, fallback }
    }

    #[inline]
    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }

    #[inline]
    pub fn clamp(&self, value: i64) -> u32 {
        value.clamp(self.min as i64, self.max as i64) as u32
    }

    /// Readback sanitizing: values outside the band become the fallback.
    pub fn sanitize(&self, value: u32) -> u32 {
        if self.contains(value) { value } else { self.fallback }
    }
}

/// Complete configuration for a tuning session.
#[derive(Debug, Clone, PartialEq)]
pub struct TuneConfig {
    pub bus_base_clock_mhz: f32,
    pub gpu_base_clock_khz: u32,
    pub cpu_ratio: f32,
    pub bus_band: Band,
    pub gpu_band: Band,
    /// Memory post-divider edit range (the field is 4 bits, 0 is meaningless)
    pub memory_divider: Band,
    pub settle: Duration,
    /// No-op cycles issued inside the critical region before the store
    pub nops_before: u32,
    /// No-op cycles issued inside the critical region after the store
    pub nops_after: u32,
}

impl TuneConfig {
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

impl Default for TuneConfig {
    fn default() -> Self {
        TuneConfig {
            bus_base_clock_mhz: BUS_BASE_CLOCK_MHZ,
            gpu_base_clock_khz: GPU_BASE_CLOCK_KHZ,
            cpu_ratio: CPU_RATIO,
            bus_band: Band::new(100, 200, 133),
            gpu_band: Band::new(100, 300, 233),
            memory_divider: Band::new(1, 15, 2),
            settle: SETTLE_DELAY,
            nops_before: 5,
            nops_after: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_sanitize() {
        let band = Band::new(100, 200, 133);
        assert_eq!(band.sanitize(150), 150);
        assert_eq!(band.sanitize(100), 100);
        assert_eq!(band.sanitize(200), 200);
        assert_eq!(band.sanitize(99), 133);
        assert_eq!(band.sanitize(4000), 133);
    }

    #[test]
    fn test_band_clamp() {
        let band = Band::new(1, 15, 2);
        assert_eq!(band.clamp(0), 1);
        assert_eq!(band.clamp(-3), 1);
        assert_eq!(band.clamp(16), 15);
        assert_eq!(band.clamp(7), 7);
    }

    #[test]
    fn test_default_timing() {
        let cfg = TuneConfig::default();
        assert_eq!(cfg.settle, Duration::from_millis(500));
        let fast = cfg.clone().with_settle(Duration::ZERO);
        assert_eq!(fast.settle, Duration::ZERO);
        assert_eq!(fast.bus_band, cfg.bus_band);
    }
}
