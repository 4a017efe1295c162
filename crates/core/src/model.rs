//! Per-domain frequency state.
//!
//! Holds what was read from the hardware at startup, what the operator asked
//! for since, and everything derived from it for display. Nothing here
//! touches hardware; [`crate::applier`] decides what to write from
//! [`FrequencyDomainModel::is_dirty`].

use std::fmt;

use crate::config::{Band, TuneConfig};
use crate::platform::{ConfigBus, Mmio, GPU_PLL, NB_PLL};
use crate::registers::{decode_gpu, decode_nb, GpuCoefficients, NbCoefficients};
use crate::solver::{solve, Solution};
use crate::ClockDomain;

/// Raw register values read once at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareSnapshot {
    pub nb_pll: u32,
    pub gpu_pll: u32,
}

impl HardwareSnapshot {
    pub fn read<H: ConfigBus + Mmio + ?Sized>(hw: &mut H) -> Self {
        let snap = HardwareSnapshot { nb_pll: hw.read_config(NB_PLL), gpu_pll: hw.read32(GPU_PLL) };
        log::debug!("readback: nb_pll={:08X} gpu_pll={:08X}", snap.nb_pll, snap.gpu_pll);
        snap
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DomainState {
    original_mhz: u32,
    desired_mhz: u32,
}

impl DomainState {
    fn new(original_mhz: u32) -> Self {
        DomainState { original_mhz, desired_mhz: original_mhz }
    }
}

/// What the operator is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditTarget {
    Domain(ClockDomain),
    MemoryPostDivider,
}

/// Operator-facing summary, redrawn after every accepted edit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusBlock {
    pub bus_desired_mhz: u32,
    pub bus_achieved_mhz: u32,
    pub cpu_mhz: u32,
    pub memory_mhz: u32,
    pub memory_divider: u8,
    pub gpu_desired_mhz: u32,
    pub gpu_achieved_mhz: u32,
}

impl fmt::Display for StatusBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FSB: {}MHz ({}MHz)", self.bus_desired_mhz, self.bus_achieved_mhz)?;
        writeln!(f, "CPU: {}MHz", self.cpu_mhz)?;
        writeln!(f, "MEM: {}MHz (MP {})", self.memory_mhz, self.memory_divider)?;
        write!(f, "GPU: {}MHz ({}MHz)", self.gpu_desired_mhz, self.gpu_achieved_mhz)
    }
}

pub struct FrequencyDomainModel {
    config: TuneConfig,
    snapshot: HardwareSnapshot,
    nb: NbCoefficients,
    gpu: GpuCoefficients,
    bus: DomainState,
    gpu_clock: DomainState,
    original_mp: u8,
    desired_mp: u8,
}

impl FrequencyDomainModel {
    /// Decode the startup readback. Implausible frequencies are replaced by
    /// the band's fallback rather than fed to the solver.
    pub fn new(snapshot: HardwareSnapshot, config: TuneConfig) -> Self {
        let nb = decode_nb(snapshot.nb_pll);
        let gpu = decode_gpu(snapshot.gpu_pll);

        let bus_mhz = nb.bus_mhz(config.bus_base_clock_mhz) as u32;
        let gpu_mhz = gpu.frequency_mhz(config.gpu_base_clock_khz);
        let bus_original = sanitize(ClockDomain::FrontSideBus, &config.bus_band, bus_mhz);
        let gpu_original = sanitize(ClockDomain::GraphicsCore, &config.gpu_band, gpu_mhz);

        log::info!("startup: FSB {}MHz, GPU {}MHz, MP {}", bus_original, gpu_original, nb.mp);

        FrequencyDomainModel {
            bus: DomainState::new(bus_original),
            gpu_clock: DomainState::new(gpu_original),
            original_mp: nb.mp,
            desired_mp: nb.mp,
            config,
            snapshot,
            nb,
            gpu,
        }
    }

    pub fn config(&self) -> &TuneConfig { &self.config }

    pub fn snapshot(&self) -> HardwareSnapshot { self.snapshot }

    pub fn nb_coefficients(&self) -> NbCoefficients { self.nb }

    pub fn gpu_coefficients(&self) -> GpuCoefficients { self.gpu }

    fn state(&self, domain: ClockDomain) -> &DomainState {
        match domain {
            ClockDomain::FrontSideBus => &self.bus,
            ClockDomain::GraphicsCore => &self.gpu_clock,
        }
    }

    fn band(&self, domain: ClockDomain) -> Band {
        match domain {
            ClockDomain::FrontSideBus => self.config.bus_band,
            ClockDomain::GraphicsCore => self.config.gpu_band,
        }
    }

    pub fn original_mhz(&self, domain: ClockDomain) -> u32 { self.state(domain).original_mhz }

    pub fn desired_mhz(&self, domain: ClockDomain) -> u32 { self.state(domain).desired_mhz }

    pub fn original_memory_divider(&self) -> u8 { self.original_mp }

    pub fn desired_memory_divider(&self) -> u8 { self.desired_mp }

    pub fn is_dirty(&self, domain: ClockDomain) -> bool {
        let s = self.state(domain);
        s.desired_mhz != s.original_mhz
    }

    pub fn memory_divider_dirty(&self) -> bool { self.desired_mp != self.original_mp }

    /// Bus is being raised above its startup frequency.
    pub fn bus_increasing(&self) -> bool { self.bus.desired_mhz > self.bus.original_mhz }

    /// Apply a ±`delta` edit. Returns false when the value was already at the
    /// edge of its band and nothing changed.
    pub fn adjust(&mut self, target: EditTarget, delta: i32) -> bool {
        match target {
            EditTarget::Domain(domain) => {
                let band = self.band(domain);
                let state = match domain {
                    ClockDomain::FrontSideBus => &mut self.bus,
                    ClockDomain::GraphicsCore => &mut self.gpu_clock,
                };
                let next = band.clamp(state.desired_mhz as i64 + delta as i64);
                let changed = next != state.desired_mhz;
                state.desired_mhz = next;
                changed
            }
            EditTarget::MemoryPostDivider => {
                let next = self.config.memory_divider.clamp(self.desired_mp as i64 + delta as i64) as u8;
                let changed = next != self.desired_mp;
                self.desired_mp = next;
                changed
            }
        }
    }

    /// Bus coefficients for the desired frequency.
    pub fn solve_bus(&self) -> Solution {
        solve(self.bus.desired_mhz, self.config.bus_base_clock_mhz)
    }

    /// Graphics-core coefficients for the desired frequency. The existing
    /// post divider stays, so the solver targets `desired × 2^shift`.
    pub fn solve_gpu(&self) -> Solution {
        solve(self.gpu_clock.desired_mhz << self.gpu.shift, self.config.bus_base_clock_mhz)
    }

    pub fn status(&self) -> StatusBlock {
        let base = self.config.bus_base_clock_mhz;
        let bus = self.solve_bus();
        let bus_achieved = bus.frequency_mhz(base);
        let mem = NbCoefficients {
            n: bus.n.min(u8::MAX as u32) as u8,
            m: bus.m.value() as u8,
            p: self.nb.p,
            mp: self.desired_mp,
        };

        let gpu = self.solve_gpu();
        let gpu_achieved = GpuCoefficients {
            n: gpu.n.min(u8::MAX as u32) as u8,
            m: gpu.m.value() as u8,
            shift: self.gpu.shift,
        };

        StatusBlock {
            bus_desired_mhz: self.bus.desired_mhz,
            bus_achieved_mhz: bus_achieved as u32,
            cpu_mhz: (bus_achieved * self.config.cpu_ratio) as u32,
            memory_mhz: mem.memory_mhz(base) as u32,
            memory_divider: self.desired_mp,
            gpu_desired_mhz: self.gpu_clock.desired_mhz,
            gpu_achieved_mhz: gpu_achieved.frequency_mhz(self.config.gpu_base_clock_khz),
        }
    }
}

fn sanitize(domain: ClockDomain, band: &Band, mhz: u32) -> u32 {
    let value = band.sanitize(mhz);
    if value != mhz {
        log::warn!("{} readback {}MHz outside {}..={}MHz, using {}MHz", domain.label(), mhz, band.min, band.max, value);
    }
    value
}
