//! PLL control register codec.
//!
//! Two register shapes exist and must never be mixed up:
//!
//! | Bits  | North-bridge PLL (config space) | Graphics-core PLL (MMIO) |
//! |-------|---------------------------------|--------------------------|
//! | 0–7   | M (input divider)               | M                        |
//! | 8–15  | N (multiplier)                  | N                        |
//! | 16–19 | P (post divider)                | 16–18: shift (P = 2^shift) |
//! | 20–23 | MP (memory post divider)        | reserved                 |
//! | 24–31 | reserved                        | reserved                 |
//!
//! Reserved bits carry undocumented state. Encoding always starts from the
//! raw value last read and only replaces the owned fields.

use bitfield_struct::bitfield;

use crate::error::CodecError;
use crate::solver::Solution;

/// Multiplier and divider fields shared by both layouts.
pub const PLL_NM_MASK: u32 = 0x0000_FFFF;
/// North-bridge post divider P.
pub const NB_P_MASK: u32 = 0x000F_0000;
/// North-bridge memory post divider MP.
pub const NB_MP_MASK: u32 = 0x00F0_0000;
/// Graphics-core post divider exponent.
pub const GPU_SHIFT_MASK: u32 = 0x0007_0000;

/// North-bridge (CPU / memory) PLL control register.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct NbPllRegister {
    pub m: u8,
    pub n: u8,
    #[bits(4)]
    pub p: u8,
    #[bits(4)]
    pub mp: u8,
    pub reserved: u8,
}

/// Graphics-core PLL coefficient register.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct GpuPllRegister {
    pub m: u8,
    pub n: u8,
    #[bits(3)]
    pub shift: u8,
    #[bits(13)]
    pub reserved: u16,
}

/// Which register shape a raw value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterLayout {
    NorthBridge,
    GraphicsCore,
}

/// Decoded north-bridge fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NbCoefficients {
    pub n: u8,
    pub m: u8,
    pub p: u8,
    pub mp: u8,
}

impl NbCoefficients {
    /// Front-side-bus frequency; the CPU runs at a fixed multiple of it.
    pub fn bus_mhz(&self, base_clock_mhz: f32) -> f32 {
        if self.m == 0 { return 0.0; }
        base_clock_mhz * self.n as f32 / self.m as f32
    }

    /// Memory clock: `(base / M) × (P × 2 × N) / (2 × MP)`.
    pub fn memory_mhz(&self, base_clock_mhz: f32) -> f32 {
        if self.m == 0 || self.mp == 0 { return 0.0; }
        let reference = base_clock_mhz / self.m as f32;
        reference * (self.p as f32 * 2.0 * self.n as f32) / (2.0 * self.mp as f32)
    }

    /// Replace N and M with a solver result.
    pub fn with_solution(self, solution: Solution) -> Result<Self, CodecError> {
        let n = fit(RegisterLayout::NorthBridge, "N", solution.n, 8)?;
        Ok(NbCoefficients { n, m: solution.m.value() as u8, ..self })
    }

    /// Replace only the memory post divider.
    pub fn with_memory_divider(self, mp: u8) -> Result<Self, CodecError> {
        let mp = fit(RegisterLayout::NorthBridge, "MP", mp as u32, 4)?;
        Ok(NbCoefficients { mp, ..self })
    }
}

/// Decoded graphics-core fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuCoefficients {
    pub n: u8,
    pub m: u8,
    pub shift: u8,
}

impl GpuCoefficients {
    /// Effective core clock, `base × N / 2^shift / M`, with the base in kHz
    /// so the whole computation stays integral.
    pub fn frequency_mhz(&self, base_clock_khz: u32) -> u32 {
        if self.m == 0 { return 0; }
        let vco = base_clock_khz as u64 * self.n as u64;
        ((vco >> self.shift) / self.m as u64 / 1000) as u32
    }

    /// Replace N and M with a solver result; the shift is kept.
    pub fn with_solution(self, solution: Solution) -> Result<Self, CodecError> {
        let n = fit(RegisterLayout::GraphicsCore, "N", solution.n, 8)?;
        Ok(GpuCoefficients { n, m: solution.m.value() as u8, ..self })
    }
}

/// Decoded contents of either register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coefficients {
    NorthBridge(NbCoefficients),
    GraphicsCore(GpuCoefficients),
}

impl Coefficients {
    pub fn layout(&self) -> RegisterLayout {
        match self {
            Coefficients::NorthBridge(_) => RegisterLayout::NorthBridge,
            Coefficients::GraphicsCore(_) => RegisterLayout::GraphicsCore,
        }
    }
}

fn fit(layout: RegisterLayout, field: &'static str, value: u32, bits: u32) -> Result<u8, CodecError> {
    if value >> bits != 0 {
        return Err(CodecError::FieldOverflow { layout, field, value, bits });
    }
    Ok(value as u8)
}

/// M must be a legal divisor unless it is the one already in the register.
fn divisor(layout: RegisterLayout, m: u8, current: u8) -> Result<u8, CodecError> {
    if matches!(m, 1 | 2 | 4) || m == current {
        Ok(m)
    } else {
        Err(CodecError::Divisor { layout, value: m })
    }
}

pub fn decode_nb(raw: u32) -> NbCoefficients {
    let reg = NbPllRegister::from_bits(raw);
    NbCoefficients { n: reg.n(), m: reg.m(), p: reg.p(), mp: reg.mp() }
}

pub fn decode_gpu(raw: u32) -> GpuCoefficients {
    let reg = GpuPllRegister::from_bits(raw);
    GpuCoefficients { n: reg.n(), m: reg.m(), shift: reg.shift() }
}

/// Unpack a raw register value according to `layout`.
pub fn decode(raw: u32, layout: RegisterLayout) -> Coefficients {
    match layout {
        RegisterLayout::NorthBridge => Coefficients::NorthBridge(decode_nb(raw)),
        RegisterLayout::GraphicsCore => Coefficients::GraphicsCore(decode_gpu(raw)),
    }
}

/// Pack `coeffs` into `raw`, leaving every bit outside the coefficient
/// fields exactly as it was. A divisor outside {1, 2, 4} is only accepted
/// when it equals the one `raw` already holds.
pub fn encode(raw: u32, coeffs: &Coefficients) -> Result<u32, CodecError> {
    let layout = coeffs.layout();
    match *coeffs {
        Coefficients::NorthBridge(c) => {
            let current = NbPllRegister::from_bits(raw);
            let m = divisor(layout, c.m, current.m())?;
            let p = fit(layout, "P", c.p as u32, 4)?;
            let mp = fit(layout, "MP", c.mp as u32, 4)?;
            let reg = current
                .with_m(m)
                .with_n(c.n)
                .with_p(p)
                .with_mp(mp);
            Ok(reg.into_bits())
        }
        Coefficients::GraphicsCore(c) => {
            let current = GpuPllRegister::from_bits(raw);
            let m = divisor(layout, c.m, current.m())?;
            let shift = fit(layout, "shift", c.shift as u32, 3)?;
            let reg = current
                .with_m(m)
                .with_n(c.n)
                .with_shift(shift);
            Ok(reg.into_bits())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BUS_BASE_CLOCK_MHZ, GPU_BASE_CLOCK_KHZ};
    use crate::solver::Divisor;

    #[test]
    fn test_decode_nb_fields() {
        let c = decode_nb(0xA5_23_08_01);
        assert_eq!(c, NbCoefficients { n: 8, m: 1, p: 3, mp: 2 });
        assert_eq!(NbPllRegister::from_bits(0xA5_23_08_01).reserved(), 0xA5);
    }

    #[test]
    fn test_stock_bus_decodes_to_133() {
        let c = decode_nb(0x0000_0801);
        assert_eq!((c.m, c.n), (1, 8));
        assert_eq!(c.bus_mhz(BUS_BASE_CLOCK_MHZ) as u32, 133);
    }

    #[test]
    fn test_stock_memory_clock() {
        let c = decode_nb(0x0023_0801);
        let mem = c.memory_mhz(BUS_BASE_CLOCK_MHZ);
        assert!((mem - 200.0).abs() < 0.1, "mem={}", mem);
        assert_eq!(NbCoefficients { mp: 0, ..c }.memory_mhz(BUS_BASE_CLOCK_MHZ), 0.0);
    }

    #[test]
    fn test_gpu_frequency() {
        let c = decode_gpu(0x0001_1C01);
        assert_eq!(c, GpuCoefficients { n: 0x1C, m: 1, shift: 1 });
        assert_eq!(c.frequency_mhz(GPU_BASE_CLOCK_KHZ), 233);
        assert_eq!(GpuCoefficients { m: 0, ..c }.frequency_mhz(GPU_BASE_CLOCK_KHZ), 0);
    }

    #[test]
    fn test_encode_preserves_foreign_bits() {
        let raws = [0x0000_0000u32, 0xFFFF_FFFF, 0xDEAD_BEEF, 0x5A23_0801, 0x8001_1C01];
        let nb = Coefficients::NorthBridge(NbCoefficients { n: 0x27, m: 4, p: 5, mp: 3 });
        let gpu = Coefficients::GraphicsCore(GpuCoefficients { n: 0x6F, m: 4, shift: 2 });
        let nb_foreign = !(PLL_NM_MASK | NB_P_MASK | NB_MP_MASK);
        let gpu_foreign = !(PLL_NM_MASK | GPU_SHIFT_MASK);
        assert_eq!(nb_foreign, 0xFF00_0000);
        assert_eq!(gpu_foreign, 0xFFF8_0000);
        assert_eq!(nb.layout(), RegisterLayout::NorthBridge);
        assert_eq!(gpu.layout(), RegisterLayout::GraphicsCore);
        for &raw in &raws {
            let out = encode(raw, &nb).unwrap();
            assert_eq!(decode(out, RegisterLayout::NorthBridge), nb);
            assert_eq!(out & nb_foreign, raw & nb_foreign, "raw={:08X}", raw);

            let out = encode(raw, &gpu).unwrap();
            assert_eq!(decode(out, RegisterLayout::GraphicsCore), gpu);
            assert_eq!(out & gpu_foreign, raw & gpu_foreign, "raw={:08X}", raw);
        }
    }

    #[test]
    fn test_encode_unchanged_is_identity() {
        let raw = 0xC3_23_08_01;
        let c = decode(raw, RegisterLayout::NorthBridge);
        assert_eq!(encode(raw, &c).unwrap(), raw);
    }

    #[test]
    fn test_field_overflow_rejected() {
        let bad = Coefficients::NorthBridge(NbCoefficients { n: 8, m: 1, p: 3, mp: 16 });
        let err = encode(0, &bad).unwrap_err();
        assert_eq!(err, CodecError::FieldOverflow {
            layout: RegisterLayout::NorthBridge, field: "MP", value: 16, bits: 4,
        });

        let c = decode_gpu(0x0001_1C01);
        let too_big = Solution { n: 300, m: Divisor::Four };
        assert!(c.with_solution(too_big).is_err());
        assert!(decode_nb(0).with_memory_divider(15).is_ok());
        assert!(decode_nb(0).with_memory_divider(16).is_err());
    }

    #[test]
    fn test_encode_rejects_bad_divisor() {
        let bad = Coefficients::NorthBridge(NbCoefficients { n: 8, m: 3, p: 3, mp: 2 });
        assert_eq!(encode(0, &bad).unwrap_err(), CodecError::Divisor {
            layout: RegisterLayout::NorthBridge, value: 3,
        });
        let bad = Coefficients::GraphicsCore(GpuCoefficients { n: 0x1C, m: 0, shift: 1 });
        assert_eq!(encode(0x0001_1C01, &bad).unwrap_err(), CodecError::Divisor {
            layout: RegisterLayout::GraphicsCore, value: 0,
        });
        for m in [1, 2, 4] {
            let ok = Coefficients::NorthBridge(NbCoefficients { n: 8, m, p: 3, mp: 2 });
            assert!(encode(0x0023_0803, &ok).is_ok());
        }
    }

    #[test]
    fn test_encode_keeps_odd_readback_divisor() {
        // Only MP changes; the register already carries M = 3.
        let raw = 0x0023_0803;
        let c = decode_nb(raw).with_memory_divider(4).unwrap();
        assert_eq!(encode(raw, &Coefficients::NorthBridge(c)).unwrap(), 0x0043_0803);
    }

    #[test]
    fn test_with_solution_keeps_post_dividers() {
        let c = decode_nb(0x0023_0801);
        let next = c.with_solution(Solution { n: 39, m: Divisor::Four }).unwrap();
        assert_eq!(next, NbCoefficients { n: 39, m: 4, p: 3, mp: 2 });
    }
}
