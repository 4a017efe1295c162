//! Frequency → PLL coefficient solver.
//!
//! The PLL output is `base × N / M` with `M ∈ {1, 2, 4}`. For a requested
//! frequency we truncate `f × k / base` for each candidate divisor and keep
//! the smallest divisor that does not throw away resolution:
//!
//! ```text
//! t1 = ⌊f / base⌋   t2 = ⌊2f / base⌋   t4 = ⌊4f / base⌋
//! t2·2 ≠ t4  → (t4, 4)
//! t1·2 ≠ t2  → (t2, 2)
//! otherwise  → (t1, 1)
//! ```
//!
//! The base clock is the nominal 16.667 MHz as an `f32`, so results are only
//! meaningful inside the plausible band; callers clamp before solving.

/// PLL input divider. Only these three values are ever programmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Divisor {
    One,
    Two,
    Four,
}

impl Divisor {
    pub const ALL: [Divisor; 3] = [Divisor::One, Divisor::Two, Divisor::Four];

    #[inline]
    pub fn value(self) -> u32 {
        match self {
            Divisor::One => 1,
            Divisor::Two => 2,
            Divisor::Four => 4,
        }
    }
}

/// Solver output: multiplier N and divisor M.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    pub n: u32,
    pub m: Divisor,
}

impl Solution {
    /// Frequency the PLL produces with these coefficients, in MHz.
    pub fn frequency_mhz(&self, base_clock_mhz: f32) -> f32 {
        base_clock_mhz * self.n as f32 / self.m.value() as f32
    }
}

#[inline]
fn trial(desired_mhz: u32, k: u32, base_clock_mhz: f32) -> u32 {
    ((desired_mhz as u64 * k as u64) as f32 / base_clock_mhz) as u32
}

/// Find (N, M) for `desired_mhz`, preferring the lowest divisor that keeps
/// all achievable precision.
pub fn solve(desired_mhz: u32, base_clock_mhz: f32) -> Solution {
    let t1 = trial(desired_mhz, 1, base_clock_mhz);
    let t2 = trial(desired_mhz, 2, base_clock_mhz);
    let t4 = trial(desired_mhz, 4, base_clock_mhz);

    if t2 as u64 * 2 != t4 as u64 {
        Solution { n: t4, m: Divisor::Four }
    } else if t1 as u64 * 2 != t2 as u64 {
        Solution { n: t2, m: Divisor::Two }
    } else {
        Solution { n: t1, m: Divisor::One }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BUS_BASE_CLOCK_MHZ;

    #[test]
    fn test_166_needs_quarter_steps() {
        let s = solve(166, BUS_BASE_CLOCK_MHZ);
        assert_eq!(s.m, Divisor::Four);
        assert_eq!(s.n, (166.0f32 * 4.0 / BUS_BASE_CLOCK_MHZ) as u32);
        assert_eq!(s.n, 39);
    }

    #[test]
    fn test_exact_multiple_uses_unit_divisor() {
        let s = solve(134, BUS_BASE_CLOCK_MHZ);
        // 134/16.667 = 8.04, 268/16.667 = 16.08, 536/16.667 = 32.16
        assert_eq!(s, Solution { n: 8, m: Divisor::One });
        assert!((s.frequency_mhz(BUS_BASE_CLOCK_MHZ) - 133.336).abs() < 0.01);
    }

    #[test]
    fn test_half_step() {
        // 142/16.667 = 8.52, 284/16.667 = 17.04, 568/16.667 = 34.08
        let s = solve(142, BUS_BASE_CLOCK_MHZ);
        assert_eq!(s, Solution { n: 17, m: Divisor::Two });
    }

    #[test]
    fn test_stock_request_lands_below() {
        // Truncation makes 133 land on 31/4, a little under the request.
        let s = solve(133, BUS_BASE_CLOCK_MHZ);
        assert_eq!(s, Solution { n: 31, m: Divisor::Four });
        assert!(s.frequency_mhz(BUS_BASE_CLOCK_MHZ) < 133.0);
    }

    #[test]
    fn test_precision_maximality_over_band() {
        let base = BUS_BASE_CLOCK_MHZ;
        for f in 50..=400u32 {
            let s = solve(f, base);
            assert!(Divisor::ALL.contains(&s.m));

            let t1 = trial(f, 1, base);
            let t2 = trial(f, 2, base);
            let t4 = trial(f, 4, base);
            match s.m {
                Divisor::Four => assert_ne!(t2 * 2, t4, "f={}", f),
                Divisor::Two => {
                    assert_eq!(t2 * 2, t4, "f={}", f);
                    assert_ne!(t1 * 2, t2, "f={}", f);
                }
                Divisor::One => {
                    assert_eq!(t2 * 2, t4, "f={}", f);
                    assert_eq!(t1 * 2, t2, "f={}", f);
                }
            }

            // Never above the request, and within one divider step below it.
            let achieved = s.frequency_mhz(base) as f64;
            let step = base as f64 / s.m.value() as f64;
            assert!(achieved <= f as f64 + 1e-3, "f={} achieved={}", f, achieved);
            assert!(f as f64 - achieved < step + 1e-3, "f={} achieved={}", f, achieved);
        }
    }

    #[test]
    fn test_zero_request() {
        assert_eq!(solve(0, BUS_BASE_CLOCK_MHZ), Solution { n: 0, m: Divisor::One });
    }

    #[test]
    fn test_huge_request_does_not_panic() {
        for f in [u32::MAX / 4 + 1, u32::MAX / 2 + 1, u32::MAX] {
            let s = solve(f, BUS_BASE_CLOCK_MHZ);
            assert!(Divisor::ALL.contains(&s.m), "f={}", f);
        }
    }
}
