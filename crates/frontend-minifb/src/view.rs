//! Status gauges.
//!
//! Text goes to the terminal and the window title; the window itself shows
//! one horizontal gauge per clock with a marker at the startup value.

use clocktune_core::{ClockDomain, FrequencyDomainModel, StatusBlock};

pub const WIDTH: usize = 256;
pub const HEIGHT: usize = 72;

const BACKGROUND: u32 = 0x0010_1418;
const TRACK: u32 = 0x0030_3840;
const MARKER: u32 = 0x00FF_FFFF;
const FSB_COLOR: u32 = 0x0040_C0FF;
const MEM_COLOR: u32 = 0x0060_E070;
const GPU_COLOR: u32 = 0x00FF_A040;

/// Memory gauge full scale.
const MEM_SCALE_MHZ: u32 = 400;

const MARGIN: usize = 8;
const ROW_HEIGHT: usize = 12;
const ROW_PITCH: usize = 22;

/// Single-line summary for the window title.
pub fn status_line(s: &StatusBlock) -> String {
    format!(
        "FSB {} ({}) | CPU {} | MEM {} (MP {}) | GPU {} ({}) MHz",
        s.bus_desired_mhz, s.bus_achieved_mhz, s.cpu_mhz,
        s.memory_mhz, s.memory_divider, s.gpu_desired_mhz, s.gpu_achieved_mhz,
    )
}

/// Fill fraction in 0..=1 for `value` on `[min, max]`.
pub fn fraction(value: u32, min: u32, max: u32) -> f32 {
    if max <= min { return 0.0; }
    (value.saturating_sub(min) as f32 / (max - min) as f32).min(1.0)
}

pub fn render(model: &FrequencyDomainModel, buf: &mut [u32]) {
    buf.iter_mut().for_each(|px| *px = BACKGROUND);
    let s = model.status();
    let cfg = model.config();

    let bus = cfg.bus_band;
    gauge(buf, 0, FSB_COLOR,
        fraction(s.bus_desired_mhz, bus.min, bus.max),
        Some(fraction(model.original_mhz(ClockDomain::FrontSideBus), bus.min, bus.max)));

    gauge(buf, 1, MEM_COLOR, fraction(s.memory_mhz, 0, MEM_SCALE_MHZ), None);

    let gpu = cfg.gpu_band;
    gauge(buf, 2, GPU_COLOR,
        fraction(s.gpu_desired_mhz, gpu.min, gpu.max),
        Some(fraction(model.original_mhz(ClockDomain::GraphicsCore), gpu.min, gpu.max)));
}

fn gauge(buf: &mut [u32], row: usize, color: u32, fill: f32, marker: Option<f32>) {
    let span = WIDTH - 2 * MARGIN;
    let top = MARGIN + row * ROW_PITCH;
    let filled = (fill * span as f32) as usize;
    let marker_x = marker.map(|m| MARGIN + ((m * span as f32) as usize).min(span - 1));

    for y in top..(top + ROW_HEIGHT).min(HEIGHT) {
        for x in MARGIN..MARGIN + span {
            let c = if Some(x) == marker_x {
                MARKER
            } else if x - MARGIN < filled {
                color
            } else {
                TRACK
            };
            buf[y * WIDTH + x] = c;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clocktune_core::model::HardwareSnapshot;
    use clocktune_core::sim::{RETAIL_GPU_PLL, RETAIL_NB_PLL};
    use clocktune_core::TuneConfig;

    #[test]
    fn test_fraction() {
        assert_eq!(fraction(100, 100, 200), 0.0);
        assert_eq!(fraction(200, 100, 200), 1.0);
        assert_eq!(fraction(150, 100, 200), 0.5);
        assert_eq!(fraction(50, 100, 200), 0.0);
        assert_eq!(fraction(999, 100, 200), 1.0);
        assert_eq!(fraction(5, 7, 7), 0.0);
    }

    #[test]
    fn test_render_draws_marker() {
        let snap = HardwareSnapshot { nb_pll: RETAIL_NB_PLL, gpu_pll: RETAIL_GPU_PLL };
        let model = FrequencyDomainModel::new(snap, TuneConfig::default());
        let mut buf = vec![0u32; WIDTH * HEIGHT];
        render(&model, &mut buf);
        assert!(buf.iter().any(|&px| px == MARKER));
        assert!(buf.iter().any(|&px| px == FSB_COLOR));
        assert!(buf.iter().any(|&px| px == GPU_COLOR));
        assert_eq!(buf[0], BACKGROUND);
    }

    #[test]
    fn test_status_line() {
        let snap = HardwareSnapshot { nb_pll: RETAIL_NB_PLL, gpu_pll: RETAIL_GPU_PLL };
        let model = FrequencyDomainModel::new(snap, TuneConfig::default());
        let line = status_line(&model.status());
        assert!(line.starts_with("FSB 133 "));
        assert!(line.contains("MP 2"));
    }
}
