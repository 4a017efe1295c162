//! # clocktune-core
//!
//! Retunes the clock generators of the console: the front-side-bus / CPU
//! PLL in the north bridge (with its memory post divider) and the graphics
//! core PLL, then commits the result to live silicon and warm-reboots.
//!
//! ## Architecture
//!
//! - [`solver`]: desired frequency → best-precision (N, M)
//! - [`registers`]: bit-field codec for the two PLL register layouts
//! - [`model`]: original / desired state per clock domain, derived clocks
//! - [`applier`]: commit protocol: ordering, interrupt masking, settle delays
//! - [`session`]: edit / apply / cancel state machine driving all of the above
//! - [`platform`]: hardware seam ([`platform::Platform`]) and the native backend
//! - [`sim`]: in-memory console with an ordered access log
//! - [`regdump`]: register image files for the simulated console
//!
//! ## Clocks
//!
//! | Domain        | Formula                                 | Stock   |
//! |---------------|-----------------------------------------|---------|
//! | Front-side bus| `16.667 × N / M`                        | 133 MHz |
//! | CPU           | bus × 5.5                               | 733 MHz |
//! | Memory        | `(16.667 / M) × (P × 2 × N) / (2 × MP)` | 200 MHz |
//! | Graphics core | `16.667 × N / 2^shift / M`              | 233 MHz |

pub mod applier;
pub mod config;
pub mod error;
pub mod model;
pub mod platform;
pub mod regdump;
pub mod registers;
pub mod session;
pub mod sim;
pub mod solver;

pub use applier::{ClockApplier, CommitPlan, CommitResult};
pub use config::TuneConfig;
pub use model::{EditTarget, FrequencyDomainModel, StatusBlock};
pub use session::{AdjustmentSession, SessionEvent, SessionOutcome, SessionState};
pub use sim::SimulatedConsole;

/// A clock rail the operator can retune.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockDomain {
    /// Front-side bus; the CPU clock follows it at a fixed ratio
    FrontSideBus,
    /// Graphics core
    GraphicsCore,
}

impl ClockDomain {
    pub const ALL: [ClockDomain; 2] = [ClockDomain::FrontSideBus, ClockDomain::GraphicsCore];

    pub fn label(self) -> &'static str {
        match self {
            ClockDomain::FrontSideBus => "FSB",
            ClockDomain::GraphicsCore => "GPU",
        }
    }
}
