//! Hardware commit protocol.
//!
//! Order of operations (a wrong order can leave a clock briefly invalid):
//!
//! 1. Graphics core, if dirty: read-modify-write N/M with a settle delay on
//!    either side of the store. No interrupt masking.
//! 2. Memory post divider, if dirty *and* the bus is being raised: MP field
//!    alone, protected, before the bus moves, so memory never sees the new
//!    bus with the old divider.
//! 3. Bus, if dirty (or MP still pending): N/M (plus MP if not already
//!    written), protected.
//! 4. Warm reboot, always.
//!
//! Protected sequence:
//!
//! ```text
//! settle → [mask → barrier → read/modify/write → barrier → unmask] → settle
//! ```
//!
//! Every register value is computed and validated up front, so a commit
//! either runs to the reboot or is abandoned before the first store. There
//! is no retry: a failed write looks exactly like a relocking PLL.

use crate::error::ApplyError;
use crate::model::FrequencyDomainModel;
use crate::platform::{ConfigAddress, CriticalRegion, Platform, GPU_PLL, NB_PLL};
use crate::registers::{encode, Coefficients, NB_MP_MASK, PLL_NM_MASK};
use crate::ClockDomain;

/// Which protocol step a write belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStep {
    GraphicsCore,
    MemoryDivider,
    BusCoefficients,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    Config(ConfigAddress),
    Mmio(u32),
}

/// One register store, computed before anything is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedWrite {
    pub step: CommitStep,
    pub target: WriteTarget,
    /// Value the store is computed from
    pub before: u32,
    pub after: u32,
    /// Bits this store owns; everything else comes from the live register
    pub mask: u32,
    /// Runs inside the interrupt-masked window
    pub protected: bool,
}

impl PlannedWrite {
    /// Merge the owned fields into a live readback.
    #[inline]
    pub fn rebase(&self, live: u32) -> u32 {
        (live & !self.mask) | (self.after & self.mask)
    }
}

/// Ordered stores for one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitPlan {
    pub writes: Vec<PlannedWrite>,
}

impl CommitPlan {
    /// Work out every store `model` needs, in protocol order.
    pub fn build(model: &FrequencyDomainModel) -> Result<Self, ApplyError> {
        let snapshot = model.snapshot();
        let mut writes = Vec::new();

        if model.is_dirty(ClockDomain::GraphicsCore) {
            let coeffs = model
                .gpu_coefficients()
                .with_solution(model.solve_gpu())
                .map_err(|source| ApplyError::Encode { domain: ClockDomain::GraphicsCore.label(), source })?;
            let after = encode(snapshot.gpu_pll, &Coefficients::GraphicsCore(coeffs))
                .map_err(|source| ApplyError::Encode { domain: ClockDomain::GraphicsCore.label(), source })?;
            writes.push(PlannedWrite {
                step: CommitStep::GraphicsCore,
                target: WriteTarget::Mmio(GPU_PLL),
                before: snapshot.gpu_pll,
                after,
                mask: PLL_NM_MASK,
                protected: false,
            });
        }

        let bus_dirty = model.is_dirty(ClockDomain::FrontSideBus);
        let mp_dirty = model.memory_divider_dirty();
        let mut nb = model.nb_coefficients();
        let mut nb_raw = snapshot.nb_pll;
        let mut mp_pending = mp_dirty;

        if mp_dirty && model.bus_increasing() {
            nb = nb
                .with_memory_divider(model.desired_memory_divider())
                .map_err(|source| ApplyError::Encode { domain: "MEM", source })?;
            let after = encode(nb_raw, &Coefficients::NorthBridge(nb))
                .map_err(|source| ApplyError::Encode { domain: "MEM", source })?;
            writes.push(PlannedWrite {
                step: CommitStep::MemoryDivider,
                target: WriteTarget::Config(NB_PLL),
                before: nb_raw,
                after,
                mask: NB_MP_MASK,
                protected: true,
            });
            nb_raw = after;
            mp_pending = false;
        }

        if bus_dirty || mp_pending {
            let mut mask = 0;
            if bus_dirty {
                nb = nb
                    .with_solution(model.solve_bus())
                    .map_err(|source| ApplyError::Encode { domain: ClockDomain::FrontSideBus.label(), source })?;
                mask |= PLL_NM_MASK;
            }
            if mp_pending {
                nb = nb
                    .with_memory_divider(model.desired_memory_divider())
                    .map_err(|source| ApplyError::Encode { domain: "MEM", source })?;
                mask |= NB_MP_MASK;
            }
            let after = encode(nb_raw, &Coefficients::NorthBridge(nb))
                .map_err(|source| ApplyError::Encode { domain: ClockDomain::FrontSideBus.label(), source })?;
            writes.push(PlannedWrite {
                step: CommitStep::BusCoefficients,
                target: WriteTarget::Config(NB_PLL),
                before: nb_raw,
                after,
                mask,
                protected: true,
            });
        }

        Ok(CommitPlan { writes })
    }

    pub fn is_empty(&self) -> bool { self.writes.is_empty() }
}

/// Outcome of a commit that reached the end of the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResult {
    /// Stores performed, in order, with the values actually written
    pub writes: Vec<PlannedWrite>,
    pub rebooted: bool,
}

pub struct ClockApplier<'a, P: Platform + ?Sized> {
    platform: &'a mut P,
}

impl<'a, P: Platform + ?Sized> ClockApplier<'a, P> {
    pub fn new(platform: &'a mut P) -> Self {
        ClockApplier { platform }
    }

    /// Run the full protocol once. Every path ends in a reboot, which on the
    /// console does not return; an `Err` means nothing was written.
    pub fn apply(&mut self, model: &FrequencyDomainModel) -> Result<CommitResult, ApplyError> {
        let plan = match CommitPlan::build(model) {
            Ok(plan) => plan,
            Err(e) => {
                log::error!("commit abandoned before any store, rebooting: {}", e);
                self.platform.warm_reboot();
                return Err(e);
            }
        };
        let config = model.config();
        let mut done = Vec::with_capacity(plan.writes.len());

        if plan.is_empty() {
            log::info!("no clock changed, rebooting");
        }

        for write in &plan.writes {
            log::info!("commit {:?}: {:08X} -> {:08X}", write.step, write.before, write.after);
            let written = if write.protected {
                self.platform.settle(config.settle);
                let written = {
                    let mut cs = CriticalRegion::enter(&mut *self.platform);
                    cs.barrier(config.nops_before);
                    let written = store(&mut *cs, write);
                    cs.barrier(config.nops_after);
                    written
                };
                self.platform.settle(config.settle);
                written
            } else {
                self.platform.settle(config.settle);
                let written = store(&mut *self.platform, write);
                self.platform.settle(config.settle);
                written
            };
            done.push(PlannedWrite { after: written, ..*write });
        }

        self.platform.warm_reboot();
        Ok(CommitResult { writes: done, rebooted: true })
    }
}

/// Read-modify-write against the live register.
fn store<P: Platform + ?Sized>(platform: &mut P, write: &PlannedWrite) -> u32 {
    let live = match write.target {
        WriteTarget::Config(addr) => platform.read_config(addr),
        WriteTarget::Mmio(addr) => platform.read32(addr),
    };
    if live != write.before {
        log::warn!("{:?}: register changed since startup ({:08X} != {:08X})", write.step, live, write.before);
    }
    let value = write.rebase(live);
    log::debug!("{:?}: store {:08X}", write.target, value);
    match write.target {
        WriteTarget::Config(addr) => platform.write_config(addr, value),
        WriteTarget::Mmio(addr) => platform.write32(addr, value),
    }
    value
}
