//! Operator session state machine.
//!
//! ```text
//!            increment / decrement
//!              ┌───────┐
//!              ▼       │
//!   start ─▶ Editing ──┘
//!              │
//!              │ apply (commit, always reboot) / cancel (no hardware)
//!              ▼
//!          Terminated ── any event ─▶ ignored
//! ```

use crate::applier::{ClockApplier, CommitResult};
use crate::config::TuneConfig;
use crate::error::ApplyError;
use crate::model::{EditTarget, FrequencyDomainModel, HardwareSnapshot, StatusBlock};
use crate::platform::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Editing,
    Terminated,
}

/// Discrete input from the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Increment(EditTarget),
    Decrement(EditTarget),
    Apply,
    Cancel,
}

/// What the frontend should do after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Edit accepted; redraw this status
    Redraw(StatusBlock),
    /// Edit hit the edge of its range
    Unchanged,
    Committed(Result<CommitResult, ApplyError>),
    Cancelled,
    /// Session already over
    Ignored,
}

pub struct AdjustmentSession<P: Platform> {
    platform: P,
    model: FrequencyDomainModel,
    state: SessionState,
}

impl<P: Platform> AdjustmentSession<P> {
    /// Read both PLL registers once and start editing from them.
    pub fn start(mut platform: P, config: TuneConfig) -> Self {
        let snapshot = HardwareSnapshot::read(&mut platform);
        let model = FrequencyDomainModel::new(snapshot, config);
        AdjustmentSession { platform, model, state: SessionState::Editing }
    }

    pub fn state(&self) -> SessionState { self.state }

    pub fn model(&self) -> &FrequencyDomainModel { &self.model }

    pub fn status(&self) -> StatusBlock { self.model.status() }

    pub fn platform(&self) -> &P { &self.platform }

    pub fn into_platform(self) -> P { self.platform }

    pub fn handle(&mut self, event: SessionEvent) -> SessionOutcome {
        if self.state == SessionState::Terminated {
            log::debug!("ignoring {:?} after termination", event);
            return SessionOutcome::Ignored;
        }
        match event {
            SessionEvent::Increment(target) => self.edit(target, 1),
            SessionEvent::Decrement(target) => self.edit(target, -1),
            SessionEvent::Apply => {
                self.state = SessionState::Terminated;
                let result = ClockApplier::new(&mut self.platform).apply(&self.model);
                SessionOutcome::Committed(result)
            }
            SessionEvent::Cancel => {
                self.state = SessionState::Terminated;
                log::info!("cancelled, hardware untouched");
                SessionOutcome::Cancelled
            }
        }
    }

    fn edit(&mut self, target: EditTarget, delta: i32) -> SessionOutcome {
        if self.model.adjust(target, delta) {
            SessionOutcome::Redraw(self.model.status())
        } else {
            SessionOutcome::Unchanged
        }
    }
}
