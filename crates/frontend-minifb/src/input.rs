//! Operator input: gamepad, keyboard fallback and headless scripts.
//!
//! | Gamepad          | Keyboard        | Event            |
//! |------------------|-----------------|------------------|
//! | D-pad left/right | Left/Right      | FSB −/+          |
//! | D-pad down/up    | Down/Up         | GPU −/+          |
//! | LB / RB          | PageDown/PageUp | memory divider −/+ |
//! | Start            | Enter           | apply            |
//! | Back             | Esc / Backspace | cancel           |

use clocktune_core::error::InitError;
use clocktune_core::{ClockDomain, EditTarget, SessionEvent};
use gilrs::{Button as GilrsButton, Event as GilrsEvent, EventType, Gilrs};
use minifb::Key;

const BUS: EditTarget = EditTarget::Domain(ClockDomain::FrontSideBus);
const GPU: EditTarget = EditTarget::Domain(ClockDomain::GraphicsCore);
const MEM: EditTarget = EditTarget::MemoryPostDivider;

/// Parse one headless script token (`fsb+`, `gpu-`, `mem+`, `apply`, `cancel`).
pub fn parse_event(token: &str) -> Result<SessionEvent, String> {
    let t = token.trim().to_ascii_lowercase();
    let event = match t.as_str() {
        "fsb+" => SessionEvent::Increment(BUS),
        "fsb-" => SessionEvent::Decrement(BUS),
        "gpu+" => SessionEvent::Increment(GPU),
        "gpu-" => SessionEvent::Decrement(GPU),
        "mem+" => SessionEvent::Increment(MEM),
        "mem-" => SessionEvent::Decrement(MEM),
        "apply" => SessionEvent::Apply,
        "cancel" => SessionEvent::Cancel,
        _ => return Err(format!("unknown event `{}` (fsb±, gpu±, mem±, apply, cancel)", token)),
    };
    Ok(event)
}

pub fn map_key(key: Key) -> Option<SessionEvent> {
    match key {
        Key::Right => Some(SessionEvent::Increment(BUS)),
        Key::Left => Some(SessionEvent::Decrement(BUS)),
        Key::Up => Some(SessionEvent::Increment(GPU)),
        Key::Down => Some(SessionEvent::Decrement(GPU)),
        Key::PageUp => Some(SessionEvent::Increment(MEM)),
        Key::PageDown => Some(SessionEvent::Decrement(MEM)),
        Key::Enter => Some(SessionEvent::Apply),
        Key::Escape | Key::Backspace => Some(SessionEvent::Cancel),
        _ => None,
    }
}

pub fn map_button(button: GilrsButton) -> Option<SessionEvent> {
    match button {
        GilrsButton::DPadRight => Some(SessionEvent::Increment(BUS)),
        GilrsButton::DPadLeft => Some(SessionEvent::Decrement(BUS)),
        GilrsButton::DPadUp => Some(SessionEvent::Increment(GPU)),
        GilrsButton::DPadDown => Some(SessionEvent::Decrement(GPU)),
        GilrsButton::RightTrigger => Some(SessionEvent::Increment(MEM)),
        GilrsButton::LeftTrigger => Some(SessionEvent::Decrement(MEM)),
        GilrsButton::Start => Some(SessionEvent::Apply),
        GilrsButton::Select => Some(SessionEvent::Cancel),
        _ => None,
    }
}

/// Gamepad event source. Button presses are edges; holds do not repeat.
pub struct Gamepad {
    gilrs: Gilrs,
}

impl Gamepad {
    /// Open the gamepad subsystem. With `require_connected`, a missing pad is
    /// an initialization failure instead of a warning.
    pub fn open(require_connected: bool) -> Result<Option<Gamepad>, InitError> {
        match Gilrs::new() {
            Ok(gilrs) => {
                let mut found = false;
                for (id, gp) in gilrs.gamepads() {
                    log::info!("gamepad [{}] \"{}\"", id, gp.name());
                    found = true;
                }
                if !found {
                    if require_connected {
                        return Err(InitError::Input("no gamepad connected".into()));
                    }
                    log::warn!("no gamepad connected (hot-plug supported), keyboard active");
                }
                Ok(Some(Gamepad { gilrs }))
            }
            Err(e) if require_connected => Err(InitError::Input(e.to_string())),
            Err(e) => {
                log::warn!("gamepad unavailable: {}", e);
                Ok(None)
            }
        }
    }

    /// Drain pending gamepad events into session events.
    pub fn poll(&mut self, out: &mut Vec<SessionEvent>) {
        while let Some(GilrsEvent { event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::ButtonPressed(b, _) => out.extend(map_button(b)),
                EventType::Connected => log::info!("gamepad connected"),
                EventType::Disconnected => log::warn!("gamepad disconnected"),
                _ => {}
            }
        }
    }
}
