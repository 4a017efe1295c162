//! Console clock retuning frontend.
//!
//! Provides two execution modes:
//!
//! - **GUI mode** (default): gauge window, gamepad input with keyboard
//!   fallback, status block on every accepted edit.
//! - **Headless mode** (`--headless --script fsb+,fsb+,apply`): runs a fixed
//!   event list and prints each status block. Used for dry runs and CI.
//!
//! The simulated console is the default backend. The `native` backend exists
//! only in builds for the console itself (`--features native`).

mod input;
mod view;

use clap::{Parser, ValueEnum};
use clocktune_core::error::InitError;
use clocktune_core::platform::Platform;
use clocktune_core::{regdump, AdjustmentSession, SessionEvent, SessionOutcome, SimulatedConsole, TuneConfig};
use minifb::{KeyRepeat, Window, WindowOptions, Scale, ScaleMode};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

const WARNING: &str = "\
It's possible for this tool to cause irreparable harm to your console.
Once the clock is set the machine reboots to the dashboard. If you do not see
\"SET\" the box has frozen: power-cycle it and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// In-memory console, nothing real is touched
    Sim,
    /// The console this program is running on
    Native,
}

#[derive(Parser, Debug)]
#[command(name = "clocktune", version, about = "Retune console bus, memory and graphics clocks")]
struct Cli {
    #[arg(long, value_enum, default_value_t = Backend::Sim)]
    backend: Backend,
    /// Start the simulated console from this register image
    #[arg(long)]
    regs: Option<PathBuf>,
    /// Write the simulated console's registers here after a commit
    #[arg(long)]
    save_regs: Option<PathBuf>,
    /// Run without a window
    #[arg(long)]
    headless: bool,
    /// Comma-separated events for headless mode (fsb±, gpu±, mem±, apply, cancel)
    #[arg(long, value_delimiter = ',', value_parser = input::parse_event)]
    script: Vec<SessionEvent>,
    /// Settle delay around every PLL store, in milliseconds
    #[arg(long, default_value_t = 500)]
    settle_ms: u64,
    /// Really sleep on the simulated console's settle delays
    #[arg(long)]
    realtime: bool,
    /// Fail at startup if no gamepad is connected
    #[arg(long)]
    require_gamepad: bool,
    /// How long a startup failure stays on screen before exiting
    #[arg(long, default_value_t = 2000)]
    fail_delay_ms: u64,
    #[arg(long)]
    debug: bool,
}

/// How the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Committed,
    Abandoned,
    Cancelled,
}

impl Ending {
    fn exit_code(self) -> ExitCode {
        match self {
            Ending::Committed | Ending::Cancelled => ExitCode::SUCCESS,
            Ending::Abandoned => ExitCode::from(2),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    println!("{}\n", WARNING);

    match run(&cli) {
        Ok(ending) => ending.exit_code(),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::thread::sleep(Duration::from_millis(cli.fail_delay_ms));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<Ending, InitError> {
    let config = TuneConfig::default().with_settle(Duration::from_millis(cli.settle_ms));
    match cli.backend {
        Backend::Sim => {
            let mut console = match &cli.regs {
                Some(path) => SimulatedConsole::from_image(&regdump::load_from_file(path)?),
                None => SimulatedConsole::retail(),
            };
            console.realtime = cli.realtime;
            let mut session = AdjustmentSession::start(console, config);
            let ending = drive(&mut session, cli)?;
            if ending == Ending::Committed {
                if let Some(path) = &cli.save_regs {
                    let image = session.platform().image();
                    match regdump::save_to_file(&image, path) {
                        Ok(()) => log::info!("registers saved to {}", path.display()),
                        Err(e) => log::error!("{}: {}", path.display(), e),
                    }
                }
            }
            Ok(ending)
        }
        Backend::Native => run_native(cli, config),
    }
}

#[cfg(all(feature = "native", target_arch = "x86"))]
fn run_native(cli: &Cli, config: TuneConfig) -> Result<Ending, InitError> {
    // SAFETY: single instance, the title owns the console.
    let console = unsafe { clocktune_core::platform::native::NativeConsole::new() };
    let mut session = AdjustmentSession::start(console, config);
    drive(&mut session, cli)
}

#[cfg(not(all(feature = "native", target_arch = "x86")))]
fn run_native(_cli: &Cli, _config: TuneConfig) -> Result<Ending, InitError> {
    Err(InitError::Backend("native".into()))
}

fn drive<P: Platform>(session: &mut AdjustmentSession<P>, cli: &Cli) -> Result<Ending, InitError> {
    if cli.headless {
        Ok(run_headless(session, &cli.script))
    } else {
        run_gui(session, cli.require_gamepad)
    }
}

/// Feed one event to the session. `Some` once the session is over.
fn dispatch<P: Platform>(session: &mut AdjustmentSession<P>, event: SessionEvent) -> Option<Ending> {
    match session.handle(event) {
        SessionOutcome::Redraw(status) => {
            println!("{}\n", status);
            None
        }
        SessionOutcome::Unchanged | SessionOutcome::Ignored => None,
        SessionOutcome::Committed(Ok(result)) => {
            for w in &result.writes {
                println!("{:?}: {:08X} -> {:08X}", w.step, w.before, w.after);
            }
            println!("\nSET");
            Some(Ending::Committed)
        }
        SessionOutcome::Committed(Err(e)) => {
            eprintln!("Not applied: {}", e);
            Some(Ending::Abandoned)
        }
        SessionOutcome::Cancelled => Some(Ending::Cancelled),
    }
}

// ─── Headless Mode ──────────────────────────────────────────────────────────

fn run_headless<P: Platform>(session: &mut AdjustmentSession<P>, script: &[SessionEvent]) -> Ending {
    println!("{}\n", session.status());
    for &event in script {
        if let Some(ending) = dispatch(session, event) {
            return ending;
        }
    }
    log::info!("script ended without apply");
    dispatch(session, SessionEvent::Cancel).unwrap_or(Ending::Cancelled)
}

// ─── GUI Mode ───────────────────────────────────────────────────────────────

fn run_gui<P: Platform>(session: &mut AdjustmentSession<P>, require_gamepad: bool) -> Result<Ending, InitError> {
    let mut gamepad = input::Gamepad::open(require_gamepad)?;

    let mut window = Window::new(
        "clocktune", view::WIDTH, view::HEIGHT,
        WindowOptions { scale: Scale::X4, scale_mode: ScaleMode::AspectRatioStretch, resize: true, ..Default::default() },
    ).map_err(|e| InitError::Display(e.to_string()))?;
    window.set_target_fps(30);

    println!("D-pad/arrows: left/right FSB, up/down GPU; LB/RB or PgDn/PgUp: memory divider");
    println!("Start/Enter: apply (reboots). Back/Esc: exit.\n");
    println!("{}\n", session.status());

    let mut buf = vec![0u32; view::WIDTH * view::HEIGHT];
    let mut events = Vec::new();
    let mut title = String::new();

    while window.is_open() {
        events.clear();
        if let Some(gp) = gamepad.as_mut() {
            gp.poll(&mut events);
        }
        events.extend(window.get_keys_pressed(KeyRepeat::No).into_iter().filter_map(input::map_key));

        for &event in &events {
            if let Some(ending) = dispatch(session, event) {
                return Ok(ending);
            }
        }

        let line = view::status_line(&session.status());
        if line != title {
            window.set_title(&line);
            title = line;
        }
        view::render(session.model(), &mut buf);
        window
            .update_with_buffer(&buf, view::WIDTH, view::HEIGHT)
            .map_err(|e| InitError::Display(e.to_string()))?;
    }

    Ok(dispatch(session, SessionEvent::Cancel).unwrap_or(Ending::Cancelled))
}
