//! Error types.
//!
//! A hung console is not an error this crate can observe. Everything here
//! is raised strictly before the first hardware mutation.

use crate::registers::RegisterLayout;

/// A coefficient does not fit the register field it is destined for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("{field} = {value} does not fit the {bits}-bit field of the {layout:?} register")]
    FieldOverflow {
        layout: RegisterLayout,
        field: &'static str,
        value: u32,
        bits: u32,
    },
    #[error("divisor M = {value} is not 1, 2 or 4 in the {layout:?} register")]
    Divisor {
        layout: RegisterLayout,
        value: u8,
    },
}

/// Commit abandoned during planning. No register was touched; the console
/// is still rebooted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("cannot encode {domain} coefficients: {source}")]
    Encode {
        domain: &'static str,
        #[source]
        source: CodecError,
    },
}

/// Register image file could not be read or written.
#[derive(Debug, thiserror::Error)]
pub enum RegDumpError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("file too small ({0} bytes)")]
    TooSmall(usize),
    #[error("invalid register image (bad magic)")]
    BadMagic,
    #[error("unsupported register image version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("unknown console revision marker {0}")]
    Revision(u8),
    #[error("decompress error: {0}")]
    Decompress(String),
    #[error("serialization error: {0}")]
    Serde(#[from] bincode::Error),
}

/// Startup failure; reported to the operator, then the process exits
/// with a non-zero status without touching the hardware.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("input device unavailable: {0}")]
    Input(String),
    #[error("display unavailable: {0}")]
    Display(String),
    #[error("register image: {0}")]
    RegisterImage(#[from] RegDumpError),
    #[error("backend `{0}` is not available in this build")]
    Backend(String),
}
