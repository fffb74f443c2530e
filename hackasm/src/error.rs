//! Error and warning types for the assembler.
//!
//! No `thiserror`/`anyhow` here, matching the rest of this crate: a hand-rolled
//! enum with a manual `Display`/`Error` impl, same shape as [`crate::parser::ParserError`].

use std::fmt;

/// A recoverable condition: doesn't stop assembly, but is worth surfacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A numeric literal didn't fit in 15 bits and was masked.
    Range(String),
    /// `$_`-generated label collided in a way hygiene should have prevented.
    Hygiene(String),
    /// A user-defined symbol was never referenced by an A-instruction.
    UnusedSymbol(String),
    /// The program has no instructions, or doesn't end in a jump.
    Structural(String),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Range(m) | Self::Hygiene(m) | Self::UnusedSymbol(m) | Self::Structural(m) => {
                write!(f, "{m}")
            }
        }
    }
}

/// A hard error: assembly cannot continue.
#[derive(Debug)]
pub enum AssemblerError {
    /// Malformed token, unknown macro, `$this` used outside a block, etc.
    Syntax(String),
    /// Unknown label, or a label redefined within one resolve pass.
    Name(String),
    /// Structurally valid but semantically invalid (e.g. `W` outside the
    /// extended profile, or `W`/`M` used together in one computation).
    Semantic(String),
    /// Wraps file I/O failures from the CLI binary.
    Io(std::io::Error),
}

impl std::error::Error for AssemblerError {}

impl fmt::Display for AssemblerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Syntax(m) => write!(f, "syntax error: {m}"),
            Self::Name(m) => write!(f, "name error: {m}"),
            Self::Semantic(m) => write!(f, "semantic error: {m}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl From<std::io::Error> for AssemblerError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}
