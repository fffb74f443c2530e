//! Error types for the VM translator.
//!
//! Same hand-rolled shape as [`hackasm::error`]: no `thiserror`/`anyhow`, a
//! manual `Display`/`Error` impl, and a `From<std::io::Error>` for the CLI
//! front end's `?` plumbing.

use std::fmt;

use hackasm::AssemblerError;

/// A hard error: translation cannot continue.
#[derive(Debug)]
pub enum TranslatorError {
    /// Unknown opcode, malformed line, unparseable numeric index.
    Syntax(String),
    /// `$this`-equivalent use of a label outside a function, invalid symbol.
    Name(String),
    /// Segment index out of range, direct-segment op outside the extended
    /// profile, or any other structurally valid but meaningless construct.
    Semantic(String),
    /// Wraps file I/O failures from the CLI binary.
    Io(std::io::Error),
}

impl std::error::Error for TranslatorError {}

impl fmt::Display for TranslatorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Syntax(m) => write!(f, "syntax error: {m}"),
            Self::Name(m) => write!(f, "name error: {m}"),
            Self::Semantic(m) => write!(f, "semantic error: {m}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl From<std::io::Error> for TranslatorError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

/// `push constant SCREEN`-style names are resolved through `hackasm`'s own
/// predefined-symbol table, so its error kind needs to fold into ours.
impl From<AssemblerError> for TranslatorError {
    fn from(error: AssemblerError) -> Self {
        match error {
            AssemblerError::Syntax(m) => Self::Syntax(m),
            AssemblerError::Name(m) => Self::Name(m),
            AssemblerError::Semantic(m) => Self::Semantic(m),
            AssemblerError::Io(e) => Self::Io(e),
        }
    }
}
