//! Inbound commands from the local console.
//!
//! The physical panel has two buttons (advance, select); the console
//! adds `quit`.  Each input line is one command.

use std::str::FromStr;

use thiserror::Error;

/// A single user action read by the [`Controller`](super::session::Controller).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Highlight the next visible item.
    Advance,
    /// Activate the highlighted item.
    Select,
    /// Leave the session; all lines are switched off on the way out.
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised input '{0}' (expected advance, select or quit)")]
pub struct UnrecognisedInput(pub String);

impl FromStr for SessionCommand {
    type Err = UnrecognisedInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "advance" | "a" | "n" | "next" => Ok(Self::Advance),
            "select" | "s" | "enter" => Ok(Self::Select),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            _ => Err(UnrecognisedInput(s.trim().to_owned())),
        }
    }
}
