//! Unified error types for the Barbot controller.
//!
//! One enum per failure domain, plus an umbrella [`Error`] that every
//! subsystem converts into so the session controller's error handling
//! stays uniform.  Only [`ConfigError`] is fatal, and only at startup.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Configuration errors (fatal at startup)
// ---------------------------------------------------------------------------

/// The persisted pump configuration, recipe catalog, or controller config
/// could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No file at the configured path.
    #[error("configuration not found: {path}")]
    NotFound { path: PathBuf },

    /// The file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or does not match the expected shape
    /// (e.g. a slot without an integer `pin`).
    #[error("malformed configuration in {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// A value failed range or consistency validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Persistence errors (recoverable)
// ---------------------------------------------------------------------------

/// Writing the pump configuration back to durable storage failed.  The
/// registry rolls its in-memory state back before surfacing this.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("write to {path} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding pump configuration failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The store refused the write without an OS error.
    #[error("store rejected write: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// Transport errors (recoverable, retried by the remote loop)
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("fetching commands failed: {0}")]
    Fetch(String),

    #[error("marking command {id} consumed failed: {reason}")]
    MarkConsumed { id: String, reason: String },

    #[error("sending confirmation failed: {0}")]
    Send(String),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Non-fatal dispense / command conditions
// ---------------------------------------------------------------------------

/// A recipe ingredient had no pump assigned to it.  The ingredient is
/// skipped; the rest of the recipe is still poured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no pump assigned to ingredient '{ingredient}'")]
pub struct UnresolvedIngredient {
    pub ingredient: String,
}

/// A remote command named a drink the catalog does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown drink '{text}' in command {id}")]
pub struct UnknownCommand {
    pub id: String,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("persistence: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    UnknownCommand(#[from] UnknownCommand),

    /// `assign` named a slot that is not part of the fixed topology.
    #[error("unknown pump slot '{0}'")]
    UnknownSlot(String),

    #[error("unknown recipe '{0}'")]
    UnknownRecipe(String),

    /// A dispense is already in flight.
    #[error("dispenser busy: a job is already running")]
    Busy,

    /// The emergency stop has been engaged; no new jobs are accepted.
    #[error("emergency stop engaged")]
    EmergencyStopped,
}

/// Controller-wide `Result` alias.
pub type Result<T> = std::result::Result<T, Error>;
