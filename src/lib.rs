//! # chewing-userdb
//!
//! Durable storage for user-learned phrase statistics in a phonetic input
//! method engine.
//!
//! The crate keeps one `SQLite` database per user and records, for every
//! (phonetic code, phrase) pair the user has taught the engine, the usage
//! statistics that drive candidate ranking: weighted frequency, original
//! frequency, the observed ceiling and a last-use timestamp. A shared
//! usage lifetime accumulates across sessions in a configuration table.
//!
//! ## Features
//!
//! - One compiled-once statement catalog; operations never re-parse SQL
//! - Fixed-arity phonetic codes with sentinel padding, so lookups match
//!   whole codes and never prefixes
//! - Additive lifetime persistence: interleaved sessions accumulate their
//!   deltas instead of overwriting each other
//! - Platform storage directory resolution with a `CHEWING_USER_PATH`
//!   override
//! - Best-effort teardown: close never raises, failures are logged
//!
//! ## Example
//!
//! ```rust
//! use chewing_userdb::{PhoneSeq, UserPhrase, UserphraseStore};
//!
//! # fn main() -> chewing_userdb::Result<()> {
//! let store = UserphraseStore::open_in_memory()?;
//! let code = PhoneSeq::new(&[10_268, 8_708])?;
//! store.upsert(&UserPhrase::new(code, "測試", 1, 1, 1, 1))?;
//! assert_eq!(store.lookup_by_code(&code)?.len(), 1);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
// Cannot be moved to function level. Current duplicates: criterion transitive deps.
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;

use thiserror::Error as ThisError;

// Module declarations
pub mod models;
pub mod storage;

// Re-exports for convenience
pub use models::{MAX_PHONE_SEQ_LEN, PHONE_NONE, PhoneSeq, UserPhrase};
pub use storage::UserphraseStore;

/// Error type for user phrase store operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait
/// implementations. Variants that wrap an engine failure expose the result
/// code through [`Error::sqlite_code`].
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed phone sequences, corrupt stored rows |
/// | `LocationUnavailable` | No usable storage directory can be resolved |
/// | `EngineOpen` | The database file cannot be opened or created |
/// | `Schema` | Engine configuration or table creation fails |
/// | `StatementCompile` | A catalog template does not compile |
/// | `Bind` | A parameter value is rejected by the engine |
/// | `Step` | Statement execution or row decoding fails |
/// | `Persist` | The lifetime delta cannot be written at teardown |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A phone sequence is empty, too long or has an embedded sentinel
    /// - A stored row decodes to an out-of-range phone count
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No usable storage directory could be resolved.
    ///
    /// Raised when:
    /// - The platform data directory cannot be created
    /// - An explicitly requested directory cannot be created
    #[error("user data directory unavailable: {cause}")]
    LocationUnavailable {
        /// Why resolution failed.
        cause: String,
    },

    /// The database file could not be opened.
    #[error("cannot open user phrase database {}: {source}", path.display())]
    EngineOpen {
        /// The file the engine was asked to open.
        path: PathBuf,
        /// The engine failure.
        source: rusqlite::Error,
    },

    /// Engine configuration or table creation failed.
    #[error("schema setup failed: {source}")]
    Schema {
        /// The engine failure.
        source: rusqlite::Error,
    },

    /// A catalog template failed to compile.
    #[error("statement '{statement}' failed to compile: {source}")]
    StatementCompile {
        /// Name of the failing template.
        statement: &'static str,
        /// The engine failure.
        source: rusqlite::Error,
    },

    /// A parameter value was rejected by the engine.
    #[error("cannot bind {slot}: {source}")]
    Bind {
        /// Name of the slot being bound.
        slot: &'static str,
        /// The engine failure.
        source: rusqlite::Error,
    },

    /// Statement execution or row decoding failed.
    #[error("statement execution failed: {source}")]
    Step {
        /// The engine failure.
        source: rusqlite::Error,
    },

    /// The lifetime delta could not be written at teardown.
    ///
    /// Teardown treats this as best-effort: the session logs the failure
    /// and closes anyway, losing only the in-memory delta.
    #[error("lifetime persistence failed: {source}")]
    Persist {
        /// The engine failure.
        source: rusqlite::Error,
    },
}

impl Error {
    /// The engine result code behind this error, when one exists.
    #[must_use]
    pub fn sqlite_code(&self) -> Option<rusqlite::ErrorCode> {
        let source = match self {
            Self::EngineOpen { source, .. }
            | Self::Schema { source }
            | Self::StatementCompile { source, .. }
            | Self::Bind { source, .. }
            | Self::Step { source }
            | Self::Persist { source } => source,
            Self::InvalidInput(_) | Self::LocationUnavailable { .. } => return None,
        };
        match source {
            rusqlite::Error::SqliteFailure(error, _) => Some(error.code),
            _ => None,
        }
    }
}

/// Result type alias for user phrase store operations.
pub type Result<T> = std::result::Result<T, Error>;
