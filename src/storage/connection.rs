//! Engine handle management for the user phrase database.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::storage::location::DB_FILENAME;
use crate::{Error, Result};

/// Opens (creating if absent) the database file inside `dir`.
///
/// The full path is always `dir/`[`DB_FILENAME`]; the resolved path is
/// returned alongside the handle for diagnostics.
///
/// # Errors
///
/// Returns [`Error::EngineOpen`] when the engine cannot open or create the
/// file; the caller must not proceed to schema or statement setup.
pub(crate) fn open_database(dir: &Path) -> Result<(Connection, PathBuf)> {
    let path = dir.join(DB_FILENAME);
    let conn = Connection::open(&path).map_err(|e| Error::EngineOpen {
        path: path.clone(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), "opened user phrase database");
    Ok((conn, path))
}

/// Opens a private in-memory database, used by tests and benchmarks.
///
/// # Errors
///
/// Returns [`Error::EngineOpen`] when the engine cannot allocate the
/// in-memory store.
pub(crate) fn open_memory_database() -> Result<Connection> {
    Connection::open_in_memory().map_err(|e| Error::EngineOpen {
        path: PathBuf::from(":memory:"),
        source: e,
    })
}
