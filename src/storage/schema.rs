//! Schema management for the user phrase database.
//!
//! The two relations are versioned (`*_v1`) and created idempotently;
//! existing data is never dropped or altered here.

use rusqlite::Connection;

use crate::models::MAX_PHONE_SEQ_LEN;
use crate::{Error, Result};

// The primary key bakes the phone-slot arity into `userphrase_v1`; a
// different arity needs a `userphrase_v2`, not new columns.
const _: () = assert!(MAX_PHONE_SEQ_LEN == 11);

/// User phrase relation name.
pub(crate) const USERPHRASE_TABLE: &str = "userphrase_v1";

/// Scalar configuration relation name.
pub(crate) const CONFIG_TABLE: &str = "config_v1";

const CREATE_USERPHRASE_TABLE: &str = "CREATE TABLE IF NOT EXISTS userphrase_v1 (\
     time INTEGER, \
     user_freq INTEGER, \
     max_freq INTEGER, \
     orig_freq INTEGER, \
     length INTEGER, \
     phone_0 INTEGER, \
     phone_1 INTEGER, \
     phone_2 INTEGER, \
     phone_3 INTEGER, \
     phone_4 INTEGER, \
     phone_5 INTEGER, \
     phone_6 INTEGER, \
     phone_7 INTEGER, \
     phone_8 INTEGER, \
     phone_9 INTEGER, \
     phone_10 INTEGER, \
     phrase TEXT, \
     PRIMARY KEY (\
     phone_0, phone_1, phone_2, phone_3, phone_4, phone_5, \
     phone_6, phone_7, phone_8, phone_9, phone_10, phrase))";

const CREATE_CONFIG_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS config_v1 (id INTEGER, value INTEGER, PRIMARY KEY (id))";

/// Applies the engine durability trade-off for this store.
///
/// Synchronous fsync-per-write is disabled: the store is a cache of learned
/// preferences, and write throughput is worth losing the last writes on a
/// crash.
///
/// # Errors
///
/// Returns [`Error::Schema`] when the pragma cannot be applied; the session
/// must treat this as fatal.
pub(crate) fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "synchronous", "OFF")
        .map_err(|e| Error::Schema { source: e })
}

/// Idempotently creates the user phrase and configuration relations.
///
/// # Errors
///
/// Returns [`Error::Schema`] on any DDL failure; the session must treat
/// this as fatal.
pub(crate) fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_USERPHRASE_TABLE)
        .map_err(|e| Error::Schema { source: e })?;
    conn.execute_batch(CREATE_CONFIG_TABLE)
        .map_err(|e| Error::Schema { source: e })?;
    tracing::debug!(tables = ?[USERPHRASE_TABLE, CONFIG_TABLE], "schema ensured");
    Ok(())
}
