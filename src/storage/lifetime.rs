//! Accumulated usage lifetime stored in the configuration table.
//!
//! The lifetime is a single monotonically meaningful scalar shared by every
//! session that opens the same database. Each session loads it at startup,
//! advances a private copy in memory, and at teardown adds only its net
//! delta back, so concurrent or crashed sessions never clobber each other's
//! contribution.

use rusqlite::Connection;

use crate::storage::catalog::{self, ConfigStatementId, config_slot};
use crate::{Error, Result};

/// Identifier of the lifetime scalar in the configuration table.
pub(crate) const CONFIG_ID_LIFETIME: i64 = 0;

/// In-memory view of the accumulated usage lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifetimeState {
    original: i64,
    current: i64,
}

impl LifetimeState {
    /// Current lifetime value, including this session's advances.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.current
    }

    /// Net change accumulated by this session so far.
    #[must_use]
    pub const fn delta(self) -> i64 {
        self.current - self.original
    }

    /// Replaces the current value; the persisted delta follows it.
    pub const fn advance(&mut self, value: i64) {
        self.current = value;
    }
}

/// Loads the lifetime scalar, bootstrapping it to zero on first run.
///
/// # Errors
///
/// Returns [`Error::StatementCompile`], [`Error::Bind`] or [`Error::Step`]
/// when the configuration table cannot be read.
pub(crate) fn load(conn: &Connection) -> Result<LifetimeState> {
    // Seed the row so a fresh database reads zero instead of no-rows.
    let put = ConfigStatementId::Put;
    let mut stmt = catalog::config_statement(conn, put)?;
    catalog::bind_slot(&mut stmt, put.template(), config_slot::ID, CONFIG_ID_LIFETIME)?;
    catalog::bind_slot(&mut stmt, put.template(), config_slot::VALUE, 0_i64)?;
    stmt.raw_execute().map_err(|e| Error::Step { source: e })?;
    drop(stmt);

    let get = ConfigStatementId::Get;
    let mut stmt = catalog::config_statement(conn, get)?;
    catalog::bind_slot(&mut stmt, get.template(), config_slot::ID, CONFIG_ID_LIFETIME)?;
    let mut rows = stmt.raw_query();
    let row = rows
        .next()
        .map_err(|e| Error::Step { source: e })?
        .ok_or_else(|| Error::Step {
            source: rusqlite::Error::QueryReturnedNoRows,
        })?;
    let value: i64 = catalog::read_slot(row, get.template(), config_slot::VALUE)?;

    tracing::debug!(lifetime = value, "loaded lifetime");
    Ok(LifetimeState {
        original: value,
        current: value,
    })
}

/// Adds this session's delta onto the stored lifetime scalar.
///
/// The addition runs in place, so sessions that interleave on the same
/// database accumulate rather than overwrite.
///
/// # Errors
///
/// Returns [`Error::Persist`] when the update cannot run to completion.
pub(crate) fn persist(conn: &Connection, state: LifetimeState) -> Result<()> {
    let delta = state.delta();
    let template = ConfigStatementId::Increment.template();
    let mut stmt = conn
        .prepare_cached(template.sql)
        .map_err(|e| Error::Persist { source: e })?;
    if let Some(index) = template.placeholder(config_slot::ID) {
        stmt.raw_bind_parameter(index, CONFIG_ID_LIFETIME)
            .map_err(|e| Error::Persist { source: e })?;
    }
    if let Some(index) = template.placeholder(config_slot::VALUE) {
        stmt.raw_bind_parameter(index, delta)
            .map_err(|e| Error::Persist { source: e })?;
    }
    let changed = stmt.raw_execute().map_err(|e| Error::Persist { source: e })?;

    tracing::debug!(delta, changed, "persisted lifetime delta");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::connection::open_memory_database;
    use crate::storage::schema;

    fn prepared_connection() -> Connection {
        let conn = open_memory_database().unwrap();
        schema::ensure_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_load_bootstraps_zero_on_fresh_database() {
        let conn = prepared_connection();
        let state = load(&conn).unwrap();
        assert_eq!(state.value(), 0);
        assert_eq!(state.delta(), 0);
    }

    #[test]
    fn test_advance_moves_value_and_delta() {
        let conn = prepared_connection();
        let mut state = load(&conn).unwrap();
        state.advance(7);
        assert_eq!(state.value(), 7);
        assert_eq!(state.delta(), 7);
    }

    #[test]
    fn test_persist_then_reload_round_trips() {
        let conn = prepared_connection();
        let mut state = load(&conn).unwrap();
        state.advance(5);
        persist(&conn, state).unwrap();

        let reloaded = load(&conn).unwrap();
        assert_eq!(reloaded.value(), 5);
        assert_eq!(reloaded.delta(), 0);
    }

    #[test]
    fn test_persist_zero_delta_keeps_value() {
        let conn = prepared_connection();
        let mut state = load(&conn).unwrap();
        state.advance(9);
        persist(&conn, state).unwrap();

        let untouched = load(&conn).unwrap();
        persist(&conn, untouched).unwrap();
        assert_eq!(load(&conn).unwrap().value(), 9);
    }

    #[test]
    fn test_deltas_accumulate_across_sessions() {
        let conn = prepared_connection();

        let mut first = load(&conn).unwrap();
        first.advance(5);

        // A second session starts before the first persists.
        let mut second = load(&conn).unwrap();
        second.advance(3);

        persist(&conn, first).unwrap();
        persist(&conn, second).unwrap();

        // 0 + (5 - 0) + (3 - 0) survives both teardowns.
        assert_eq!(load(&conn).unwrap().value(), 8);
    }
}
