//! The user phrase store session object.
//!
//! A [`UserphraseStore`] owns one database connection for the lifetime of
//! an input session. Opening runs the full startup sequence: locate the
//! storage directory, open the engine, configure it, ensure the schema and
//! compile the statement catalog, then load the accumulated lifetime. Any
//! failure along the way abandons the partially initialized connection.
//! Teardown persists the lifetime delta best-effort and never raises.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rusqlite::Connection;
use tracing::instrument;

use crate::models::{MAX_PHONE_SEQ_LEN, PHONE_NONE, PhoneSeq, UserPhrase};
use crate::storage::catalog::{self, PhraseStatementId, slot};
use crate::storage::lifetime::{self, LifetimeState};
use crate::storage::metrics::record_operation_metrics;
use crate::storage::{connection, location, schema};
use crate::{Error, Result};

/// Single-session handle to the user phrase database.
///
/// The store is [`Send`] but deliberately not [`Sync`]; the engine is asked
/// for one connection and callers serialize access by owning the value.
pub struct UserphraseStore {
    conn: Connection,
    db_path: Option<PathBuf>,
    lifetime: LifetimeState,
    closed: bool,
}

impl UserphraseStore {
    /// Opens the store in the per-user storage directory.
    ///
    /// The directory comes from the `CHEWING_USER_PATH` override when that
    /// points at a writable directory, otherwise from the platform data
    /// directory, created on demand.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocationUnavailable`] when no directory can be
    /// resolved, [`Error::EngineOpen`] when the database cannot be opened,
    /// or a schema, compile or step error from session startup.
    pub fn open() -> Result<Self> {
        let dir = location::resolve_default()?;
        let (conn, db_path) = connection::open_database(&dir)?;
        Self::init(conn, Some(db_path))
    }

    /// Opens the store in `dir`, creating the directory if missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocationUnavailable`] when the directory cannot be
    /// created, or any session startup error.
    pub fn open_in_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| Error::LocationUnavailable {
            cause: format!("cannot create {}: {e}", dir.display()),
        })?;
        let (conn, db_path) = connection::open_database(dir)?;
        Self::init(conn, Some(db_path))
    }

    /// Opens an in-memory store that vanishes on close.
    ///
    /// # Errors
    ///
    /// Returns any session startup error.
    pub fn open_in_memory() -> Result<Self> {
        let conn = connection::open_memory_database()?;
        Self::init(conn, None)
    }

    /// Runs the startup sequence on a fresh connection.
    ///
    /// Startup is all-or-nothing: on any failure the connection is dropped,
    /// which closes the engine, and the error propagates.
    fn init(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        let start = Instant::now();
        let result = (|| {
            schema::configure(&conn)?;
            schema::ensure_schema(&conn)?;
            catalog::compile_all(&conn)?;
            lifetime::load(&conn)
        })();
        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("open", start, status);

        let lifetime = result?;
        tracing::debug!(path = ?db_path, lifetime = lifetime.value(), "user phrase store ready");
        Ok(Self {
            conn,
            db_path,
            lifetime,
            closed: false,
        })
    }

    /// Path of the backing database file, `None` for in-memory stores.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// All phrases recorded for `code`, in engine order.
    ///
    /// A code matches only records stored with the same phone count;
    /// sentinel padding keeps shorter codes from matching longer ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StatementCompile`], [`Error::Bind`] or
    /// [`Error::Step`] when the query cannot run.
    #[instrument(skip(self), fields(operation = "lookup_by_code", code.len = code.len()))]
    pub fn lookup_by_code(&self, code: &PhoneSeq) -> Result<Vec<UserPhrase>> {
        let start = Instant::now();
        let result = (|| {
            let id = PhraseStatementId::SelectByCode;
            let template = id.template();
            let mut stmt = catalog::phrase_statement(&self.conn, id)?;
            catalog::bind_code(&mut stmt, template, code)?;

            let mut rows = stmt.raw_query();
            let mut phrases = Vec::new();
            while let Some(row) = rows.next().map_err(|e| Error::Step { source: e })? {
                phrases.push(UserPhrase {
                    code: *code,
                    phrase: catalog::read_slot(row, template, slot::PHRASE)?,
                    time: catalog::read_slot(row, template, slot::TIME)?,
                    orig_freq: catalog::read_slot(row, template, slot::ORIG_FREQ)?,
                    max_freq: catalog::read_slot(row, template, slot::MAX_FREQ)?,
                    user_freq: catalog::read_slot(row, template, slot::USER_FREQ)?,
                });
            }
            Ok(phrases)
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("lookup_by_code", start, status);
        result
    }

    /// The record stored under the exact (code, phrase) key, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StatementCompile`], [`Error::Bind`] or
    /// [`Error::Step`] when the query cannot run.
    #[instrument(skip(self), fields(operation = "lookup_exact", code.len = code.len(), phrase = %phrase))]
    pub fn lookup_exact(&self, code: &PhoneSeq, phrase: &str) -> Result<Option<UserPhrase>> {
        let start = Instant::now();
        let result = (|| {
            let id = PhraseStatementId::SelectByCodeAndPhrase;
            let template = id.template();
            let mut stmt = catalog::phrase_statement(&self.conn, id)?;
            catalog::bind_key(&mut stmt, template, code, phrase)?;

            let mut rows = stmt.raw_query();
            let Some(row) = rows.next().map_err(|e| Error::Step { source: e })? else {
                return Ok(None);
            };
            Ok(Some(UserPhrase {
                code: *code,
                phrase: phrase.to_string(),
                time: catalog::read_slot(row, template, slot::TIME)?,
                orig_freq: catalog::read_slot(row, template, slot::ORIG_FREQ)?,
                max_freq: catalog::read_slot(row, template, slot::MAX_FREQ)?,
                user_freq: catalog::read_slot(row, template, slot::USER_FREQ)?,
            }))
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("lookup_exact", start, status);
        result
    }

    /// Inserts `record`, replacing any record under the same key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StatementCompile`], [`Error::Bind`] or
    /// [`Error::Step`] when the write cannot run.
    #[instrument(
        skip(self, record),
        fields(operation = "upsert", code.len = record.code.len(), phrase = %record.phrase)
    )]
    pub fn upsert(&self, record: &UserPhrase) -> Result<()> {
        let start = Instant::now();
        let result = (|| {
            let id = PhraseStatementId::Upsert;
            let template = id.template();
            let mut stmt = catalog::phrase_statement(&self.conn, id)?;
            catalog::bind_slot(&mut stmt, template, slot::TIME, record.time)?;
            catalog::bind_slot(&mut stmt, template, slot::ORIG_FREQ, record.orig_freq)?;
            catalog::bind_slot(&mut stmt, template, slot::MAX_FREQ, record.max_freq)?;
            catalog::bind_slot(&mut stmt, template, slot::USER_FREQ, record.user_freq)?;
            catalog::bind_key(&mut stmt, template, &record.code, &record.phrase)?;

            let changed = stmt.raw_execute().map_err(|e| Error::Step { source: e })?;
            tracing::trace!(changed, "upserted user phrase");
            Ok(())
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("upsert", start, status);
        result
    }

    /// Removes the record under the exact (code, phrase) key.
    ///
    /// Deleting an absent record is not an error; the engine reports zero
    /// affected rows and the call succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StatementCompile`], [`Error::Bind`] or
    /// [`Error::Step`] when the delete cannot run.
    #[instrument(skip(self), fields(operation = "delete", code.len = code.len(), phrase = %phrase))]
    pub fn delete(&self, code: &PhoneSeq, phrase: &str) -> Result<()> {
        let start = Instant::now();
        let result = (|| {
            let id = PhraseStatementId::Delete;
            let template = id.template();
            let mut stmt = catalog::phrase_statement(&self.conn, id)?;
            catalog::bind_key(&mut stmt, template, code, phrase)?;

            let changed = stmt.raw_execute().map_err(|e| Error::Step { source: e })?;
            tracing::trace!(changed, "deleted user phrase");
            Ok(())
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("delete", start, status);
        result
    }

    /// Highest weighted frequency among phrases stored under `code`.
    ///
    /// Returns `None` when no phrase is stored for the code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StatementCompile`], [`Error::Bind`] or
    /// [`Error::Step`] when the query cannot run.
    #[instrument(skip(self), fields(operation = "max_user_freq", code.len = code.len()))]
    pub fn max_user_freq(&self, code: &PhoneSeq) -> Result<Option<i64>> {
        let start = Instant::now();
        let result = (|| {
            let id = PhraseStatementId::MaxUserFreqByCode;
            let template = id.template();
            let mut stmt = catalog::phrase_statement(&self.conn, id)?;
            catalog::bind_code(&mut stmt, template, code)?;

            let mut rows = stmt.raw_query();
            let Some(row) = rows.next().map_err(|e| Error::Step { source: e })? else {
                return Ok(None);
            };
            // The aggregate always yields one row; an empty group reads NULL.
            catalog::read_slot(row, template, slot::USER_FREQ)
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("max_user_freq", start, status);
        result
    }

    /// Every stored (code, phrase) key, in engine order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Step`] when the scan cannot run, or
    /// [`Error::InvalidInput`] when a stored row does not decode to a valid
    /// phone sequence.
    #[instrument(skip(self), fields(operation = "enumerate"))]
    pub fn enumerate(&self) -> Result<Vec<(PhoneSeq, String)>> {
        let start = Instant::now();
        let result = (|| {
            let id = PhraseStatementId::SelectAll;
            let template = id.template();
            let mut stmt = catalog::phrase_statement(&self.conn, id)?;

            let mut rows = stmt.raw_query();
            let mut entries = Vec::new();
            while let Some(row) = rows.next().map_err(|e| Error::Step { source: e })? {
                let stored: i64 = catalog::read_slot(row, template, slot::LENGTH)?;
                let length = usize::try_from(stored)
                    .ok()
                    .filter(|len| (1..=MAX_PHONE_SEQ_LEN).contains(len))
                    .ok_or_else(|| {
                        Error::InvalidInput(format!("stored phrase length {stored} is out of range"))
                    })?;

                let mut phones = [PHONE_NONE; MAX_PHONE_SEQ_LEN];
                for (index, phone) in phones.iter_mut().enumerate() {
                    *phone = catalog::read_slot(row, template, slot::phone(index))?;
                }
                let code = PhoneSeq::new(&phones[..length])?;
                let phrase: String = catalog::read_slot(row, template, slot::PHRASE)?;
                entries.push((code, phrase));
            }
            Ok(entries)
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("enumerate", start, status);
        result
    }

    /// Accumulated usage lifetime, including this session's advances.
    #[must_use]
    pub const fn lifetime(&self) -> i64 {
        self.lifetime.value()
    }

    /// Moves the in-memory lifetime to `value`.
    ///
    /// Only the net change from the loaded value reaches the database, at
    /// [`close`](Self::close) or drop.
    pub const fn advance_lifetime(&mut self, value: i64) {
        self.lifetime.advance(value);
    }

    /// Persists the lifetime delta and closes the session.
    ///
    /// Dropping the store does the same; `close` only makes the teardown
    /// explicit. Persistence failures are logged, never raised.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let start = Instant::now();
        let result = lifetime::persist(&self.conn, self.lifetime);
        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("close", start, status);
        if let Err(error) = result {
            tracing::warn!(%error, "failed to persist lifetime at close");
        }
        self.conn.flush_prepared_statement_cache();
    }
}

impl Drop for UserphraseStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> UserphraseStore {
        UserphraseStore::open_in_memory().unwrap()
    }

    fn sample_record(phones: &[u16], phrase: &str) -> UserPhrase {
        UserPhrase::new(PhoneSeq::new(phones).unwrap(), phrase, 42, 1, 1, 1)
    }

    #[test]
    fn test_store_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<UserphraseStore>();
    }

    #[test]
    fn test_open_in_memory_starts_empty() {
        let store = create_test_store();
        assert!(store.enumerate().unwrap().is_empty());
        assert_eq!(store.lifetime(), 0);
        assert!(store.db_path().is_none());
    }

    #[test]
    fn test_upsert_then_lookup_exact() {
        let store = create_test_store();
        let code = PhoneSeq::new(&[10_268, 8_708]).unwrap();
        let record = UserPhrase::new(code, "測試", 42, 1, 2, 3);
        store.upsert(&record).unwrap();

        let found = store.lookup_exact(&code, "測試").unwrap().unwrap();
        assert_eq!(found, record);
    }

    #[test]
    fn test_lookup_exact_missing_is_none() {
        let store = create_test_store();
        let code = PhoneSeq::new(&[1, 2, 3]).unwrap();
        assert!(store.lookup_exact(&code, "absent").unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_existing_record() {
        let store = create_test_store();
        let code = PhoneSeq::new(&[7]).unwrap();
        store.upsert(&UserPhrase::new(code, "字", 1, 1, 1, 1)).unwrap();
        store.upsert(&UserPhrase::new(code, "字", 9, 1, 5, 5)).unwrap();

        let phrases = store.lookup_by_code(&code).unwrap();
        assert_eq!(phrases.len(), 1);
        assert_eq!(phrases[0].time, 9);
        assert_eq!(phrases[0].user_freq, 5);
    }

    #[test]
    fn test_lookup_by_code_returns_all_phrases_for_code() {
        let store = create_test_store();
        let code = PhoneSeq::new(&[100, 200]).unwrap();
        store.upsert(&sample_record(&[100, 200], "甲乙")).unwrap();
        store.upsert(&sample_record(&[100, 200], "甲一")).unwrap();
        store.upsert(&sample_record(&[300], "丙")).unwrap();

        let phrases = store.lookup_by_code(&code).unwrap();
        assert_eq!(phrases.len(), 2);
        assert!(phrases.iter().all(|p| p.code == code));
    }

    #[test]
    fn test_lookup_distinguishes_prefix_codes() {
        let store = create_test_store();
        store.upsert(&sample_record(&[5], "短")).unwrap();
        store.upsert(&sample_record(&[5, 9], "長句")).unwrap();

        let short = store.lookup_by_code(&PhoneSeq::new(&[5]).unwrap()).unwrap();
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].phrase, "短");

        let long = store.lookup_by_code(&PhoneSeq::new(&[5, 9]).unwrap()).unwrap();
        assert_eq!(long.len(), 1);
        assert_eq!(long[0].phrase, "長句");
    }

    #[test]
    fn test_single_phrase_learn_then_forget_cycle() {
        let store = create_test_store();
        let code = PhoneSeq::new(&[5, 9]).unwrap();
        let record = UserPhrase::new(code, "測試", 100, 1, 1, 1);

        store.upsert(&record).unwrap();
        assert_eq!(store.lookup_by_code(&code).unwrap(), vec![record]);

        store.delete(&code, "測試").unwrap();
        assert!(store.lookup_by_code(&code).unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_record() {
        let store = create_test_store();
        let code = PhoneSeq::new(&[11, 22]).unwrap();
        store.upsert(&sample_record(&[11, 22], "刪除")).unwrap();

        store.delete(&code, "刪除").unwrap();
        assert!(store.lookup_exact(&code, "刪除").unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_record_succeeds() {
        let store = create_test_store();
        let code = PhoneSeq::new(&[11, 22]).unwrap();
        store.delete(&code, "沒有").unwrap();
    }

    #[test]
    fn test_max_user_freq_matches_scan() {
        let store = create_test_store();
        let code = PhoneSeq::new(&[88]).unwrap();
        store.upsert(&UserPhrase::new(code, "一", 1, 1, 3, 3)).unwrap();
        store.upsert(&UserPhrase::new(code, "乙", 1, 1, 7, 7)).unwrap();
        store.upsert(&UserPhrase::new(code, "伊", 1, 1, 2, 2)).unwrap();

        assert_eq!(store.max_user_freq(&code).unwrap(), Some(7));

        let scan_max = store
            .lookup_by_code(&code)
            .unwrap()
            .iter()
            .map(|p| p.user_freq)
            .max();
        assert_eq!(store.max_user_freq(&code).unwrap(), scan_max);
    }

    #[test]
    fn test_max_user_freq_none_for_unknown_code() {
        let store = create_test_store();
        let code = PhoneSeq::new(&[1, 2, 3, 4]).unwrap();
        assert_eq!(store.max_user_freq(&code).unwrap(), None);
    }

    #[test]
    fn test_enumerate_returns_all_keys() {
        let store = create_test_store();
        store.upsert(&sample_record(&[1], "一")).unwrap();
        store.upsert(&sample_record(&[2, 3], "二三")).unwrap();

        let mut entries = store.enumerate().unwrap();
        entries.sort_by(|a, b| a.1.cmp(&b.1));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, PhoneSeq::new(&[1]).unwrap());
        assert_eq!(entries[1].0, PhoneSeq::new(&[2, 3]).unwrap());
    }

    #[test]
    fn test_advance_lifetime_is_visible_immediately() {
        let mut store = create_test_store();
        store.advance_lifetime(12);
        assert_eq!(store.lifetime(), 12);

        store.advance_lifetime(20);
        assert_eq!(store.lifetime(), 20);
    }

    #[test]
    fn test_close_persists_lifetime_delta() {
        let dir = TempDir::new().unwrap();

        let mut store = UserphraseStore::open_in_dir(dir.path()).unwrap();
        store.advance_lifetime(5);
        store.close();

        let store = UserphraseStore::open_in_dir(dir.path()).unwrap();
        assert_eq!(store.lifetime(), 5);
    }

    #[test]
    fn test_drop_persists_lifetime_delta() {
        let dir = TempDir::new().unwrap();

        let mut store = UserphraseStore::open_in_dir(dir.path()).unwrap();
        store.advance_lifetime(3);
        drop(store);

        let store = UserphraseStore::open_in_dir(dir.path()).unwrap();
        assert_eq!(store.lifetime(), 3);
    }

    #[test]
    fn test_open_in_dir_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("inner").join("user");

        let store = UserphraseStore::open_in_dir(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.db_path().unwrap(), nested.join("chewing.db"));
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let code = PhoneSeq::new(&[512, 1_024]).unwrap();

        let store = UserphraseStore::open_in_dir(dir.path()).unwrap();
        store.upsert(&UserPhrase::new(code, "保存", 7, 1, 4, 4)).unwrap();
        store.close();

        let store = UserphraseStore::open_in_dir(dir.path()).unwrap();
        let found = store.lookup_exact(&code, "保存").unwrap().unwrap();
        assert_eq!(found.user_freq, 4);
    }
}
