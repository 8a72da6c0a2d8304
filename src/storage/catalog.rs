//! Compiled statement catalog for the user phrase database.
//!
//! Every template shares one positional numbering for its placeholders:
//! time=?1, orig_freq=?2, max_freq=?3, user_freq=?4, length=?5, phrase=?6,
//! phone_0..phone_10=?10..?20 (7..=9 are never used). A statement's text
//! only declares the subset it filters or writes, and its
//! [`StatementTemplate`] maps each semantic slot to that placeholder number
//! or to [`UNUSED`]. Call sites bind by semantic slot and never hard-code a
//! position; binding a slot a template does not use is a no-op. Result
//! columns are mapped the same way.
//!
//! Templates are compiled once per session by [`compile_all`], which pins
//! them in the connection's prepared-statement cache; operations then fetch
//! the already-compiled statement by template text.

use rusqlite::types::FromSql;
use rusqlite::{CachedStatement, Connection, Row, Statement, ToSql};

use crate::models::{MAX_PHONE_SEQ_LEN, PhoneSeq};
use crate::{Error, Result};

/// Marks a slot a statement neither binds nor returns.
pub const UNUSED: i8 = -1;

/// Semantic slots of a user phrase record, in canonical binding order.
pub mod slot {
    /// Last-use logical timestamp.
    pub const TIME: usize = 0;
    /// Frequency at creation.
    pub const ORIG_FREQ: usize = 1;
    /// Highest observed frequency.
    pub const MAX_FREQ: usize = 2;
    /// Current weighted frequency.
    pub const USER_FREQ: usize = 3;
    /// Number of syllables in use.
    pub const LENGTH: usize = 4;
    /// Phrase text.
    pub const PHRASE: usize = 5;
    /// First phone slot; the remaining ten follow contiguously.
    pub const PHONE_0: usize = 6;
    /// Total semantic slot count.
    pub const COUNT: usize = PHONE_0 + crate::models::MAX_PHONE_SEQ_LEN;

    /// Slot index of phone `index`.
    #[must_use]
    pub const fn phone(index: usize) -> usize {
        PHONE_0 + index
    }
}

/// Semantic slots of a configuration scalar.
pub mod config_slot {
    /// Scalar identifier.
    pub const ID: usize = 0;
    /// Scalar value.
    pub const VALUE: usize = 1;
    /// Total semantic slot count.
    pub const COUNT: usize = 2;
}

// Shared placeholder numbers; phone slots occupy ?10..?20.
const BIND_TIME: i8 = 1;
const BIND_ORIG_FREQ: i8 = 2;
const BIND_MAX_FREQ: i8 = 3;
const BIND_USER_FREQ: i8 = 4;
const BIND_LENGTH: i8 = 5;
const BIND_PHRASE: i8 = 6;
const BIND_PHONES: [i8; MAX_PHONE_SEQ_LEN] = [10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20];
const BIND_CONFIG_ID: i8 = 1;
const BIND_CONFIG_VALUE: i8 = 2;

const PHRASE_SLOT_NAMES: [&str; slot::COUNT] = [
    "time", "orig_freq", "max_freq", "user_freq", "length", "phrase", "phone_0", "phone_1",
    "phone_2", "phone_3", "phone_4", "phone_5", "phone_6", "phone_7", "phone_8", "phone_9",
    "phone_10",
];
const CONFIG_SLOT_NAMES: [&str; config_slot::COUNT] = ["id", "value"];

/// Immutable, compiled-once description of one query template.
#[derive(Debug)]
pub struct StatementTemplate {
    /// Statement text with shared positional placeholders.
    pub sql: &'static str,
    binds: &'static [i8],
    columns: &'static [i8],
    names: &'static [&'static str],
}

impl StatementTemplate {
    /// Placeholder number for `slot`, or `None` when this statement does
    /// not bind it.
    #[must_use]
    pub fn placeholder(&self, slot: usize) -> Option<usize> {
        let number = self.binds.get(slot).copied()?;
        usize::try_from(number).ok()
    }

    /// Result column holding `slot`, or `None` when this statement does
    /// not return it.
    #[must_use]
    pub fn column(&self, slot: usize) -> Option<usize> {
        let column = self.columns.get(slot).copied()?;
        usize::try_from(column).ok()
    }

    /// Diagnostic name of `slot`.
    #[must_use]
    pub fn slot_name(&self, slot: usize) -> &'static str {
        self.names.get(slot).copied().unwrap_or("unknown")
    }
}

const fn no_slots() -> [i8; slot::COUNT] {
    [UNUSED; slot::COUNT]
}

// Filter by code: length plus every phone slot.
const fn code_binds() -> [i8; slot::COUNT] {
    let mut map = no_slots();
    map[slot::LENGTH] = BIND_LENGTH;
    let mut index = 0;
    while index < MAX_PHONE_SEQ_LEN {
        map[slot::phone(index)] = BIND_PHONES[index];
        index += 1;
    }
    map
}

// Filter by the full (code, phrase) key.
const fn key_binds() -> [i8; slot::COUNT] {
    let mut map = code_binds();
    map[slot::PHRASE] = BIND_PHRASE;
    map
}

// Upsert writes every semantic slot.
const fn record_binds() -> [i8; slot::COUNT] {
    let mut map = key_binds();
    map[slot::TIME] = BIND_TIME;
    map[slot::ORIG_FREQ] = BIND_ORIG_FREQ;
    map[slot::MAX_FREQ] = BIND_MAX_FREQ;
    map[slot::USER_FREQ] = BIND_USER_FREQ;
    map
}

// SelectAll returns the key columns: length, phrase, then the phones.
const fn key_columns() -> [i8; slot::COUNT] {
    let mut map = no_slots();
    map[slot::LENGTH] = 0;
    map[slot::PHRASE] = 1;
    let mut index = 0;
    let mut column = 2;
    while index < MAX_PHONE_SEQ_LEN {
        map[slot::phone(index)] = column;
        index += 1;
        column += 1;
    }
    map
}

// Statistics columns in select order: time, orig_freq, max_freq, user_freq.
const fn stats_columns() -> [i8; slot::COUNT] {
    let mut map = no_slots();
    map[slot::TIME] = 0;
    map[slot::ORIG_FREQ] = 1;
    map[slot::MAX_FREQ] = 2;
    map[slot::USER_FREQ] = 3;
    map
}

const fn stats_and_phrase_columns() -> [i8; slot::COUNT] {
    let mut map = stats_columns();
    map[slot::PHRASE] = 4;
    map
}

const fn max_freq_columns() -> [i8; slot::COUNT] {
    let mut map = no_slots();
    map[slot::USER_FREQ] = 0;
    map
}

const NO_SLOTS: [i8; slot::COUNT] = no_slots();
const CODE_BINDS: [i8; slot::COUNT] = code_binds();
const KEY_BINDS: [i8; slot::COUNT] = key_binds();
const RECORD_BINDS: [i8; slot::COUNT] = record_binds();
const KEY_COLUMNS: [i8; slot::COUNT] = key_columns();
const STATS_COLUMNS: [i8; slot::COUNT] = stats_columns();
const STATS_AND_PHRASE_COLUMNS: [i8; slot::COUNT] = stats_and_phrase_columns();
const MAX_FREQ_COLUMNS: [i8; slot::COUNT] = max_freq_columns();

const CONFIG_GET_BINDS: [i8; config_slot::COUNT] = [BIND_CONFIG_ID, UNUSED];
const CONFIG_PUT_BINDS: [i8; config_slot::COUNT] = [BIND_CONFIG_ID, BIND_CONFIG_VALUE];
const CONFIG_GET_COLUMNS: [i8; config_slot::COUNT] = [UNUSED, 0];
const CONFIG_NO_COLUMNS: [i8; config_slot::COUNT] = [UNUSED, UNUSED];

const SELECT_ALL: StatementTemplate = StatementTemplate {
    sql: "SELECT length, phrase, \
          phone_0, phone_1, phone_2, phone_3, phone_4, phone_5, \
          phone_6, phone_7, phone_8, phone_9, phone_10 \
          FROM userphrase_v1",
    binds: &NO_SLOTS,
    columns: &KEY_COLUMNS,
    names: &PHRASE_SLOT_NAMES,
};

const SELECT_BY_CODE: StatementTemplate = StatementTemplate {
    sql: "SELECT time, orig_freq, max_freq, user_freq, phrase \
          FROM userphrase_v1 WHERE length = ?5 AND \
          phone_0 = ?10 AND phone_1 = ?11 AND phone_2 = ?12 AND \
          phone_3 = ?13 AND phone_4 = ?14 AND phone_5 = ?15 AND \
          phone_6 = ?16 AND phone_7 = ?17 AND phone_8 = ?18 AND \
          phone_9 = ?19 AND phone_10 = ?20",
    binds: &CODE_BINDS,
    columns: &STATS_AND_PHRASE_COLUMNS,
    names: &PHRASE_SLOT_NAMES,
};

const SELECT_BY_CODE_AND_PHRASE: StatementTemplate = StatementTemplate {
    sql: "SELECT time, orig_freq, max_freq, user_freq \
          FROM userphrase_v1 WHERE length = ?5 AND phrase = ?6 AND \
          phone_0 = ?10 AND phone_1 = ?11 AND phone_2 = ?12 AND \
          phone_3 = ?13 AND phone_4 = ?14 AND phone_5 = ?15 AND \
          phone_6 = ?16 AND phone_7 = ?17 AND phone_8 = ?18 AND \
          phone_9 = ?19 AND phone_10 = ?20",
    binds: &KEY_BINDS,
    columns: &STATS_COLUMNS,
    names: &PHRASE_SLOT_NAMES,
};

const UPSERT: StatementTemplate = StatementTemplate {
    sql: "INSERT OR REPLACE INTO userphrase_v1 (\
          time, orig_freq, max_freq, user_freq, length, phrase, \
          phone_0, phone_1, phone_2, phone_3, phone_4, phone_5, \
          phone_6, phone_7, phone_8, phone_9, phone_10) \
          VALUES (?1, ?2, ?3, ?4, ?5, ?6, \
          ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
    binds: &RECORD_BINDS,
    columns: &NO_SLOTS,
    names: &PHRASE_SLOT_NAMES,
};

const DELETE: StatementTemplate = StatementTemplate {
    sql: "DELETE FROM userphrase_v1 WHERE length = ?5 AND phrase = ?6 AND \
          phone_0 = ?10 AND phone_1 = ?11 AND phone_2 = ?12 AND \
          phone_3 = ?13 AND phone_4 = ?14 AND phone_5 = ?15 AND \
          phone_6 = ?16 AND phone_7 = ?17 AND phone_8 = ?18 AND \
          phone_9 = ?19 AND phone_10 = ?20",
    binds: &KEY_BINDS,
    columns: &NO_SLOTS,
    names: &PHRASE_SLOT_NAMES,
};

const MAX_USER_FREQ_BY_CODE: StatementTemplate = StatementTemplate {
    sql: "SELECT MAX(user_freq) FROM userphrase_v1 WHERE length = ?5 AND \
          phone_0 = ?10 AND phone_1 = ?11 AND phone_2 = ?12 AND \
          phone_3 = ?13 AND phone_4 = ?14 AND phone_5 = ?15 AND \
          phone_6 = ?16 AND phone_7 = ?17 AND phone_8 = ?18 AND \
          phone_9 = ?19 AND phone_10 = ?20",
    binds: &CODE_BINDS,
    columns: &MAX_FREQ_COLUMNS,
    names: &PHRASE_SLOT_NAMES,
};

const CONFIG_GET: StatementTemplate = StatementTemplate {
    sql: "SELECT value FROM config_v1 WHERE id = ?1",
    binds: &CONFIG_GET_BINDS,
    columns: &CONFIG_GET_COLUMNS,
    names: &CONFIG_SLOT_NAMES,
};

const CONFIG_PUT: StatementTemplate = StatementTemplate {
    sql: "INSERT OR IGNORE INTO config_v1 (id, value) VALUES (?1, ?2)",
    binds: &CONFIG_PUT_BINDS,
    columns: &CONFIG_NO_COLUMNS,
    names: &CONFIG_SLOT_NAMES,
};

const CONFIG_INCREMENT: StatementTemplate = StatementTemplate {
    sql: "UPDATE config_v1 SET value = value + ?2 WHERE id = ?1",
    binds: &CONFIG_PUT_BINDS,
    columns: &CONFIG_NO_COLUMNS,
    names: &CONFIG_SLOT_NAMES,
};

/// Identities of the user phrase statement templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhraseStatementId {
    /// Enumerate every stored phrase key.
    SelectAll,
    /// All phrases recorded for one phonetic code.
    SelectByCode,
    /// Exact record lookup by (code, phrase).
    SelectByCodeAndPhrase,
    /// Insert-or-replace one full record.
    Upsert,
    /// Remove one exact record.
    Delete,
    /// Highest weighted frequency among phrases sharing a code.
    MaxUserFreqByCode,
}

impl PhraseStatementId {
    /// Every phrase statement, in catalog order.
    pub const ALL: [Self; 6] = [
        Self::SelectAll,
        Self::SelectByCode,
        Self::SelectByCodeAndPhrase,
        Self::Upsert,
        Self::Delete,
        Self::MaxUserFreqByCode,
    ];

    /// Stable name for logs and error reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelectAll => "select_all",
            Self::SelectByCode => "select_by_code",
            Self::SelectByCodeAndPhrase => "select_by_code_and_phrase",
            Self::Upsert => "upsert",
            Self::Delete => "delete",
            Self::MaxUserFreqByCode => "max_user_freq_by_code",
        }
    }

    /// The immutable template behind this identity.
    #[must_use]
    pub const fn template(self) -> &'static StatementTemplate {
        match self {
            Self::SelectAll => &SELECT_ALL,
            Self::SelectByCode => &SELECT_BY_CODE,
            Self::SelectByCodeAndPhrase => &SELECT_BY_CODE_AND_PHRASE,
            Self::Upsert => &UPSERT,
            Self::Delete => &DELETE,
            Self::MaxUserFreqByCode => &MAX_USER_FREQ_BY_CODE,
        }
    }
}

/// Identities of the configuration scalar statement templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigStatementId {
    /// Read one scalar by id.
    Get,
    /// Insert a scalar if its id is absent.
    Put,
    /// Add a delta to a scalar in place.
    Increment,
}

impl ConfigStatementId {
    /// Every configuration statement, in catalog order.
    pub const ALL: [Self; 3] = [Self::Get, Self::Put, Self::Increment];

    /// Stable name for logs and error reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "config_get",
            Self::Put => "config_put",
            Self::Increment => "config_increment",
        }
    }

    /// The immutable template behind this identity.
    #[must_use]
    pub const fn template(self) -> &'static StatementTemplate {
        match self {
            Self::Get => &CONFIG_GET,
            Self::Put => &CONFIG_PUT,
            Self::Increment => &CONFIG_INCREMENT,
        }
    }
}

/// Number of distinct templates one session compiles and caches.
pub(crate) const STATEMENT_COUNT: usize =
    PhraseStatementId::ALL.len() + ConfigStatementId::ALL.len();

/// Compiles every template against `conn` exactly once.
///
/// The prepared-statement cache is sized to hold the full set, so later
/// lookups through [`phrase_statement`] and [`config_statement`] reuse the
/// compiled statement instead of re-parsing the text.
///
/// # Errors
///
/// Returns [`Error::StatementCompile`] naming the first template that
/// fails. No partial statement set is usable; session startup must abort.
pub(crate) fn compile_all(conn: &Connection) -> Result<()> {
    conn.set_prepared_statement_cache_capacity(STATEMENT_COUNT);
    for id in PhraseStatementId::ALL {
        let _ = phrase_statement(conn, id)?;
    }
    for id in ConfigStatementId::ALL {
        let _ = config_statement(conn, id)?;
    }
    Ok(())
}

/// Fetches the compiled statement for a phrase template.
///
/// # Errors
///
/// Returns [`Error::StatementCompile`] when the template cannot compile.
pub(crate) fn phrase_statement(
    conn: &Connection,
    id: PhraseStatementId,
) -> Result<CachedStatement<'_>> {
    conn.prepare_cached(id.template().sql)
        .map_err(|e| Error::StatementCompile {
            statement: id.as_str(),
            source: e,
        })
}

/// Fetches the compiled statement for a configuration template.
///
/// # Errors
///
/// Returns [`Error::StatementCompile`] when the template cannot compile.
pub(crate) fn config_statement(
    conn: &Connection,
    id: ConfigStatementId,
) -> Result<CachedStatement<'_>> {
    conn.prepare_cached(id.template().sql)
        .map_err(|e| Error::StatementCompile {
            statement: id.as_str(),
            source: e,
        })
}

/// Binds `value` to `slot`; a no-op when the template does not use it.
///
/// # Errors
///
/// Returns [`Error::Bind`] naming the slot when the engine rejects the
/// value.
pub(crate) fn bind_slot<T: ToSql>(
    stmt: &mut Statement<'_>,
    template: &StatementTemplate,
    slot: usize,
    value: T,
) -> Result<()> {
    let Some(index) = template.placeholder(slot) else {
        return Ok(());
    };
    stmt.raw_bind_parameter(index, value).map_err(|e| Error::Bind {
        slot: template.slot_name(slot),
        source: e,
    })
}

/// Binds the code filter: length plus all phone slots, sentinel padding
/// included.
///
/// # Errors
///
/// Returns [`Error::Bind`] when any slot cannot be bound.
pub(crate) fn bind_code(
    stmt: &mut Statement<'_>,
    template: &StatementTemplate,
    code: &PhoneSeq,
) -> Result<()> {
    // Note: cast usize to i64 for the engine (rusqlite binds integers as i64)
    #[allow(clippy::cast_possible_wrap)]
    let length = code.len() as i64;
    bind_slot(stmt, template, slot::LENGTH, length)?;
    for index in 0..MAX_PHONE_SEQ_LEN {
        bind_slot(stmt, template, slot::phone(index), code.slot(index))?;
    }
    Ok(())
}

/// Binds the full (code, phrase) key.
///
/// # Errors
///
/// Returns [`Error::Bind`] when any slot cannot be bound.
pub(crate) fn bind_key(
    stmt: &mut Statement<'_>,
    template: &StatementTemplate,
    code: &PhoneSeq,
    phrase: &str,
) -> Result<()> {
    bind_code(stmt, template, code)?;
    bind_slot(stmt, template, slot::PHRASE, phrase)
}

/// Reads the result column mapped to `slot` from `row`.
///
/// # Errors
///
/// Returns [`Error::Step`] when the slot is not part of this template's
/// result set or the stored value does not convert to `T`.
pub(crate) fn read_slot<T: FromSql>(
    row: &Row<'_>,
    template: &StatementTemplate,
    slot: usize,
) -> Result<T> {
    let column = template.column(slot).ok_or_else(|| Error::Step {
        source: rusqlite::Error::InvalidColumnIndex(slot),
    })?;
    row.get(column).map_err(|e| Error::Step { source: e })
}
