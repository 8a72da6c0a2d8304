//! Core record types for learned user phrases.

use crate::{Error, Result};

/// Maximum number of syllables in one phonetic code sequence.
///
/// The on-disk schema bakes this arity into the `userphrase_v1` primary key
/// (`phone_0`..`phone_10`); changing it requires a new table version.
pub const MAX_PHONE_SEQ_LEN: usize = 11;

/// Sentinel stored in phone slots beyond the in-use length.
pub const PHONE_NONE: u16 = 0;

/// A phonetic code sequence: up to [`MAX_PHONE_SEQ_LEN`] syllable codes.
///
/// The sequence is stored as a fixed-width array with an explicit in-use
/// length; unused trailing slots always hold [`PHONE_NONE`]. Construction
/// validates both, so every `PhoneSeq` satisfies the schema's fixed-column
/// contract: `len` equals the count of non-sentinel slots and everything
/// past `len` is the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhoneSeq {
    phones: [u16; MAX_PHONE_SEQ_LEN],
    len: u8,
}

impl PhoneSeq {
    /// Creates a sequence from the in-use syllable codes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `phones` is empty, holds more
    /// than [`MAX_PHONE_SEQ_LEN`] entries, or contains the reserved
    /// [`PHONE_NONE`] value.
    pub fn new(phones: &[u16]) -> Result<Self> {
        if phones.is_empty() {
            return Err(Error::InvalidInput(
                "phone sequence must not be empty".to_string(),
            ));
        }
        if phones.len() > MAX_PHONE_SEQ_LEN {
            return Err(Error::InvalidInput(format!(
                "phone sequence has {} syllables, maximum is {MAX_PHONE_SEQ_LEN}",
                phones.len()
            )));
        }
        if let Some(position) = phones.iter().position(|&phone| phone == PHONE_NONE) {
            return Err(Error::InvalidInput(format!(
                "phone value {PHONE_NONE} at position {position} is reserved for unused slots"
            )));
        }

        let mut padded = [PHONE_NONE; MAX_PHONE_SEQ_LEN];
        padded[..phones.len()].copy_from_slice(phones);
        // Note: cast usize to u8 (guarded above, at most 11)
        #[allow(clippy::cast_possible_truncation)]
        let len = phones.len() as u8;
        Ok(Self {
            phones: padded,
            len,
        })
    }

    /// Number of syllables in use (1..=[`MAX_PHONE_SEQ_LEN`]).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Always `false`: an empty sequence cannot be constructed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The in-use syllable codes, without sentinel padding.
    #[must_use]
    pub fn phones(&self) -> &[u16] {
        &self.phones[..self.len()]
    }

    /// The value stored in slot `index` of the fixed-width representation.
    ///
    /// Slots at or beyond [`len`](Self::len), including indexes past
    /// [`MAX_PHONE_SEQ_LEN`], read as [`PHONE_NONE`].
    #[must_use]
    pub const fn slot(&self, index: usize) -> u16 {
        if index < MAX_PHONE_SEQ_LEN {
            self.phones[index]
        } else {
            PHONE_NONE
        }
    }
}

impl TryFrom<&[u16]> for PhoneSeq {
    type Error = Error;

    fn try_from(phones: &[u16]) -> Result<Self> {
        Self::new(phones)
    }
}

/// One learned phrase record: the unique (code, phrase) key plus its usage
/// statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPhrase {
    /// Phonetic code the phrase was learned under.
    pub code: PhoneSeq,
    /// Phrase text.
    pub phrase: String,
    /// Last-use logical timestamp, supplied by the caller (typically the
    /// current lifetime value).
    pub time: i64,
    /// Frequency at creation.
    pub orig_freq: i64,
    /// Highest frequency ever observed.
    pub max_freq: i64,
    /// Current weighted frequency.
    pub user_freq: i64,
}

impl UserPhrase {
    /// Creates a record with all statistics set explicitly.
    #[must_use]
    pub fn new(
        code: PhoneSeq,
        phrase: impl Into<String>,
        time: i64,
        orig_freq: i64,
        max_freq: i64,
        user_freq: i64,
    ) -> Self {
        Self {
            code,
            phrase: phrase.into(),
            time,
            orig_freq,
            max_freq,
            user_freq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_seq_new_valid() {
        let seq = PhoneSeq::new(&[5, 9]).unwrap();
        assert_eq!(seq.len(), 2);
        assert!(!seq.is_empty());
        assert_eq!(seq.phones(), &[5, 9]);
    }

    #[test]
    fn test_phone_seq_full_length() {
        let phones: Vec<u16> = (1..=11).collect();
        let seq = PhoneSeq::new(&phones).unwrap();
        assert_eq!(seq.len(), MAX_PHONE_SEQ_LEN);
        assert_eq!(seq.phones(), phones.as_slice());
    }

    #[test]
    fn test_phone_seq_rejects_empty() {
        let err = PhoneSeq::new(&[]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_phone_seq_rejects_too_long() {
        let phones: Vec<u16> = (1..=12).collect();
        let err = PhoneSeq::new(&phones).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_phone_seq_rejects_sentinel_value() {
        let err = PhoneSeq::new(&[5, PHONE_NONE, 9]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("position 1"));
    }

    #[test]
    fn test_phone_seq_pads_unused_slots() {
        let seq = PhoneSeq::new(&[5, 9]).unwrap();
        assert_eq!(seq.slot(0), 5);
        assert_eq!(seq.slot(1), 9);
        for index in 2..MAX_PHONE_SEQ_LEN {
            assert_eq!(seq.slot(index), PHONE_NONE);
        }
    }

    #[test]
    fn test_phone_seq_slot_out_of_range_reads_sentinel() {
        let seq = PhoneSeq::new(&[5]).unwrap();
        assert_eq!(seq.slot(MAX_PHONE_SEQ_LEN), PHONE_NONE);
        assert_eq!(seq.slot(usize::MAX), PHONE_NONE);
    }

    #[test]
    fn test_phone_seq_equality_covers_length() {
        let short = PhoneSeq::new(&[5]).unwrap();
        let long = PhoneSeq::new(&[5, 9]).unwrap();
        assert_ne!(short, long);
        assert_eq!(long, PhoneSeq::new(&[5, 9]).unwrap());
    }

    #[test]
    fn test_phone_seq_try_from_slice() {
        let seq = PhoneSeq::try_from([33u16, 44, 55].as_slice()).unwrap();
        assert_eq!(seq.phones(), &[33, 44, 55]);
    }

    #[test]
    fn test_user_phrase_new() {
        let code = PhoneSeq::new(&[5, 9]).unwrap();
        let record = UserPhrase::new(code, "測試", 100, 1, 7, 3);
        assert_eq!(record.code, code);
        assert_eq!(record.phrase, "測試");
        assert_eq!(record.time, 100);
        assert_eq!(record.orig_freq, 1);
        assert_eq!(record.max_freq, 7);
        assert_eq!(record.user_freq, 3);
    }
}
