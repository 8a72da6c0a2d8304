//! Data models for the user phrase store.
//!
//! This module contains the record types the storage layer reads and writes.

mod phrase;

pub use phrase::{MAX_PHONE_SEQ_LEN, PHONE_NONE, PhoneSeq, UserPhrase};
