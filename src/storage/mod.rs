//! Storage layer for the user phrase database.
//!
//! The layer splits along the session startup sequence:
//! - **location**: resolves the per-user storage directory
//! - **connection**: opens the `SQLite` engine
//! - **schema**: configures the engine and owns the DDL
//! - **catalog**: the compiled-once statement templates and slot maps
//! - **lifetime**: the accumulated usage counter in the config table
//! - **store**: the session object tying the pieces together

// Allow significant_drop_tightening - dropping database connections slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod catalog;
pub(crate) mod connection;
pub(crate) mod lifetime;
pub mod location;
pub(crate) mod metrics;
pub(crate) mod schema;
pub mod store;

pub use location::{DB_FILENAME, USER_DATA_SUBDIR, USER_PATH_ENV, resolve_storage_directory};
pub use store::UserphraseStore;
