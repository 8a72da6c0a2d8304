//! Storage directory resolution for the user phrase database.
//!
//! Resolution order:
//! 1. An explicit override directory (normally from [`USER_PATH_ENV`]),
//!    used verbatim when it exists and is writable. An unusable override
//!    is ignored rather than reported.
//! 2. The platform user-data directory plus [`USER_DATA_SUBDIR`]:
//!    - Linux: `~/.local/share/chewing/`
//!    - macOS: `~/Library/Application Support/chewing/`
//!    - Windows: `C:\Users\<User>\AppData\Local\chewing\`
//!    The directory is created if missing; the system temp directory backs
//!    this up when no user-data directory can be determined.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Environment variable that overrides the storage directory.
pub const USER_PATH_ENV: &str = "CHEWING_USER_PATH";

/// Subdirectory of the platform user-data directory holding the database.
pub const USER_DATA_SUBDIR: &str = "chewing";

/// Fixed database filename inside the storage directory.
pub const DB_FILENAME: &str = "chewing.db";

/// Resolves a writable directory for the user phrase database.
///
/// A usable `explicit_override` is returned verbatim without creating
/// anything; otherwise the default directory is derived and created
/// (including parents). Creating a directory that already exists is not an
/// error.
///
/// # Errors
///
/// Returns [`Error::LocationUnavailable`] when the default directory cannot
/// be created.
pub fn resolve_storage_directory(explicit_override: Option<&Path>) -> Result<PathBuf> {
    resolve_or_create(explicit_override, default_directory())
}

fn resolve_or_create(explicit_override: Option<&Path>, default: PathBuf) -> Result<PathBuf> {
    if let Some(dir) = explicit_override {
        if is_writable_dir(dir) {
            return Ok(dir.to_path_buf());
        }
        tracing::debug!(
            path = %dir.display(),
            "storage override is missing or not writable, falling back to default"
        );
    }

    std::fs::create_dir_all(&default).map_err(|e| Error::LocationUnavailable {
        cause: format!("cannot create {}: {e}", default.display()),
    })?;
    Ok(default)
}

/// Resolves the storage directory using the process environment.
///
/// Reads the override from [`USER_PATH_ENV`] and delegates to
/// [`resolve_storage_directory`].
///
/// # Errors
///
/// Returns [`Error::LocationUnavailable`] when the default directory cannot
/// be created.
pub fn resolve_default() -> Result<PathBuf> {
    let explicit_override = std::env::var_os(USER_PATH_ENV).map(PathBuf::from);
    resolve_storage_directory(explicit_override.as_deref())
}

/// Default storage directory before creation.
pub(crate) fn default_directory() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || std::env::temp_dir().join(USER_DATA_SUBDIR),
        |base| base.data_local_dir().join(USER_DATA_SUBDIR),
    )
}

fn is_writable_dir(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|metadata| metadata.is_dir() && !metadata.permissions().readonly())
        .unwrap_or(false)
}
