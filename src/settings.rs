//! # Engine Settings
//!
//! Immutable configuration consumed by [`crate::engine::CryptEngine`]:
//! the password, the on-disk content status, the PBKDF2 iteration count,
//! and an optional scratch directory for intermediate files.

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::consts::{DEFAULT_PBKDF2_ITERATIONS, PBKDF2_MIN_RECOMMENDED};

/// What the storage layer says is currently on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStatus {
    /// Files are plaintext on disk; decrypt operations are no-ops.
    Decrypted,
    /// Files are this engine's ciphertext on disk.
    Encrypted,
}

/// Engine configuration, resolved once at construction.
///
/// The iteration count is kept as the raw configuration string and parsed
/// exactly once per engine (see [`EngineSettings::resolve_iterations`]);
/// absent or non-numeric values fall back to
/// [`DEFAULT_PBKDF2_ITERATIONS`].
#[derive(Debug)]
pub struct EngineSettings {
    password: SecretString,
    status: StorageStatus,
    kdf_iterations: Option<String>,
    scratch_dir: Option<PathBuf>,
}

impl EngineSettings {
    pub fn new(password: impl Into<String>, status: StorageStatus) -> Self {
        Self {
            password: SecretString::new(password.into()),
            status,
            kdf_iterations: None,
            scratch_dir: None,
        }
    }

    /// Raw iteration-count value from configuration. Parsed lazily; bad
    /// values are not an error, they mean "use the default".
    pub fn with_kdf_iterations(mut self, raw: impl Into<String>) -> Self {
        self.kdf_iterations = Some(raw.into());
        self
    }

    /// Directory for intermediate candidate files.
    ///
    /// Must live on the same filesystem as the files being transformed,
    /// because the final step of every transform is a rename. Defaults to
    /// the target file's own directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn status(&self) -> StorageStatus {
        self.status
    }

    pub(crate) fn password(&self) -> &SecretString {
        &self.password
    }

    /// An empty password disables the engine entirely.
    pub fn is_enabled(&self) -> bool {
        !self.password.expose_secret().is_empty()
    }

    /// Parse the configured iteration count, defaulting on absent or
    /// non-numeric input. Zero counts as non-numeric.
    pub fn resolve_iterations(&self) -> u32 {
        let iterations = self
            .kdf_iterations
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_PBKDF2_ITERATIONS);

        if iterations < PBKDF2_MIN_RECOMMENDED {
            warn!(iterations, "PBKDF2 iteration count below recommended minimum");
        }
        iterations
    }

    pub(crate) fn scratch_dir_for(&self, target: &Path) -> PathBuf {
        match &self.scratch_dir {
            Some(dir) => dir.clone(),
            None => target.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
        }
    }
}
