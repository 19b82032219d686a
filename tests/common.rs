//! tests/common.rs
//! Shared constants and helpers for the integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use cryptfile::{CryptEngine, EngineSettings, StorageStatus};
use tempfile::TempDir;

/// Fast iteration count for tests — KDF cost is measured in benches/.
pub const TEST_ITERATIONS: &str = "16";

pub const TEST_PASSWORD: &str = "Hello";

/// Engine configured for encrypted-at-rest content with a fast KDF.
pub fn test_engine(password: &str) -> CryptEngine {
    CryptEngine::new(
        EngineSettings::new(password, StorageStatus::Encrypted)
            .with_kdf_iterations(TEST_ITERATIONS),
    )
}

/// Write `content` into a fresh temp dir, returning the dir guard and path.
pub fn plaintext_file(content: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.bin");
    fs::write(&path, content).unwrap();
    (dir, path)
}

/// Deterministic non-trivial test payload.
#[allow(dead_code)] // Not every test file uses it
pub fn patterned_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Names of all entries in the directory, sorted.
#[allow(dead_code)]
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
