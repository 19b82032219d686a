// src/lib.rs

//! Transparent at-rest file encryption.
//!
//! Files are wrapped in a fixed 101-byte binary header (magic, version,
//! plaintext size, KDF salt, integrity tag, IV) followed by AES-256-CBC
//! ciphertext with PKCS#7 padding. The cipher key comes from PBKDF2 with
//! HMAC-SHA256 over a configured password; an independent HMAC-SHA256 key
//! (SHA-512 of the cipher key) authenticates `IV ‖ ciphertext`. Whole-file
//! transforms go through a temporary file and a rename-based atomic
//! replace, so a crash never leaves the original path missing or
//! half-written. Files without the header pass through untouched.

pub mod consts;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod header;
pub mod reader;
pub mod settings;

// High-level API — what most callers import.
pub use engine::CryptEngine;
pub use error::CryptfileError;
pub use reader::{DecryptingReader, FileReadStream};
pub use settings::{EngineSettings, StorageStatus};

// Format introspection without a full parse.
pub use header::{read_format_version, EncryptedFileHeader};
