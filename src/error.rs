//! # Error Types
//!
//! All fallible operations return [`Result<T, CryptfileError>`](CryptfileError).
//!
//! Note what is deliberately *not* an error: a file whose header does not
//! parse. That is the documented "not encrypted" signal and surfaces as
//! `Option::None` from [`crate::header::EncryptedFileHeader::try_parse`],
//! never as an error variant.

use thiserror::Error;

/// The error type for all at-rest encryption operations.
#[derive(Error, Debug)]
pub enum CryptfileError {
    /// I/O error during file operations, the cipher transform, or the
    /// atomic-replace rename sequence.
    ///
    /// Propagated after best-effort cleanup of any partially written
    /// temporary file; the original file is left untouched.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The recomputed integrity tag does not match the stored one.
    ///
    /// Always fatal, never downgraded to a warning: it is the primary
    /// tamper/corruption detector. A wrong password surfaces the same way,
    /// and callers cannot distinguish the two from the tag check alone.
    #[error("integrity tag mismatch: content is corrupted or the password is wrong")]
    Integrity,

    /// Key derivation or cipher setup failed.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl From<&'static str> for CryptfileError {
    fn from(msg: &'static str) -> Self {
        CryptfileError::Crypto(msg.to_string())
    }
}
