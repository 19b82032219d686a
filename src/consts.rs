//! # Constants
//!
//! Fixed layout of the encrypted-file container and the KDF configuration
//! bounds used throughout the library.

/// Magic bytes identifying a file produced by this container format.
///
/// A file that does not start with these 12 bytes is treated as ordinary
/// plaintext (passthrough), never as an error.
pub const MAGIC: &[u8; 12] = b"CRYPTFILE\0\0\0";

/// The only container format version this library reads or writes.
///
/// Any other version byte on read is treated the same as an absent header,
/// so newer and older deployments can coexist on the same storage.
pub const FORMAT_VERSION: u8 = 1;

/// Salt length in bytes, input to PBKDF2.
pub const SALT_LEN: usize = 32;

/// Integrity tag length in bytes (HMAC-SHA256 output).
pub const TAG_LEN: usize = 32;

/// Initialization vector length in bytes (AES block size).
pub const IV_LEN: usize = 16;

/// AES block length in bytes.
pub const BLOCK_LEN: usize = 16;

// Field offsets inside the header. The byte order is fixed:
// magic | version | plaintext size (LE i64) | salt | tag | iv
pub const VERSION_OFFSET: usize = MAGIC.len();
pub const SIZE_OFFSET: usize = VERSION_OFFSET + 1;
pub const SALT_OFFSET: usize = SIZE_OFFSET + 8;
pub const TAG_OFFSET: usize = SALT_OFFSET + SALT_LEN;
pub const IV_OFFSET: usize = TAG_OFFSET + TAG_LEN;

/// Total header length: 12 + 1 + 8 + 32 + 32 + 16 = 101 bytes.
///
/// Derived from the field layout, never configured independently.
pub const HEADER_LEN: usize = IV_OFFSET + IV_LEN;

/// Default PBKDF2 iteration count when the configuration supplies none
/// (or supplies a non-numeric value).
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 4096;

/// Iteration counts below this are accepted but logged as weak.
pub const PBKDF2_MIN_RECOMMENDED: u32 = 1000;

/// Buffer size for the streaming cipher transform. Must be a multiple of
/// [`BLOCK_LEN`].
pub(crate) const CRYPT_BUF_LEN: usize = 64 * 1024;
