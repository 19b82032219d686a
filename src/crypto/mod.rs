// src/crypto/mod.rs

//! Cryptographic primitives: key derivation, randomness, and the cipher
//! and MAC type aliases used by the header codec.

pub mod kdf;
pub mod rng;

use aes::Aes256;
use hmac::Hmac;
use sha2::Sha256;

/// HMAC-SHA256, used for the integrity tag over `IV ‖ ciphertext`.
pub type HmacSha256 = Hmac<Sha256>;

/// AES-256-CBC encryptor (PKCS#7 padding applied by the callers).
pub type Aes256CbcEnc = cbc::Encryptor<Aes256>;

/// AES-256-CBC decryptor.
pub type Aes256CbcDec = cbc::Decryptor<Aes256>;
