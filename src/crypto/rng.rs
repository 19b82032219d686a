// src/crypto/rng.rs

//! OS-backed randomness for per-file salt and IV generation.
//!
//! Salt and IV uniqueness is what keeps identical plaintexts from producing
//! identical ciphertexts; both must come from the OS CSPRNG, never from a
//! seeded or thread-local PRNG.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::consts::{IV_LEN, SALT_LEN};

#[inline]
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Fresh 32-byte KDF salt.
#[inline]
pub fn random_salt() -> [u8; SALT_LEN] {
    random_bytes()
}

/// Fresh 16-byte CBC initialization vector.
#[inline]
pub fn random_iv() -> [u8; IV_LEN] {
    random_bytes()
}
