//! src/crypto/kdf.rs
//! Password → key material. PBKDF2-HMAC-SHA256 for the cipher key, a
//! SHA-512 digest of the cipher key for the independent HMAC key.

use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroizing;

use crate::consts::SALT_LEN;
use crate::crypto::HmacSha256;
use crate::error::CryptfileError;

/// Key material derived from a password and a per-file salt.
///
/// Lives only for the duration of a single encrypt/decrypt/read operation;
/// both buffers are zeroized on drop.
pub struct DerivedKeys {
    cipher_key: Zeroizing<[u8; 32]>,
    hmac_key: Zeroizing<[u8; 64]>,
}

impl DerivedKeys {
    /// Derive the 256-bit cipher key via PBKDF2 with HMAC-SHA256 as the
    /// PRF, then the HMAC key as SHA-512 of the cipher key (64 bytes, the
    /// block size recommended for HMAC-SHA256 keys).
    pub fn derive(
        password: &SecretString,
        salt: &[u8; SALT_LEN],
        iterations: u32,
    ) -> Result<Self, CryptfileError> {
        if iterations == 0 {
            return Err("PBKDF2 iterations must be >= 1".into());
        }

        let mut cipher_key = Zeroizing::new([0u8; 32]);
        pbkdf2::<Hmac<Sha256>>(
            password.expose_secret().as_bytes(),
            salt,
            iterations,
            cipher_key.as_mut_slice(),
        )
        .map_err(|e| CryptfileError::Crypto(format!("PBKDF2 failed: {e}")))?;

        let mut hmac_key = Zeroizing::new([0u8; 64]);
        hmac_key.copy_from_slice(Sha512::digest(cipher_key.as_ref()).as_slice());

        Ok(Self { cipher_key, hmac_key })
    }

    pub fn cipher_key(&self) -> &[u8; 32] {
        &self.cipher_key
    }

    /// Fresh HMAC-SHA256 instance keyed with the derived HMAC key.
    pub fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(self.hmac_key.as_ref())
            .expect("64-byte key is always valid for HMAC-SHA256")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(password: &str, salt: [u8; SALT_LEN], iterations: u32) -> DerivedKeys {
        DerivedKeys::derive(&SecretString::new(password.to_string()), &salt, iterations).unwrap()
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = derive("hunter2", [7u8; SALT_LEN], 10);
        let b = derive("hunter2", [7u8; SALT_LEN], 10);
        assert_eq!(a.cipher_key(), b.cipher_key());
    }

    #[test]
    fn salt_and_password_change_the_key() {
        let base = derive("hunter2", [7u8; SALT_LEN], 10);
        assert_ne!(base.cipher_key(), derive("hunter2", [8u8; SALT_LEN], 10).cipher_key());
        assert_ne!(base.cipher_key(), derive("hunter3", [7u8; SALT_LEN], 10).cipher_key());
    }

    #[test]
    fn hmac_key_is_independent_of_cipher_key() {
        let keys = derive("hunter2", [7u8; SALT_LEN], 10);
        // First 32 bytes of the SHA-512 digest must not equal the input key.
        assert_ne!(&keys.hmac_key[..32], keys.cipher_key());
    }

    #[test]
    fn zero_iterations_rejected() {
        let Err(err) = DerivedKeys::derive(
            &SecretString::new("pw".to_string()),
            &[0u8; SALT_LEN],
            0,
        ) else {
            panic!("derivation with zero iterations succeeded");
        };
        assert!(matches!(err, CryptfileError::Crypto(_)));
    }
}
