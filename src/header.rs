//! # Header Codec
//!
//! Fixed-layout 101-byte binary header written at offset 0 of every
//! encrypted file, plus the tag computation/validation and cipher-context
//! construction built around it.
//!
//! Parsing is deliberately `Option`-based: an unrecognized header is the
//! normal way the engine detects "this file is not encrypted" and falls
//! back to passthrough, so it must never surface as an error.

use std::io::{Read, Seek, SeekFrom, Write};

use aes::cipher::KeyIvInit;
use hmac::Mac;
use secrecy::SecretString;

use crate::consts::{
    FORMAT_VERSION, HEADER_LEN, IV_LEN, IV_OFFSET, MAGIC, SALT_LEN, TAG_LEN, TAG_OFFSET,
};
use crate::crypto::kdf::DerivedKeys;
use crate::crypto::rng::{random_iv, random_salt};
use crate::crypto::{Aes256CbcDec, Aes256CbcEnc, HmacSha256};
use crate::error::CryptfileError;

/// The fixed-length prologue of an encrypted file.
///
/// Field order on disk: magic (12) | version (1) | plaintext size
/// (8, LE i64) | salt (32) | integrity tag (32) | IV (16).
#[derive(Debug, Clone)]
pub struct EncryptedFileHeader {
    version: u8,
    plaintext_size: i64,
    salt: [u8; SALT_LEN],
    tag: [u8; TAG_LEN],
    iv: [u8; IV_LEN],
}

impl EncryptedFileHeader {
    /// Build a header for a new encryption: fresh random salt and IV,
    /// zeroed tag placeholder (back-patched once the ciphertext is known).
    pub fn generate(plaintext_size: i64) -> Self {
        Self {
            version: FORMAT_VERSION,
            plaintext_size,
            salt: random_salt(),
            tag: [0u8; TAG_LEN],
            iv: random_iv(),
        }
    }

    /// Read exactly [`HEADER_LEN`] bytes and parse them.
    ///
    /// Returns `None` — not an error — when the magic does not match, the
    /// version is not [`FORMAT_VERSION`], the size field is negative, or
    /// the read itself fails. All of those mean "not a file this engine
    /// encrypted" and the caller decides the fallback.
    pub fn try_parse<R: Read>(reader: &mut R) -> Option<Self> {
        let mut raw = [0u8; HEADER_LEN];
        reader.read_exact(&mut raw).ok()?;

        if &raw[..MAGIC.len()] != MAGIC {
            return None;
        }
        let version = raw[MAGIC.len()];
        if version != FORMAT_VERSION {
            return None;
        }

        let mut size_bytes = [0u8; 8];
        size_bytes.copy_from_slice(&raw[crate::consts::SIZE_OFFSET..crate::consts::SALT_OFFSET]);
        let plaintext_size = i64::from_le_bytes(size_bytes);
        if plaintext_size < 0 {
            return None;
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&raw[crate::consts::SALT_OFFSET..TAG_OFFSET]);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&raw[TAG_OFFSET..IV_OFFSET]);
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&raw[IV_OFFSET..HEADER_LEN]);

        Some(Self {
            version,
            plaintext_size,
            salt,
            tag,
            iv,
        })
    }

    /// Serialize the header in its fixed byte order.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CryptfileError> {
        writer.write_all(MAGIC)?;
        writer.write_all(&[self.version])?;
        writer.write_all(&self.plaintext_size.to_le_bytes())?;
        writer.write_all(&self.salt)?;
        writer.write_all(&self.tag)?;
        writer.write_all(&self.iv)?;
        Ok(())
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn plaintext_size(&self) -> i64 {
        self.plaintext_size
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// Derive the cipher and HMAC keys for this header's salt.
    pub fn derive_keys(
        &self,
        password: &SecretString,
        iterations: u32,
    ) -> Result<DerivedKeys, CryptfileError> {
        DerivedKeys::derive(password, &self.salt, iterations)
    }

    /// HMAC-SHA256 over every byte from the IV offset to EOF — the IV
    /// itself is part of the MAC input, immediately followed by the
    /// ciphertext.
    pub fn compute_tag<S: Read + Seek>(
        stream: &mut S,
        keys: &DerivedKeys,
    ) -> Result<[u8; TAG_LEN], CryptfileError> {
        let mac = tag_mac(stream, keys)?;
        Ok(mac.finalize().into_bytes().into())
    }

    /// Overwrite the tag placeholder at its fixed offset. The two-pass
    /// write: header first with a zeroed tag, then this once the
    /// ciphertext (and therefore the tag) is known.
    pub fn write_tag_in_place<S: Write + Seek>(
        stream: &mut S,
        tag: &[u8; TAG_LEN],
    ) -> Result<(), CryptfileError> {
        stream.seek(SeekFrom::Start(TAG_OFFSET as u64))?;
        stream.write_all(tag)?;
        Ok(())
    }

    /// Recompute the tag over `IV ‖ ciphertext` and compare against the
    /// stored one in constant time. Mismatch is fatal
    /// ([`CryptfileError::Integrity`]) — it signals tampering, corruption,
    /// or a wrong password, and is never downgraded.
    pub fn validate_tag<S: Read + Seek>(
        &self,
        stream: &mut S,
        keys: &DerivedKeys,
    ) -> Result<(), CryptfileError> {
        let mac = tag_mac(stream, keys)?;
        mac.verify_slice(&self.tag).map_err(|_| CryptfileError::Integrity)
    }

    /// Cipher context for encryption: AES-256, CBC mode, this header's IV.
    pub fn encryptor(&self, keys: &DerivedKeys) -> Aes256CbcEnc {
        Aes256CbcEnc::new(keys.cipher_key().into(), (&self.iv).into())
    }

    /// Cipher context for decryption.
    pub fn decryptor(&self, keys: &DerivedKeys) -> Aes256CbcDec {
        Aes256CbcDec::new(keys.cipher_key().into(), (&self.iv).into())
    }
}

/// Quick format probe: reads just magic + version and returns the version
/// byte when the magic matches. Cheaper than [`EncryptedFileHeader::try_parse`]
/// for "is this ours?" checks.
pub fn read_format_version<R: Read>(reader: &mut R) -> Option<u8> {
    let mut prefix = [0u8; MAGIC.len() + 1];
    reader.read_exact(&mut prefix).ok()?;
    if &prefix[..MAGIC.len()] != MAGIC {
        return None;
    }
    Some(prefix[MAGIC.len()])
}

fn tag_mac<S: Read + Seek>(stream: &mut S, keys: &DerivedKeys) -> Result<HmacSha256, CryptfileError> {
    stream.seek(SeekFrom::Start(IV_OFFSET as u64))?;
    let mut mac = keys.mac();
    let mut buf = [0u8; 8192];
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        mac.update(&buf[..n]);
    }
    Ok(mac)
}
