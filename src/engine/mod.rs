// src/engine/mod.rs

//! Whole-file transforms with crash-safe in-place replacement.
//!
//! [`CryptEngine`] orchestrates the header codec and the streaming cipher:
//! encrypt and decrypt write into a uniquely named temporary file first and
//! swap it into place with the atomic replace protocol, so the original
//! path is never left missing or half-written. A size query reads only the
//! header; `open_for_read` hands back either the raw file or a decrypting
//! view over it.
//!
//! The engine holds no shared mutable state beyond the once-resolved
//! iteration count; concurrent calls against *different* paths need no
//! coordination. Concurrent calls against the *same* path are not
//! coordinated here — callers must serialize those themselves.

pub mod replace;

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::OnceLock;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::BlockEncryptMut;
use hmac::Mac;
use tracing::debug;

use crate::consts::{BLOCK_LEN, CRYPT_BUF_LEN, FORMAT_VERSION, HEADER_LEN, TAG_LEN};
use crate::crypto::kdf::DerivedKeys;
use crate::error::CryptfileError;
use crate::header::{read_format_version, EncryptedFileHeader};
use crate::reader::{DecryptingReader, FileReadStream};
use crate::settings::{EngineSettings, StorageStatus};
use self::replace::{atomic_replace, claim_unique};

/// At-rest encryption engine over ordinary files.
///
/// Stateless across invocations apart from the iteration count, which is
/// resolved from configuration at most once and cached.
pub struct CryptEngine {
    settings: EngineSettings,
    iterations: OnceLock<u32>,
}

impl CryptEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            iterations: OnceLock::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn iterations(&self) -> u32 {
        *self.iterations.get_or_init(|| self.settings.resolve_iterations())
    }

    /// Encrypt `path` in place.
    ///
    /// No-op when the engine is disabled (empty password) or the file
    /// already carries a current-version header. On any failure the
    /// partially written temporary file is deleted and the original is
    /// untouched.
    pub fn encrypt_file(&self, path: &Path) -> Result<(), CryptfileError> {
        if !self.settings.is_enabled() {
            debug!(path = %path.display(), "engine disabled, skipping encryption");
            return Ok(());
        }

        let mut source = File::open(path)?;
        if read_format_version(&mut source) == Some(FORMAT_VERSION) {
            debug!(path = %path.display(), "already encrypted, skipping");
            return Ok(());
        }
        source.seek(SeekFrom::Start(0))?;

        let plaintext_len = source.metadata()?.len();
        let header = EncryptedFileHeader::generate(plaintext_len as i64);
        let keys = header.derive_keys(self.settings.password(), self.iterations())?;

        let scratch = self.settings.scratch_dir_for(path);
        let (tmp_path, tmp) = claim_unique(&scratch, &temp_stem(path)?, "enc")?;

        let result = write_encrypted(&mut source, tmp, &header, &keys)
            .and_then(|_| atomic_replace(&tmp_path, path));
        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }

    /// Decrypt `path` in place.
    ///
    /// No-op when the stored status says content is already plaintext, or
    /// when the file carries no recognizable header (passthrough). A tag
    /// mismatch is fatal and leaves the file untouched.
    pub fn decrypt_file(&self, path: &Path) -> Result<(), CryptfileError> {
        if self.settings.status() == StorageStatus::Decrypted {
            debug!(path = %path.display(), "status says plaintext on disk, skipping decryption");
            return Ok(());
        }

        let mut source = File::open(path)?;
        let Some(header) = EncryptedFileHeader::try_parse(&mut source) else {
            debug!(path = %path.display(), "no container header, leaving file as-is");
            return Ok(());
        };

        let keys = header.derive_keys(self.settings.password(), self.iterations())?;
        header.validate_tag(&mut source, &keys)?;
        source.seek(SeekFrom::Start(HEADER_LEN as u64))?;

        let scratch = self.settings.scratch_dir_for(path);
        let (tmp_path, tmp) = claim_unique(&scratch, &temp_stem(path)?, "dec")?;

        let result = write_decrypted(source, tmp, &header, &keys)
            .and_then(|_| atomic_replace(&tmp_path, path));
        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }

    /// Open `path` for reading, transparently decrypting when it carries a
    /// valid header.
    ///
    /// Disabled engine or plaintext status returns the raw file directly;
    /// an unrecognized header returns the raw file rewound to offset 0.
    /// The integrity tag is validated *before* any plaintext is served.
    pub fn open_for_read(&self, path: &Path) -> Result<FileReadStream, CryptfileError> {
        let mut file = File::open(path)?;
        if !self.settings.is_enabled() || self.settings.status() == StorageStatus::Decrypted {
            return Ok(FileReadStream::Raw(file));
        }

        match EncryptedFileHeader::try_parse(&mut file) {
            None => {
                file.seek(SeekFrom::Start(0))?;
                Ok(FileReadStream::Raw(file))
            }
            Some(header) => {
                let keys = header.derive_keys(self.settings.password(), self.iterations())?;
                header.validate_tag(&mut file, &keys)?;
                file.seek(SeekFrom::Start(HEADER_LEN as u64))?;
                Ok(FileReadStream::Decrypted(DecryptingReader::new(
                    BufReader::new(file),
                    &header,
                    &keys,
                )))
            }
        }
    }

    /// Logical size of `path`: the header's plaintext-size field when a
    /// valid header is present (the on-disk ciphertext is longer, due to
    /// block padding), the raw file length otherwise. Reads only the
    /// header, never the payload.
    pub fn size_of(&self, path: &Path) -> Result<u64, CryptfileError> {
        let mut file = File::open(path)?;
        match EncryptedFileHeader::try_parse(&mut file) {
            Some(header) => Ok(header.plaintext_size() as u64),
            None => Ok(file.metadata()?.len()),
        }
    }

    /// Does `path` start with a current-version container header?
    pub fn is_encrypted(&self, path: &Path) -> Result<bool, CryptfileError> {
        let mut file = File::open(path)?;
        Ok(read_format_version(&mut file) == Some(FORMAT_VERSION))
    }
}

/// Stream `source` through the cipher into `dest`: header, CBC ciphertext
/// with a PKCS#7 final block, then the back-patched integrity tag.
fn write_encrypted(
    source: &mut File,
    mut dest: File,
    header: &EncryptedFileHeader,
    keys: &DerivedKeys,
) -> Result<(), CryptfileError> {
    header.write_to(&mut dest)?;

    let mut enc = header.encryptor(keys);
    let mut mac = keys.mac();
    // The tag covers IV ‖ ciphertext, IV first.
    mac.update(header.iv());

    let mut buf = vec![0u8; CRYPT_BUF_LEN];
    loop {
        let n = read_full(source, &mut buf)?;
        if n == buf.len() {
            for chunk in buf.chunks_exact_mut(BLOCK_LEN) {
                enc.encrypt_block_mut(GenericArray::from_mut_slice(chunk));
            }
            mac.update(&buf);
            dest.write_all(&buf)?;
            continue;
        }

        // Final stretch: remaining full blocks, then exactly one padded
        // block. A block-aligned plaintext still gets a whole pad block.
        let full = n - n % BLOCK_LEN;
        let rem = n - full;
        let mut last = [0u8; BLOCK_LEN];
        last[..rem].copy_from_slice(&buf[full..n]);
        last[rem..].fill((BLOCK_LEN - rem) as u8);

        for chunk in buf[..full].chunks_exact_mut(BLOCK_LEN) {
            enc.encrypt_block_mut(GenericArray::from_mut_slice(chunk));
        }
        enc.encrypt_block_mut(GenericArray::from_mut_slice(&mut last));

        mac.update(&buf[..full]);
        mac.update(&last);
        dest.write_all(&buf[..full])?;
        dest.write_all(&last)?;
        break;
    }

    let tag: [u8; TAG_LEN] = mac.finalize().into_bytes().into();
    EncryptedFileHeader::write_tag_in_place(&mut dest, &tag)?;
    dest.sync_all()?;
    Ok(())
}

/// Stream ciphertext back to plaintext through the decrypting reader,
/// which trims the pad by trusting the header's size field. `source` must
/// be positioned at the first ciphertext byte.
fn write_decrypted(
    source: File,
    dest: File,
    header: &EncryptedFileHeader,
    keys: &DerivedKeys,
) -> Result<(), CryptfileError> {
    let mut reader = DecryptingReader::new(BufReader::new(source), header, keys);
    let mut writer = BufWriter::new(dest);
    io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    let dest = writer
        .into_inner()
        .map_err(|e| CryptfileError::Io(e.into_error()))?;
    dest.sync_all()?;
    Ok(())
}

/// Read until `buf` is full or EOF; returns the number of bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn temp_stem(path: &Path) -> Result<String, CryptfileError> {
    Ok(path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
        .to_string_lossy()
        .into_owned())
}
