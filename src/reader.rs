//! # Decrypting Reader
//!
//! A forward-only read view over the ciphertext region of an encrypted
//! file that yields the original plaintext bytes lazily, block by block,
//! without materializing a full decrypted copy.
//!
//! The reader reports the *logical* length and position — the header's
//! plaintext size and the number of plaintext bytes emitted — and trims
//! the final PKCS#7 pad by trusting the header's size field, which is
//! authoritative for logical length.
//!
//! Repositioning is restricted to a full rewind: CBC chaining state cannot
//! be reconstructed for an arbitrary offset, and silently returning
//! garbage plaintext is worse than refusing. Anything but seeking to the
//! start (or a zero-displacement position query) fails with
//! [`std::io::ErrorKind::Unsupported`]. Writing through this type is not
//! expressible at all — it does not implement `Write`.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, KeyIvInit};
use zeroize::Zeroizing;

use crate::consts::{BLOCK_LEN, HEADER_LEN, IV_LEN};
use crate::crypto::kdf::DerivedKeys;
use crate::crypto::Aes256CbcDec;
use crate::header::EncryptedFileHeader;

/// Streaming plaintext view over `inner`, which must be positioned at the
/// start of the ciphertext (directly after the header).
pub struct DecryptingReader<R> {
    inner: R,
    decryptor: Aes256CbcDec,
    // Retained so a rewind can rebuild the chaining state from scratch.
    cipher_key: Zeroizing<[u8; 32]>,
    iv: [u8; IV_LEN],
    plaintext_len: u64,
    emitted: u64,
    block: [u8; BLOCK_LEN],
    block_pos: usize,
    block_len: usize,
}

impl<R: Read> DecryptingReader<R> {
    pub(crate) fn new(inner: R, header: &EncryptedFileHeader, keys: &DerivedKeys) -> Self {
        Self {
            inner,
            decryptor: header.decryptor(keys),
            cipher_key: Zeroizing::new(*keys.cipher_key()),
            iv: *header.iv(),
            plaintext_len: header.plaintext_size() as u64,
            emitted: 0,
            block: [0u8; BLOCK_LEN],
            block_pos: 0,
            block_len: 0,
        }
    }

    /// Original (decrypted) payload length in bytes, from the header.
    pub fn len(&self) -> u64 {
        self.plaintext_len
    }

    pub fn is_empty(&self) -> bool {
        self.plaintext_len == 0
    }

    /// Logical plaintext position: bytes emitted so far.
    pub fn position(&self) -> u64 {
        self.emitted
    }

    /// Decrypt the next ciphertext block into the pending buffer.
    fn fill_block(&mut self) -> io::Result<()> {
        let mut ciphertext = [0u8; BLOCK_LEN];
        self.inner.read_exact(&mut ciphertext).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                io::Error::new(io::ErrorKind::InvalidData, "encrypted payload truncated")
            } else {
                e
            }
        })?;

        let block = GenericArray::from_mut_slice(&mut ciphertext);
        self.decryptor.decrypt_block_mut(block);
        self.block = ciphertext;
        self.block_pos = 0;
        // The final block carries PKCS#7 padding; the header's size field
        // decides how much of it is real payload.
        let remaining = self.plaintext_len - self.emitted;
        self.block_len = (BLOCK_LEN as u64).min(remaining) as usize;
        Ok(())
    }
}

impl<R: Read> Read for DecryptingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() && self.emitted < self.plaintext_len {
            if self.block_pos == self.block_len {
                self.fill_block()?;
            }
            let pending = &self.block[self.block_pos..self.block_len];
            let n = pending.len().min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&pending[..n]);
            self.block_pos += n;
            self.emitted += n as u64;
            filled += n;
        }
        Ok(filled)
    }
}

impl<R: Read + Seek> Seek for DecryptingReader<R> {
    /// Only a full rewind is supported. `Start(0)` repositions the
    /// underlying stream to the first ciphertext byte and rebuilds the
    /// CBC decryptor from the stored key and IV; zero-displacement
    /// variants are position queries. Every other target would desync the
    /// chaining state, so it is rejected rather than silently corrupting.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Start(0) => {
                self.inner.seek(SeekFrom::Start(HEADER_LEN as u64))?;
                self.decryptor = Aes256CbcDec::new((&*self.cipher_key).into(), (&self.iv).into());
                self.emitted = 0;
                self.block_pos = 0;
                self.block_len = 0;
                Ok(0)
            }
            SeekFrom::Current(0) => Ok(self.emitted),
            SeekFrom::Start(n) if n == self.emitted => Ok(self.emitted),
            _ => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "decrypting reader only supports rewinding to the start",
            )),
        }
    }
}

/// What [`crate::engine::CryptEngine::open_for_read`] hands back: either
/// the raw file (engine disabled, or the file was never encrypted) or a
/// decrypting view over it.
pub enum FileReadStream {
    Raw(File),
    Decrypted(DecryptingReader<io::BufReader<File>>),
}

impl FileReadStream {
    /// Logical length of what a full read would produce.
    pub fn logical_len(&self) -> io::Result<u64> {
        match self {
            FileReadStream::Raw(file) => Ok(file.metadata()?.len()),
            FileReadStream::Decrypted(reader) => Ok(reader.len()),
        }
    }

    pub fn is_decrypting(&self) -> bool {
        matches!(self, FileReadStream::Decrypted(_))
    }
}

impl Read for FileReadStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            FileReadStream::Raw(file) => file.read(buf),
            FileReadStream::Decrypted(reader) => reader.read(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::TAG_LEN;
    use aes::cipher::BlockEncryptMut;
    use secrecy::SecretString;
    use std::io::{Cursor, Write};

    /// Encrypt `plaintext` into a full container image in memory.
    fn encrypt_to_vec(plaintext: &[u8], keys: &DerivedKeys, header: &EncryptedFileHeader) -> Vec<u8> {
        let mut out = Vec::new();
        header.write_to(&mut out).unwrap();

        let mut enc = header.encryptor(keys);
        let mut padded = plaintext.to_vec();
        let pad = BLOCK_LEN - plaintext.len() % BLOCK_LEN;
        padded.extend(std::iter::repeat(pad as u8).take(pad));
        for chunk in padded.chunks_exact_mut(BLOCK_LEN) {
            enc.encrypt_block_mut(GenericArray::from_mut_slice(chunk));
        }
        out.write_all(&padded).unwrap();

        let mut cursor = Cursor::new(&mut out);
        let tag = EncryptedFileHeader::compute_tag(&mut cursor, keys).unwrap();
        out[crate::consts::TAG_OFFSET..crate::consts::TAG_OFFSET + TAG_LEN].copy_from_slice(&tag);
        out
    }

    fn reader_over(plaintext: &[u8]) -> DecryptingReader<Cursor<Vec<u8>>> {
        let password = SecretString::new("hunter2".to_string());
        let header = EncryptedFileHeader::generate(plaintext.len() as i64);
        let keys = header.derive_keys(&password, 10).unwrap();
        let image = encrypt_to_vec(plaintext, &keys, &header);
        let mut cursor = Cursor::new(image);
        cursor.seek(SeekFrom::Start(HEADER_LEN as u64)).unwrap();
        DecryptingReader::new(cursor, &header, &keys)
    }

    #[test]
    fn reads_back_plaintext() {
        for len in [0usize, 1, 15, 16, 17, 1000] {
            let plaintext: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let mut reader = reader_over(&plaintext);
            assert_eq!(reader.len(), len as u64);
            let mut got = Vec::new();
            reader.read_to_end(&mut got).unwrap();
            assert_eq!(got, plaintext, "len = {len}");
            assert_eq!(reader.position(), len as u64);
        }
    }

    #[test]
    fn byte_at_a_time_reads() {
        let plaintext = b"forward-only, one byte at a time";
        let mut reader = reader_over(plaintext);
        let mut got = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte).unwrap() {
                0 => break,
                _ => got.push(byte[0]),
            }
        }
        assert_eq!(got, plaintext);
    }

    #[test]
    fn rewind_restarts_from_offset_zero() {
        let plaintext = b"read me twice and I decrypt the same both times!";
        let mut reader = reader_over(plaintext);

        let mut first = Vec::new();
        reader.read_to_end(&mut first).unwrap();

        assert_eq!(reader.seek(SeekFrom::Start(0)).unwrap(), 0);
        assert_eq!(reader.position(), 0);
        let mut second = Vec::new();
        reader.read_to_end(&mut second).unwrap();

        assert_eq!(first, plaintext);
        assert_eq!(second, plaintext);
    }

    #[test]
    fn arbitrary_seek_is_unsupported() {
        let mut reader = reader_over(b"no mid-stream repositioning");
        for pos in [
            SeekFrom::Start(5),
            SeekFrom::Current(-1),
            SeekFrom::Current(3),
            SeekFrom::End(0),
        ] {
            let err = reader.seek(pos).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::Unsupported, "pos = {pos:?}");
        }
        // Position queries still work.
        assert_eq!(reader.seek(SeekFrom::Current(0)).unwrap(), 0);
    }

    #[test]
    fn truncated_ciphertext_is_invalid_data() {
        let plaintext = vec![0x5A; 100];
        let password = SecretString::new("hunter2".to_string());
        let header = EncryptedFileHeader::generate(plaintext.len() as i64);
        let keys = header.derive_keys(&password, 10).unwrap();
        let mut image = encrypt_to_vec(&plaintext, &keys, &header);
        image.truncate(image.len() - 40);

        let mut cursor = Cursor::new(image);
        cursor.seek(SeekFrom::Start(HEADER_LEN as u64)).unwrap();
        let mut reader = DecryptingReader::new(cursor, &header, &keys);
        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
