//! src/engine/replace.rs
//! Unique temp-path allocation and the rename-based atomic replace
//! protocol. The original path is never left missing or half-written,
//! at the cost of a brief window where old and new content coexist
//! under different names.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::error::CryptfileError;

/// Create (and claim, via `create_new`) a uniquely named file in `dir`.
///
/// Collisions are avoided by an incrementing numeric suffix:
/// `{stem}.0.{ext}`, `{stem}.1.{ext}`, …
pub(crate) fn claim_unique(
    dir: &Path,
    stem: &str,
    ext: &str,
) -> Result<(PathBuf, File), CryptfileError> {
    for n in 0u32.. {
        let candidate = dir.join(format!("{stem}.{n}.{ext}"));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    unreachable!("u32 suffix space exhausted")
}

/// First sibling name with an incrementing numeric suffix that does not
/// exist yet. Used for the backup name in the replace protocol, where the
/// slot is immediately filled by a rename.
fn unique_sibling(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    for n in 0u32.. {
        let candidate = dir.join(format!("{stem}.{n}.{ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!("u32 suffix space exhausted")
}

/// Atomically swap `candidate` into `target`'s place:
///
/// 1. rename `target` → unique backup sibling
/// 2. rename `candidate` → `target`
/// 3. if step 2 fails, rename the backup back (rollback) and re-raise
/// 4. if step 2 succeeds, delete the backup (best-effort, logged)
pub fn atomic_replace(candidate: &Path, target: &Path) -> Result<(), CryptfileError> {
    let dir = target.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "target path has no parent directory")
    })?;
    let stem = target
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target path has no file name"))?
        .to_string_lossy()
        .into_owned();

    let backup = unique_sibling(dir, &stem, "bak");
    fs::rename(target, &backup)?;

    if let Err(swap_err) = fs::rename(candidate, target) {
        if let Err(undo_err) = fs::rename(&backup, target) {
            // Rollback itself failed: the previous content still exists
            // under the backup name, so nothing is lost, but the target
            // path is momentarily absent.
            error!(
                backup = %backup.display(),
                target = %target.display(),
                %undo_err,
                "rollback rename failed after replace failure"
            );
        }
        return Err(swap_err.into());
    }

    if let Err(rm_err) = fs::remove_file(&backup) {
        // Not fatal: the swap already succeeded. The stale backup just
        // lingers until something sweeps it up.
        warn!(backup = %backup.display(), %rm_err, "could not delete replace backup");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn claim_unique_increments_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let (a, _fa) = claim_unique(dir.path(), "blob.bin", "enc").unwrap();
        let (b, _fb) = claim_unique(dir.path(), "blob.bin", "enc").unwrap();
        assert_eq!(a.file_name().unwrap(), "blob.bin.0.enc");
        assert_eq!(b.file_name().unwrap(), "blob.bin.1.enc");
    }

    #[test]
    fn replace_swaps_content_and_removes_backup() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data.txt");
        let candidate = dir.path().join("data.txt.0.enc");
        fs::write(&target, b"old").unwrap();
        fs::write(&candidate, b"new").unwrap();

        atomic_replace(&candidate, &target).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1, "backup and candidate must both be gone");
    }

    #[test]
    fn failed_swap_rolls_back_original() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data.txt");
        let mut f = File::create(&target).unwrap();
        f.write_all(b"precious original bytes").unwrap();
        drop(f);

        // A candidate that does not exist makes step 2 fail.
        let missing = dir.path().join("no-such-candidate");
        let err = atomic_replace(&missing, &target).unwrap_err();
        assert!(matches!(err, CryptfileError::Io(_)));

        assert_eq!(fs::read(&target).unwrap(), b"precious original bytes");
    }
}
