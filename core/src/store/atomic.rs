//! Backup-then-replace file writes.
//!
//! Sequence for `write(path, bytes)`:
//! 1. copy `path` to `path.bak` (best effort, the original is untouched so far),
//! 2. write `bytes` to `path.tmp`, flush and fsync,
//! 3. rename `path.tmp` over `path` (`std::fs::rename` replaces the target
//!    in one step, so a reader sees either the old or the new file),
//! 4. on failure in 2 or 3, drop the staging file, put the backup back if
//!    the target no longer matches it, and report [`TreeError::AtomicWrite`].

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::error::{Result, TreeError};

use super::fs::FileOps;


pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, ".bak")
}

pub fn staging_path(path: &Path) -> PathBuf {
    with_suffix(path, ".tmp")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}


pub struct AtomicWriter<'a> {
    ops: &'a dyn FileOps,
}

impl<'a> AtomicWriter<'a> {
    pub fn new(ops: &'a dyn FileOps) -> Self {
        AtomicWriter { ops }
    }

    pub fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let bak = backup_path(path);
        let tmp = staging_path(path);

        let have_backup = match self.ops.copy(path, &bak) {
            Ok(()) => true,
            Err(e) => {
                debug!("no backup of {}: {}", path.display(), e);
                false
            }
        };

        if let Err(source) = self.stage_and_replace(&tmp, path, bytes) {
            let _ = self.ops.remove(&tmp);
            if have_backup {
                self.restore(&bak, path);
            }
            error!(
                "error writing {}: {}; previous version kept",
                path.display(),
                source
            );
            return Err(TreeError::AtomicWrite {
                path: path.to_path_buf(),
                source,
            });
        }
        Ok(())
    }

    fn stage_and_replace(&self, tmp: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.ops.write_synced(tmp, bytes)?;
        self.ops.rename(tmp, path)
    }

    /// Copy the backup over `path` unless `path` already holds the same
    /// content, which keeps the target's mtime stable in the common case.
    fn restore(&self, bak: &Path, path: &Path) {
        let current = self.ops.read_to_string(path).ok();
        let saved = self.ops.read_to_string(bak).ok();
        if current.is_some() && current == saved {
            return;
        }
        if let Err(e) = self.ops.copy(bak, path) {
            error!("could not restore {} from {}: {}", path.display(), bak.display(), e);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fs::{FailStep, FaultyFileOps, StdFileOps};
    use std::fs;

    #[test]
    fn suffix_paths() {
        let p = Path::new("/cfg/lockbox.yml");
        assert_eq!(backup_path(p), PathBuf::from("/cfg/lockbox.yml.bak"));
        assert_eq!(staging_path(p), PathBuf::from("/cfg/lockbox.yml.tmp"));
    }

    #[test]
    fn successful_write_leaves_backup_and_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.yml");
        fs::write(&path, "old: 1\n").unwrap();

        AtomicWriter::new(&StdFileOps).write(&path, b"new: 2\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new: 2\n");
        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), "old: 1\n");
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn missing_original_still_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.yml");
        AtomicWriter::new(&StdFileOps).write(&path, b"a: 1\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a: 1\n");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn temp_write_failure_keeps_original_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.yml");
        fs::write(&path, "keep: me\n").unwrap();
        let before = fs::read(&path).unwrap();

        let ops = FaultyFileOps::new();
        ops.fail_on(FailStep::WriteTemp);
        let err = AtomicWriter::new(&ops).write(&path, b"lost: 1\n").unwrap_err();

        assert!(matches!(err, TreeError::AtomicWrite { .. }));
        assert_eq!(fs::read(&path).unwrap(), before);
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn rename_failure_keeps_original_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.yml");
        fs::write(&path, "keep: me\n").unwrap();
        let before = fs::read(&path).unwrap();

        let ops = FaultyFileOps::new();
        ops.fail_on(FailStep::Rename);
        assert!(AtomicWriter::new(&ops).write(&path, b"lost: 1\n").is_err());

        assert_eq!(fs::read(&path).unwrap(), before);
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn backup_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.yml");
        fs::write(&path, "old: 1\n").unwrap();

        let ops = FaultyFileOps::new();
        ops.fail_on(FailStep::Backup);
        AtomicWriter::new(&ops).write(&path, b"new: 1\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new: 1\n");
    }

    #[test]
    fn step_order_is_backup_write_rename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.yml");
        fs::write(&path, "old: 1\n").unwrap();

        let ops = FaultyFileOps::new();
        AtomicWriter::new(&ops).write(&path, b"new: 1\n").unwrap();
        assert_eq!(ops.call_names(), vec!["backup", "write", "rename"]);
    }
}
