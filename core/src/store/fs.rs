//! Filesystem seam for the tree store.
//!
//! Every file touch the tree performs goes through [`FileOps`]. The
//! production implementation is [`StdFileOps`]; [`FaultyFileOps`] wraps it
//! and fails a chosen step on demand, which is how atomic-write recovery is
//! exercised without tampering with permissions.

use std::cell::{Cell, RefCell};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;


/// Filesystem operations used by the tree store and the atomic writer.
pub trait FileOps {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create or truncate `path`, write `bytes`, flush and fsync.
    fn write_synced(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Move `from` onto `to`, replacing `to` if it exists.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove(&self, path: &Path) -> io::Result<()>;
}


/// Shared handles, so a test can keep one end of a [`FaultyFileOps`].
impl<T: FileOps + ?Sized> FileOps for Rc<T> {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        (**self).read_to_string(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        (**self).modified(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        (**self).copy(from, to)
    }

    fn write_synced(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        (**self).write_synced(path, bytes)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        (**self).rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        (**self).remove(path)
    }
}


#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileOps;

impl FileOps for StdFileOps {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn write_synced(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut f = fs::File::create(path)?;
        f.write_all(bytes)?;
        f.flush()?;
        f.sync_all()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}


// ---------------------------------------------------------------------------
// Fault injection
// ---------------------------------------------------------------------------

/// A step of the save sequence that [`FaultyFileOps`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailStep {
    /// Copying the current file to its `.bak`.
    Backup,
    /// Writing the `.tmp` staging file.
    WriteTemp,
    /// Moving the staging file over the target.
    Rename,
    /// Reading the target's mtime. Fails with `PermissionDenied`.
    Stat,
}


/// Test double: delegates to [`StdFileOps`] but fails the armed step.
/// Every delegated write-side call is recorded in order.
#[derive(Debug, Default)]
pub struct FaultyFileOps {
    fail: Cell<Option<FailStep>>,
    pub calls: RefCell<Vec<(&'static str, PathBuf)>>,
}

impl FaultyFileOps {
    /// A double with no step armed.
    pub fn new() -> Self {
        FaultyFileOps::default()
    }

    /// Fail `step` on every attempt until [`FaultyFileOps::heal`] is called.
    pub fn fail_on(&self, step: FailStep) {
        self.fail.set(Some(step));
    }

    /// Stop failing.
    pub fn heal(&self) {
        self.fail.set(None);
    }

    fn check(&self, step: FailStep, op: &'static str, path: &Path) -> io::Result<()> {
        self.calls.borrow_mut().push((op, path.to_path_buf()));
        if self.fail.get() == Some(step) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("injected failure in {:?}", step),
            ));
        }
        Ok(())
    }

    /// Recorded operation names, in call order.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.borrow().iter().map(|(op, _)| *op).collect()
    }
}

impl FileOps for FaultyFileOps {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        StdFileOps.read_to_string(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        if self.fail.get() == Some(FailStep::Stat) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("injected failure stating {}", path.display()),
            ));
        }
        StdFileOps.modified(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let is_backup = to.extension().map_or(false, |e| e == "bak");
        if is_backup {
            self.check(FailStep::Backup, "backup", to)?;
        } else {
            self.calls.borrow_mut().push(("copy", to.to_path_buf()));
        }
        StdFileOps.copy(from, to)
    }

    fn write_synced(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.check(FailStep::WriteTemp, "write", path)?;
        StdFileOps.write_synced(path, bytes)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check(FailStep::Rename, "rename", to)?;
        StdFileOps.rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.calls.borrow_mut().push(("remove", path.to_path_buf()));
        StdFileOps.remove(path)
    }
}
