//! The tree store: owner of the root mapping and the only component that
//! touches the backing file.
//!
//! Internal load logic:
//! 1. construction calls `load` to read the file,
//! 2. every branch read calls `reload_if_stale`, which stats the file at most
//!    once per deadtime window and reloads only when the mtime moved.
//!
//! Internal save logic:
//! - a save request writes immediately when the last write is at least one
//!   deadtime old; otherwise it arms a one-shot timer for the end of the
//!   window (an armed timer is never re-armed) and returns,
//! - the owner drives the timer with [`MemoryTree::poll`]; the flush it
//!   triggers renders the root as it is at that moment, so a burst of
//!   writes becomes a single disk write carrying the final state,
//! - [`MemoryTree::save_now`] cancels the timer and writes synchronously.

use std::cell::RefCell;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, error, warn};

use crate::branch::Branch;
use crate::error::{Result, TreeError};
use crate::format::Format;
use crate::types::{Submapping, TreeConfig};

use super::atomic::AtomicWriter;
use super::clock::{Clock, SystemClock};
use super::fs::{FileOps, StdFileOps};
use super::locate::ConfigLocator;
use super::timer::SaveTimer;


/// Mutable part of the tree, behind a `RefCell` so that branch views can
/// share `&MemoryTree`.
#[derive(Debug)]
struct TreeState {
    root: Submapping,
    /// File mtime as of our last load or save.
    mtime: Option<SystemTime>,
    last_save_ms: u64,
    last_reload_ms: u64,
    save_counter: u64,
    disk_writes: u64,
    timer: SaveTimer,
}


/// Owner of a settings tree and the only writer of its backing file.
pub struct MemoryTree {
    path: Option<PathBuf>,
    deadtime_ms: u64,
    format: Box<dyn Format>,
    clock: Box<dyn Clock>,
    ops: Box<dyn FileOps>,
    state: RefCell<TreeState>,
}

impl MemoryTree {
    /// A tree without a backing file. Load, reload and save are no-ops.
    pub fn in_memory() -> Self {
        let config = TreeConfig::default();
        MemoryTree::build(None, &config, Box::new(SystemClock::new()), Box::new(StdFileOps))
    }

    /// Bind to an existing file and load it.
    pub fn at_path(path: impl Into<PathBuf>, config: TreeConfig) -> Result<Self> {
        MemoryTree::from_parts(
            Some(path.into()),
            config,
            Box::new(SystemClock::new()),
            Box::new(StdFileOps),
        )
    }

    /// Resolve a logical name through `locator` and load the result.
    /// `None` gives an in-memory tree.
    pub fn open(
        name: Option<&str>,
        source: Option<&str>,
        locator: &ConfigLocator,
        config: TreeConfig,
    ) -> Result<Self> {
        let path = match name {
            Some(name) => Some(locator.resolve(name, source, config.format.backend().as_ref())?),
            None => None,
        };
        MemoryTree::from_parts(path, config, Box::new(SystemClock::new()), Box::new(StdFileOps))
    }

    /// Full control over the time source and filesystem.
    pub fn from_parts(
        path: Option<PathBuf>,
        config: TreeConfig,
        clock: Box<dyn Clock>,
        ops: Box<dyn FileOps>,
    ) -> Result<Self> {
        let tree = MemoryTree::build(path, &config, clock, ops);
        tree.load()?;
        Ok(tree)
    }

    fn build(
        path: Option<PathBuf>,
        config: &TreeConfig,
        clock: Box<dyn Clock>,
        ops: Box<dyn FileOps>,
    ) -> Self {
        let now = clock.now_ms();
        MemoryTree {
            path,
            deadtime_ms: config.deadtime_ms,
            format: config.format.backend(),
            clock,
            ops,
            state: RefCell::new(TreeState {
                root: Submapping::new(),
                mtime: None,
                last_save_ms: now,
                last_reload_ms: now,
                save_counter: 0,
                disk_writes: 0,
                timer: SaveTimer::new(),
            }),
        }
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    /// Backing file, `None` for an in-memory tree.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Minimum interval between reload checks and between writes.
    pub fn deadtime_ms(&self) -> u64 {
        self.deadtime_ms
    }

    /// Serialization backend for the backing file.
    pub fn format(&self) -> &dyn Format {
        self.format.as_ref()
    }

    /// Number of save requests made so far (diagnostic).
    pub fn save_counter(&self) -> u64 {
        self.state.borrow().save_counter
    }

    /// Number of completed file writes (diagnostic).
    pub fn disk_writes(&self) -> u64 {
        self.state.borrow().disk_writes
    }

    /// True while a deferred save is armed.
    pub fn has_pending_save(&self) -> bool {
        self.state.borrow().timer.is_active()
    }

    /// When the pending deferred save is due, on this tree's clock.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.state.borrow().timer.due_at()
    }

    /// A copy of the whole tree as it is in memory.
    pub fn snapshot(&self) -> Submapping {
        self.state.borrow().root.clone()
    }

    /// View of the whole tree, without defaults.
    pub fn root(&self) -> Branch<'_> {
        Branch::root(self)
    }

    /// Top-level sub-branch `name`.
    pub fn branch(&self, name: &str) -> Result<Branch<'_>> {
        self.root().branch(name)
    }

    /// Navigate a dotted path from the root and attach `defaults`.
    pub fn resolve<'t>(&'t self, dotted: &str, defaults: Vec<Branch<'t>>) -> Result<Branch<'t>> {
        self.root().resolve_path(dotted, defaults)
    }

    pub(crate) fn with_root<R>(&self, f: impl FnOnce(&Submapping) -> R) -> R {
        f(&self.state.borrow().root)
    }

    pub(crate) fn with_root_mut<R>(&self, f: impl FnOnce(&mut Submapping) -> R) -> R {
        f(&mut self.state.borrow_mut().root)
    }

    // -------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------

    /// Read and parse the backing file, replacing the in-memory tree.
    ///
    /// Malformed content is not fatal: the tree becomes empty and a
    /// warning is logged.
    pub fn load(&self) -> Result<()> {
        let path = match &self.path {
            Some(p) => p,
            None => return Ok(()),
        };
        debug!("loading config file {}", path.display());
        let text = self
            .ops
            .read_to_string(path)
            .map_err(|e| TreeError::file_access(path, e))?;
        let root = match self.format.parse(&text) {
            Ok(root) => root,
            Err(e) => {
                warn!("{} could not be parsed, starting from an empty tree: {}", path.display(), e);
                Submapping::new()
            }
        };
        let mtime = self
            .ops
            .modified(path)
            .map_err(|e| TreeError::file_access(path, e))?;

        let mut st = self.state.borrow_mut();
        st.root = root;
        st.mtime = Some(mtime);
        st.last_reload_ms = self.clock.now_ms();
        Ok(())
    }

    /// Reload if the file changed on disk, checking at most once per
    /// deadtime window. A vanished file keeps the in-memory tree; any other
    /// stat failure is returned.
    pub fn reload_if_stale(&self) -> Result<()> {
        let path = match &self.path {
            Some(p) => p,
            None => return Ok(()),
        };
        let now = self.clock.now_ms();
        let stored = {
            let mut st = self.state.borrow_mut();
            if now.saturating_sub(st.last_reload_ms) < self.deadtime_ms {
                return Ok(());
            }
            st.last_reload_ms = now;
            st.mtime
        };
        match self.ops.modified(path) {
            Ok(current) if Some(current) != stored => {
                debug!("{} changed on disk, reloading", path.display());
                self.load()
            }
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("{} has vanished, keeping in-memory tree", path.display());
                Ok(())
            }
            Err(e) => Err(TreeError::file_access(path, e)),
        }
    }

    // -------------------------------------------------------------------
    // Saving
    // -------------------------------------------------------------------

    /// Request a save under the configured deadtime.
    pub fn save(&self) -> Result<()> {
        self.save_within(None)
    }

    /// Request a save, writing now if at least `deadtime_ms` (default: the
    /// tree's deadtime) has passed since the last write, otherwise deferring
    /// it to the end of that window.
    pub fn save_within(&self, deadtime_ms: Option<u64>) -> Result<()> {
        self.state.borrow_mut().save_counter += 1;
        self.flush_or_defer(deadtime_ms)
    }

    /// Cancel any deferred save and write synchronously.
    pub fn save_now(&self) -> Result<()> {
        self.state.borrow_mut().timer.stop();
        let result = self.save_within(Some(0));
        self.state.borrow_mut().timer.stop();
        result
    }

    /// Run the deferred save if it is due. Returns whether a flush ran.
    ///
    /// Errors are logged here, since the request that armed the timer has
    /// long returned, and also handed back to the poller.
    pub fn poll(&self) -> Result<bool> {
        let now = self.clock.now_ms();
        if !self.state.borrow_mut().timer.take_if_due(now) {
            return Ok(false);
        }
        match self.flush_or_defer(None) {
            Ok(()) => Ok(true),
            Err(e) => {
                error!("deferred save failed: {}", e);
                Err(e)
            }
        }
    }

    fn flush_or_defer(&self, deadtime_ms: Option<u64>) -> Result<()> {
        let path = match &self.path {
            Some(p) => p,
            None => return Ok(()),
        };
        let deadtime = deadtime_ms.unwrap_or(self.deadtime_ms);
        let now = self.clock.now_ms();
        let mut st = self.state.borrow_mut();

        if now.saturating_sub(st.last_save_ms) >= deadtime {
            st.last_save_ms = now;
            st.timer.stop();
            self.write_file(path, &mut st)
        } else {
            let due = st.last_save_ms.saturating_add(deadtime);
            if st.timer.start(due) {
                debug!("save of {} deferred until {} ms", path.display(), due);
            }
            Ok(())
        }
    }

    fn write_file(&self, path: &Path, st: &mut TreeState) -> Result<()> {
        match self.ops.modified(path) {
            Ok(current) if Some(current) != st.mtime => {
                warn!(
                    "{} has been changed on disk by someone else; those changes are overwritten now",
                    path.display()
                );
            }
            Ok(_) => {}
            Err(e) => debug!("cannot stat {} before save: {}", path.display(), e),
        }
        debug!("saving config file {}", path.display());
        let text = self.format.render(&st.root)?;
        AtomicWriter::new(self.ops.as_ref()).write(path, text.as_bytes())?;
        st.disk_writes += 1;
        st.mtime = self.ops.modified(path).ok();
        Ok(())
    }
}

impl Drop for MemoryTree {
    fn drop(&mut self) {
        if self.state.borrow().timer.is_active() {
            if let Err(e) = self.save_now() {
                error!("final flush on drop failed: {}", e);
            }
        }
    }
}

impl fmt::Debug for MemoryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTree")
            .field("path", &self.path)
            .field("deadtime_ms", &self.deadtime_ms)
            .field("format", &self.format.name())
            .field("state", &self.state)
            .finish()
    }
}
