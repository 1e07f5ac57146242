//! File-backed tree store.
//!
//! [`MemoryTree`] owns the root mapping and is the only writer of the
//! backing file. Saves go through [`AtomicWriter`] (backup, staged write,
//! rename); time comes from an injected [`Clock`] and every filesystem touch
//! from an injected [`FileOps`].

pub mod atomic;
pub mod clock;
pub mod fs;
pub mod locate;
pub mod timer;
pub mod tree;

pub use atomic::{backup_path, staging_path, AtomicWriter};
pub use clock::{Clock, ManualClock, SystemClock};
pub use fs::{FailStep, FaultyFileOps, FileOps, StdFileOps};
pub use locate::{ConfigLocator, Origin};
pub use timer::SaveTimer;
pub use tree::MemoryTree;
