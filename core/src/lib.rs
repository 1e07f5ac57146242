//! memtree: a hierarchical settings tree persisted to a single YAML (or
//! JSON) file.
//!
//! Callers work through [`Branch`] views. Reads fall back through an
//! ordered defaults chain; writes land in the branch's own data and request
//! a save, which the [`MemoryTree`] debounces and writes atomically.
//! External edits to the file are picked up lazily on read.

pub mod branch;
pub mod error;
pub mod format;
pub mod store;
pub mod types;

pub use branch::{Assignment, Branch, BranchPath, Entry};
pub use error::{Result, TreeError};
pub use format::{Format, JsonFormat, YamlFormat};
pub use store::{Clock, ConfigLocator, FileOps, ManualClock, MemoryTree, SystemClock};
pub use types::{mapping, FormatKind, Leaf, Node, Submapping, TreeConfig, DEFAULT_DEADTIME_MS};
