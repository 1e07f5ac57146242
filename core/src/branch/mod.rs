//! Branch views: dotted-path addressing into a tree plus defaults chains.
//!
//! A [`Branch`] holds only a path and its defaults; the data lives in the
//! owning [`crate::store::MemoryTree`].

pub mod path;
pub mod view;

pub use path::BranchPath;
pub use view::{Assignment, Branch, Entry};
