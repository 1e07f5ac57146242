//! Error taxonomy for the settings tree.
//!
//! Read-path key absence and write-path I/O failures surface to the caller.
//! Parse failures while loading the backing file are absorbed by the tree
//! store (it falls back to an empty mapping) and only reach callers through
//! explicit imports.

use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, TreeError>;

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The backing file or a directory on its path could not be read,
    /// stat'ed, copied or created.
    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Text handed to a serialization backend was malformed.
    #[error("malformed {format} content: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    /// A read found the key neither in the branch nor in any default.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The backup-then-replace sequence failed. The previous file content
    /// has already been restored when this is returned.
    #[error("atomic write to {} failed, previous content restored: {source}", path.display())]
    AtomicWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A backend could not render the in-memory tree.
    #[error("cannot render tree: {0}")]
    Render(String),

    #[error("'{0}' holds a leaf value, not a branch")]
    NotABranch(String),

    #[error("'{0}' is a branch, not a leaf value")]
    NotALeaf(String),

    /// Rename and erase need a parent, which the root does not have.
    #[error("the root branch cannot be {0}")]
    RootBranch(&'static str),

    #[error("invalid branch path: {0}")]
    InvalidPath(String),
}

impl TreeError {
    pub(crate) fn file_access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TreeError::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// True for errors that mean "nothing stored under that name".
    pub fn is_not_found(&self) -> bool {
        matches!(self, TreeError::KeyNotFound(_))
    }
}
