//! Config file discovery.
//!
//! Turns a logical name like `"lockbox"` into a concrete, writable file path.
//! Lookup order is: the directory given in the name itself, the user
//! directory, then the default (template) directory. Templates are never
//! edited in place: a match in the default directory is copied into the user
//! directory first.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TreeError};
use crate::format::{with_extension, Format};


/// Where a file was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Explicit,
    User,
    Default,
}


/// User and template directories for named config files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocator {
    pub user_dir: PathBuf,
    pub default_dir: PathBuf,
}

impl ConfigLocator {
    /// Locator over explicit user and template directories.
    pub fn new(user_dir: impl Into<PathBuf>, default_dir: impl Into<PathBuf>) -> Self {
        ConfigLocator {
            user_dir: user_dir.into(),
            default_dir: default_dir.into(),
        }
    }

    /// `MEMTREE_USER_DIR` / `MEMTREE_DEFAULT_DIR`, falling back to
    /// `~/.config/memtree` and `~/.config/memtree/defaults`.
    pub fn from_env() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        let base = PathBuf::from(home).join(".config").join("memtree");
        let user_dir = std::env::var("MEMTREE_USER_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| base.clone());
        let default_dir = std::env::var("MEMTREE_DEFAULT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| base.join("defaults"));
        ConfigLocator::new(user_dir, default_dir)
    }

    /// First existing file for `name` (extension already applied).
    pub fn find(&self, name: &str) -> Option<(PathBuf, Origin)> {
        let named = Path::new(name);
        let file = named.file_name()?;
        let mut candidates = Vec::with_capacity(3);
        if let Some(dir) = named.parent().filter(|d| !d.as_os_str().is_empty()) {
            candidates.push((dir.join(file), Origin::Explicit));
        }
        candidates.push((self.user_dir.join(file), Origin::User));
        candidates.push((self.default_dir.join(file), Origin::Default));
        candidates.into_iter().find(|(path, _)| path.is_file())
    }

    /// Resolve `name` to a path that exists after this call returns.
    ///
    /// When nothing matches, the `source` template (if it resolves) is
    /// copied to the target in the user directory; otherwise an empty file
    /// is created there.
    pub fn resolve(&self, name: &str, source: Option<&str>, format: &dyn Format) -> Result<PathBuf> {
        let named = with_extension(name, format);
        let file = Path::new(&named)
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| TreeError::InvalidPath(name.to_string()))?;

        if let Some((found, origin)) = self.find(&named) {
            if origin != Origin::Default {
                return Ok(found);
            }
            let dest = self.user_dir.join(&file);
            self.ensure_user_dir()?;
            fs::copy(&found, &dest).map_err(|e| TreeError::file_access(&dest, e))?;
            debug!("copied template {} to {}", found.display(), dest.display());
            return Ok(dest);
        }

        let target = self.user_dir.join(&file);
        self.ensure_user_dir()?;

        if let Some(src) = source {
            if let Some((src_path, _)) = self.find(&with_extension(src, format)) {
                fs::copy(&src_path, &target).map_err(|e| TreeError::file_access(&target, e))?;
                debug!(
                    "{} not found, created from source {}",
                    target.display(),
                    src_path.display()
                );
                return Ok(target);
            }
        }

        fs::File::create(&target).map_err(|e| TreeError::file_access(&target, e))?;
        debug!("{} not found, created empty file", target.display());
        Ok(target)
    }

    fn ensure_user_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.user_dir).map_err(|e| TreeError::file_access(&self.user_dir, e))
    }
}
