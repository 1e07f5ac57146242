//! Dotted branch paths such as `lockbox.pid.p`.
//!
//! The empty string is the root. Segments are literal keys; empty segments
//! (`a..b`, leading or trailing dots) are rejected.

use std::fmt;

use crate::error::{Result, TreeError};


#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BranchPath {
    segments: Vec<String>,
}

impl BranchPath {
    /// The empty path.
    pub fn root() -> Self {
        BranchPath {
            segments: Vec::new(),
        }
    }

    /// Parse a dotted string. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(BranchPath::root());
        }
        let mut segments = Vec::new();
        for part in input.split('.') {
            if part.is_empty() {
                return Err(TreeError::InvalidPath(format!(
                    "empty segment in path '{}'",
                    input
                )));
            }
            segments.push(part.to_string());
        }
        Ok(BranchPath { segments })
    }

    /// Keys from the root down.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True for the empty path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    /// This path extended by `key`.
    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        BranchPath { segments }
    }

    /// `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(self.prefix(self.segments.len() - 1))
    }

    /// The first `n` segments.
    pub fn prefix(&self, n: usize) -> Self {
        BranchPath {
            segments: self.segments[..n.min(self.segments.len())].to_vec(),
        }
    }

    /// Segments joined with `.`; empty for the root.
    pub fn to_dotted(&self) -> String {
        self.segments.join(".")
    }
}

impl fmt::Display for BranchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dotted())
    }
}
