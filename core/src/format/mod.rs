//! Serialization backends for the backing file.
//!
//! A backend turns file text into a [`Submapping`] and back. YAML is the
//! preferred format (human-editable, order preserving); JSON is available as
//! a fallback. Both keep key order across a load/save round trip.

pub mod json;
pub mod yaml;

use crate::error::Result;
use crate::types::Submapping;

pub use json::JsonFormat;
pub use yaml::YamlFormat;


/// A text format the tree can be persisted in.
pub trait Format {
    /// Short name used in error messages, e.g. `"yaml"`.
    fn name(&self) -> &'static str;

    /// Required file extension, without the dot.
    fn extension(&self) -> &'static str;

    /// Parse a whole document. Empty or null documents yield an empty
    /// mapping; any other non-mapping top level is a parse error.
    fn parse(&self, text: &str) -> Result<Submapping>;

    /// Render a mapping as a standalone document.
    fn render(&self, data: &Submapping) -> Result<String>;
}


/// Append the backend's extension unless `name` already carries it.
pub fn with_extension(name: &str, format: &dyn Format) -> String {
    let suffix = format!(".{}", format.extension());
    if name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}
