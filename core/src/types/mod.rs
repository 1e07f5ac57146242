pub mod config;
pub mod node;

pub use config::{FormatKind, TreeConfig, DEFAULT_DEADTIME_MS};
pub use node::{mapping, Leaf, Node, Submapping};
