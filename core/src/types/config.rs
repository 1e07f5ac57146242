use serde::{Deserialize, Serialize};

use crate::format::{Format, JsonFormat, YamlFormat};


/// Minimum interval between reload checks and between disk writes.
pub const DEFAULT_DEADTIME_MS: u64 = 3000;


#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    #[default]
    Yaml,
    Json,
}

impl FormatKind {
    pub fn backend(self) -> Box<dyn Format> {
        match self {
            FormatKind::Yaml => Box::new(YamlFormat),
            FormatKind::Json => Box::new(JsonFormat),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "yaml" | "yml" => Some(FormatKind::Yaml),
            "json" => Some(FormatKind::Json),
            _ => None,
        }
    }
}


/// Per-tree tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeConfig {
    #[serde(default = "default_deadtime_ms")]
    pub deadtime_ms: u64,
    #[serde(default)]
    pub format: FormatKind,
}

fn default_deadtime_ms() -> u64 {
    DEFAULT_DEADTIME_MS
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            deadtime_ms: DEFAULT_DEADTIME_MS,
            format: FormatKind::Yaml,
        }
    }
}

impl TreeConfig {
    /// Defaults overlaid with `MEMTREE_DEADTIME_MS` and `MEMTREE_FORMAT`.
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut cfg = TreeConfig::default();
        if let Ok(raw) = std::env::var("MEMTREE_DEADTIME_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => cfg.deadtime_ms = ms,
                Err(_) => tracing::warn!("ignoring MEMTREE_DEADTIME_MS={:?}: not a number", raw),
            }
        }
        if let Ok(raw) = std::env::var("MEMTREE_FORMAT") {
            match FormatKind::parse(&raw) {
                Some(kind) => cfg.format = kind,
                None => tracing::warn!("ignoring MEMTREE_FORMAT={:?}: expected yaml or json", raw),
            }
        }
        cfg
    }

    pub fn with_deadtime_ms(mut self, ms: u64) -> Self {
        self.deadtime_ms = ms;
        self
    }

    pub fn with_format(mut self, format: FormatKind) -> Self {
        self.format = format;
        self
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_three_seconds_yaml() {
        let cfg = TreeConfig::default();
        assert_eq!(cfg.deadtime_ms, 3000);
        assert_eq!(cfg.format, FormatKind::Yaml);
    }

    #[test]
    fn deserialize_fills_missing_fields() {
        let cfg: TreeConfig = serde_yaml::from_str("format: json\n").unwrap();
        assert_eq!(cfg.deadtime_ms, DEFAULT_DEADTIME_MS);
        assert_eq!(cfg.format, FormatKind::Json);
    }

    #[test]
    fn format_kind_parse() {
        assert_eq!(FormatKind::parse("YML"), Some(FormatKind::Yaml));
        assert_eq!(FormatKind::parse(" json "), Some(FormatKind::Json));
        assert_eq!(FormatKind::parse("toml"), None);
    }

    #[test]
    fn backend_extension_matches_kind() {
        assert_eq!(FormatKind::Yaml.backend().extension(), "yml");
        assert_eq!(FormatKind::Json.backend().extension(), "json");
    }

    #[test]
    fn builder_style_overrides() {
        let cfg = TreeConfig::default()
            .with_deadtime_ms(10)
            .with_format(FormatKind::Json);
        assert_eq!(cfg.deadtime_ms, 10);
        assert_eq!(cfg.format, FormatKind::Json);
    }
}
