//! Streaming reader settings

use serde::{Deserialize, Serialize};

/// Default maximum container nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Streaming reader settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Maximum number of simultaneously open containers
    pub max_depth: usize,
}

impl ReaderConfig {
    /// Create settings with the default depth bound
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Create settings with a custom depth bound
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde() {
        let config = ReaderConfig::with_max_depth(8);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"max_depth":8}"#);
        let back: ReaderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert_eq!(ReaderConfig::default().max_depth, DEFAULT_MAX_DEPTH);
    }
}
