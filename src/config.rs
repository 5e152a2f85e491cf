//! Runtime limits and tuning

use serde::Deserialize;

/// Default number of allocations between automatic collections.
pub const DEFAULT_GC_THRESHOLD: usize = 10_000;

/// Fixed capacities and tuning knobs for one interpreter.
///
/// Exceeding a capacity at run time is a fatal error. Every field has a
/// default, so a partial JSON document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Value-stack capacity in slots
    pub stack_size: usize,
    /// Maximum number of active calls
    pub max_call_depth: usize,
    /// Maximum number of active try blocks
    pub max_try_depth: usize,
    /// Allocations between automatic collections; 0 disables them
    pub gc_threshold: usize,
    /// Nesting limit for the parser and the compiler
    pub max_syntax_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: 4096,
            max_call_depth: 200,
            max_try_depth: 64,
            gc_threshold: DEFAULT_GC_THRESHOLD,
            max_syntax_depth: 200,
        }
    }
}

impl RuntimeConfig {
    /// Defaults, with `gc_threshold` taken from `GC_THRESHOLD` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(threshold) = std::env::var("GC_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            config.gc_threshold = threshold;
        }
        config
    }

    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
