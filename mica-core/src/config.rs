use serde::{Deserialize, Serialize};

/// Engine-wide tunables. All fields have serde defaults so partial configs
/// deserialize cleanly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Undo stack cap; oldest entries are discarded past this.
    #[serde(default = "default_max_history_entries")]
    pub max_history_entries: usize,

    /// Default search result cap when a query does not set one.
    #[serde(default = "default_search_result_limit")]
    pub search_result_limit: usize,

    /// Lines of context captured before and after each content match.
    #[serde(default = "default_search_context_lines")]
    pub search_context_lines: usize,
}

fn default_max_history_entries() -> usize {
    100
}

fn default_search_result_limit() -> usize {
    100
}

fn default_search_context_lines() -> usize {
    2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_history_entries: default_max_history_entries(),
            search_result_limit: default_search_result_limit(),
            search_context_lines: default_search_context_lines(),
        }
    }
}
