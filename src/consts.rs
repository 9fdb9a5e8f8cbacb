//! Project-wide constants.

use std::path::PathBuf;

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default Anthropic model when none is specified.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Default Groq model when none is specified.
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";

/// Default OpenRouter model when none is specified.
pub const DEFAULT_OPENROUTER_MODEL: &str = "meta-llama/llama-3.1-8b-instruct:free";

/// Shared memory keeps this many (role, content) entries before evicting.
pub const DEFAULT_MEMORY_CAPACITY: usize = 20;

/// Rolling history is cut to its last N characters when embedded in a prompt.
pub const DEFAULT_CONTEXT_WINDOW: usize = 1500;

/// Longest message the relay will hand to the transport in one piece.
pub const RELAY_CHUNK_LIMIT: usize = 3500;

/// Default database path: `~/.troupe/troupe.db`.
/// Single DB for settings and credentials.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".troupe")
        .join("troupe.db")
}

/// Format a number with comma separators (e.g. 1,234,567).
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}
