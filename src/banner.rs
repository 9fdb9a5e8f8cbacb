//! Startup banner and session summary display.

use std::path::Path;

use crate::backend::TokenUsage;
use crate::consts::{AUTHOR, format_number};

/// Session configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub provider: &'a str,
    pub model: &'a str,
    pub auth_status: &'a str,
    pub pipeline: &'a str,
    /// Shared memory capacity; `0` means disabled.
    pub memory_capacity: usize,
    pub output_dir: &'a Path,
}

pub fn print_banner(info: &BannerInfo) {
    let memory = match info.memory_capacity {
        0 => "off".to_string(),
        n => format!("{n} entries"),
    };
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║             T R O U P E               ║
   ║    one stage, many roles, in order    ║
   ╚═══════════════════════════════════════╝

   version   {}
   by        {}
   provider  {} ({})
   auth      {}
   crew      {}
   memory    {}
   output    {}
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        info.provider,
        info.model,
        info.auth_status,
        info.pipeline,
        memory,
        info.output_dir.display(),
    );
}

/// Token line, if anything was counted.
pub fn usage_line(usage: TokenUsage) -> Option<String> {
    (usage.total() > 0).then(|| {
        format!(
            "session: {:>6} input + {:>6} output = {:>6} tokens",
            format_number(usage.input_tokens),
            format_number(usage.output_tokens),
            format_number(usage.total()),
        )
    })
}

pub fn print_session_summary(usage: TokenUsage) {
    if let Some(line) = usage_line(usage) {
        println!("{line}");
    }
    println!("goodbye.");
}
