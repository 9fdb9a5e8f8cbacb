use anyhow::{Result, bail};
use async_trait::async_trait;
use std::io::{self, BufRead, Write};

use super::{Backend, Completion};

/// You are the model. Read the prompt, type the completion.
///
/// Input ends at a line containing a single `.` (or EOF).
pub struct HumanBackend;

impl HumanBackend {
    fn print_prompt(prompt: &str) {
        println!("\n{}", "=".repeat(60));
        println!("{}", prompt);
        println!("{}", "=".repeat(60));
    }

    fn read_completion() -> Result<String> {
        print!("Completion (end with a line containing only '.'):\n> ");
        io::stdout().flush()?;

        let stdin = io::stdin();
        let mut lines = Vec::new();
        for line in stdin.lock().lines() {
            let line = line?;
            if line.trim() == "." {
                break;
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }
}

#[async_trait]
impl Backend for HumanBackend {
    fn name(&self) -> &str {
        "human"
    }

    async fn generate(&self, prompt: &str) -> Result<Completion> {
        Self::print_prompt(prompt);
        let text = tokio::task::spawn_blocking(Self::read_completion).await??;
        if text.trim().is_empty() {
            bail!("no completion entered");
        }
        Ok(Completion::text(text))
    }
}
