//! ui::prompts
//!
//! Interactive prompts and confirmations.
//!
//! # Design
//!
//! Prompts are only shown in interactive mode. In non-interactive mode
//! every prompt resolves to its default so headless runs never block.
//! Dry runs never prompt.

use std::io::{self, BufRead, Write};

use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(String),
}

/// Prompt for confirmation (yes/no).
///
/// Returns `Ok(true)` if the user confirms, `Ok(false)` if they decline.
/// An empty line takes the default, as does a non-interactive session.
/// EOF on stdin counts as a cancel.
pub fn confirm(message: &str, default: bool, interactive: bool) -> Result<bool, PromptError> {
    if !interactive {
        return Ok(default);
    }

    let hint = if default { "[Y/n]" } else { "[y/N]" };
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("{} {} ", message, hint);
        io::stdout()
            .flush()
            .map_err(|e| PromptError::IoError(e.to_string()))?;

        line.clear();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .map_err(|e| PromptError::IoError(e.to_string()))?;
        if read == 0 {
            return Err(PromptError::Cancelled);
        }

        match line.trim().to_ascii_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => continue,
        }
    }
}
