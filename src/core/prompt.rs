//! Interactive confirmation port.

use std::io::{self, BufRead, Write};

use crate::error::{Error, Result};
use crate::interrupt;

pub trait Prompt {
    /// Show `question` and return the operator's answer, trimmed.
    fn ask(&self, question: &str) -> Result<String>;
}

/// Reads answers from the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&self, question: &str) -> Result<String> {
        print!("{}", question);
        io::stdout().flush().ok();

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| Error::internal_io(e.to_string(), Some("read answer".to_string())))?;

        if interrupt::received() {
            return Err(Error::interrupted_while("waiting for confirmation"));
        }

        Ok(line.trim().to_string())
    }
}
