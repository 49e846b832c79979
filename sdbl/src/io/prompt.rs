//! Yes/no confirmation.

use std::io::{self, BufRead, Stdin, Stdout, Write};

use anyhow::{Context, Result};

use crate::core::version::is_affirmative;

pub trait Confirm {
    /// Ask `question`; true only for an affirmative answer.
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Line-based prompt over any reader/writer pair. End of input declines.
pub struct TerminalConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl TerminalConfirm<io::StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(stdin.lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Confirm for TerminalConfirm<R, W> {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        write!(self.output, "{question} (yes/no): ").context("write prompt")?;
        self.output.flush().context("flush prompt")?;
        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("read answer")?;
        Ok(read > 0 && is_affirmative(&line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(input: &str) -> (bool, String) {
        let mut out = Vec::new();
        let answer = TerminalConfirm::new(input.as_bytes(), &mut out)
            .confirm("Continue anyway?")
            .expect("confirm");
        (answer, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn yes_continues() {
        let (answer, prompt) = ask("yes\n");
        assert!(answer);
        assert_eq!(prompt, "Continue anyway? (yes/no): ");
    }

    #[test]
    fn anything_else_declines() {
        assert!(!ask("no\n").0);
        assert!(!ask("\n").0);
        assert!(!ask("").0);
    }
}
