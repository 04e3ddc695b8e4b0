//! Interactive conflict prompt

use crate::conflict::{ConflictKind, ConflictRequest, Decider};
use crate::error::{Error, Result};
use std::io::{self, BufRead, StdinLock, Stdout, Write};

/// Asks a human to pick a numbered option, re-asking until the answer is a
/// number in range
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompt<StdinLock<'static>, Stdout> {
    /// Prompt on the process's stdin/stdout
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Give back the output sink (used by tests to inspect the transcript)
    pub fn into_output(self) -> W {
        self.output
    }

    fn show(&mut self, request: &ConflictRequest<'_>) -> io::Result<()> {
        writeln!(self.output)?;
        match request.kind {
            ConflictKind::Param => writeln!(
                self.output,
                "[CONFLICT] Multiple changes detected for parameter '{}':",
                request.subject
            )?,
            ConflictKind::File => writeln!(
                self.output,
                "[CONFLICT] The same file '{}' was found in multiple mods:",
                request.subject
            )?,
        }

        for (i, option) in request.options.iter().enumerate() {
            match option.preview {
                Some(value) => writeln!(self.output, "  {}. '{}' (from {})", i + 1, value, option.source)?,
                None => writeln!(self.output, "  {}. Use version from mod '{}'", i + 1, option.source)?,
            }
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> Decider for ConsolePrompt<R, W> {
    fn decide(&mut self, request: &ConflictRequest<'_>) -> Result<usize> {
        let count = request.options.len();
        self.show(request)?;

        loop {
            write!(
                self.output,
                "Enter the number of the desired option (1-{count}): "
            )?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(Error::PromptClosed);
            }

            match line.trim().parse::<usize>() {
                Ok(choice) if (1..=count).contains(&choice) => {
                    writeln!(self.output, "Option {choice} selected.")?;
                    return Ok(choice - 1);
                }
                Ok(_) => writeln!(self.output, "Error: Invalid number.")?,
                Err(_) => writeln!(self.output, "Error: Please enter a number.")?,
            }
        }
    }
}
