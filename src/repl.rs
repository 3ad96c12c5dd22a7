use std::io::{self, BufRead, Write};

use miette::Report;

use crate::eval::Evaluator;

/// Counts of what a [`Session`] did with its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub evaluated: usize,
    pub failed: usize,
}

/// Reads expressions line by line, printing each result to `output` and each
/// error report to `errors`. A malformed line never stops the session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    prompt: Option<String>,
    filename: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Name shown in diagnostics instead of `<input>`.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn run(
        &self,
        mut input: impl BufRead,
        mut output: impl Write,
        mut errors: impl Write,
    ) -> io::Result<Summary> {
        let mut summary = Summary::default();
        let mut line = String::new();

        loop {
            if let Some(prompt) = &self.prompt {
                write!(output, "{prompt}")?;
                output.flush()?;
            }

            line.clear();
            if input.read_line(&mut line)? == 0 {
                break;
            }

            let text = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
            if text.is_empty() {
                continue;
            }

            summary.evaluated += 1;
            match Evaluator::new(self.filename.as_deref(), text).evaluate() {
                Ok(number) => writeln!(output, "{number}")?,
                Err(e) => {
                    summary.failed += 1;
                    writeln!(errors, "Error: {e}")?;
                    writeln!(errors, "{:?}", Report::new(e))?;
                }
            }
        }

        Ok(summary)
    }
}
