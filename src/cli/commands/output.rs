//! Result rendering for text and JSON modes.

use crate::cli::args::OutputFormat;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;

/// Writes command results in the selected format.
pub struct Output<'a> {
    format: OutputFormat,
    out: &'a mut dyn Write,
}

impl<'a> Output<'a> {
    pub fn new(format: OutputFormat, out: &'a mut dyn Write) -> Self {
        Self { format, out }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Emit `value` as JSON in JSON mode, or the lines from `text` otherwise.
    pub fn emit<T, F>(&mut self, value: &T, text: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce() -> Vec<String>,
    {
        if self.is_json() {
            writeln!(self.out, "{}", serde_json::to_string_pretty(value)?)?;
        } else {
            for line in text() {
                writeln!(self.out, "{line}")?;
            }
        }
        Ok(())
    }
}
