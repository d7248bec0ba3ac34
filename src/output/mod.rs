//! Output writers for analysis results.
//!
//! Everything leaves the tool as JSON; rendering for humans is left to
//! downstream consumers.

use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use crate::core::Result;

/// Output format enum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// Indented JSON.
    #[default]
    Json,
    /// Single-line JSON.
    JsonCompact,
}

impl Format {
    pub fn format_value<W: Write>(&self, value: &Value, writer: &mut W) -> Result<()> {
        match self {
            Format::Json => serde_json::to_writer_pretty(&mut *writer, value)?,
            Format::JsonCompact => serde_json::to_writer(&mut *writer, value)?,
        }
        writeln!(writer)?;
        Ok(())
    }

    pub fn format<T: Serialize, W: Write>(&self, data: &T, writer: &mut W) -> Result<()> {
        let value = serde_json::to_value(data)?;
        self.format_value(&value, writer)
    }
}
