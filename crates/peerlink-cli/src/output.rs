//! JSON renderers shared by command handlers.

use std::io::Write;

use anyhow::Context;
use serde::Serialize;

use crate::error::{CliError, CliResult};

/// Write `value` as one compact JSON line.
pub(crate) fn write_json_line<W: Write, T: Serialize>(out: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)
        .context("failed to format JSON")
        .map_err(CliError::failure)?;
    writeln!(out)
        .context("failed to write output")
        .map_err(CliError::failure)
}

/// Write `value` as indented JSON followed by a newline.
pub(crate) fn write_json_pretty<W: Write, T: Serialize>(out: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)
        .context("failed to format JSON")
        .map_err(CliError::failure)?;
    writeln!(out)
        .context("failed to write output")
        .map_err(CliError::failure)
}
