//! `format`: print the canonical serialization of a markup file.

use std::fs;
use std::io::{Write, stdout};
use std::path::Path;

use anyhow::{Context, Result};

use crate::serializer::format_markup;

pub fn format_file(file: &Path) -> Result<()> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let formatted = format_markup(&source)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let mut out = stdout().lock();
    out.write_all(formatted.as_bytes())?;
    out.flush()?;
    Ok(())
}
