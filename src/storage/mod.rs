//! Symbol list input and snapshot output

use crate::models::{Instrument, PriceSnapshot, SymbolList};
use anyhow::{Context, Result};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Read the instruments to price, in file order
pub fn read_symbol_list(path: &Path) -> Result<Vec<Instrument>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read symbol list {}", path.display()))?;
    let list: SymbolList = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid symbol list {}", path.display()))?;

    log::debug!("Loaded {} symbols from {}", list.stocks.len(), path.display());
    Ok(list.stocks)
}

/// Replace the snapshot file with `snapshot`, pretty-printed.
///
/// Written to a temp file in the same directory and renamed into place, so
/// readers see either the old or the new snapshot.
pub fn write_snapshot(path: &Path, snapshot: &PriceSnapshot) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, snapshot).context("Failed to serialize snapshot")?;
        writer.flush().context("Failed to write snapshot")?;
    }

    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    log::info!("Saved {} prices to {}", snapshot.len(), path.display());
    Ok(())
}
