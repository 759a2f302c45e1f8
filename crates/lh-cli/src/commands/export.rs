//! Implementation of the `lh export` command.
//!
//! Round-trips a history CSV through the record store with the persisted
//! overlay applied: original columns are preserved verbatim, enrichment
//! columns reflect the overlay.

use std::path::Path;

use anyhow::{Context, Result};
use lh_core::Overlay;

/// Run the export command.
pub fn run(db: lh_db::Database, input: &Path, output: &Path) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let mut library = lh_core::csv::parse(&text)
        .with_context(|| format!("failed to parse {}", input.display()))?;

    let overlay = Overlay::load(db).context("failed to load overlay")?;
    overlay.apply_to(&mut library);

    let enriched = lh_core::csv::serialize(&library).context("failed to serialize records")?;
    std::fs::write(output, enriched)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Wrote {} records to {}", library.len(), output.display());
    Ok(())
}
