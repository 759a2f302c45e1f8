//! Implementation of the `lh overlay` command.
//!
//! Lists the persisted overlay entries, for checking what corrections are on
//! file.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use lh_core::Overlay;

/// Run the overlay command.
pub fn run(db: lh_db::Database, json: bool) -> Result<()> {
    let overlay = Overlay::load(db).context("failed to load overlay")?;

    // BTreeMap for stable output order; the overlay itself is unordered.
    let entries: BTreeMap<&str, _> = overlay.iter().collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No overlay entries.");
        return Ok(());
    }

    for (key, patch) in entries {
        let mut fields = Vec::new();
        if let Some(d) = patch.duration_secs {
            fields.push(format!("duration={d}s"));
        }
        if let Some(g) = &patch.genre {
            fields.push(format!("genre={g}"));
        }
        if let Some(f) = &patch.feat {
            fields.push(format!("feat={f}"));
        }
        if let Some(p) = &patch.prod {
            fields.push(format!("prod={p}"));
        }
        if let Some(l) = &patch.label {
            fields.push(format!("label={l}"));
        }
        println!("{key}  {}", fields.join(", "));
    }
    Ok(())
}
