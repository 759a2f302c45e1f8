//! Implementation of the `lh enrich` command.
//!
//! Records a metadata correction for one track identity in the persisted
//! overlay. The correction applies to every subsequent report and export.

use anyhow::{Context, Result, bail};
use lh_core::{Library, MetadataPatch, Overlay, TrackIdentity};

/// Run the enrich command.
pub fn run(
    db: lh_db::Database,
    artist: &str,
    album: &str,
    track: &str,
    patch: MetadataPatch,
) -> Result<()> {
    if patch.is_empty() {
        bail!("nothing to enrich: pass at least one of --duration, --genre, --feat, --prod, --label");
    }

    let identity = TrackIdentity::new(artist.trim(), album.trim(), track.trim());
    let mut overlay = Overlay::load(db).context("failed to load overlay")?;

    // No library is loaded in a one-shot CLI invocation; the overlay entry
    // alone carries the correction into future loads.
    let mut scratch = Library::default();
    overlay
        .update(&identity, &patch, &mut scratch)
        .context("failed to persist enrichment")?;

    println!("Recorded enrichment for {identity}");
    Ok(())
}
