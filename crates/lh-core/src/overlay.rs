//! The metadata overlay: user-supplied corrections keyed by track identity,
//! persisted through an injected key-value store.
//!
//! The store stands in for whatever durable storage the host offers; the
//! production implementation lives in `lh-db` (SQLite), and [`MemoryStore`]
//! backs tests. The whole map is persisted under one well-known key and
//! rewritten in full on every update, write-through with a single attempt.

use std::collections::HashMap;

use thiserror::Error;

use crate::event::{MetadataPatch, TrackIdentity};
use crate::library::Library;

/// Well-known key the serialized overlay map lives under.
pub const OVERLAY_KEY: &str = "lh/overlay";

/// Failure to read or write the durable store.
///
/// Surfaced from [`Overlay::update`] after the in-memory mutation has been
/// applied: the enrichment stays visible for the session even when it could
/// not be made durable.
#[derive(Debug, Error)]
#[error("overlay persistence failed: {source}")]
pub struct PersistError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl PersistError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// A string-keyed durable store with process-wide lifetime.
///
/// Injected at overlay construction so tests can supply in-memory doubles.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError>;
}

/// In-memory [`KvStore`] backed by a `HashMap`. Used by tests and anywhere
/// durability is not wanted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The identity-keyed overlay map plus its backing store.
pub struct Overlay<S> {
    store: S,
    entries: HashMap<String, MetadataPatch>,
}

impl<S: KvStore> Overlay<S> {
    /// Loads the persisted map from the store. An absent key yields an empty
    /// overlay, not an error.
    pub fn load(store: S) -> Result<Self, PersistError> {
        let entries = match store.get(OVERLAY_KEY)? {
            Some(json) => serde_json::from_str(&json).map_err(PersistError::new)?,
            None => HashMap::new(),
        };
        tracing::debug!(entries = entries.len(), "loaded overlay");
        Ok(Self { store, entries })
    }

    /// Number of identities with at least one correction.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The stored entry for an identity, if any.
    pub fn get(&self, identity: &TrackIdentity) -> Option<&MetadataPatch> {
        self.entries.get(&identity.key())
    }

    /// Iterates entries as (key, patch) pairs, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataPatch)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merges overlay entries into every matching record. A record's own
    /// present value always wins over the overlay.
    pub fn apply_to(&self, library: &mut Library) {
        if self.entries.is_empty() {
            return;
        }
        for event in library.events_mut() {
            if let Some(patch) = self.entries.get(&event.identity().key()) {
                patch.fill_missing(event);
            }
        }
    }

    /// Merges `patch` into the stored entry for `identity`, overwrites the
    /// patched fields on every matching in-memory record, then persists the
    /// full map. Idempotent under repeated identical calls.
    ///
    /// The in-memory mutation happens before the write, so a
    /// [`PersistError`] means the change is live for this session but may
    /// not survive a restart.
    pub fn update(
        &mut self,
        identity: &TrackIdentity,
        patch: &MetadataPatch,
        library: &mut Library,
    ) -> Result<(), PersistError> {
        let entry = self.entries.entry(identity.key()).or_default();
        entry.merge_from(patch);
        let merged = entry.clone();

        for event in library.events_mut() {
            if event.identity() == *identity {
                merged.overwrite(event);
            }
        }

        let json = serde_json::to_string(&self.entries).map_err(PersistError::new)?;
        self.store.set(OVERLAY_KEY, &json)?;
        tracing::debug!(identity = %identity, "overlay entry persisted");
        Ok(())
    }
}
