//! Play-event domain types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator used when joining identity components into an overlay key.
///
/// Not expected to appear in normal artist/album/track text; if it does, the
/// key is still deterministic, merely less readable.
pub const KEY_SEPARATOR: char = '|';

/// One row of listening-history input, possibly pre-aggregated with a play
/// count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayEvent {
    /// When the play occurred. `None` when the source row had no timestamp
    /// column or the value did not parse; such events are excluded from the
    /// time-bucket histograms but still counted in every other aggregate.
    pub timestamp: Option<DateTime<Utc>>,
    /// Artist name, trimmed. Empty is valid but excluded from artist
    /// groupings.
    pub artist: String,
    /// Album title, trimmed. Empty is valid but excluded from album
    /// groupings.
    pub album: String,
    /// Track title, trimmed. Empty is valid but excluded from track
    /// groupings.
    pub track: String,
    /// Number of plays this record represents. Always at least 1; raw event
    /// logs default to 1 per row.
    pub play_count: u64,
    /// Track length in seconds. Absent until enriched or supplied by the
    /// source file.
    pub duration_secs: Option<u64>,
    pub genre: Option<String>,
    pub feat: Option<String>,
    pub prod: Option<String>,
    pub label: Option<String>,
}

impl PlayEvent {
    /// Returns the identity this event belongs to.
    pub fn identity(&self) -> TrackIdentity {
        TrackIdentity::new(&self.artist, &self.album, &self.track)
    }
}

/// The (artist, album, track) triple used as a stable grouping and overlay
/// key.
///
/// Equality is exact string match after trimming; no case normalization is
/// applied, so casing differences produce distinct identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackIdentity {
    pub artist: String,
    pub album: String,
    pub track: String,
}

impl TrackIdentity {
    pub fn new(
        artist: impl Into<String>,
        album: impl Into<String>,
        track: impl Into<String>,
    ) -> Self {
        Self {
            artist: artist.into(),
            album: album.into(),
            track: track.into(),
        }
    }

    /// Deterministic string key used for overlay lookup and persistence.
    pub fn key(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.artist,
            self.album,
            self.track,
            sep = KEY_SEPARATOR
        )
    }

    /// True when all three components are empty, in which case the record is
    /// excluded from every grouping.
    pub fn is_blank(&self) -> bool {
        self.artist.is_empty() && self.album.is_empty() && self.track.is_empty()
    }
}

impl fmt::Display for TrackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// User-supplied corrections for fields missing from the original data
/// source.
///
/// All fields are optional; only present fields participate in merges. The
/// serialized form omits absent fields, which keeps the persisted overlay map
/// compact and lets older entries gain fields without migration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prod: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl MetadataPatch {
    /// True when no field is present.
    pub fn is_empty(&self) -> bool {
        self.duration_secs.is_none()
            && self.genre.is_none()
            && self.feat.is_none()
            && self.prod.is_none()
            && self.label.is_none()
    }

    /// Merges `other` into `self`; fields present in `other` win.
    pub fn merge_from(&mut self, other: &Self) {
        if other.duration_secs.is_some() {
            self.duration_secs = other.duration_secs;
        }
        if other.genre.is_some() {
            self.genre.clone_from(&other.genre);
        }
        if other.feat.is_some() {
            self.feat.clone_from(&other.feat);
        }
        if other.prod.is_some() {
            self.prod.clone_from(&other.prod);
        }
        if other.label.is_some() {
            self.label.clone_from(&other.label);
        }
    }

    /// Fills only the fields the event lacks; the event's own values win.
    pub fn fill_missing(&self, event: &mut PlayEvent) {
        if event.duration_secs.is_none() {
            event.duration_secs = self.duration_secs;
        }
        if event.genre.is_none() {
            event.genre.clone_from(&self.genre);
        }
        if event.feat.is_none() {
            event.feat.clone_from(&self.feat);
        }
        if event.prod.is_none() {
            event.prod.clone_from(&self.prod);
        }
        if event.label.is_none() {
            event.label.clone_from(&self.label);
        }
    }

    /// Writes every present field onto the event, replacing existing values.
    ///
    /// Used by explicit user updates, which target the record directly.
    pub fn overwrite(&self, event: &mut PlayEvent) {
        if self.duration_secs.is_some() {
            event.duration_secs = self.duration_secs;
        }
        if self.genre.is_some() {
            event.genre.clone_from(&self.genre);
        }
        if self.feat.is_some() {
            event.feat.clone_from(&self.feat);
        }
        if self.prod.is_some() {
            event.prod.clone_from(&self.prod);
        }
        if self.label.is_some() {
            event.label.clone_from(&self.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(artist: &str, album: &str, track: &str) -> PlayEvent {
        PlayEvent {
            timestamp: None,
            artist: artist.to_string(),
            album: album.to_string(),
            track: track.to_string(),
            play_count: 1,
            duration_secs: None,
            genre: None,
            feat: None,
            prod: None,
            label: None,
        }
    }

    #[test]
    fn identity_key_joins_with_separator() {
        let id = TrackIdentity::new("A", "X", "T1");
        assert_eq!(id.key(), "A|X|T1");
    }

    #[test]
    fn identity_is_case_sensitive() {
        let a = TrackIdentity::new("Artist", "Album", "Track");
        let b = TrackIdentity::new("artist", "Album", "Track");
        assert_ne!(a, b);
    }

    #[test]
    fn blank_identity_detected() {
        assert!(TrackIdentity::new("", "", "").is_blank());
        assert!(!TrackIdentity::new("", "", "T").is_blank());
    }

    #[test]
    fn fill_missing_keeps_existing_values() {
        let mut e = event("A", "X", "T");
        e.genre = Some("Jazz".to_string());
        let patch = MetadataPatch {
            duration_secs: Some(120),
            genre: Some("Rock".to_string()),
            ..MetadataPatch::default()
        };
        patch.fill_missing(&mut e);
        assert_eq!(e.duration_secs, Some(120));
        assert_eq!(e.genre.as_deref(), Some("Jazz"));
    }

    #[test]
    fn overwrite_replaces_existing_values() {
        let mut e = event("A", "X", "T");
        e.genre = Some("Jazz".to_string());
        let patch = MetadataPatch {
            genre: Some("Rock".to_string()),
            ..MetadataPatch::default()
        };
        patch.overwrite(&mut e);
        assert_eq!(e.genre.as_deref(), Some("Rock"));
    }

    #[test]
    fn merge_from_only_takes_present_fields() {
        let mut base = MetadataPatch {
            genre: Some("Rock".to_string()),
            ..MetadataPatch::default()
        };
        let patch = MetadataPatch {
            duration_secs: Some(200),
            ..MetadataPatch::default()
        };
        base.merge_from(&patch);
        assert_eq!(base.genre.as_deref(), Some("Rock"));
        assert_eq!(base.duration_secs, Some(200));
    }

    #[test]
    fn patch_serde_omits_absent_fields() {
        let patch = MetadataPatch {
            genre: Some("Rock".to_string()),
            ..MetadataPatch::default()
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"genre":"Rock"}"#);
        let parsed: MetadataPatch = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, patch);
    }
}
