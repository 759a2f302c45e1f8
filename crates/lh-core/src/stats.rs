//! The aggregation engine: a pure function from play events to a statistics
//! snapshot.
//!
//! Counting convention: every grouped count is the sum of `play_count` over
//! the group's records, uniformly for artists, albums, tracks, genres, and
//! the time histograms. Raw event logs default each row to 1, so for those
//! the sum equals the row count.
//!
//! Rankings sort by descending count with ties broken by first-seen order in
//! the input sequence (stable sort), never alphabetically.

use std::collections::HashMap;

use chrono::Timelike;
use serde::Serialize;

use crate::event::{PlayEvent, TrackIdentity};

/// One named group with its summed play count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub name: String,
    pub count: u64,
}

/// Aggregate for one distinct track identity.
///
/// Artist and album come from the identity; duration and genre come from the
/// first member record that carries them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackTally {
    pub artist: String,
    pub album: String,
    pub track: String,
    pub count: u64,
    pub duration_secs: Option<u64>,
    pub genre: Option<String>,
}

/// Time-bucketed play histograms.
///
/// Records without a parseable timestamp are excluded from all three buckets
/// but still count toward every other aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListeningPatterns {
    /// Plays per hour of day; always exactly 24 entries, zero-filled.
    pub by_hour: [u64; 24],
    /// Occurring weekdays (English names), ranked by count descending.
    pub by_weekday: Vec<GroupCount>,
    /// Occurring months (English names), ranked by count descending.
    pub by_month: Vec<GroupCount>,
}

impl Default for ListeningPatterns {
    fn default() -> Self {
        Self {
            by_hour: [0; 24],
            by_weekday: Vec::new(),
            by_month: Vec::new(),
        }
    }
}

/// The full computed aggregate result of one [`analyze`] call.
///
/// Immutable by convention: callers obtain a fresh snapshot by re-invoking
/// [`analyze`] after any mutation to the record store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    /// Sum of `duration × play_count` in seconds over records with a
    /// duration.
    pub total_listening_secs: u64,
    /// Mean duration over distinct tracks that carry one, unweighted by play
    /// count. Zero when no track has a duration.
    pub average_track_duration_secs: f64,
    /// Total plays across all records, durationless ones included.
    pub total_plays: u64,
    pub top_artists: Vec<GroupCount>,
    pub top_albums: Vec<GroupCount>,
    pub top_genres: Vec<GroupCount>,
    pub top_tracks: Vec<TrackTally>,
    pub patterns: ListeningPatterns,
}

/// First-seen-ordered counter; the backbone of every stable ranking.
#[derive(Debug, Default)]
struct Tally {
    index: HashMap<String, usize>,
    groups: Vec<GroupCount>,
}

impl Tally {
    fn add(&mut self, name: &str, count: u64) {
        if let Some(&i) = self.index.get(name) {
            self.groups[i].count += count;
        } else {
            self.index.insert(name.to_string(), self.groups.len());
            self.groups.push(GroupCount {
                name: name.to_string(),
                count,
            });
        }
    }

    /// Descending by count; `sort_by` is stable, so ties keep first-seen
    /// order.
    fn into_ranked(self, cap: Option<usize>) -> Vec<GroupCount> {
        let mut groups = self.groups;
        groups.sort_by(|a, b| b.count.cmp(&a.count));
        if let Some(cap) = cap {
            groups.truncate(cap);
        }
        groups
    }
}

/// Computes a statistics snapshot over the given records.
///
/// Pure and deterministic for a given input order. `top_n` caps the artist,
/// album, genre, and track rankings; `None` returns all groups. The weekday
/// and month histograms are inherently capped at 7 and 12.
///
/// An empty input yields an all-zero snapshot, not an error.
pub fn analyze(events: &[PlayEvent], top_n: Option<usize>) -> Statistics {
    let mut artists = Tally::default();
    let mut albums = Tally::default();
    let mut genres = Tally::default();
    let mut weekdays = Tally::default();
    let mut months = Tally::default();
    let mut by_hour = [0_u64; 24];

    let mut track_index: HashMap<TrackIdentity, usize> = HashMap::new();
    let mut tracks: Vec<TrackTally> = Vec::new();

    let mut total_plays = 0_u64;
    let mut total_listening_secs = 0_u64;

    for event in events {
        // A record with no identity at all contributes to nothing.
        if event.identity().is_blank() {
            continue;
        }
        total_plays += event.play_count;

        if !event.artist.is_empty() {
            artists.add(&event.artist, event.play_count);
        }
        if !event.album.is_empty() {
            albums.add(&event.album, event.play_count);
        }
        if let Some(genre) = &event.genre {
            genres.add(genre, event.play_count);
        }

        if !event.track.is_empty() {
            let identity = event.identity();
            if let Some(&i) = track_index.get(&identity) {
                let tally = &mut tracks[i];
                tally.count += event.play_count;
                if tally.duration_secs.is_none() {
                    tally.duration_secs = event.duration_secs;
                }
                if tally.genre.is_none() {
                    tally.genre.clone_from(&event.genre);
                }
            } else {
                track_index.insert(identity, tracks.len());
                tracks.push(TrackTally {
                    artist: event.artist.clone(),
                    album: event.album.clone(),
                    track: event.track.clone(),
                    count: event.play_count,
                    duration_secs: event.duration_secs,
                    genre: event.genre.clone(),
                });
            }
        }

        if let Some(secs) = event.duration_secs {
            total_listening_secs += secs * event.play_count;
        }

        if let Some(ts) = event.timestamp {
            by_hour[ts.hour() as usize] += event.play_count;
            weekdays.add(&ts.format("%A").to_string(), event.play_count);
            months.add(&ts.format("%B").to_string(), event.play_count);
        }
    }

    // Average over distinct tracks with a duration, computed before the cap.
    let with_duration: Vec<u64> = tracks.iter().filter_map(|t| t.duration_secs).collect();
    let average_track_duration_secs = if with_duration.is_empty() {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        {
            with_duration.iter().sum::<u64>() as f64 / with_duration.len() as f64
        }
    };

    tracks.sort_by(|a, b| b.count.cmp(&a.count));
    if let Some(cap) = top_n {
        tracks.truncate(cap);
    }

    Statistics {
        total_listening_secs,
        average_track_duration_secs,
        total_plays,
        top_artists: artists.into_ranked(top_n),
        top_albums: albums.into_ranked(top_n),
        top_genres: genres.into_ranked(top_n),
        top_tracks: tracks,
        patterns: ListeningPatterns {
            by_hour,
            by_weekday: weekdays.into_ranked(Some(7)),
            by_month: months.into_ranked(Some(12)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv;

    fn events_from(text: &str) -> Vec<PlayEvent> {
        csv::parse(text).unwrap().events().to_vec()
    }

    #[test]
    fn empty_input_yields_zeroed_snapshot() {
        let stats = analyze(&[], None);
        assert_eq!(stats.total_plays, 0);
        assert_eq!(stats.total_listening_secs, 0);
        assert!(stats.top_artists.is_empty());
        assert!(stats.top_tracks.is_empty());
        assert_eq!(stats.patterns.by_hour.len(), 24);
        assert!(stats.patterns.by_hour.iter().all(|&c| c == 0));
        assert!(stats.patterns.by_weekday.is_empty());
    }

    #[test]
    fn counts_sum_play_counts_across_tracks() {
        let events = events_from("Artist,Album,Track,Count\nA,X,T1,3\nA,X,T2,5\n");
        let stats = analyze(&events, None);
        assert_eq!(
            stats.top_artists,
            vec![GroupCount {
                name: "A".to_string(),
                count: 8
            }]
        );
        assert_eq!(stats.top_tracks.len(), 2);
        assert_eq!(stats.top_tracks[0].track, "T2");
        assert_eq!(stats.top_tracks[0].count, 5);
        assert_eq!(stats.top_tracks[1].track, "T1");
        assert_eq!(stats.top_tracks[1].count, 3);
    }

    #[test]
    fn ties_rank_by_first_seen_order_not_alphabetically() {
        let events = events_from(
            "Artist,Album,Track,Count\nZeta,X,T1,2\nAlpha,Y,T2,2\nZeta,X,T1,1\nAlpha,Y,T3,1\n",
        );
        let stats = analyze(&events, None);
        assert_eq!(stats.top_artists[0].name, "Zeta");
        assert_eq!(stats.top_artists[0].count, 3);
        assert_eq!(stats.top_artists[1].name, "Alpha");
        assert_eq!(stats.top_artists[1].count, 3);
    }

    #[test]
    fn tracks_group_by_full_identity_not_title() {
        // Same title on two albums stays two groups.
        let events = events_from("Artist,Album,Track,Count\nA,X,Intro,2\nA,Y,Intro,1\n");
        let stats = analyze(&events, None);
        assert_eq!(stats.top_tracks.len(), 2);
        assert_eq!(stats.top_tracks[0].album, "X");
        assert_eq!(stats.top_tracks[1].album, "Y");
    }

    #[test]
    fn track_group_takes_metadata_from_first_populated_member() {
        let events = events_from(
            "Artist,Album,Track,Count,Duration,Genre\nA,X,T,1,,\nA,X,T,2,180,Rock\n",
        );
        let stats = analyze(&events, None);
        assert_eq!(stats.top_tracks.len(), 1);
        assert_eq!(stats.top_tracks[0].count, 3);
        assert_eq!(stats.top_tracks[0].duration_secs, Some(180));
        assert_eq!(stats.top_tracks[0].genre.as_deref(), Some("Rock"));
    }

    #[test]
    fn missing_duration_excluded_from_totals_but_not_counts() {
        let events = events_from(
            "Artist,Album,Track,Count,Duration\nA,X,T1,3,\nA,X,T2,5,240\n",
        );
        let stats = analyze(&events, None);
        assert_eq!(stats.top_artists[0].count, 8);
        assert_eq!(stats.total_listening_secs, 240 * 5);
        assert!((stats.average_track_duration_secs - 240.0).abs() < f64::EPSILON);
    }

    #[test]
    fn enriched_duration_multiplies_by_play_count() {
        use crate::event::{MetadataPatch, TrackIdentity};
        use crate::overlay::{MemoryStore, Overlay};

        let mut library = csv::parse("Artist,Album,Track,Count\nA,X,T1,3\nA,X,T2,5\n").unwrap();
        let mut overlay = Overlay::load(MemoryStore::default()).unwrap();
        let patch = MetadataPatch {
            duration_secs: Some(120),
            ..MetadataPatch::default()
        };
        overlay
            .update(&TrackIdentity::new("A", "X", "T1"), &patch, &mut library)
            .unwrap();

        let stats = analyze(library.events(), None);
        assert_eq!(stats.total_listening_secs, 120 * 3);
    }

    #[test]
    fn average_is_mean_over_distinct_tracks_with_duration() {
        let events = events_from(
            "Artist,Album,Track,Count,Duration\nA,X,T1,10,100\nA,X,T2,1,300\nA,X,T3,4,\n",
        );
        let stats = analyze(&events, None);
        // Unweighted by play count: (100 + 300) / 2
        assert!((stats.average_track_duration_secs - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_fields_excluded_from_their_grouping_only() {
        let events = events_from("Artist,Album,Track,Count\n,X,T1,2\nA,,T2,3\n");
        let stats = analyze(&events, None);
        assert_eq!(stats.top_artists.len(), 1);
        assert_eq!(stats.top_artists[0].name, "A");
        assert_eq!(stats.top_albums.len(), 1);
        assert_eq!(stats.top_albums[0].name, "X");
        // Empty artist does not hide the track.
        assert_eq!(stats.top_tracks.len(), 2);
    }

    #[test]
    fn all_empty_identity_row_is_a_no_op() {
        let events = events_from("Artist,Album,Track,Count\nA,X,T,1\n,,,2\n");
        let stats = analyze(&events, None);
        assert_eq!(stats.top_artists.len(), 1);
        assert_eq!(stats.top_tracks.len(), 1);
        assert_eq!(stats.total_plays, 1);
    }

    #[test]
    fn hour_histogram_counts_and_unparseable_timestamps_excluded() {
        let events = events_from(
            "timestamp,artist,album,track\n2021-03-01T14:05:00Z,A,X,T1\n2021-03-01T14:40:00Z,A,X,T2\nbroken,A,X,T3\n",
        );
        let stats = analyze(&events, None);
        assert_eq!(stats.patterns.by_hour[14], 2);
        assert_eq!(stats.patterns.by_hour.iter().sum::<u64>(), 2);
        // The unparseable row still counts elsewhere.
        assert_eq!(stats.top_artists[0].count, 3);
        // 2021-03-01 is a Monday.
        assert_eq!(stats.patterns.by_weekday[0].name, "Monday");
        assert_eq!(stats.patterns.by_weekday[0].count, 2);
        assert_eq!(stats.patterns.by_month[0].name, "March");
    }

    #[test]
    fn top_n_caps_rankings() {
        let events = events_from(
            "Artist,Album,Track,Count\nA,W,T1,4\nB,X,T2,3\nC,Y,T3,2\nD,Z,T4,1\n",
        );
        let stats = analyze(&events, Some(2));
        assert_eq!(stats.top_artists.len(), 2);
        assert_eq!(stats.top_tracks.len(), 2);
        assert_eq!(stats.top_artists[0].name, "A");
    }

    #[test]
    fn snapshot_is_pure_and_deterministic() {
        let events = events_from("Artist,Album,Track,Count\nA,X,T1,3\nB,Y,T2,3\n");
        let first = analyze(&events, None);
        let second = analyze(&events, None);
        assert_eq!(first, second);
    }
}
