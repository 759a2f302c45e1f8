//! CSV adapter: converts listening-history CSV text to and from the record
//! store.
//!
//! Two header conventions are accepted as instances of the same schema:
//!
//! - pre-aggregated: `Artist, Album, Track, Count`
//! - raw events: `utc_time` (or `timestamp`), `artist`, `album`, `track`
//!
//! plus optional `Duration`, `Genre`, `Feat`, `Prod`, `Label` columns in
//! either form. Header matching trims and lowercases names; field values are
//! trimmed. Serialization writes original columns verbatim from the shadow
//! rows, except the five enrichment columns, which reflect the records'
//! current values.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

use crate::event::PlayEvent;
use crate::library::Library;

/// Enrichment columns, in canonical output order. These are the only columns
/// whose serialized values come from the normalized events rather than the
/// shadow rows.
const ENRICHMENT_COLUMNS: [&str; 5] = ["duration", "genre", "feat", "prod", "label"];

/// CSV adapter errors.
///
/// Everything except [`CsvError::Empty`] is a format error: the input cannot
/// yield meaningful statistics and is never silently recovered. `Empty` is
/// distinct because the file is well-formed, just useless.
#[derive(Debug, Error)]
pub enum CsvError {
    /// A required column is missing from the header.
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),
    /// A data row has a different number of fields than the header.
    #[error("row {row}: expected {expected} fields, found {found}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// The count column holds something other than a positive integer.
    #[error("row {row}: invalid play count {value:?}")]
    InvalidCount { row: usize, value: String },
    /// The file parsed but contained no data rows.
    #[error("input contains no data rows")]
    Empty,
    /// The underlying reader failed (unbalanced quotes, invalid UTF-8).
    #[error(transparent)]
    Malformed(#[from] ::csv::Error),
    /// Writing serialized output failed.
    #[error("failed to write csv output: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolved column positions for one parsed header.
#[derive(Debug)]
struct ColumnMap {
    artist: usize,
    album: usize,
    track: usize,
    count: Option<usize>,
    timestamp: Option<usize>,
    duration: Option<usize>,
    genre: Option<usize>,
    feat: Option<usize>,
    prod: Option<usize>,
    label: Option<usize>,
}

impl ColumnMap {
    fn resolve(normalized: &[String]) -> Result<Self, CsvError> {
        let find = |names: &[&str]| {
            normalized
                .iter()
                .position(|h| names.iter().any(|n| h == n))
        };

        let artist = find(&["artist"]).ok_or(CsvError::MissingColumn("artist"))?;
        let album = find(&["album"]).ok_or(CsvError::MissingColumn("album"))?;
        let track = find(&["track"]).ok_or(CsvError::MissingColumn("track"))?;
        let count = find(&["count", "play_count", "plays"]);
        let timestamp = find(&["utc_time", "timestamp"]);
        if count.is_none() && timestamp.is_none() {
            return Err(CsvError::MissingColumn("count or timestamp"));
        }

        Ok(Self {
            artist,
            album,
            track,
            count,
            timestamp,
            duration: find(&["duration"]),
            genre: find(&["genre"]),
            feat: find(&["feat"]),
            prod: find(&["prod"]),
            label: find(&["label"]),
        })
    }
}

/// Parses CSV text into a [`Library`].
///
/// All-or-nothing: any format error aborts the whole parse. Entirely blank
/// rows are skipped; row order is preserved.
pub fn parse(text: &str) -> Result<Library, CsvError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(text.as_bytes());

    let header = reader.headers()?.clone();
    let columns: Vec<String> = header.iter().map(str::to_string).collect();
    let normalized: Vec<String> = columns.iter().map(|c| c.to_lowercase()).collect();
    let map = ColumnMap::resolve(&normalized)?;

    let mut rows = Vec::new();
    let mut events = Vec::new();

    for (i, result) in reader.records().enumerate() {
        // 1-based, counting the header as row 1
        let row = i + 2;
        let record = result?;
        let fields: Vec<String> = record.iter().map(str::to_string).collect();

        if fields.iter().all(String::is_empty) {
            continue;
        }
        if fields.len() != columns.len() {
            return Err(CsvError::RowWidth {
                row,
                expected: columns.len(),
                found: fields.len(),
            });
        }

        let field = |idx: Option<usize>| idx.map(|i| fields[i].as_str()).unwrap_or_default();

        let play_count = match map.count {
            Some(idx) => match fields[idx].parse::<u64>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(CsvError::InvalidCount {
                        row,
                        value: fields[idx].clone(),
                    });
                }
            },
            // raw event logs carry one play per row
            None => 1,
        };

        events.push(PlayEvent {
            timestamp: parse_timestamp(field(map.timestamp)),
            artist: fields[map.artist].clone(),
            album: fields[map.album].clone(),
            track: fields[map.track].clone(),
            play_count,
            duration_secs: parse_duration(field(map.duration)),
            genre: non_empty(field(map.genre)),
            feat: non_empty(field(map.feat)),
            prod: non_empty(field(map.prod)),
            label: non_empty(field(map.label)),
        });
        rows.push(fields);
    }

    if events.is_empty() {
        return Err(CsvError::Empty);
    }

    tracing::debug!(rows = events.len(), columns = columns.len(), "parsed csv");
    Ok(Library::new(columns, rows, events))
}

/// Serializes the library back to CSV text.
///
/// The header is the original columns plus any enrichment column that is now
/// populated on at least one record but was absent from the input. Original
/// columns are emitted verbatim from the shadow rows, except enrichment
/// columns, which take the record's current value when present.
pub fn serialize(library: &Library) -> Result<String, CsvError> {
    let normalized: Vec<String> = library
        .columns()
        .iter()
        .map(|c| c.to_lowercase())
        .collect();

    // Enrichment columns to append, in canonical order.
    let appended: Vec<&str> = ENRICHMENT_COLUMNS
        .iter()
        .copied()
        .filter(|name| !normalized.iter().any(|c| c == name))
        .filter(|name| {
            library
                .events()
                .iter()
                .any(|e| enrichment_value(e, name).is_some())
        })
        .collect();

    let mut writer = ::csv::Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = library.columns().iter().map(String::as_str).collect();
    header.extend(&appended);
    writer.write_record(&header)?;

    for (row, event) in library.rows().iter().zip(library.events()) {
        let mut out: Vec<String> = Vec::with_capacity(header.len());
        for (value, name) in row.iter().zip(&normalized) {
            let current = ENRICHMENT_COLUMNS
                .contains(&name.as_str())
                .then(|| enrichment_value(event, name))
                .flatten();
            out.push(current.unwrap_or_else(|| value.clone()));
        }
        for name in &appended {
            out.push(enrichment_value(event, name).unwrap_or_default());
        }
        writer.write_record(&out)?;
    }

    writer.flush()?;
    let bytes = match writer.into_inner() {
        Ok(bytes) => bytes,
        Err(err) => {
            return Err(CsvError::Io(std::io::Error::new(
                err.error().kind(),
                err.error().to_string(),
            )));
        }
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Current value of one enrichment field, by normalized column name.
fn enrichment_value(event: &PlayEvent, name: &str) -> Option<String> {
    match name {
        "duration" => event.duration_secs.map(|d| d.to_string()),
        "genre" => event.genre.clone(),
        "feat" => event.feat.clone(),
        "prod" => event.prod.clone(),
        "label" => event.label.clone(),
        _ => None,
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Lenient duration parse: non-numeric or negative values become `None`.
/// Only the count column is strict.
fn parse_duration(value: &str) -> Option<u64> {
    value.parse::<u64>().ok()
}

/// Parses a timestamp in any of the formats seen across listening-history
/// exports. Unparseable values become `None`; the record still counts toward
/// every non-temporal aggregate.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    // Epoch seconds (ListenBrainz-style listened_at)
    if value.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(secs) = value.parse::<i64>() {
            return DateTime::from_timestamp(secs, 0);
        }
    }
    const NAIVE_FORMATS: [&str; 3] = [
        "%Y-%m-%d %H:%M:%S",
        // Last.fm export forms, with and without the comma
        "%d %b %Y, %H:%M",
        "%d %b %Y %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    None
}
