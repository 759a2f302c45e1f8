//! Core domain logic for the listening-history analyzer.
//!
//! This crate contains the fundamental types and logic for:
//! - CSV adapter: parsing and lossless re-serialization of history files
//! - Library: the in-memory record store
//! - Overlay: persisted user-supplied metadata corrections
//! - Stats: the aggregation engine producing statistics snapshots

pub mod csv;
pub mod event;
pub mod library;
pub mod overlay;
pub mod stats;

pub use csv::CsvError;
pub use event::{MetadataPatch, PlayEvent, TrackIdentity};
pub use library::Library;
pub use overlay::{KvStore, MemoryStore, OVERLAY_KEY, Overlay, PersistError};
pub use stats::{GroupCount, ListeningPatterns, Statistics, TrackTally, analyze};
