//! The record store: normalized play events plus a shadow copy of the
//! original rows.
//!
//! The shadow copy exists so re-serialization can preserve columns the
//! normalized [`PlayEvent`] shape does not model (unrecognized columns,
//! original timestamp text). Mutation of events goes through the overlay;
//! this type only exposes read access and a crate-internal mutable view.

use crate::event::PlayEvent;

/// The in-memory record store produced by one successful parse.
///
/// Row order is the original file order. Parsing is all-or-nothing, so a
/// `Library` is either fully populated or was never constructed; a failed
/// re-parse leaves any prior value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Library {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    events: Vec<PlayEvent>,
}

impl Library {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<Vec<String>>, events: Vec<PlayEvent>) -> Self {
        debug_assert_eq!(rows.len(), events.len());
        Self {
            columns,
            rows,
            events,
        }
    }

    /// The normalized play events, in original row order.
    pub fn events(&self) -> &[PlayEvent] {
        &self.events
    }

    /// The original header names, trimmed but otherwise verbatim.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Shadow copy of the original field values, one row per event.
    pub(crate) fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Mutable view for the overlay; not public so all mutation funnels
    /// through [`Overlay::update`](crate::overlay::Overlay::update) and
    /// [`Overlay::apply_to`](crate::overlay::Overlay::apply_to).
    pub(crate) fn events_mut(&mut self) -> &mut [PlayEvent] {
        &mut self.events
    }
}
