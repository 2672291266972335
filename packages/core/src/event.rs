//! Normalized timetable events produced by an event source.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// A single class from the timetable feed.
///
/// Events carry no stable identity; two events are the same event when all
/// of their fields are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Display title of the class.
    pub summary: String,
    /// Start time in the feed's local offset.
    pub start: DateTime<FixedOffset>,
    /// End time in the feed's local offset.
    pub end: DateTime<FixedOffset>,
    /// Room or building the class takes place in.
    pub location: String,
    /// Teacher name, empty when the feed omits it.
    #[serde(default)]
    pub teacher: String,
    /// Student group attending the class.
    pub group: String,
    /// Discipline the class belongs to.
    pub discipline: String,
}

impl NormalizedEvent {
    /// Calendar date of the start time, taken in the event's own offset.
    pub fn day(&self) -> NaiveDate {
        self.start.date_naive()
    }
}
