use crate::models::{Category, RatingEntry};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The rating log of one session. Holds at most one entry per date; storage
/// order is insertion order and carries no meaning, so readers go through
/// [`HistoryStore::ordered_descending`] or [`HistoryStore::chronological`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStore {
    entries: Vec<RatingEntry>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from persisted entries. When a date repeats, the later
    /// entry wins.
    pub fn from_entries(entries: Vec<RatingEntry>) -> Self {
        let mut store = Self::new();
        for entry in entries {
            if let Some(previous) = store.upsert(entry) {
                log::warn!("duplicate history entry for {}, keeping the later one", previous.date);
            }
        }
        store
    }

    /// Inserts `entry`, or replaces the entry with the same date in place.
    /// Returns the replaced entry.
    pub fn upsert(&mut self, entry: RatingEntry) -> Option<RatingEntry> {
        match self.entries.iter_mut().find(|e| e.date == entry.date) {
            Some(existing) => Some(std::mem::replace(existing, entry)),
            None => {
                self.entries.push(entry);
                None
            }
        }
    }

    /// Removes the entry for `date`. Returns false, leaving the log untouched,
    /// when there is none.
    pub fn delete(&mut self, date: NaiveDate) -> bool {
        let start = self.entries.len();
        self.entries.retain(|e| e.date != date);
        self.entries.len() != start
    }

    pub fn get(&self, date: NaiveDate) -> Option<&RatingEntry> {
        self.entries.iter().find(|e| e.date == date)
    }

    /// Most recent first.
    pub fn ordered_descending(&self) -> Vec<&RatingEntry> {
        let mut ordered: Vec<_> = self.entries.iter().collect();
        ordered.sort_by(|a, b| b.date.cmp(&a.date));
        ordered
    }

    /// Oldest first.
    pub fn chronological(&self) -> Vec<&RatingEntry> {
        let mut ordered: Vec<_> = self.entries.iter().collect();
        ordered.sort_by_key(|e| e.date);
        ordered
    }

    pub fn entries(&self) -> &[RatingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Good,
    Ok,
    Bad,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Good => "good",
            Verdict::Ok => "ok",
            Verdict::Bad => "bad",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display bucket for an overall score: above 7 is good, above 4 is ok.
pub fn classify(overall: f64) -> Verdict {
    if overall > 7.0 {
        Verdict::Good
    } else if overall > 4.0 {
        Verdict::Ok
    } else {
        Verdict::Bad
    }
}

/// Which line the history chart follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSelection {
    Overall,
    Category(Category),
}

impl FromStr for SeriesSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("overall") {
            return Ok(SeriesSelection::Overall);
        }
        s.parse::<Category>().map(SeriesSelection::Category)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Chronological points for one chart line. Days without a rating for the
/// selected category are gaps.
pub fn series(history: &HistoryStore, selection: SeriesSelection) -> Vec<SeriesPoint> {
    history
        .chronological()
        .into_iter()
        .map(|entry| SeriesPoint {
            date: entry.date,
            value: match selection {
                SeriesSelection::Overall => Some(entry.overall),
                SeriesSelection::Category(c) => entry.ratings.get(c).value().map(f64::from),
            },
        })
        .collect()
}
