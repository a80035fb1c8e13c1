//! Row filter pipeline: partition, date validity, date range, then sort.
//!
//! The steps always run in that order. Partition filtering comes before the
//! validity filter so date-less rows still count toward partition-only views.

use chrono::NaiveDate;

use crate::access::PartitionChoice;
use crate::types::{DatedRecord, Record};

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range; reversed endpoints are swapped.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Overlap with `bounds`, or `None` when disjoint.
    pub fn clamp_to(&self, bounds: DateRange) -> Option<DateRange> {
        let start = self.start.max(bounds.start);
        let end = self.end.min(bounds.end);
        (start <= end).then_some(DateRange { start, end })
    }
}

/// Transient UI selections of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub partition: Option<PartitionChoice>,
    pub range: Option<DateRange>,
}

/// A row that survived filtering, with its 1-based display ordinal.
#[derive(Debug, Clone, Copy)]
pub struct FilteredRow<'a> {
    pub ordinal: usize,
    pub record: &'a Record,
    pub date: Option<NaiveDate>,
}

/// Step 1: keep rows of the selected store.
pub fn partition_filter<'a>(
    records: &[DatedRecord<'a>],
    store_position: usize,
    choice: &PartitionChoice,
) -> Vec<DatedRecord<'a>> {
    match choice {
        PartitionChoice::All => records.to_vec(),
        PartitionChoice::NoAccess => Vec::new(),
        PartitionChoice::Store(name) => records
            .iter()
            .filter(|r| r.record.cell(store_position) == Some(name.as_str()))
            .copied()
            .collect(),
    }
}

/// Min/max canonical date, or `None` when no row has a date.
pub fn date_bounds(records: &[DatedRecord<'_>]) -> Option<DateRange> {
    let mut dates = records.iter().filter_map(|r| r.date);
    let first = dates.next()?;
    let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some(DateRange { start: min, end: max })
}

/// Run the full pipeline.
///
/// With `require_date`, rows without a canonical date are dropped. A `range`
/// keeps only rows dated inside it. The range step is skipped entirely when
/// no row carries a date. Output is sorted newest first (stable; undated rows
/// last) and numbered from 1.
pub fn filter<'a>(
    records: &[DatedRecord<'a>],
    store_position: usize,
    choice: &PartitionChoice,
    range: Option<DateRange>,
    require_date: bool,
) -> Vec<FilteredRow<'a>> {
    let mut rows = partition_filter(records, store_position, choice);

    if require_date {
        rows.retain(|r| r.date.is_some());
    }

    if let Some(range) = range {
        if date_bounds(&rows).is_some() {
            rows.retain(|r| r.date.is_some_and(|d| range.contains(d)));
        }
    }

    // Descending by date; `None` sorts below every date.
    rows.sort_by(|a, b| b.date.cmp(&a.date));

    rows.into_iter()
        .enumerate()
        .map(|(i, r)| FilteredRow {
            ordinal: i + 1,
            record: r.record,
            date: r.date,
        })
        .collect()
}
