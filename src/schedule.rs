//! Schedule generator: maps a date range onto per-day page ranges.
//!
//! Participant `i` reads, on day `d` of the range,
//! `start_page(i) + d * pages[i] ..= start_page(i) + (d + 1) * pages[i] - 1`.
//! Ranges are never clamped to the participant's own block; a range longer
//! than one pass simply keeps counting upward.

use chrono::NaiveDate;
use tracing::debug;

use crate::allocation::AllocationState;
use crate::error::HatimError;
use crate::limits::MAX_SCHEDULE_DAYS;
use crate::model::*;

/// Calendar-day range as chosen by the user. Either end may be unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ScheduleRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Parse two ISO `YYYY-MM-DD` strings. Anything unparseable becomes unset.
    pub fn parse(start: &str, end: &str) -> Self {
        Self {
            start: parse_iso_date(start),
            end: parse_iso_date(end),
        }
    }

    /// Number of days `days()` would return, without building the list.
    pub fn day_count(&self) -> usize {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start <= end => (end - start).num_days() as usize + 1,
            _ => 0,
        }
    }

    /// Inclusive list of days. Empty when an end is unset or `start > end`.
    pub fn days(&self) -> Vec<NaiveDate> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => days_in_range(start, end),
            _ => Vec::new(),
        }
    }
}

pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Every calendar day from `start` to `end`, both included.
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// `DD.MM.YYYY`, the header format of the exported sheet.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Page range for one participant on one day of the range.
pub fn day_range(
    state: &AllocationState,
    participant_index: usize,
    day_index: usize,
) -> Result<PageRange, HatimError> {
    if day_index >= MAX_SCHEDULE_DAYS {
        return Err(HatimError::RangeTooLarge {
            days: day_index + 1,
            max: MAX_SCHEDULE_DAYS,
        });
    }
    let start_page = state.start_page(participant_index)?;
    let pages = state.participants()[participant_index].pages;
    Ok(range_for(start_page, pages, day_index))
}

fn range_for(start_page: u32, pages: u32, day_index: usize) -> PageRange {
    // day_index < MAX_SCHEDULE_DAYS and pages <= BOOK_SIZE
    let start = start_page + day_index as u32 * pages;
    PageRange::new(start, start + pages - 1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub ordinal: usize,
    pub participant_id: ParticipantId,
    pub full_name: String,
    pub pages: u32,
    pub start_page: u32,
    /// One entry per day of the schedule.
    pub ranges: Vec<PageRange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub days: Vec<NaiveDate>,
    pub rows: Vec<ScheduleRow>,
}

impl Schedule {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Compute the day-by-day reading plan for the current roster.
///
/// An empty or inverted range yields a schedule with no days; callers decide
/// whether that is an error. More than `MAX_SCHEDULE_DAYS` days is rejected.
pub fn generate(state: &AllocationState, range: &ScheduleRange) -> Result<Schedule, HatimError> {
    let day_count = range.day_count();
    if day_count > MAX_SCHEDULE_DAYS {
        return Err(HatimError::RangeTooLarge {
            days: day_count,
            max: MAX_SCHEDULE_DAYS,
        });
    }
    let days = range.days();

    let rows = state
        .participants()
        .iter()
        .zip(state.start_pages())
        .enumerate()
        .map(|(i, (p, start_page))| ScheduleRow {
            ordinal: i + 1,
            participant_id: p.id,
            full_name: p.full_name.clone(),
            pages: p.pages,
            start_page,
            ranges: (0..days.len()).map(|d| range_for(start_page, p.pages, d)).collect(),
        })
        .collect();

    debug!(days = days.len(), participants = state.len(), "generated schedule");
    Ok(Schedule { days, rows })
}
