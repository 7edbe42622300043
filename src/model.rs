use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::allocation::AllocationState;
use crate::error::HatimError;

/// Opaque participant identifier. Assigned once, never reused.
pub type ParticipantId = Ulid;

/// A person taking part in the hatim and the number of pages they read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub full_name: String,
    pub pages: u32,
}

/// Inclusive range of absolute page numbers `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "PageRange start must not be after end");
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }
}

impl std::fmt::Display for PageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Journal record. One per accepted mutation, flat, no nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    NameChanged {
        name: String,
    },
    DatesChanged {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    ParticipantAdded {
        id: ParticipantId,
        full_name: String,
        pages: u32,
    },
    ParticipantUpdated {
        id: ParticipantId,
        full_name: String,
        pages: u32,
    },
    ParticipantRemoved {
        id: ParticipantId,
    },
    /// Adjacent swap of the entries at `index` and `index + 1`.
    ParticipantsSwapped {
        index: usize,
    },
}

/// Everything a single hatim session owns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HatimDocument {
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub allocation: AllocationState,
    /// Sequence number of the last journal entry folded into this document.
    pub journal_seq: u64,
}

impl HatimDocument {
    /// Apply a journal event. Events are validated before they are journaled,
    /// so this never fails; participant events naming an unknown id are skipped.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::NameChanged { name } => self.name = name.clone(),
            Event::DatesChanged { start, end } => {
                self.start_date = *start;
                self.end_date = *end;
            }
            other => self.allocation.apply_event(other),
        }
    }

    /// Apply an event read back from the journal, re-running the checks it
    /// passed when it was first accepted.
    pub fn replay(&mut self, event: &Event) -> Result<(), HatimError> {
        self.allocation.check_event(event)?;
        self.apply(event);
        Ok(())
    }
}

// ── Query result types ───────────────────────────────────────────

/// How full the book is, for display next to the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageLevel {
    Normal,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageSummary {
    pub participants: usize,
    pub used: u32,
    pub remaining: u32,
    pub fill_pct: f64,
    pub level: UsageLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub ordinal: usize,
    pub id: ParticipantId,
    pub full_name: String,
    pub pages: u32,
    pub start_page: u32,
}
