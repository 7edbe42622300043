//! Allocation model: the ordered roster and the book-size ceiling.
//!
//! All mutations go through `mutations.rs`, which validates against the
//! current state and returns the `Event` to apply. Nothing is mutated until
//! validation has passed, so a rejected operation leaves the state untouched.

mod mutations;

use crate::error::HatimError;
use crate::limits::*;
use crate::model::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationState {
    book_size: u32,
    /// Roster order; determines where each block of pages sits in the book.
    participants: Vec<Participant>,
}

impl Default for AllocationState {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationState {
    pub fn new() -> Self {
        Self {
            book_size: BOOK_SIZE,
            participants: Vec::new(),
        }
    }

    /// Rebuild a roster from stored participants, enforcing the same rules as `add`.
    /// Ids are kept as stored.
    pub fn restore(participants: Vec<Participant>) -> Result<Self, HatimError> {
        let mut state = Self::new();
        for p in participants {
            let (_, event) = state.plan_add_with_id(p.id, &p.full_name, p.pages)?;
            state.apply_event(&event);
        }
        Ok(state)
    }

    /// Apply a participant event. Events for ids that are not on the roster
    /// and swaps past the end are ignored; `check_event` rejects them first
    /// when the event comes from outside this process.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::ParticipantAdded { id, full_name, pages } => {
                self.participants.push(Participant {
                    id: *id,
                    full_name: full_name.clone(),
                    pages: *pages,
                });
            }
            Event::ParticipantUpdated { id, full_name, pages } => {
                if let Some(p) = self.participants.iter_mut().find(|p| p.id == *id) {
                    p.full_name = full_name.clone();
                    p.pages = *pages;
                }
            }
            Event::ParticipantRemoved { id } => {
                if let Some(pos) = self.position(id) {
                    self.participants.remove(pos);
                }
            }
            Event::ParticipantsSwapped { index } => {
                if index + 1 < self.participants.len() {
                    self.participants.swap(*index, index + 1);
                }
            }
            Event::NameChanged { .. } | Event::DatesChanged { .. } => {}
        }
    }

    // ── Queries ──────────────────────────────────────────────

    pub fn book_size(&self) -> u32 {
        self.book_size
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == *id)
    }

    pub fn position(&self, id: &ParticipantId) -> Option<usize> {
        self.participants.iter().position(|p| p.id == *id)
    }

    /// First absolute page of the participant at `index`:
    /// one past the pages of everyone ahead of them.
    pub fn start_page(&self, index: usize) -> Result<u32, HatimError> {
        if index >= self.participants.len() {
            return Err(HatimError::IndexOutOfBounds {
                index,
                len: self.participants.len(),
            });
        }
        Ok(1 + self.participants[..index].iter().map(|p| p.pages).sum::<u32>())
    }

    /// Start page of every participant, in roster order, in one pass.
    pub fn start_pages(&self) -> Vec<u32> {
        let mut next = 1;
        self.participants
            .iter()
            .map(|p| {
                let start = next;
                next += p.pages;
                start
            })
            .collect()
    }

    pub fn total_used(&self) -> u32 {
        self.participants.iter().map(|p| p.pages).sum()
    }

    pub fn remaining(&self) -> u32 {
        self.book_size - self.total_used()
    }

    pub fn usage(&self) -> UsageSummary {
        let used = self.total_used();
        let fill_pct = f64::from(used) / f64::from(self.book_size) * 100.0;
        let level = if fill_pct >= USAGE_DANGER_PCT {
            UsageLevel::Danger
        } else if fill_pct >= USAGE_WARNING_PCT {
            UsageLevel::Warning
        } else {
            UsageLevel::Normal
        };
        UsageSummary {
            participants: self.participants.len(),
            used,
            remaining: self.book_size - used,
            fill_pct,
            level,
        }
    }

    /// Roster as displayed: 1-based ordinal plus derived start page.
    pub fn roster(&self) -> Vec<ParticipantInfo> {
        self.participants
            .iter()
            .zip(self.start_pages())
            .enumerate()
            .map(|(i, (p, start_page))| ParticipantInfo {
                ordinal: i + 1,
                id: p.id,
                full_name: p.full_name.clone(),
                pages: p.pages,
                start_page,
            })
            .collect()
    }
}
