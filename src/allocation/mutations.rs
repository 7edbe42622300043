use ulid::Ulid;

use crate::error::{HatimError, ValidationError};
use crate::limits::*;
use crate::model::*;

use super::AllocationState;

/// Trim and check a name/quota pair. Returns the trimmed name.
fn validate_entry(full_name: &str, pages: u32) -> Result<String, ValidationError> {
    let name = full_name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong { len, max: MAX_NAME_LEN });
    }
    if pages < 1 {
        return Err(ValidationError::InvalidPages);
    }
    Ok(name.to_string())
}

impl AllocationState {
    /// `other_total + pages` must fit in the book.
    fn check_capacity(&self, other_total: u32, pages: u32) -> Result<(), ValidationError> {
        if u64::from(other_total) + u64::from(pages) > u64::from(self.book_size) {
            return Err(ValidationError::CapacityExceeded {
                requested: pages,
                available: self.book_size.saturating_sub(other_total),
            });
        }
        Ok(())
    }

    fn index_in_bounds(&self, index: usize) -> Result<(), HatimError> {
        if index >= self.participants.len() {
            return Err(HatimError::IndexOutOfBounds {
                index,
                len: self.participants.len(),
            });
        }
        Ok(())
    }

    // ── Planning: validate, return the event, touch nothing ──

    /// The participant as it will appear on the roster, plus its event.
    pub fn plan_add(&self, full_name: &str, pages: u32) -> Result<(Participant, Event), HatimError> {
        self.plan_add_with_id(Ulid::new(), full_name, pages)
    }

    pub(super) fn plan_add_with_id(
        &self,
        id: ParticipantId,
        full_name: &str,
        pages: u32,
    ) -> Result<(Participant, Event), HatimError> {
        let full_name = validate_entry(full_name, pages)?;
        if self.position(&id).is_some() {
            return Err(HatimError::DuplicateId(id));
        }
        self.check_capacity(self.total_used(), pages)?;
        let event = Event::ParticipantAdded {
            id,
            full_name: full_name.clone(),
            pages,
        };
        Ok((Participant { id, full_name, pages }, event))
    }

    /// Capacity is re-checked without the participant's own current quota,
    /// so keeping or shrinking a quota is always allowed.
    pub fn plan_edit(
        &self,
        id: ParticipantId,
        full_name: &str,
        pages: u32,
    ) -> Result<Event, HatimError> {
        let full_name = validate_entry(full_name, pages)?;
        let current = self.get(&id).ok_or(HatimError::NotFound(id))?;
        self.check_capacity(self.total_used() - current.pages, pages)?;
        Ok(Event::ParticipantUpdated { id, full_name, pages })
    }

    pub fn plan_remove(&self, id: ParticipantId) -> Result<Event, HatimError> {
        if self.position(&id).is_none() {
            return Err(HatimError::NotFound(id));
        }
        Ok(Event::ParticipantRemoved { id })
    }

    /// `None` when `index` is already first.
    pub fn plan_move_up(&self, index: usize) -> Result<Option<Event>, HatimError> {
        self.index_in_bounds(index)?;
        if index == 0 {
            return Ok(None);
        }
        Ok(Some(Event::ParticipantsSwapped { index: index - 1 }))
    }

    /// `None` when `index` is already last.
    pub fn plan_move_down(&self, index: usize) -> Result<Option<Event>, HatimError> {
        self.index_in_bounds(index)?;
        if index == self.participants.len() - 1 {
            return Ok(None);
        }
        Ok(Some(Event::ParticipantsSwapped { index }))
    }

    /// Re-validate an event that was planned elsewhere, e.g. read back from
    /// the journal. Header events always pass.
    pub fn check_event(&self, event: &Event) -> Result<(), HatimError> {
        match event {
            Event::ParticipantAdded { id, full_name, pages } => {
                self.plan_add_with_id(*id, full_name, *pages)?;
            }
            Event::ParticipantUpdated { id, full_name, pages } => {
                self.plan_edit(*id, full_name, *pages)?;
            }
            Event::ParticipantRemoved { id } => {
                self.plan_remove(*id)?;
            }
            Event::ParticipantsSwapped { index } => {
                self.index_in_bounds(index.saturating_add(1))?;
            }
            Event::NameChanged { .. } | Event::DatesChanged { .. } => {}
        }
        Ok(())
    }

    // ── Direct mutation: plan + apply ────────────────────────

    pub fn add(&mut self, full_name: &str, pages: u32) -> Result<Participant, HatimError> {
        let (participant, event) = self.plan_add(full_name, pages)?;
        self.apply_event(&event);
        Ok(participant)
    }

    pub fn edit(&mut self, id: ParticipantId, full_name: &str, pages: u32) -> Result<(), HatimError> {
        let event = self.plan_edit(id, full_name, pages)?;
        self.apply_event(&event);
        Ok(())
    }

    pub fn remove(&mut self, id: ParticipantId) -> Result<Participant, HatimError> {
        let event = self.plan_remove(id)?;
        let removed = self.get(&id).cloned().ok_or(HatimError::NotFound(id))?;
        self.apply_event(&event);
        Ok(removed)
    }

    /// Swap with the previous entry. No-op at the top.
    pub fn move_up(&mut self, index: usize) -> Result<(), HatimError> {
        if let Some(event) = self.plan_move_up(index)? {
            self.apply_event(&event);
        }
        Ok(())
    }

    /// Swap with the next entry. No-op at the bottom.
    pub fn move_down(&mut self, index: usize) -> Result<(), HatimError> {
        if let Some(event) = self.plan_move_down(index)? {
            self.apply_event(&event);
        }
        Ok(())
    }
}
