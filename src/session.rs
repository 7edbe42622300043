//! One open hatim: the document, its snapshot store and its journal.
//!
//! Every mutation is validated against the current document, written to the
//! journal, then applied. Once the journal holds `compact_threshold` entries
//! the session checkpoints: snapshot save, then journal reset. The snapshot
//! records the last journal `seq` it contains, so entries left behind by a
//! crash between those two steps are skipped on the next open.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::HatimError;
use crate::export::{self, Export};
use crate::limits::MAX_HATIM_NAME_LEN;
use crate::model::*;
use crate::schedule::{self, Schedule, ScheduleRange};
use crate::store::{DocumentStore, JsonFileStore};
use crate::wal::{JournalEntry, Wal};

pub const DEFAULT_COMPACT_THRESHOLD: u64 = 100;

/// Keep document names safe to use as file stems.
pub fn sanitize_document_name(name: &str) -> Result<String, HatimError> {
    let safe: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if safe.is_empty() {
        return Err(HatimError::Storage(format!("unusable document name {name:?}")));
    }
    Ok(safe)
}

/// Snapshot and journal paths for a named document in `data_dir`.
pub fn document_paths(data_dir: &Path, name: &str) -> Result<(PathBuf, PathBuf), HatimError> {
    let safe = sanitize_document_name(name)?;
    Ok((
        data_dir.join(format!("{safe}.json")),
        data_dir.join(format!("{safe}.wal")),
    ))
}

/// Fold journal entries newer than the snapshot into `doc`. Each one is
/// re-checked; an entry that no longer fits means the files disagree, and
/// opening fails rather than breaking the roster.
fn replay_journal(doc: &mut HatimDocument, entries: &[JournalEntry]) -> Result<(), HatimError> {
    let mut replayed = 0;
    let mut stale = 0;
    for entry in entries {
        if entry.seq <= doc.journal_seq {
            stale += 1;
            continue;
        }
        doc.replay(&entry.event)
            .map_err(|e| HatimError::Storage(format!("journal entry {} rejected: {e}", entry.seq)))?;
        doc.journal_seq = entry.seq;
        replayed += 1;
    }
    if stale > 0 {
        warn!(stale, "skipped journal entries already in the snapshot");
    }
    if replayed > 0 {
        info!(replayed, seq = doc.journal_seq, "replayed journal");
    }
    Ok(())
}

pub struct Session<S: DocumentStore> {
    doc: HatimDocument,
    store: S,
    wal: Option<Wal>,
    compact_threshold: u64,
}

impl Session<JsonFileStore> {
    /// Open the named document under `data_dir`, replaying its journal.
    pub fn open_in(data_dir: &Path, name: &str, compact_threshold: u64) -> Result<Self, HatimError> {
        let (snapshot, journal) = document_paths(data_dir, name)?;
        Self::open(JsonFileStore::new(snapshot), Some(&journal), compact_threshold)
    }
}

impl<S: DocumentStore> Session<S> {
    /// Load the snapshot (empty document if none), then replay the journal
    /// on top. Without a journal path, changes live only until `checkpoint`.
    pub fn open(store: S, journal: Option<&Path>, compact_threshold: u64) -> Result<Self, HatimError> {
        let mut doc = store.load()?.unwrap_or_default();
        let wal = match journal {
            Some(path) => {
                let (entries, wal) = Wal::recover(path)?;
                replay_journal(&mut doc, &entries)?;
                Some(wal)
            }
            None => None,
        };
        Ok(Self {
            doc,
            store,
            wal,
            compact_threshold: compact_threshold.max(1),
        })
    }

    /// Session without a journal; every change waits for `checkpoint`.
    pub fn in_memory(store: S) -> Result<Self, HatimError> {
        Self::open(store, None, DEFAULT_COMPACT_THRESHOLD)
    }

    pub fn document(&self) -> &HatimDocument {
        &self.doc
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Journal + apply, checkpointing when the journal is long enough.
    fn persist_and_apply(&mut self, event: Event) -> Result<(), HatimError> {
        let entry = JournalEntry {
            seq: self.doc.journal_seq + 1,
            event,
        };
        if let Some(wal) = self.wal.as_mut() {
            wal.append(&entry)?;
        }
        self.doc.apply(&entry.event);
        self.doc.journal_seq = entry.seq;
        debug!(seq = entry.seq, "applied {:?}", entry.event);

        let due = self
            .wal
            .as_ref()
            .is_some_and(|w| w.appends_since_reset() >= self.compact_threshold);
        if due {
            self.checkpoint()?;
        }
        Ok(())
    }

    /// Save a snapshot and empty the journal.
    pub fn checkpoint(&mut self) -> Result<(), HatimError> {
        self.store.save(&self.doc)?;
        if let Some(wal) = self.wal.as_mut() {
            wal.reset()?;
        }
        info!(participants = self.doc.allocation.len(), "checkpoint saved");
        Ok(())
    }

    // ── Header ───────────────────────────────────────────────

    pub fn set_name(&mut self, name: &str) -> Result<(), HatimError> {
        let name = name.trim();
        let len = name.chars().count();
        if len > MAX_HATIM_NAME_LEN {
            return Err(crate::error::ValidationError::NameTooLong {
                len,
                max: MAX_HATIM_NAME_LEN,
            }
            .into());
        }
        self.persist_and_apply(Event::NameChanged { name: name.to_string() })
    }

    /// Either end may be left unset. An inverted range is stored as given;
    /// it only matters at export time.
    pub fn set_dates(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), HatimError> {
        self.persist_and_apply(Event::DatesChanged { start, end })
    }

    // ── Roster ───────────────────────────────────────────────

    pub fn add(&mut self, full_name: &str, pages: u32) -> Result<Participant, HatimError> {
        let (participant, event) = self.doc.allocation.plan_add(full_name, pages)?;
        self.persist_and_apply(event)?;
        Ok(participant)
    }

    pub fn edit(&mut self, id: ParticipantId, full_name: &str, pages: u32) -> Result<(), HatimError> {
        let event = self.doc.allocation.plan_edit(id, full_name, pages)?;
        self.persist_and_apply(event)
    }

    pub fn remove(&mut self, id: ParticipantId) -> Result<(), HatimError> {
        let event = self.doc.allocation.plan_remove(id)?;
        self.persist_and_apply(event)
    }

    pub fn move_up(&mut self, index: usize) -> Result<(), HatimError> {
        match self.doc.allocation.plan_move_up(index)? {
            Some(event) => self.persist_and_apply(event),
            None => Ok(()),
        }
    }

    pub fn move_down(&mut self, index: usize) -> Result<(), HatimError> {
        match self.doc.allocation.plan_move_down(index)? {
            Some(event) => self.persist_and_apply(event),
            None => Ok(()),
        }
    }

    // ── Derived views ────────────────────────────────────────

    pub fn usage(&self) -> UsageSummary {
        self.doc.allocation.usage()
    }

    pub fn roster(&self) -> Vec<ParticipantInfo> {
        self.doc.allocation.roster()
    }

    /// Schedule for the stored date range. Never cached.
    pub fn schedule(&self) -> Result<Schedule, HatimError> {
        let range = ScheduleRange {
            start: self.doc.start_date,
            end: self.doc.end_date,
        };
        schedule::generate(&self.doc.allocation, &range)
    }

    pub fn export(&self) -> Result<Export, HatimError> {
        export::prepare_export(&self.doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::store::InMemoryStore;
    use ulid::Ulid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn mutations_reach_document() {
        let mut session = Session::in_memory(InMemoryStore::new()).unwrap();
        let ali = session.add("Ali", 100).unwrap();
        session.add("Veli", 100).unwrap();
        session.move_down(0).unwrap();
        assert_eq!(session.roster()[1].id, ali.id);
        assert_eq!(session.roster()[1].start_page, 101);

        session.edit(ali.id, "Ali Can", 50).unwrap();
        assert_eq!(session.usage().used, 150);
        session.remove(ali.id).unwrap();
        assert_eq!(session.document().allocation.len(), 1);
    }

    #[test]
    fn rejected_mutation_changes_nothing() {
        let mut session = Session::in_memory(InMemoryStore::new()).unwrap();
        session.add("Ali", 600).unwrap();
        let before = session.document().clone();
        assert!(matches!(
            session.add("Veli", 5),
            Err(HatimError::Validation(ValidationError::CapacityExceeded { available: 4, .. }))
        ));
        assert_eq!(session.document(), &before);
    }

    #[test]
    fn checkpoint_writes_store() {
        let mut session = Session::in_memory(InMemoryStore::new()).unwrap();
        session.set_name("  Aile  ").unwrap();
        session.add("Ali", 10).unwrap();
        assert!(session.store().json().is_none());
        session.checkpoint().unwrap();
        let saved = session.store().load().unwrap().unwrap();
        assert_eq!(saved.name, "Aile");
        assert_eq!(&saved, session.document());
    }

    #[test]
    fn legacy_store_upgraded_on_open() {
        let store = InMemoryStore::with_json(
            r#"{ "hatimName": "Eski", "participants": [{ "id": 1700000000000, "firstName": "Ali", "lastName": "Kaya", "pages": 20 }] }"#,
        );
        let session = Session::in_memory(store).unwrap();
        assert_eq!(session.roster()[0].full_name, "Ali Kaya");
    }

    #[test]
    fn schedule_and_export_follow_dates() {
        let mut session = Session::in_memory(InMemoryStore::new()).unwrap();
        session.add("Ali", 10).unwrap();
        assert!(session.schedule().unwrap().is_empty());
        assert!(matches!(session.export(), Err(HatimError::InvalidRange(_))));

        session.set_dates(Some(date(2024, 1, 1)), Some(date(2024, 1, 3))).unwrap();
        let schedule = session.schedule().unwrap();
        assert_eq!(schedule.rows[0].ranges[2].to_string(), "21-30");
        assert_eq!(session.export().unwrap().file_name, "Hatim_hatim.xlsx");
    }

    #[test]
    fn hatim_name_length_limited() {
        let mut session = Session::in_memory(InMemoryStore::new()).unwrap();
        let long = "n".repeat(MAX_HATIM_NAME_LEN + 1);
        assert!(matches!(
            session.set_name(&long),
            Err(HatimError::Validation(ValidationError::NameTooLong { .. }))
        ));
    }

    #[test]
    fn boundary_moves_are_not_journaled() {
        let dir = std::env::temp_dir().join("hatim_test_session_noop");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let mut session = Session::open_in(&dir, "noop", 100).unwrap();
        session.add("Ali", 10).unwrap();
        session.move_up(0).unwrap();
        session.move_down(0).unwrap();
        assert_eq!(session.wal.as_ref().unwrap().appends_since_reset(), 1);
    }

    #[test]
    fn replay_skips_entries_the_snapshot_holds() {
        let mut session = Session::in_memory(InMemoryStore::new()).unwrap();
        session.add("Ali", 300).unwrap();
        session.add("Veli", 304).unwrap();
        session.move_up(1).unwrap();
        assert_eq!(session.document().journal_seq, 3);

        let mut doc = session.document().clone();
        let entries = vec![
            JournalEntry { seq: 2, event: Event::ParticipantRemoved { id: Ulid::new() } },
            JournalEntry { seq: 3, event: Event::ParticipantsSwapped { index: 0 } },
            JournalEntry { seq: 4, event: Event::NameChanged { name: "Cuma".into() } },
        ];
        replay_journal(&mut doc, &entries).unwrap();
        assert_eq!(doc.allocation, session.document().allocation);
        assert_eq!(doc.name, "Cuma");
        assert_eq!(doc.journal_seq, 4);
    }

    #[test]
    fn replay_rejects_entry_that_breaks_roster() {
        let mut doc = HatimDocument::default();
        let entries = vec![
            JournalEntry {
                seq: 1,
                event: Event::ParticipantAdded { id: Ulid::new(), full_name: "Ali".into(), pages: 600 },
            },
            JournalEntry {
                seq: 2,
                event: Event::ParticipantAdded { id: Ulid::new(), full_name: "Veli".into(), pages: 10 },
            },
        ];
        assert!(matches!(replay_journal(&mut doc, &entries), Err(HatimError::Storage(_))));
        assert_eq!(doc.allocation.total_used(), 600);
    }

    #[test]
    fn document_names_sanitized() {
        assert_eq!(sanitize_document_name("../etc/passwd").unwrap(), "etcpasswd");
        assert_eq!(sanitize_document_name("aile-2024_a").unwrap(), "aile-2024_a");
        assert!(sanitize_document_name("../").is_err());
    }
}
