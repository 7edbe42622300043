//! Load/save boundary for hatim documents.
//!
//! The stored shape is camelCase JSON:
//! `{ hatimName, startDate, endDate, participants: [{ id, fullName, pages }], journalSeq }`.
//! Older files carry `firstName`/`lastName` and millisecond-timestamp ids;
//! `StoredDocument::migrate` upgrades those on load. Saving always writes the
//! current shape.

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ulid::Ulid;

use crate::allocation::AllocationState;
use crate::error::HatimError;
use crate::model::*;
use crate::schedule::parse_iso_date;

/// Where a session's snapshot lives.
pub trait DocumentStore {
    /// `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<HatimDocument>, HatimError>;
    fn save(&self, doc: &HatimDocument) -> Result<(), HatimError>;
}

// ── Stored record shape ──────────────────────────────────────────

/// Participant id as found on disk: a ULID, or a legacy numeric timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredId {
    Ulid(Ulid),
    Legacy(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredParticipant {
    pub id: StoredId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub pages: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    #[serde(default)]
    pub hatim_name: String,
    /// ISO date or empty.
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub participants: Vec<StoredParticipant>,
    /// Last journal entry the snapshot includes. Absent in older files.
    #[serde(default)]
    pub journal_seq: u64,
}

impl StoredDocument {
    /// Upgrade legacy records in place. Returns how many participants changed.
    ///
    /// - no `fullName` but a first/last name: `fullName = trim(first + " " + last)`
    /// - numeric id: a ULID carrying the same millisecond timestamp, with the
    ///   roster position as its random part so equal timestamps stay distinct
    ///
    /// Running it again on migrated data changes nothing.
    pub fn migrate(&mut self) -> usize {
        let mut changed = 0;
        for (pos, p) in self.participants.iter_mut().enumerate() {
            let mut touched = false;
            let has_full_name = p.full_name.as_deref().is_some_and(|n| !n.is_empty());
            if !has_full_name && (p.first_name.is_some() || p.last_name.is_some()) {
                let joined = format!(
                    "{} {}",
                    p.first_name.as_deref().unwrap_or(""),
                    p.last_name.as_deref().unwrap_or("")
                );
                p.full_name = Some(joined.trim().to_string());
                touched = true;
            }
            if p.first_name.is_some() || p.last_name.is_some() {
                p.first_name = None;
                p.last_name = None;
                touched = true;
            }
            if let StoredId::Legacy(ms) = p.id {
                p.id = StoredId::Ulid(Ulid::from_parts(ms, pos as u128));
                touched = true;
            }
            if touched {
                changed += 1;
            }
        }
        changed
    }

    /// Build the in-memory document. Expects `migrate` to have run.
    pub fn into_document(self) -> Result<HatimDocument, HatimError> {
        let mut participants = Vec::with_capacity(self.participants.len());
        for p in self.participants {
            let StoredId::Ulid(id) = p.id else {
                return Err(HatimError::Storage("participant id was not migrated".into()));
            };
            participants.push(Participant {
                id,
                full_name: p.full_name.unwrap_or_default(),
                pages: p.pages,
            });
        }
        Ok(HatimDocument {
            name: self.hatim_name,
            start_date: stored_date("startDate", &self.start_date),
            end_date: stored_date("endDate", &self.end_date),
            allocation: AllocationState::restore(participants)?,
            journal_seq: self.journal_seq,
        })
    }

    pub fn from_document(doc: &HatimDocument) -> Self {
        Self {
            hatim_name: doc.name.clone(),
            start_date: doc.start_date.map(|d| d.to_string()).unwrap_or_default(),
            end_date: doc.end_date.map(|d| d.to_string()).unwrap_or_default(),
            participants: doc
                .allocation
                .participants()
                .iter()
                .map(|p| StoredParticipant {
                    id: StoredId::Ulid(p.id),
                    full_name: Some(p.full_name.clone()),
                    first_name: None,
                    last_name: None,
                    pages: p.pages,
                })
                .collect(),
            journal_seq: doc.journal_seq,
        }
    }
}

fn stored_date(field: &str, value: &str) -> Option<chrono::NaiveDate> {
    if value.trim().is_empty() {
        return None;
    }
    let parsed = parse_iso_date(value);
    if parsed.is_none() {
        warn!("ignoring unparseable {field} {value:?}");
    }
    parsed
}

/// Parse, migrate and validate a stored JSON payload.
pub fn decode_document(json: &str) -> Result<HatimDocument, HatimError> {
    let mut stored: StoredDocument = serde_json::from_str(json)?;
    let migrated = stored.migrate();
    if migrated > 0 {
        warn!("upgraded {migrated} legacy participant records");
    }
    stored.into_document()
}

pub fn encode_document(doc: &HatimDocument) -> Result<String, HatimError> {
    Ok(serde_json::to_string_pretty(&StoredDocument::from_document(doc))?)
}

// ── JSON file ────────────────────────────────────────────────────

/// Snapshot in a single JSON file, replaced atomically on save.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self) -> Result<Option<HatimDocument>, HatimError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let doc = decode_document(&json)?;
        info!(path = %self.path.display(), participants = doc.allocation.len(), "loaded hatim");
        Ok(Some(doc))
    }

    /// Write to a temp file, fsync, then rename over the snapshot.
    fn save(&self, doc: &HatimDocument) -> Result<(), HatimError> {
        let json = encode_document(doc)?;
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

// ── In memory ────────────────────────────────────────────────────

/// Keeps the encoded JSON in memory, so loads go through the same
/// decode and migration path as files.
#[derive(Default)]
pub struct InMemoryStore {
    json: RefCell<Option<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with a raw payload, e.g. one written by an older version.
    pub fn with_json(json: impl Into<String>) -> Self {
        Self {
            json: RefCell::new(Some(json.into())),
        }
    }

    pub fn json(&self) -> Option<String> {
        self.json.borrow().clone()
    }
}

impl DocumentStore for InMemoryStore {
    fn load(&self) -> Result<Option<HatimDocument>, HatimError> {
        self.json.borrow().as_deref().map(decode_document).transpose()
    }

    fn save(&self, doc: &HatimDocument) -> Result<(), HatimError> {
        *self.json.borrow_mut() = Some(encode_document(doc)?);
        Ok(())
    }
}
