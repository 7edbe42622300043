use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use ulid::Ulid;

use hatim::model::Event;
use hatim::session::{Session, document_paths};
use hatim::store::DocumentStore;
use hatim::wal::{JournalEntry, Wal};
use hatim::{HatimError, ValidationError};

// ── Test infrastructure ──────────────────────────────────────

fn test_data_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hatim_int_test_{}", Ulid::new()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ── Tests ────────────────────────────────────────────────────

#[test]
fn journal_survives_reopen() {
    let dir = test_data_dir();
    let (ali, veli);
    {
        let mut session = Session::open_in(&dir, "aile", 100).unwrap();
        session.set_name("Aile Hatmi").unwrap();
        session.set_dates(Some(date(2024, 3, 11)), Some(date(2024, 3, 13))).unwrap();
        ali = session.add("Ali", 100).unwrap();
        veli = session.add("Veli", 100).unwrap();
        session.move_up(1).unwrap();
        session.edit(ali.id, "Ali Kaya", 120).unwrap();
    }

    let (snapshot, journal) = document_paths(&dir, "aile").unwrap();
    assert!(!snapshot.exists(), "no checkpoint yet");
    assert!(fs::metadata(&journal).unwrap().len() > 0);

    let session = Session::open_in(&dir, "aile", 100).unwrap();
    let roster = session.roster();
    assert_eq!(roster.len(), 2);
    assert_eq!(roster[0].id, veli.id);
    assert_eq!(roster[1].full_name, "Ali Kaya");
    assert_eq!(roster[1].start_page, 101);
    assert_eq!(session.document().name, "Aile Hatmi");

    let schedule = session.schedule().unwrap();
    assert_eq!(schedule.rows[1].ranges[2].to_string(), "341-460");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn checkpoint_moves_journal_into_snapshot() {
    let dir = test_data_dir();
    {
        let mut session = Session::open_in(&dir, "cp", 100).unwrap();
        session.add("Ali", 10).unwrap();
        session.checkpoint().unwrap();
        session.add("Veli", 20).unwrap();
    }
    let (snapshot, journal) = document_paths(&dir, "cp").unwrap();
    let saved = fs::read_to_string(&snapshot).unwrap();
    assert!(saved.contains("Ali"));
    assert!(!saved.contains("Veli"));
    assert!(fs::metadata(&journal).unwrap().len() > 0);

    let session = Session::open_in(&dir, "cp", 100).unwrap();
    assert_eq!(session.usage().used, 30);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn threshold_triggers_checkpoint() {
    let dir = test_data_dir();
    let (snapshot, journal) = document_paths(&dir, "auto").unwrap();
    {
        let mut session = Session::open_in(&dir, "auto", 3).unwrap();
        session.add("A", 1).unwrap();
        session.add("B", 1).unwrap();
        assert!(!snapshot.exists());
        session.add("C", 1).unwrap();
        assert!(snapshot.exists());
        assert_eq!(fs::metadata(&journal).unwrap().len(), 0);
    }
    let session = Session::open_in(&dir, "auto", 3).unwrap();
    assert_eq!(session.roster().len(), 3);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn crash_between_snapshot_and_journal_reset() {
    let dir = test_data_dir();
    let (_, journal) = document_paths(&dir, "crash").unwrap();
    let (ali, veli);
    {
        let mut session = Session::open_in(&dir, "crash", 100).unwrap();
        ali = session.add("Ali", 600).unwrap();
        veli = session.add("Veli", 4).unwrap();
        session.move_up(1).unwrap();
        // snapshot written, journal never emptied
        session.store().save(session.document()).unwrap();
    }
    assert!(fs::metadata(&journal).unwrap().len() > 0);

    {
        let mut session = Session::open_in(&dir, "crash", 100).unwrap();
        let roster = session.roster();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].id, veli.id);
        assert_eq!(roster[1].id, ali.id);
        assert_eq!(session.usage().used, 604);
        assert_eq!(session.usage().remaining, 0);

        // new entries continue after the stale ones
        session.edit(ali.id, "Ali Kaya", 500).unwrap();
    }

    let session = Session::open_in(&dir, "crash", 100).unwrap();
    assert_eq!(session.roster()[1].full_name, "Ali Kaya");
    assert_eq!(session.usage().used, 504);
    assert_eq!(session.document().journal_seq, 4);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn journal_entry_past_capacity_fails_open() {
    let dir = test_data_dir();
    let (_, journal) = document_paths(&dir, "overfull").unwrap();
    {
        let mut wal = Wal::open(&journal).unwrap();
        for (seq, pages) in [(1, 600), (2, 10)] {
            let event = Event::ParticipantAdded { id: Ulid::new(), full_name: format!("P{seq}"), pages };
            wal.append(&JournalEntry { seq, event }).unwrap();
        }
    }
    assert!(matches!(Session::open_in(&dir, "overfull", 100), Err(HatimError::Storage(_))));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn rejected_mutation_is_not_journaled() {
    let dir = test_data_dir();
    {
        let mut session = Session::open_in(&dir, "reject", 100).unwrap();
        session.add("Ali", 600).unwrap();
        let err = session.add("Veli", 5).unwrap_err();
        assert!(matches!(
            err,
            HatimError::Validation(ValidationError::CapacityExceeded { requested: 5, available: 4 })
        ));
        assert!(matches!(session.remove(Ulid::new()), Err(HatimError::NotFound(_))));
    }
    let session = Session::open_in(&dir, "reject", 100).unwrap();
    assert_eq!(session.roster().len(), 1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn torn_journal_tail_is_dropped() {
    let dir = test_data_dir();
    {
        let mut session = Session::open_in(&dir, "torn", 100).unwrap();
        session.add("Ali", 10).unwrap();
    }
    let (_, journal) = document_paths(&dir, "torn").unwrap();
    {
        let mut f = fs::OpenOptions::new().append(true).open(&journal).unwrap();
        f.write_all(&[200, 0, 0, 0, 7, 7, 7]).unwrap();
    }
    {
        let mut session = Session::open_in(&dir, "torn", 100).unwrap();
        assert_eq!(session.roster().len(), 1);
        session.add("Veli", 10).unwrap();
    }
    let session = Session::open_in(&dir, "torn", 100).unwrap();
    assert_eq!(session.roster().len(), 2);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn legacy_snapshot_loads_and_exports() {
    let dir = test_data_dir();
    let (snapshot, _) = document_paths(&dir, "legacy").unwrap();
    fs::write(
        &snapshot,
        r#"{
            "hatimName": "Cuma: Hatim/2024",
            "startDate": "2024-01-01",
            "endDate": "2024-01-02",
            "participants": [
                { "id": 1704067200000, "firstName": "Ali", "lastName": "Veli", "pages": 100 },
                { "id": 1704067200001, "firstName": "", "lastName": "Ayşe", "pages": 100 }
            ]
        }"#,
    )
    .unwrap();

    let session = Session::open_in(&dir, "legacy", 100).unwrap();
    let export = session.export().unwrap();
    assert_eq!(export.sheet_name, "Cuma_ Hatim_2024");
    assert_eq!(export.file_name, "Cuma_ Hatim_2024_hatim.xlsx");
    assert_eq!(
        export.matrix.to_tsv(),
        "#\tFULL NAME\tPAGE COUNT\t01.01.2024\t02.01.2024\n\
         1\tAli Veli\t100\t1-100\t101-200\n\
         2\tAyşe\t100\t101-200\t201-300\n"
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn long_range_export_rejected() {
    let dir = test_data_dir();
    let mut session = Session::open_in(&dir, "long", 100).unwrap();
    session.add("Ali", 1).unwrap();
    session.set_dates(Some(date(2024, 1, 1)), Some(date(2025, 2, 3))).unwrap();
    assert!(matches!(session.export(), Err(HatimError::RangeTooLarge { days: 400, .. })));

    session.set_dates(Some(date(2024, 1, 3)), Some(date(2024, 1, 1))).unwrap();
    assert!(session.schedule().unwrap().is_empty());
    assert!(matches!(session.export(), Err(HatimError::InvalidRange(_))));

    let _ = fs::remove_dir_all(&dir);
}
