use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::Event;

/// One journal record. `seq` keeps increasing across checkpoints, so entries
/// a snapshot already holds can be told apart from newer ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub event: Event,
}

/// Encode one entry as `[u32 len][bincode payload][u32 crc32]`.
fn encode_entry(writer: &mut impl Write, entry: &JournalEntry) -> io::Result<()> {
    let payload =
        bincode::serialize(entry).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "journal entry too large"))?;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Read exactly `buf.len()` bytes. `Ok(false)` on a clean or partial EOF.
fn read_entry_part(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Append-only journal of accepted mutations since the last snapshot.
///
/// A crash mid-append leaves at most one truncated entry at the tail; replay
/// detects it through the length prefix and CRC and stops there.
pub struct Wal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_reset: u64,
}

impl Wal {
    /// Open (or create) the journal at `path`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            appends_since_reset: 0,
        })
    }

    /// Append one entry and fsync before returning.
    pub fn append(&mut self, entry: &JournalEntry) -> io::Result<()> {
        encode_entry(&mut self.writer, entry)?;
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.appends_since_reset += 1;
        Ok(())
    }

    pub fn appends_since_reset(&self) -> u64 {
        self.appends_since_reset
    }

    /// Empty the journal. Call only after a snapshot holding every journaled
    /// entry has been saved; a crash before this leaves entries the next open
    /// skips by `seq`.
    pub fn reset(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        file.sync_all()?;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.appends_since_reset = 0;
        Ok(())
    }

    /// Replay the journal from disk, returning every intact entry.
    /// A truncated or corrupt tail is discarded with a warning.
    pub fn replay(path: &Path) -> io::Result<Vec<JournalEntry>> {
        Ok(Self::replay_with_len(path)?.0)
    }

    /// Replay, cut any damaged tail off the file, and open it for appending,
    /// so new entries never land behind unreadable bytes.
    pub fn recover(path: &Path) -> io::Result<(Vec<JournalEntry>, Self)> {
        let (events, valid_len) = Self::replay_with_len(path)?;
        if let Ok(meta) = fs::metadata(path)
            && meta.len() > valid_len
        {
            warn!(path = %path.display(), dropped = meta.len() - valid_len, "truncating damaged journal tail");
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
        }
        Ok((events, Self::open(path)?))
    }

    /// Intact entries plus the byte length they occupy.
    fn replay_with_len(path: &Path) -> io::Result<(Vec<JournalEntry>, u64)> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
            Err(e) => return Err(e),
        };
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut valid_len = 0u64;

        loop {
            let mut len_buf = [0u8; 4];
            if !read_entry_part(&mut reader, &mut len_buf)? {
                break;
            }
            let len = u32::from_le_bytes(len_buf);

            // payload + crc must fit in what is left of the file
            let left = file_len.saturating_sub(valid_len + 4);
            if u64::from(len) + 4 > left {
                warn!(path = %path.display(), len, left, "journal length prefix past end of file, stopping replay");
                break;
            }

            let mut payload = vec![0u8; len as usize];
            if !read_entry_part(&mut reader, &mut payload)? {
                warn!(path = %path.display(), "discarding truncated journal entry");
                break;
            }

            let mut crc_buf = [0u8; 4];
            if !read_entry_part(&mut reader, &mut crc_buf)? {
                warn!(path = %path.display(), "discarding truncated journal entry");
                break;
            }
            if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
                warn!(path = %path.display(), "journal checksum mismatch, stopping replay");
                break;
            }

            match bincode::deserialize::<JournalEntry>(&payload) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(path = %path.display(), "undecodable journal entry: {e}");
                    break;
                }
            }
            valid_len += 8 + u64::from(len);
        }

        Ok((entries, valid_len))
    }
}
