//! Export matrix handed to whatever writes the spreadsheet.
//!
//! Row 0 is the header `#`, `FULL NAME`, `PAGE COUNT`, then one `DD.MM.YYYY`
//! column per day. Each following row is `ordinal, name, pages` and one
//! `start-end` cell per day. Styling and file I/O belong to the writer.

use tracing::info;

use crate::error::HatimError;
use crate::limits::MAX_SHEET_NAME_LEN;
use crate::model::HatimDocument;
use crate::schedule::{self, Schedule, ScheduleRange};

pub const HEADER_ORDINAL: &str = "#";
pub const HEADER_NAME: &str = "FULL NAME";
pub const HEADER_PAGES: &str = "PAGE COUNT";

/// Used when the hatim has no name yet.
pub const DEFAULT_TITLE: &str = "Hatim";

const UNSAFE_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Width hint floor, in characters.
const MIN_COLUMN_WIDTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Number(u64),
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    pub rows: Vec<Vec<Cell>>,
}

impl Matrix {
    pub fn from_schedule(schedule: &Schedule) -> Self {
        let mut header: Vec<Cell> = vec![HEADER_ORDINAL.into(), HEADER_NAME.into(), HEADER_PAGES.into()];
        header.extend(schedule.days.iter().map(|d| Cell::Text(schedule::format_date(*d))));

        let mut rows = Vec::with_capacity(schedule.rows.len() + 1);
        rows.push(header);
        for row in &schedule.rows {
            let mut cells = Vec::with_capacity(3 + row.ranges.len());
            cells.push(Cell::Number(row.ordinal as u64));
            cells.push(Cell::Text(row.full_name.clone()));
            cells.push(Cell::Number(u64::from(row.pages)));
            cells.extend(row.ranges.iter().map(|r| Cell::Text(r.to_string())));
            rows.push(cells);
        }
        Self { rows }
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Advisory per-column widths: longest cell plus two, never under eight.
    pub fn column_widths(&self) -> Vec<usize> {
        (0..self.width())
            .map(|col| {
                let longest = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.to_string().chars().count())
                    .max()
                    .unwrap_or(0);
                (longest + 2).max(MIN_COLUMN_WIDTH)
            })
            .collect()
    }

    /// Tab-separated rendering, one line per row. Tabs and newlines inside
    /// cells are replaced by spaces.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let line: Vec<String> = row
                .iter()
                .map(|c| c.to_string().replace(['\t', '\n', '\r'], " "))
                .collect();
            out.push_str(&line.join("\t"));
            out.push('\n');
        }
        out
    }
}

fn title(hatim_name: &str) -> &str {
    let trimmed = hatim_name.trim();
    if trimmed.is_empty() { DEFAULT_TITLE } else { trimmed }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Sheet name: sanitized title, at most 31 characters.
pub fn sheet_name(hatim_name: &str) -> String {
    sanitize(title(hatim_name)).chars().take(MAX_SHEET_NAME_LEN).collect()
}

/// Suggested file name for the exported workbook.
pub fn file_name(hatim_name: &str) -> String {
    format!("{}_hatim.xlsx", sanitize(title(hatim_name)))
}

/// A ready-to-write export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub sheet_name: String,
    pub file_name: String,
    pub matrix: Matrix,
}

/// Caller-side checks around the generator, then the matrix.
///
/// Unlike `schedule::generate`, an empty roster, a missing date or an empty
/// day sequence are errors here.
pub fn prepare_export(doc: &HatimDocument) -> Result<Export, HatimError> {
    if doc.allocation.is_empty() {
        return Err(HatimError::EmptyRoster);
    }
    let (Some(start), Some(end)) = (doc.start_date, doc.end_date) else {
        return Err(HatimError::InvalidRange("start and end date must both be set"));
    };
    let range = ScheduleRange::new(start, end);
    let schedule = schedule::generate(&doc.allocation, &range)?;
    if schedule.is_empty() {
        return Err(HatimError::InvalidRange("start date is after end date"));
    }

    let export = Export {
        sheet_name: sheet_name(&doc.name),
        file_name: file_name(&doc.name),
        matrix: Matrix::from_schedule(&schedule),
    };
    info!(
        sheet = %export.sheet_name,
        days = schedule.days.len(),
        participants = schedule.rows.len(),
        "prepared export"
    );
    Ok(export)
}
