/// Pages in the book. Every hatim divides exactly this many pages.
pub const BOOK_SIZE: u32 = 604;

/// Longest date range a schedule may cover, in days.
pub const MAX_SCHEDULE_DAYS: usize = 365;

/// Spreadsheet applications reject longer sheet names.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Upper bound on a participant's full name, in characters.
pub const MAX_NAME_LEN: usize = 256;

/// Upper bound on the hatim title, in characters.
pub const MAX_HATIM_NAME_LEN: usize = 256;

/// Fill percentage at which usage is reported as `Warning`.
pub const USAGE_WARNING_PCT: f64 = 70.0;

/// Fill percentage at which usage is reported as `Danger`.
pub const USAGE_DANGER_PCT: f64 = 90.0;
