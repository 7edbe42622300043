use crate::model::ParticipantId;

/// Why a participant's name or quota was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName,
    NameTooLong { len: usize, max: usize },
    InvalidPages,
    /// `available` is what is still free for this operation.
    CapacityExceeded { requested: u32, available: u32 },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyName => write!(f, "full name must not be empty"),
            ValidationError::NameTooLong { len, max } => {
                write!(f, "name is {len} characters long, limit is {max}")
            }
            ValidationError::InvalidPages => write!(f, "page count must be at least 1"),
            ValidationError::CapacityExceeded { requested, available } => write!(
                f,
                "{requested} pages requested but only {available} of {} remain",
                crate::limits::BOOK_SIZE
            ),
        }
    }
}

#[derive(Debug)]
pub enum HatimError {
    Validation(ValidationError),
    NotFound(ParticipantId),
    DuplicateId(ParticipantId),
    IndexOutOfBounds { index: usize, len: usize },
    RangeTooLarge { days: usize, max: usize },
    InvalidRange(&'static str),
    EmptyRoster,
    Storage(String),
}

impl std::fmt::Display for HatimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HatimError::Validation(e) => write!(f, "validation failed: {e}"),
            HatimError::NotFound(id) => write!(f, "participant not found: {id}"),
            HatimError::DuplicateId(id) => write!(f, "participant id already on the roster: {id}"),
            HatimError::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for {len} participants")
            }
            HatimError::RangeTooLarge { days, max } => {
                write!(f, "date range covers {days} days, limit is {max}")
            }
            HatimError::InvalidRange(msg) => write!(f, "invalid date range: {msg}"),
            HatimError::EmptyRoster => write!(f, "no participants to schedule"),
            HatimError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for HatimError {}

impl From<ValidationError> for HatimError {
    fn from(e: ValidationError) -> Self {
        HatimError::Validation(e)
    }
}

impl From<std::io::Error> for HatimError {
    fn from(e: std::io::Error) -> Self {
        HatimError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for HatimError {
    fn from(e: serde_json::Error) -> Self {
        HatimError::Storage(e.to_string())
    }
}
