pub mod allocation;
pub mod command;
pub mod error;
pub mod export;
pub mod limits;
pub mod model;
pub mod schedule;
pub mod session;
pub mod store;
pub mod wal;

pub use allocation::AllocationState;
pub use error::{HatimError, ValidationError};
pub use model::{HatimDocument, PageRange, Participant, ParticipantId};
pub use schedule::{Schedule, ScheduleRange};
pub use session::Session;
