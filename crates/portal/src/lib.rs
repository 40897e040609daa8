pub mod bridge;
pub mod db;
pub mod errors;
pub mod identity;
pub mod journal;
pub mod theme;

pub use db::{Assignment, Feedback, NewSubmission, PortalDb, Submission, SubmittedFile};
pub use errors::PortalError;
pub use identity::{Identity, IdentityStore};
pub use journal::{JournalRecord, StudyJournal};
pub use theme::ThemePref;
